//! Per-user history summaries

use crate::persistence::SessionRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Number of emotion categories counted in the pie
pub const CATEGORY_COUNT: usize = 5;

/// Summary of a user's stored sessions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    /// Oldest capture time
    pub earliest: DateTime<Utc>,

    /// Newest capture time
    pub latest: DateTime<Utc>,

    /// Number of sessions
    pub num: usize,

    /// Sessions in ascending capture order
    pub data: Vec<HistoryEntry>,

    /// Session count per `vote0` category, index 0 = ordinal 1
    pub pie: [u32; CATEGORY_COUNT],
}

/// One session in a history listing.
///
/// `time` and `result` come from the record; payload keys of the same name
/// are dropped so each appears once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub time: DateTime<Utc>,
    pub result: String,
    #[serde(flatten)]
    pub payload: serde_json::Value,
}

impl HistorySummary {
    /// Summarize records; `None` when there are none.
    ///
    /// Records are sorted by capture time first, so any input order works.
    pub fn from_records(mut records: Vec<SessionRecord>) -> Option<Self> {
        records.sort_by_key(|r| r.recorded_at);
        let earliest = records.first()?.recorded_at;
        let latest = records.last()?.recorded_at;

        let mut pie = [0u32; CATEGORY_COUNT];
        for record in &records {
            match overall_ordinal(&record.payload) {
                Some(ordinal) => pie[ordinal - 1] += 1,
                None => debug!(id = %record.id, "Session has no readable vote0 category"),
            }
        }

        let num = records.len();
        let data = records
            .into_iter()
            .map(|r| HistoryEntry {
                time: r.recorded_at,
                result: r.result,
                payload: without_entry_keys(r.payload),
            })
            .collect();

        Some(Self {
            earliest,
            latest,
            num,
            data,
            pie,
        })
    }
}

fn without_entry_keys(mut payload: serde_json::Value) -> serde_json::Value {
    if let serde_json::Value::Object(map) = &mut payload {
        map.remove("time");
        map.remove("result");
    }
    payload
}

/// Category ordinal (1..=5) of `vote0 = [percent, ordinal, name]`
fn overall_ordinal(payload: &serde_json::Value) -> Option<usize> {
    let ordinal = payload.get("vote0")?.get(1)?.as_u64()?;
    let ordinal = usize::try_from(ordinal).ok()?;
    (1..=CATEGORY_COUNT).contains(&ordinal).then_some(ordinal)
}
