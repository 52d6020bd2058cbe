//! The two operations behind the HTTP surface

use crate::error::AppError;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use moodwave_classifiers::InferenceOutcome;
use moodwave_core::RawRecording;
use moodwave_telemetry::{HistorySummary, SessionRecord};
use serde_json::Value;
use tracing::{info, instrument};

/// Run one inference cycle for a user and persist the result.
///
/// Returns the report JSON with `time` and `name` added, exactly as stored.
#[instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn run_inference_cycle(
    state: &AppState,
    user: &str,
    body: String,
    recorded_at: DateTime<Utc>,
) -> Result<Value, AppError> {
    let engine = state.engine.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let recording = RawRecording::from_json(&body)?;
        engine.infer(&recording)
    })
    .await?;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            state.metrics.record_failure(err.kind());
            metrics::counter!("moodwave_inference_errors_total", "kind" => err.kind())
                .increment(1);
            return Err(err.into());
        }
    };
    record_success(state, &outcome);

    let summary = outcome.report.summary();
    let mut payload = serde_json::to_value(&outcome.report).map_err(moodwave_core::Error::from)?;
    if let Value::Object(map) = &mut payload {
        map.insert("time".to_string(), Value::String(recorded_at.to_rfc3339()));
        map.insert("name".to_string(), Value::String(user.to_string()));
    }

    let record = SessionRecord::new(user, recorded_at, payload.clone(), summary.clone());
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || store.append(record)).await??;
    state.metrics.record_session_persisted();

    info!(
        user,
        vote0 = %summary,
        windows = outcome.report.windows_total,
        latency_us = outcome.latency_us,
        "Session recorded"
    );

    Ok(payload)
}

fn record_success(state: &AppState, outcome: &InferenceOutcome) {
    let undefined = outcome.report.windows_undefined as u64;
    state.metrics.record_inference(
        outcome.latency_us,
        outcome.report.windows_total as u64,
        undefined,
    );

    metrics::counter!("moodwave_inferences_total").increment(1);
    metrics::counter!("moodwave_undefined_confidence_total").increment(undefined);
    metrics::histogram!("moodwave_inference_latency_us").record(outcome.latency_us as f64);
}

/// Fetch a user's historical inference summary
#[instrument(skip(state))]
pub async fn fetch_history(state: &AppState, user: &str) -> Result<HistorySummary, AppError> {
    state.metrics.record_history_query();

    let store = state.store.clone();
    let owner = user.to_string();
    let records = tokio::task::spawn_blocking(move || store.query_user(&owner)).await??;

    HistorySummary::from_records(records).ok_or(AppError::NoHistory)
}
