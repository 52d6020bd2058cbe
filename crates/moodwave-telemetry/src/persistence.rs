//! Session persistence layer
//!
//! One record per completed inference, keyed by `(user, recorded_at)`.
//! The file store is an append-only JSON-lines log; a repeated key is
//! resolved at read time in favour of the last write.

use chrono::{DateTime, Utc};
use moodwave_core::{Error, Result};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};

const STORE_FILE: &str = "sessions.jsonl";

/// Configuration for session persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding the session log
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,

    /// Flush to disk after this many records
    #[serde(default = "default_flush_interval")]
    pub flush_interval: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            flush_interval: default_flush_interval(),
        }
    }
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_flush_interval() -> usize {
    1
}

/// A persisted inference result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique record ID
    pub id: String,

    /// User the recording belongs to
    pub user: String,

    /// Capture time
    pub recorded_at: DateTime<Utc>,

    /// Full inference report as returned to the client
    pub payload: serde_json::Value,

    /// `vote0` display percentage as text
    pub result: String,
}

impl SessionRecord {
    /// Create a record with a fresh ID
    pub fn new(
        user: impl Into<String>,
        recorded_at: DateTime<Utc>,
        payload: serde_json::Value,
        result: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_record_id(),
            user: user.into(),
            recorded_at,
            payload,
            result: result.into(),
        }
    }
}

/// Generate a unique record ID using UUID v4
fn generate_record_id() -> String {
    format!("ses_{}", uuid::Uuid::new_v4())
}

/// Durable key-value store of session records
pub trait SessionStore: Send + Sync {
    /// Store a record; a repeated `(user, recorded_at)` replaces the earlier one
    fn append(&self, record: SessionRecord) -> Result<()>;

    /// All records of one user, ascending by `recorded_at`
    fn query_user(&self, user: &str) -> Result<Vec<SessionRecord>>;

    /// Force buffered records to durable storage
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

struct SessionWriter {
    file: BufWriter<File>,
    records_since_flush: usize,
}

/// JSON-lines file store
pub struct JsonlSessionStore {
    config: PersistenceConfig,
    path: PathBuf,
    writer: Mutex<SessionWriter>,
}

impl JsonlSessionStore {
    /// Open (or create) the store in `config.dir`
    pub fn open(config: PersistenceConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.dir).map_err(|e| {
            Error::persistence(format!("cannot create {}: {}", config.dir.display(), e))
        })?;

        let path = config.dir.join(STORE_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::persistence(format!("cannot open {}: {}", path.display(), e)))?;

        info!("Session store opened at {:?}", path);

        Ok(Self {
            config,
            path,
            writer: Mutex::new(SessionWriter {
                file: BufWriter::new(file),
                records_since_flush: 0,
            }),
        })
    }

    /// Path of the session log
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStore for JsonlSessionStore {
    fn append(&self, record: SessionRecord) -> Result<()> {
        let json = serde_json::to_string(&record)?;

        let mut writer = self.writer.lock();
        writeln!(writer.file, "{}", json)
            .map_err(|e| Error::persistence(format!("write failed: {}", e)))?;
        writer.records_since_flush += 1;

        if writer.records_since_flush >= self.config.flush_interval {
            writer
                .file
                .flush()
                .map_err(|e| Error::persistence(format!("flush failed: {}", e)))?;
            writer.records_since_flush = 0;
        }

        debug!(user = %record.user, recorded_at = %record.recorded_at, "Persisted session");
        Ok(())
    }

    fn query_user(&self, user: &str) -> Result<Vec<SessionRecord>> {
        // make buffered appends visible to the reader
        self.flush()?;

        let file = File::open(&self.path)
            .map_err(|e| Error::persistence(format!("cannot read {}: {}", self.path.display(), e)))?;

        let mut latest: BTreeMap<DateTime<Utc>, SessionRecord> = BTreeMap::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| Error::persistence(format!("read failed: {}", e)))?;
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<SessionRecord>(&line) {
                Ok(record) if record.user == user => {
                    latest.insert(record.recorded_at, record);
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to parse session record: {}", e);
                }
            }
        }

        Ok(latest.into_values().collect())
    }

    fn flush(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer
            .file
            .flush()
            .map_err(|e| Error::persistence(format!("flush failed: {}", e)))?;
        writer.records_since_flush = 0;
        Ok(())
    }
}

impl Drop for JsonlSessionStore {
    fn drop(&mut self) {
        let _ = self.writer.get_mut().file.flush();
    }
}

/// In-memory store for tests and ephemeral runs
#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<BTreeMap<(String, DateTime<Utc>), SessionRecord>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all users
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn append(&self, record: SessionRecord) -> Result<()> {
        self.records
            .write()
            .insert((record.user.clone(), record.recorded_at), record);
        Ok(())
    }

    fn query_user(&self, user: &str) -> Result<Vec<SessionRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|((owner, _), _)| owner == user)
            .map(|(_, record)| record.clone())
            .collect())
    }
}
