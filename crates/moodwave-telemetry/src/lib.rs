//! Moodwave Telemetry
//!
//! Session persistence, history summaries and service metrics.
//!
//! Provides:
//! - Durable per-user session records (JSON-lines file or in-memory)
//! - History summaries with per-category counts
//! - In-process counters for the stats endpoint

pub mod history;
pub mod metrics;
pub mod persistence;

pub use history::{HistoryEntry, HistorySummary};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use persistence::{
    JsonlSessionStore, MemorySessionStore, PersistenceConfig, SessionRecord, SessionStore,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::history::HistorySummary;
    pub use crate::metrics::MetricsCollector;
    pub use crate::persistence::{SessionRecord, SessionStore};
}
