//! Shared application state

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use moodwave_classifiers::{ClassifierRegistry, InferenceEngine};
use moodwave_telemetry::{JsonlSessionStore, MetricsCollector, SessionStore};
use std::sync::Arc;
use tracing::info;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,

    /// Immutable inference engine, loaded once at startup
    pub engine: Arc<InferenceEngine>,

    /// Session persistence
    pub store: Arc<dyn SessionStore>,

    /// In-process counters for `/v1/stats`
    pub metrics: MetricsCollector,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Load models and open the session store
    pub fn new(config: ServerConfig, metrics_handle: PrometheusHandle) -> Result<Self> {
        info!(path = %config.ensemble_config.display(), "Loading ensemble");
        let registry = ClassifierRegistry::from_file(&config.ensemble_config)
            .context("failed to load classifier ensemble")?;
        info!("Loaded {} classifiers", registry.count());
        let engine = registry
            .build_engine()
            .context("failed to build inference engine")?;

        let store = JsonlSessionStore::open(config.store.clone())
            .context("failed to open session store")?;

        Ok(Self::from_parts(
            config,
            Arc::new(engine),
            Arc::new(store),
            metrics_handle,
        ))
    }

    /// Assemble state from already built parts
    pub fn from_parts(
        config: ServerConfig,
        engine: Arc<InferenceEngine>,
        store: Arc<dyn SessionStore>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            store,
            metrics: MetricsCollector::new(),
            metrics_handle,
        }
    }
}
