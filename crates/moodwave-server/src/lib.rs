//! Moodwave Server
//!
//! HTTP boundary of the valence engine. Two operations are exposed:
//! recording a session (inference plus persistence) and reading a user's
//! history summary. Health, Prometheus and stats endpoints sit beside them.

pub mod config;
pub mod error;
pub mod routes;
pub mod service;
pub mod state;

pub use config::{Overrides, ServerConfig};
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
