use std::sync::Arc;

use subhub_events::EventBus;
use subhub_pipeline::Services;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is an `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// The wired service graph (pipeline, tasks, teams, videos, ...).
    pub services: Services,
    /// Server configuration (JWT secret, CORS, timeouts).
    pub config: Arc<ServerConfig>,
    /// Post-commit domain events.
    pub event_bus: Arc<EventBus>,
}
