//! Application state management

use crate::engine::TelemetryEngine;
use cst_core::model::SensorSnapshot;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The single engine every route talks to
    pub engine: TelemetryEngine,
}

impl AppState {
    pub fn new(engine: TelemetryEngine) -> Self {
        Self { engine }
    }

    /// Subscribe to published snapshots
    pub fn subscribe(&self) -> watch::Receiver<Arc<SensorSnapshot>> {
        self.engine.subscribe()
    }
}
