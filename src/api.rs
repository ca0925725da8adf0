//! HTTP command surface
//!
//! The chat transport (message delivery, command parsing, keyboards) lives
//! outside this process; it drives the core through this API, one route per
//! command.

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::ai::{HttpTransport, Orchestrator};
use crate::config::ConfigStore;
use crate::ledger::{CostTracker, Ledger};
use crate::session::SessionStore;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<SessionStore>,
    pub tracker: Arc<CostTracker>,
    pub ledger: Ledger,
}

impl AppState {
    pub fn new(config: Arc<ConfigStore>, ledger: Ledger) -> Self {
        let transport = Arc::new(HttpTransport::new());
        Self {
            orchestrator: Arc::new(Orchestrator::new(config.clone(), transport)),
            sessions: Arc::new(SessionStore::new()),
            tracker: Arc::new(CostTracker::new(config.clone(), ledger.clone())),
            config,
            ledger,
        }
    }
}
