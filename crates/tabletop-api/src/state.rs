//! Shared application state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tabletop_core::clock::Clock;
use tabletop_core::narration::Narrator;
use tabletop_core::rng::DeterministicRng;
use tabletop_core::store::StateStore;
use tabletop_session::application::registry::SessionRegistry;

/// Limits enforced at the HTTP/WS edge rather than by a coordinator.
#[derive(Debug, Clone, Copy)]
pub struct EdgeSettings {
    /// Upper bound on one narration call.
    pub narration_timeout: Duration,
    /// Outbound queue capacity per live connection.
    pub connection_buffer: usize,
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            narration_timeout: Duration::from_secs(20),
            connection_buffer: 64,
        }
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Invite code to coordinator lookup.
    pub sessions: Arc<SessionRegistry>,
    /// Random number generator used to allocate invite codes.
    pub rng: Arc<Mutex<dyn DeterministicRng>>,
    /// Narration collaborator for host prompts.
    pub narrator: Arc<dyn Narrator>,
    /// Edge limits.
    pub settings: EdgeSettings,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn StateStore>,
        rng: Arc<Mutex<dyn DeterministicRng>>,
        narrator: Arc<dyn Narrator>,
        settings: EdgeSettings,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(clock, store)),
            rng,
            narrator,
            settings,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.sessions)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
