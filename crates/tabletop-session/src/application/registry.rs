//! In-process registry guaranteeing one coordinator per invite code.

use std::sync::Arc;

use dashmap::DashMap;
use tabletop_core::clock::Clock;
use tabletop_core::error::DomainError;
use tabletop_core::store::StateStore;
use tracing::debug;
use uuid::Uuid;

use crate::application::coordinator::SessionCoordinator;
use crate::domain::invite_code::InviteCode;

/// Namespace for deriving session ids from invite codes.
const SESSION_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b7e_53a4_4d0e_9c61_7a2f_0b3d_5e89);

/// Maps invite codes to their single live coordinator.
///
/// Coordinators are created on first lookup and kept while they hold a
/// session, so every request for a code reaches the same instance. A lookup
/// that finds no session leaves nothing behind.
pub struct SessionRegistry {
    clock: Arc<dyn Clock>,
    store: Arc<dyn StateStore>,
    coordinators: DashMap<InviteCode, Arc<SessionCoordinator>>,
}

impl SessionRegistry {
    /// Creates an empty registry whose coordinators share `clock` and `store`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn StateStore>) -> Self {
        Self {
            clock,
            store,
            coordinators: DashMap::new(),
        }
    }

    /// Internal identity for an invite code. The same code always yields the
    /// same id, across restarts.
    #[must_use]
    pub fn session_id_for(code: &InviteCode) -> Uuid {
        Uuid::new_v5(&SESSION_NAMESPACE, code.as_str().as_bytes())
    }

    /// Returns the coordinator for a code, creating it on first use.
    pub fn coordinator(&self, code: &InviteCode) -> Arc<SessionCoordinator> {
        self.coordinators
            .entry(code.clone())
            .or_insert_with(|| {
                debug!(invite_code = %code, "creating coordinator");
                Arc::new(SessionCoordinator::new(
                    Self::session_id_for(code),
                    code.clone(),
                    Arc::clone(&self.clock),
                    Arc::clone(&self.store),
                ))
            })
            .value()
            .clone()
    }

    /// Returns the coordinator for a code that names an initialized session.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no session exists for the code; the coordinator
    ///   created for the lookup is forgotten again.
    /// - `Upstream` if loading the checkpoint fails.
    pub async fn existing(&self, code: &InviteCode) -> Result<Arc<SessionCoordinator>, DomainError> {
        let coordinator = self.coordinator(code);
        match coordinator.ensure_exists().await {
            Ok(()) => Ok(coordinator),
            Err(err) => {
                self.forget_if_absent(coordinator);
                Err(err)
            }
        }
    }

    /// Drops a coordinator that holds no session and no connections and is
    /// referenced nowhere but the map and the caller.
    ///
    /// Clones are only handed out under the map's shard lock, which
    /// `remove_if` holds while checking, so no lookup can pick up the
    /// coordinator while it is being dropped.
    pub fn forget_if_absent(&self, coordinator: Arc<SessionCoordinator>) -> bool {
        let forgotten = self
            .coordinators
            .remove_if(coordinator.invite_code(), |_, resident| {
                Arc::ptr_eq(resident, &coordinator)
                    && Arc::strong_count(resident) == 2
                    && resident.is_vacant()
            })
            .is_some();
        if forgotten {
            debug!(invite_code = %coordinator.invite_code(), "forgot coordinator without session");
        }
        forgotten
    }

    /// Number of resident coordinators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coordinators.len()
    }

    /// Whether no coordinator is resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coordinators.is_empty()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("coordinators", &self.coordinators.len())
            .finish_non_exhaustive()
    }
}
