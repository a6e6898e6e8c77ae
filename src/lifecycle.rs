//! App-lifecycle reactions: re-checks on foreground, snapshotting on
//! background.
//!
//! The snapshot is a crash-resume diagnostic only. It is best-effort:
//! a write failure is logged and swallowed, never surfaced.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{keys, SessionStore};

/// App state as delivered by the platform lifecycle subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    Active,
    Background,
    Inactive,
}

/// Lightweight snapshot written to the plain tier when the app is
/// backgrounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalSnapshot {
    pub last_active_time: DateTime<Utc>,
    pub seller_id: Option<String>,
    pub auth_status: bool,
}

pub struct LifecycleCoordinator {
    store: Arc<SessionStore>,
}

impl LifecycleCoordinator {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Write the background snapshot. Best-effort.
    pub fn snapshot(&self, seller_id: Option<&str>, authenticated: bool) {
        let snapshot = CriticalSnapshot {
            last_active_time: Utc::now(),
            seller_id: seller_id.map(str::to_string),
            auth_status: authenticated,
        };
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                let outcome = self.store.set(keys::CRITICAL_DATA, &json);
                debug!(?outcome, "Background snapshot written");
            }
            Err(err) => {
                debug!(error = %err, "Background snapshot serialization failed");
            }
        }
    }

    /// Read back the last snapshot, if one survived.
    pub fn last_snapshot(&self) -> Option<CriticalSnapshot> {
        let json = self.store.get(keys::CRITICAL_DATA)?;
        serde_json::from_str(&json).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::new_test_store;

    #[test]
    fn snapshot_round_trips_through_plain_tier() {
        let (store, _dir) = new_test_store();
        let coordinator = LifecycleCoordinator::new(store.clone());

        coordinator.snapshot(Some("42"), true);

        let snapshot = coordinator.last_snapshot().expect("snapshot present");
        assert_eq!(snapshot.seller_id.as_deref(), Some("42"));
        assert!(snapshot.auth_status);
        assert!(store.get(keys::CRITICAL_DATA).is_some());
    }

    #[test]
    fn missing_snapshot_reads_as_none() {
        let (store, _dir) = new_test_store();
        let coordinator = LifecycleCoordinator::new(store);
        assert!(coordinator.last_snapshot().is_none());
    }
}
