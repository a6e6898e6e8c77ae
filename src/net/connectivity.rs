//! Device network reachability tracking.
//!
//! The platform delivers `{is_connected, is_internet_reachable, type}`
//! reports on every change; the monitor collapses them into a tri-state
//! connection status and can actively probe the backend on demand.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::api::SellerApi;
use crate::error::AuthError;
use crate::models::{ConnectionStatus, NetworkState};
use crate::retry::{CancelToken, RetryExecutor};

pub struct ConnectivityMonitor {
    api: Arc<dyn SellerApi>,
    retry: RetryExecutor,
    state: Mutex<NetworkState>,
    status: Mutex<ConnectionStatus>,
}

impl ConnectivityMonitor {
    pub fn new(api: Arc<dyn SellerApi>, retry: RetryExecutor) -> Self {
        Self {
            api,
            retry,
            state: Mutex::new(NetworkState::default()),
            status: Mutex::new(ConnectionStatus::Offline),
        }
    }

    /// Apply a platform connectivity event and return the recomputed
    /// status.
    pub fn apply_event(&self, event: NetworkState) -> ConnectionStatus {
        let status = event.status();
        debug!(
            connected = ?event.is_connected,
            reachable = ?event.is_internet_reachable,
            transport = event.transport.as_deref().unwrap_or("unknown"),
            status = status.as_str(),
            "Connectivity event"
        );
        *self.state.lock().expect("network state lock") = event;
        *self.status.lock().expect("status lock") = status;
        status
    }

    /// Actively probe the backend. Status is `Checking` for the duration
    /// of the probe, then `Online`/`Offline` from the probe result. A
    /// probe error after retries counts as offline and is handed back so
    /// the caller can surface it.
    pub async fn test_connection(
        &self,
        cancel: &CancelToken,
    ) -> (ConnectionStatus, Option<AuthError>) {
        *self.status.lock().expect("status lock") = ConnectionStatus::Checking;

        let api = self.api.clone();
        let probe = self
            .retry
            .perform_with_retry("connectivity_probe", cancel, || {
                let api = api.clone();
                async move { api.test_connection().await.map_err(AuthError::from) }
            })
            .await;

        let (reachable, error) = match probe {
            Ok(up) => (up, None),
            Err(err) => (false, Some(err)),
        };
        let status = if reachable {
            ConnectionStatus::Online
        } else {
            ConnectionStatus::Offline
        };
        *self.status.lock().expect("status lock") = status;
        (status, error)
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.lock().expect("status lock")
    }

    pub fn network_state(&self) -> NetworkState {
        self.state.lock().expect("network state lock").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    use crate::models::PerformanceMetrics;
    use crate::retry::CancelSource;
    use crate::testutil::MockSellerApi;

    fn monitor(api: Arc<MockSellerApi>) -> ConnectivityMonitor {
        let retry = RetryExecutor::new(
            Arc::new(AtomicU32::new(0)),
            Arc::new(Mutex::new(PerformanceMetrics::default())),
        );
        ConnectivityMonitor::new(api, retry)
    }

    #[test]
    fn events_recompute_status() {
        let monitor = monitor(Arc::new(MockSellerApi::default()));
        let status = monitor.apply_event(NetworkState {
            is_connected: Some(true),
            is_internet_reachable: Some(true),
            transport: Some("wifi".to_string()),
        });
        assert_eq!(status, ConnectionStatus::Online);

        let status = monitor.apply_event(NetworkState {
            is_connected: Some(true),
            is_internet_reachable: Some(false),
            transport: Some("cellular".to_string()),
        });
        assert_eq!(status, ConnectionStatus::Offline);
        assert_eq!(monitor.status(), ConnectionStatus::Offline);
        assert_eq!(monitor.network_state().transport.as_deref(), Some("cellular"));
    }

    #[tokio::test]
    async fn probe_success_is_online() {
        let api = Arc::new(MockSellerApi::default());
        api.set_connection_ok(true);
        let monitor = monitor(api);
        let (status, error) = monitor.test_connection(&CancelSource::new().token()).await;
        assert_eq!(status, ConnectionStatus::Online);
        assert!(error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn probe_failure_is_offline_and_reports_the_error() {
        let api = Arc::new(MockSellerApi::default());
        api.fail_connection();
        let monitor = monitor(api.clone());
        let (status, error) = monitor.test_connection(&CancelSource::new().token()).await;
        assert_eq!(status, ConnectionStatus::Offline);
        assert!(matches!(error, Some(AuthError::Network(_))));
        assert_eq!(api.call_count("test_connection"), 3);
    }
}
