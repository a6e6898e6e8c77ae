//! Session/auth orchestration behind one state object and one method
//! surface.
//!
//! Three independent triggers re-enter the same status check: initial
//! mount, connectivity-change events, and app-foreground events. The
//! check is single-flight - a trigger that arrives while a pass is in
//! flight awaits that pass's result instead of starting a duplicate -
//! and the mutating entry points (`check_auth_status`, `login`,
//! `logout`, `refresh_token`, profile updates) all serialize through one
//! gate so interleaved writes cannot corrupt the retry counter or issue
//! a double logout.

use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::SellerApi;
use crate::biometric::{BiometricApi, BiometricGate};
use crate::error::{AuthError, AuthErrorKind};
use crate::lifecycle::{AppPhase, LifecycleCoordinator};
use crate::models::{
    ConnectionStatus, LoginResponse, NetworkState, PerformanceMetrics, SellerPayload,
    SellerProfile,
};
use crate::net::ConnectivityMonitor;
use crate::retry::{CancelSource, CancelToken, RetryExecutor};
use crate::store::{keys, SessionStore, StoreOutcome};

use super::token::{TokenManager, DEFAULT_EXPIRY_BUFFER_SECS};

/// The only user type this core manages.
const USER_TYPE_SELLER: &str = "seller";

/// Sub-phase of an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPhase {
    Valid,
    Refreshing,
}

/// Auth state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Unknown,
    Checking,
    Authenticated(TokenPhase),
    Unauthenticated,
}

/// Reactive state published to the UI layer.
#[derive(Debug, Clone)]
pub struct AuthSnapshot {
    pub phase: AuthPhase,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub seller: Option<SellerProfile>,
    pub auth_error: Option<String>,
    pub auth_error_kind: Option<AuthErrorKind>,
    pub retry_count: u32,
    pub connection_status: ConnectionStatus,
    pub network_state: NetworkState,
    pub biometric_supported: bool,
    pub biometric_enabled: bool,
    pub performance_metrics: PerformanceMetrics,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            phase: AuthPhase::Unknown,
            is_authenticated: false,
            is_loading: false,
            seller: None,
            auth_error: None,
            auth_error_kind: None,
            retry_count: 0,
            connection_status: ConnectionStatus::Offline,
            network_state: NetworkState::default(),
            biometric_supported: false,
            biometric_enabled: false,
            performance_metrics: PerformanceMetrics::default(),
        }
    }
}

/// In-memory mutable state. Guarded by a plain mutex; never held across
/// an await.
struct AuthState {
    phase: AuthPhase,
    seller: Option<SellerProfile>,
    auth_error: Option<AuthError>,
    is_loading: bool,
}

/// Session keys as read back from storage for a status check.
struct StoredSession {
    access_token: Option<String>,
    user_type: Option<String>,
    seller_id: Option<String>,
    seller_data: Option<String>,
}

impl StoredSession {
    fn read(store: &SessionStore) -> Self {
        Self {
            access_token: store.get(keys::ACCESS_TOKEN),
            user_type: store.get(keys::USER_TYPE),
            seller_id: store.get(keys::SELLER_ID),
            seller_data: store.get(keys::SELLER_DATA),
        }
    }

    fn is_complete(&self) -> bool {
        self.access_token.is_some()
            && self.user_type.as_deref() == Some(USER_TYPE_SELLER)
            && self.seller_id.is_some()
    }

    /// Parse the stored profile. A corrupt blob costs the profile but
    /// not the session; the next profile refresh rewrites it.
    fn load_seller(&self) -> Option<SellerProfile> {
        let json = self.seller_data.as_ref()?;
        match serde_json::from_str(json) {
            Ok(seller) => Some(seller),
            Err(err) => {
                warn!(error = %err, "Stored seller data corrupt, dropping profile");
                None
            }
        }
    }
}

struct Inner {
    store: Arc<SessionStore>,
    tokens: TokenManager,
    retry: RetryExecutor,
    api: Arc<dyn SellerApi>,
    connectivity: ConnectivityMonitor,
    lifecycle: LifecycleCoordinator,
    biometrics: BiometricGate,
    cancel: CancelSource,
    /// Serializes every mutating entry point.
    gate: Mutex<()>,
    /// Single-flight slot for `check_auth_status`. `None` result means
    /// the pass is still running.
    check_flight: Mutex<Option<watch::Receiver<Option<bool>>>>,
    state: StdMutex<AuthState>,
    metrics: Arc<StdMutex<PerformanceMetrics>>,
    watch_tx: watch::Sender<AuthSnapshot>,
}

/// Orchestrates storage, token validity, connectivity, lifecycle and
/// biometrics behind the surface the UI layer consumes.
pub struct AuthController {
    inner: Arc<Inner>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

impl AuthController {
    pub fn new(
        store: Arc<SessionStore>,
        api: Arc<dyn SellerApi>,
        biometric_api: Arc<dyn BiometricApi>,
    ) -> Self {
        let retry_count = Arc::new(AtomicU32::new(0));
        let metrics = Arc::new(StdMutex::new(PerformanceMetrics::default()));
        let retry = RetryExecutor::new(retry_count, metrics.clone());

        let (watch_tx, _watch_rx) = watch::channel(AuthSnapshot::default());

        let inner = Arc::new(Inner {
            tokens: TokenManager::new(store.clone(), api.clone(), retry.clone()),
            connectivity: ConnectivityMonitor::new(api.clone(), retry.clone()),
            lifecycle: LifecycleCoordinator::new(store.clone()),
            biometrics: BiometricGate::new(biometric_api, store.clone()),
            cancel: CancelSource::new(),
            gate: Mutex::new(()),
            check_flight: Mutex::new(None),
            state: StdMutex::new(AuthState {
                phase: AuthPhase::Unknown,
                seller: None,
                auth_error: None,
                is_loading: false,
            }),
            metrics,
            retry,
            api,
            store,
            watch_tx,
        });

        Self {
            inner,
            tasks: StdMutex::new(Vec::new()),
        }
    }

    /// Subscribe to state snapshots. The receiver always holds the most
    /// recent snapshot.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.inner.watch_tx.subscribe()
    }

    /// Current snapshot without subscribing.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.watch_tx.borrow().clone()
    }

    /// Initial mount trigger: runs the first status check.
    pub async fn start(&self) -> bool {
        info!("Auth controller starting");
        self.inner.check_auth_status().await
    }

    /// Re-entrant status check. Concurrent callers share one pass.
    pub async fn check_auth_status(&self) -> bool {
        self.inner.check_auth_status().await
    }

    /// Explicit re-check entry point for collaborators that observe an
    /// unauthorized response elsewhere in the app.
    pub async fn force_recheck(&self) -> bool {
        debug!("Forced auth re-check requested");
        self.inner.check_auth_status().await
    }

    /// Establish a session from a login response. Returns `false` and
    /// sets `auth_error` on an invalid payload, without touching storage.
    pub async fn login(&self, payload: LoginResponse) -> bool {
        self.inner.login(payload).await
    }

    /// Clear the session everywhere. Idempotent. This is the only
    /// operation that reports failure to the caller: failing to clear
    /// credentials is security-relevant.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.inner.logout().await
    }

    /// Exchange the refresh token for a new access token. Failure is
    /// terminal and forces a logout.
    pub async fn refresh_token(&self) -> bool {
        self.inner.refresh_token().await
    }

    /// Re-fetch the seller profile and merge it over in-memory state.
    pub async fn refresh_user_data(&self) -> bool {
        self.inner.profile_sync("profile_fetch", None).await
    }

    /// Push a partial profile update and merge the server's response.
    pub async fn update_seller_profile(&self, patch: SellerPayload) -> bool {
        self.inner.profile_sync("profile_update", Some(patch)).await
    }

    pub async fn authenticate_with_biometrics(&self) -> bool {
        match self.inner.biometrics.authenticate().await {
            Ok(ok) => ok,
            Err(err) => {
                self.inner.set_auth_error(err);
                false
            }
        }
    }

    pub async fn toggle_biometric(&self, enabled: bool) -> bool {
        let result = match self.inner.biometrics.toggle(enabled).await {
            Ok(ok) => ok,
            Err(err) => {
                self.inner.set_auth_error(err);
                false
            }
        };
        self.inner.publish();
        result
    }

    /// Bearer header for outgoing requests, empty when signed out.
    pub fn get_auth_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(token) = self.inner.store.get(keys::ACCESS_TOKEN) {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        headers
    }

    pub fn clear_auth_error(&self) {
        {
            let mut state = self.inner.state.lock().expect("auth state lock");
            state.auth_error = None;
        }
        self.inner.publish();
    }

    /// Feed platform connectivity events into the controller. Each event
    /// recomputes the status and re-enters the status check.
    pub fn attach_connectivity(&self, mut events: mpsc::Receiver<NetworkState>) {
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                inner.connectivity.apply_event(event);
                inner.publish();
                inner.check_auth_status().await;
            }
        });
        self.tasks.lock().expect("task list lock").push(handle);
    }

    /// Feed platform app-lifecycle events into the controller.
    pub fn attach_lifecycle(&self, mut events: mpsc::Receiver<AppPhase>) {
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            while let Some(phase) = events.recv().await {
                match phase {
                    AppPhase::Active => {
                        debug!("App foregrounded, re-checking auth and connectivity");
                        let cancel = inner.cancel.token();
                        let (_, _) = tokio::join!(
                            inner.check_auth_status(),
                            inner.connectivity.test_connection(&cancel)
                        );
                        inner.publish();
                    }
                    AppPhase::Background => {
                        let (seller_id, authenticated) = {
                            let state = inner.state.lock().expect("auth state lock");
                            (
                                state.seller.as_ref().map(|s| s.id.to_string()),
                                matches!(state.phase, AuthPhase::Authenticated(_)),
                            )
                        };
                        inner.lifecycle.snapshot(seller_id.as_deref(), authenticated);
                    }
                    AppPhase::Inactive => {}
                }
            }
        });
        self.tasks.lock().expect("task list lock").push(handle);
    }

    /// Stop event listeners and cancel in-flight work.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel_all();
        for handle in self.tasks.lock().expect("task list lock").drain(..) {
            handle.abort();
        }
    }
}

impl Drop for AuthController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn publish(&self) {
        let snapshot = {
            let state = self.state.lock().expect("auth state lock");
            AuthSnapshot {
                phase: state.phase,
                is_authenticated: matches!(state.phase, AuthPhase::Authenticated(_)),
                is_loading: state.is_loading,
                seller: state.seller.clone(),
                auth_error: state.auth_error.as_ref().map(AuthError::user_message),
                auth_error_kind: state.auth_error.as_ref().map(AuthError::kind),
                retry_count: self.retry.retry_count(),
                connection_status: self.connectivity.status(),
                network_state: self.connectivity.network_state(),
                biometric_supported: self.biometrics.supported(),
                biometric_enabled: self.biometrics.enabled(),
                performance_metrics: self.metrics.lock().expect("metrics lock").clone(),
            }
        };
        self.watch_tx.send_replace(snapshot);
    }

    fn set_auth_error(&self, error: AuthError) {
        {
            let mut state = self.state.lock().expect("auth state lock");
            state.auth_error = Some(error);
        }
        self.publish();
    }

    fn set_phase(&self, phase: AuthPhase, seller: Option<SellerProfile>) {
        let mut state = self.state.lock().expect("auth state lock");
        state.phase = phase;
        state.seller = seller;
    }

    /// Single-flight wrapper around `run_check`.
    async fn check_auth_status(self: &Arc<Self>) -> bool {
        let flight_tx = {
            let mut flight = self.check_flight.lock().await;
            if let Some(rx) = flight.as_ref() {
                // Join the pass already in flight.
                let mut rx = rx.clone();
                drop(flight);
                loop {
                    if let Some(result) = *rx.borrow_and_update() {
                        return result;
                    }
                    if rx.changed().await.is_err() {
                        // Flight owner vanished; report current state.
                        return self.watch_tx.borrow().is_authenticated;
                    }
                }
            }
            let (tx, rx) = watch::channel(None);
            *flight = Some(rx);
            tx
        };

        let result = self.run_check().await;

        *self.check_flight.lock().await = None;
        let _ = flight_tx.send(Some(result));
        result
    }

    /// One full status-check pass. Holds the gate for its duration.
    async fn run_check(self: &Arc<Self>) -> bool {
        let _guard = self.gate.lock().await;
        let cancel = self.cancel.token();

        {
            let mut state = self.state.lock().expect("auth state lock");
            state.phase = AuthPhase::Checking;
            state.is_loading = true;
        }
        self.publish();

        // Connectivity probe and session read run in parallel; the probe
        // status lands in the monitor, the session drives the state
        // machine below.
        let ((_, probe_error), stored) =
            tokio::join!(self.connectivity.test_connection(&cancel), async {
                StoredSession::read(&self.store)
            });

        let result = self.evaluate_session(stored, &cancel).await;

        {
            let mut state = self.state.lock().expect("auth state lock");
            // An exhausted probe is surfaced as an error but never costs
            // the session; a terminal refresh error takes precedence.
            if let Some(err) = probe_error {
                if !matches!(err, AuthError::Cancelled) && state.auth_error.is_none() {
                    state.auth_error = Some(err);
                }
            }
            state.is_loading = false;
        }
        self.publish();
        result
    }

    async fn evaluate_session(&self, stored: StoredSession, cancel: &CancelToken) -> bool {
        if !stored.is_complete() {
            debug!("Session keys absent or incomplete");
            self.set_phase(AuthPhase::Unauthenticated, None);
            return false;
        }
        let access_token = stored
            .access_token
            .as_deref()
            .unwrap_or_default()
            .to_string();

        if !TokenManager::is_expired(&access_token) {
            if TokenManager::is_expiring_soon(&access_token, DEFAULT_EXPIRY_BUFFER_SECS) {
                // Proactive refresh; the current token still works, so a
                // failure here degrades nothing.
                match self.tokens.refresh(cancel).await {
                    Ok(refreshed) => {
                        debug!(refreshed, "Proactive refresh finished");
                    }
                    Err(AuthError::Cancelled) => return false,
                    Err(err) => {
                        warn!(error = %err, "Proactive refresh failed, keeping current token");
                    }
                }
            }
            self.set_phase(
                AuthPhase::Authenticated(TokenPhase::Valid),
                stored.load_seller(),
            );
            return true;
        }

        // Expired token: the session survives only if refresh succeeds.
        self.set_phase(
            AuthPhase::Authenticated(TokenPhase::Refreshing),
            stored.load_seller(),
        );
        self.publish();

        match self.tokens.refresh(cancel).await {
            Ok(true) => {
                info!("Session refreshed after expiry");
                self.set_phase(
                    AuthPhase::Authenticated(TokenPhase::Valid),
                    stored.load_seller(),
                );
                true
            }
            Ok(false) => {
                warn!("Expired session has no refresh token, logging out");
                self.force_logout();
                false
            }
            Err(AuthError::Cancelled) => false,
            Err(err) => {
                warn!(error = %err, "Refresh failed, logging out");
                self.force_logout();
                false
            }
        }
    }

    /// Terminal-refresh path: clear everything and surface the expiry.
    fn force_logout(&self) {
        if let Err(err) = self.clear_session() {
            warn!(error = %err, "Session clear incomplete during forced logout");
        }
        let mut state = self.state.lock().expect("auth state lock");
        state.phase = AuthPhase::Unauthenticated;
        state.seller = None;
        state.auth_error = Some(AuthError::RefreshFailed("token refresh".to_string()));
    }

    async fn login(self: &Arc<Self>, payload: LoginResponse) -> bool {
        let _guard = self.gate.lock().await;

        let access_token = payload.access_token.as_deref().unwrap_or_default();
        let seller = payload
            .seller
            .as_ref()
            .and_then(SellerProfile::from_payload);

        let (access_token, mut seller) = match (access_token, seller) {
            (token, Some(seller)) if !token.is_empty() => (token.to_string(), seller),
            _ => {
                warn!("Login payload missing access_token or seller identity");
                self.set_auth_error(AuthError::LoginPayloadInvalid(
                    "missing access token or seller identity".to_string(),
                ));
                return false;
            }
        };

        seller.last_login = Some(Utc::now());
        let seller_json = match serde_json::to_string(&seller) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "Seller profile serialization failed");
                self.set_auth_error(AuthError::Storage(err.to_string()));
                return false;
            }
        };

        let seller_id = seller.id.to_string();
        let last_login = seller
            .last_login
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_default();

        let mut pairs: Vec<(&str, &str)> = vec![
            (keys::ACCESS_TOKEN, access_token.as_str()),
            (keys::USER_TYPE, USER_TYPE_SELLER),
            (keys::SELLER_ID, seller_id.as_str()),
            (keys::SELLER_DATA, seller_json.as_str()),
            (keys::LAST_LOGIN, last_login.as_str()),
            (keys::IS_FIRST_TIME, "false"),
        ];
        if let Some(ref refresh_token) = payload.refresh_token {
            pairs.push((keys::REFRESH_TOKEN, refresh_token.as_str()));
        }
        if let Some(ref api_token) = payload.api_token {
            pairs.push((keys::API_TOKEN, api_token.as_str()));
        }
        if let Some(ref phone) = seller.phone {
            pairs.push((keys::USER_PHONE, phone.as_str()));
        }

        // Entries apply independently; a degraded write is logged by the
        // store and the session proceeds.
        self.store.multi_set(&pairs);

        {
            let mut state = self.state.lock().expect("auth state lock");
            state.phase = AuthPhase::Authenticated(TokenPhase::Valid);
            state.seller = Some(seller);
            state.auth_error = None;
        }
        info!(seller_id = %seller_id, "Login succeeded");
        self.publish();
        true
    }

    async fn logout(self: &Arc<Self>) -> Result<(), AuthError> {
        // Abort in-flight retries and refreshes before taking the gate so
        // a backoff loop cannot outlive the session it belongs to.
        self.cancel.cancel_all();
        let _guard = self.gate.lock().await;

        let result = self.clear_session();
        {
            let mut state = self.state.lock().expect("auth state lock");
            state.phase = AuthPhase::Unauthenticated;
            state.seller = None;
            state.auth_error = None;
        }
        info!("Logged out");
        self.publish();
        result
    }

    /// Remove every session key from both tiers. Partial failure is
    /// reported, not rolled back.
    fn clear_session(&self) -> Result<(), AuthError> {
        let outcomes = self.store.multi_remove(&keys::SESSION_KEYS);
        let failed: Vec<&str> = keys::SESSION_KEYS
            .iter()
            .zip(&outcomes)
            .filter(|(_, outcome)| !outcome.persisted())
            .map(|(key, _)| *key)
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Storage(format!(
                "failed to clear keys: {}",
                failed.join(", ")
            )))
        }
    }

    async fn refresh_token(self: &Arc<Self>) -> bool {
        let _guard = self.gate.lock().await;
        let cancel = self.cancel.token();

        {
            let mut state = self.state.lock().expect("auth state lock");
            if matches!(state.phase, AuthPhase::Authenticated(_)) {
                state.phase = AuthPhase::Authenticated(TokenPhase::Refreshing);
            }
        }
        self.publish();

        let result = match self.tokens.refresh(&cancel).await {
            Ok(true) => {
                let mut state = self.state.lock().expect("auth state lock");
                if matches!(state.phase, AuthPhase::Authenticated(_)) {
                    state.phase = AuthPhase::Authenticated(TokenPhase::Valid);
                }
                true
            }
            Ok(false) => {
                debug!("No refresh token stored");
                let mut state = self.state.lock().expect("auth state lock");
                if matches!(state.phase, AuthPhase::Authenticated(_)) {
                    state.phase = AuthPhase::Authenticated(TokenPhase::Valid);
                }
                false
            }
            Err(AuthError::Cancelled) => false,
            Err(err) => {
                warn!(error = %err, "Explicit refresh failed, logging out");
                self.force_logout();
                false
            }
        };
        self.publish();
        result
    }

    /// Shared path for `refresh_user_data` (no patch) and
    /// `update_seller_profile` (with patch). On success the response is
    /// merged over the in-memory profile and re-persisted; on failure
    /// state is untouched and `auth_error` is set.
    async fn profile_sync(self: &Arc<Self>, operation: &str, patch: Option<SellerPayload>) -> bool {
        let _guard = self.gate.lock().await;

        let Some(access_token) = self.store.get(keys::ACCESS_TOKEN) else {
            self.set_auth_error(AuthError::TokenInvalid);
            return false;
        };
        let cancel = self.cancel.token();

        let api = self.api.clone();
        let result = self
            .retry
            .perform_with_retry(operation, &cancel, || {
                let api = api.clone();
                let access_token = access_token.clone();
                let patch = patch.clone();
                async move {
                    match patch {
                        Some(ref patch) => api
                            .update_profile(&access_token, patch)
                            .await
                            .map_err(AuthError::from),
                        None => api.get_profile(&access_token).await.map_err(AuthError::from),
                    }
                }
            })
            .await;

        match result {
            Ok(response) => {
                let merged = {
                    let mut state = self.state.lock().expect("auth state lock");
                    match state.seller.as_mut() {
                        Some(seller) => {
                            seller.merge(&response.seller);
                            Some(seller.clone())
                        }
                        None => {
                            let seller = SellerProfile::from_payload(&response.seller);
                            state.seller = seller.clone();
                            seller
                        }
                    }
                };
                if let Some(ref seller) = merged {
                    match serde_json::to_string(seller) {
                        Ok(json) => {
                            if self.store.set(keys::SELLER_DATA, &json) == StoreOutcome::Failed {
                                warn!("Merged profile could not be persisted");
                            }
                        }
                        Err(err) => warn!(error = %err, "Merged profile serialization failed"),
                    }
                }
                {
                    let mut metrics = self.metrics.lock().expect("metrics lock");
                    metrics.mark_synced();
                }
                self.publish();
                true
            }
            Err(AuthError::Cancelled) => false,
            Err(err) => {
                warn!(operation, error = %err, "Profile sync failed");
                self.set_auth_error(err);
                false
            }
        }
    }
}
