//! Shared test doubles: scripted API, in-memory keychain, token builder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::api::{ApiError, ProfileResponse, RefreshResponse, SellerApi};
use crate::biometric::BiometricApi;
use crate::error::AuthError;
use crate::models::SellerPayload;
use crate::store::secure::SecureBackend;
use crate::store::SessionStore;

/// Build an unsigned JWT with the given `exp` (unix seconds).
pub fn make_jwt(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({ "exp": exp, "sub": "seller" })
            .to_string()
            .as_bytes(),
    );
    format!("{}.{}.sig", header, payload)
}

/// SessionStore on a temp directory with an in-memory keychain. The
/// TempDir must be kept alive for the store's lifetime.
pub fn new_test_store() -> (Arc<SessionStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::open(
        dir.path().to_path_buf(),
        Arc::new(MemorySecureBackend::default()),
    )
    .expect("open store");
    (Arc::new(store), dir)
}

// ============================================================================
// Secure backends
// ============================================================================

/// In-memory keychain stand-in.
#[derive(Default)]
pub struct MemorySecureBackend {
    map: Mutex<HashMap<String, String>>,
}

impl SecureBackend for MemorySecureBackend {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .lock()
            .expect("mem secure lock")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.lock().expect("mem secure lock").get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.map.lock().expect("mem secure lock").remove(key);
        Ok(())
    }
}

/// Keychain that fails until healed, for exercising the tier fallback.
pub struct FlakySecureBackend {
    failing: AtomicBool,
    inner: MemorySecureBackend,
}

impl FlakySecureBackend {
    pub fn always_failing() -> Self {
        Self {
            failing: AtomicBool::new(true),
            inner: MemorySecureBackend::default(),
        }
    }

    pub fn heal(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("keychain unavailable");
        }
        Ok(())
    }
}

impl SecureBackend for FlakySecureBackend {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.inner.set(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        self.inner.get(key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        self.inner.delete(key)
    }
}

// ============================================================================
// Scripted API
// ============================================================================

type RefreshScript = Result<(String, Option<String>), String>;

/// Scripted `SellerApi`. Defaults: connection up, refresh unconfigured
/// (fails), profile fetch returns an empty payload, update echoes the
/// patch back.
pub struct MockSellerApi {
    connection: Mutex<Result<bool, String>>,
    refresh: Mutex<RefreshScript>,
    profile: Mutex<Result<SellerPayload, String>>,
    update: Mutex<Option<Result<SellerPayload, String>>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockSellerApi {
    fn default() -> Self {
        Self {
            connection: Mutex::new(Ok(true)),
            refresh: Mutex::new(Err("refresh not configured".to_string())),
            profile: Mutex::new(Ok(SellerPayload::default())),
            update: Mutex::new(None),
            delays: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockSellerApi {
    pub fn set_connection_ok(&self, ok: bool) {
        *self.connection.lock().expect("mock lock") = Ok(ok);
    }

    pub fn fail_connection(&self) {
        *self.connection.lock().expect("mock lock") = Err("connection refused".to_string());
    }

    pub fn set_refresh_result(&self, result: RefreshScript) {
        *self.refresh.lock().expect("mock lock") = result;
    }

    pub fn fail_refresh(&self) {
        self.set_refresh_result(Err("refresh rejected".to_string()));
    }

    pub fn set_profile(&self, payload: SellerPayload) {
        *self.profile.lock().expect("mock lock") = Ok(payload);
    }

    pub fn fail_profile(&self) {
        *self.profile.lock().expect("mock lock") = Err("profile unavailable".to_string());
    }

    pub fn set_update_result(&self, result: Result<SellerPayload, String>) {
        *self.update.lock().expect("mock lock") = Some(result);
    }

    /// Delay every call to `operation` by `delay` (paused-clock friendly).
    pub fn set_delay(&self, operation: &str, delay: Duration) {
        self.delays
            .lock()
            .expect("mock lock")
            .insert(operation.to_string(), delay);
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .expect("mock lock")
            .iter()
            .filter(|call| call.as_str() == operation)
            .count()
    }

    async fn enter(&self, operation: &str) {
        self.calls
            .lock()
            .expect("mock lock")
            .push(operation.to_string());
        let delay = self
            .delays
            .lock()
            .expect("mock lock")
            .get(operation)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SellerApi for MockSellerApi {
    async fn test_connection(&self) -> Result<bool, ApiError> {
        self.enter("test_connection").await;
        self.connection
            .lock()
            .expect("mock lock")
            .clone()
            .map_err(ApiError::ServerError)
    }

    async fn refresh_access_token(&self, _refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        self.enter("refresh_access_token").await;
        match self.refresh.lock().expect("mock lock").clone() {
            Ok((access_token, refresh_token)) => Ok(RefreshResponse {
                access_token,
                refresh_token,
            }),
            Err(msg) => Err(ApiError::ServerError(msg)),
        }
    }

    async fn get_profile(&self, _access_token: &str) -> Result<ProfileResponse, ApiError> {
        self.enter("get_profile").await;
        match self.profile.lock().expect("mock lock").clone() {
            Ok(seller) => Ok(ProfileResponse { seller }),
            Err(msg) => Err(ApiError::ServerError(msg)),
        }
    }

    async fn update_profile(
        &self,
        _access_token: &str,
        patch: &SellerPayload,
    ) -> Result<ProfileResponse, ApiError> {
        self.enter("update_profile").await;
        let scripted = self.update.lock().expect("mock lock").clone();
        match scripted {
            Some(Ok(seller)) => Ok(ProfileResponse { seller }),
            Some(Err(msg)) => Err(ApiError::ServerError(msg)),
            None => Ok(ProfileResponse {
                seller: patch.clone(),
            }),
        }
    }
}

// ============================================================================
// Biometrics
// ============================================================================

pub struct MockBiometricApi {
    hardware: bool,
    enrolled: bool,
    prompt_ok: AtomicBool,
    prompts: AtomicU32,
}

impl MockBiometricApi {
    pub fn supported() -> Self {
        Self {
            hardware: true,
            enrolled: true,
            prompt_ok: AtomicBool::new(true),
            prompts: AtomicU32::new(0),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            hardware: false,
            enrolled: false,
            prompt_ok: AtomicBool::new(false),
            prompts: AtomicU32::new(0),
        }
    }

    pub fn set_prompt_result(&self, ok: bool) {
        self.prompt_ok.store(ok, Ordering::SeqCst);
    }

    pub fn prompt_count(&self) -> u32 {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BiometricApi for MockBiometricApi {
    fn has_hardware(&self) -> bool {
        self.hardware
    }

    fn is_enrolled(&self) -> bool {
        self.enrolled
    }

    async fn prompt(&self, _reason: &str) -> Result<bool, AuthError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        Ok(self.prompt_ok.load(Ordering::SeqCst))
    }
}
