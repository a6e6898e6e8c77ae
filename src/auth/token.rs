//! Access-token expiry tracking and refresh.
//!
//! Expiry is read straight from the JWT payload's `exp` claim without
//! signature verification - the server re-validates every request, this
//! side only decides when to refresh. Any token that cannot be decoded
//! is treated as expired (fail-closed).

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::api::SellerApi;
use crate::error::AuthError;
use crate::retry::{CancelToken, RetryExecutor};
use crate::store::{keys, SessionStore};

/// Proactive-refresh window: a token whose `exp` is within this many
/// seconds is refreshed before a request has a chance to fail on it.
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 300;

/// Decode the `exp` claim (unix seconds) from a JWT. `None` for
/// anything that is not a three-part token with a JSON payload.
fn decode_exp(token: &str) -> Option<i64> {
    let mut parts = token.split('.');
    let _header = parts.next()?;
    let payload = parts.next()?;
    let _signature = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: JsonValue = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp")?.as_i64()
}

/// Decides when the access token needs replacing and performs the
/// refresh exchange through the retry executor.
pub struct TokenManager {
    store: Arc<SessionStore>,
    api: Arc<dyn SellerApi>,
    retry: RetryExecutor,
}

impl TokenManager {
    pub fn new(store: Arc<SessionStore>, api: Arc<dyn SellerApi>, retry: RetryExecutor) -> Self {
        Self { store, api, retry }
    }

    /// True when the token's `exp` is in the past, or when the token
    /// cannot be decoded at all.
    pub fn is_expired(token: &str) -> bool {
        match decode_exp(token) {
            Some(exp) => exp <= Utc::now().timestamp(),
            None => {
                debug!("Token payload undecodable, treating as expired");
                true
            }
        }
    }

    /// True when `exp` falls within the buffer window. Undecodable
    /// tokens are always "expiring soon".
    pub fn is_expiring_soon(token: &str, buffer_secs: i64) -> bool {
        match decode_exp(token) {
            Some(exp) => exp - Utc::now().timestamp() <= buffer_secs,
            None => true,
        }
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// `Ok(false)` means there was no refresh token to use. An `Err`
    /// means the exchange failed after retries; the controller treats
    /// that as terminal for the session.
    pub async fn refresh(&self, cancel: &CancelToken) -> Result<bool, AuthError> {
        let Some(refresh_token) = self.store.get(keys::REFRESH_TOKEN) else {
            debug!("No refresh token stored, cannot refresh");
            return Ok(false);
        };

        let api = self.api.clone();
        let response = self
            .retry
            .perform_with_retry("token_refresh", cancel, || {
                let api = api.clone();
                let refresh_token = refresh_token.clone();
                async move {
                    api.refresh_access_token(&refresh_token)
                        .await
                        .map_err(AuthError::from)
                }
            })
            .await
            .map_err(|err| match err {
                AuthError::Cancelled => AuthError::Cancelled,
                other => AuthError::RefreshFailed(other.to_string()),
            })?;

        // A logout may have raced the exchange; never write tokens for a
        // session the user has already signed out of.
        if cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }

        if !self.store.set(keys::ACCESS_TOKEN, &response.access_token).persisted() {
            warn!("Refreshed access token could not be persisted");
        }
        if let Some(ref new_refresh) = response.refresh_token {
            self.store.set(keys::REFRESH_TOKEN, new_refresh);
        }
        debug!(rotated = response.refresh_token.is_some(), "Token refresh succeeded");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    use crate::models::PerformanceMetrics;
    use crate::retry::CancelSource;
    use crate::testutil::{make_jwt, new_test_store, MockSellerApi};

    fn manager(store: Arc<SessionStore>, api: Arc<MockSellerApi>) -> TokenManager {
        let retry = RetryExecutor::new(
            Arc::new(AtomicU32::new(0)),
            Arc::new(Mutex::new(PerformanceMetrics::default())),
        );
        TokenManager::new(store, api, retry)
    }

    #[test]
    fn past_exp_is_expired() {
        let token = make_jwt(Utc::now().timestamp() - 60);
        assert!(TokenManager::is_expired(&token));
    }

    #[test]
    fn future_exp_is_not_expired() {
        let token = make_jwt(Utc::now().timestamp() + 3600);
        assert!(!TokenManager::is_expired(&token));
    }

    #[test]
    fn malformed_tokens_fail_closed() {
        assert!(TokenManager::is_expired(""));
        assert!(TokenManager::is_expired("not-a-jwt"));
        assert!(TokenManager::is_expired("a.b"));
        assert!(TokenManager::is_expired("a.%%%.c"));
        assert!(TokenManager::is_expired("a.b.c.d"));
        // Valid base64 but not JSON
        let junk = URL_SAFE_NO_PAD.encode(b"junk");
        assert!(TokenManager::is_expired(&format!("h.{}.s", junk)));
        assert!(TokenManager::is_expiring_soon("not-a-jwt", 300));
    }

    #[test]
    fn expiring_soon_respects_buffer_window() {
        let in_600s = make_jwt(Utc::now().timestamp() + 600);
        assert!(!TokenManager::is_expiring_soon(&in_600s, 300));

        let in_100s = make_jwt(Utc::now().timestamp() + 100);
        assert!(TokenManager::is_expiring_soon(&in_100s, 300));
    }

    #[tokio::test]
    async fn refresh_without_stored_token_returns_false() {
        let (store, _dir) = new_test_store();
        let api = Arc::new(MockSellerApi::default());
        let manager = manager(store, api.clone());

        let refreshed = manager
            .refresh(&CancelSource::new().token())
            .await
            .expect("no-op refresh");
        assert!(!refreshed);
        assert_eq!(api.call_count("refresh_access_token"), 0);
    }

    #[tokio::test]
    async fn refresh_persists_new_tokens() {
        let (store, _dir) = new_test_store();
        store.set(keys::REFRESH_TOKEN, "old-rt");
        let api = Arc::new(MockSellerApi::default());
        api.set_refresh_result(Ok(("new-at".to_string(), Some("new-rt".to_string()))));
        let manager = manager(store.clone(), api);

        let refreshed = manager
            .refresh(&CancelSource::new().token())
            .await
            .expect("refresh");
        assert!(refreshed);
        assert_eq!(store.get(keys::ACCESS_TOKEN).as_deref(), Some("new-at"));
        assert_eq!(store.get(keys::REFRESH_TOKEN).as_deref(), Some("new-rt"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_is_terminal() {
        let (store, _dir) = new_test_store();
        store.set(keys::REFRESH_TOKEN, "old-rt");
        let api = Arc::new(MockSellerApi::default());
        api.fail_refresh();
        let manager = manager(store.clone(), api);

        let err = manager
            .refresh(&CancelSource::new().token())
            .await
            .expect_err("exhausted refresh");
        assert!(matches!(err, AuthError::RefreshFailed(_)));
        // The old access token (none here) is untouched
        assert_eq!(store.get(keys::ACCESS_TOKEN), None);
    }
}
