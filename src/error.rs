use thiserror::Error;

/// Errors produced by the session/auth core.
///
/// Only `logout()` ever propagates one of these to the caller; every other
/// operation converts failures into controller state (`auth_error`,
/// `retry_count`, `connection_status`).
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("invalid or expired token")]
    TokenInvalid,

    #[error("session refresh failed: {0}")]
    RefreshFailed(String),

    #[error("invalid login payload: {0}")]
    LoginPayloadInvalid(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Coarse classification used by the UI layer to pick an error treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    Validation,
    Network,
    Storage,
    Expiry,
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::Storage(_) => AuthErrorKind::Storage,
            AuthError::Network(_) | AuthError::Cancelled => AuthErrorKind::Network,
            AuthError::TokenInvalid | AuthError::RefreshFailed(_) => AuthErrorKind::Expiry,
            AuthError::LoginPayloadInvalid(_) => AuthErrorKind::Validation,
        }
    }

    /// Human-readable message suitable for direct display.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Storage(_) => "Could not save your session on this device.".to_string(),
            AuthError::Network(_) => {
                "Network problem. Check your connection and try again.".to_string()
            }
            AuthError::TokenInvalid => "Your session is no longer valid.".to_string(),
            AuthError::RefreshFailed(_) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            AuthError::LoginPayloadInvalid(msg) => format!("Login failed: {}", msg),
            AuthError::Cancelled => "Operation cancelled.".to_string(),
        }
    }
}

impl From<crate::api::ApiError> for AuthError {
    fn from(err: crate::api::ApiError) -> Self {
        match err {
            crate::api::ApiError::Unauthorized => AuthError::TokenInvalid,
            other => AuthError::Network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_classifies() {
        assert_eq!(AuthError::Storage("disk".into()).kind(), AuthErrorKind::Storage);
        assert_eq!(AuthError::Network("down".into()).kind(), AuthErrorKind::Network);
        assert_eq!(AuthError::Cancelled.kind(), AuthErrorKind::Network);
        assert_eq!(AuthError::TokenInvalid.kind(), AuthErrorKind::Expiry);
        assert_eq!(
            AuthError::RefreshFailed("401".into()).kind(),
            AuthErrorKind::Expiry
        );
        assert_eq!(
            AuthError::LoginPayloadInvalid("no id".into()).kind(),
            AuthErrorKind::Validation
        );
    }

    #[test]
    fn unauthorized_api_errors_become_token_invalid() {
        let err: AuthError = crate::api::ApiError::Unauthorized.into();
        assert!(matches!(err, AuthError::TokenInvalid));
        assert!(err.user_message().contains("no longer valid"));
    }
}
