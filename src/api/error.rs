use thiserror::Error;

/// Failures from the seller backend.
///
/// 401 gets its own variant because the auth core reacts to it (the
/// token is dead, refresh or sign out); everything else only feeds the
/// retry loop and error messages.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session token rejected by the server")]
    Unauthorized,

    #[error("Rate limited by the seller backend")]
    RateLimited,

    #[error("Seller backend error: {0}")]
    ServerError(String),

    #[error("Request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Malformed response from seller backend: {0}")]
    InvalidResponse(String),
}

/// Longest slice of a response body carried into an error message.
const MAX_ERROR_BODY_BYTES: usize = 400;

impl ApiError {
    /// Cut an error body down to a loggable size, on a char boundary so
    /// multibyte responses cannot split a code point.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_BYTES {
            return body.to_string();
        }
        let mut cut = MAX_ERROR_BODY_BYTES;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... ({} bytes total)", &body[..cut], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            code => ApiError::RequestFailed {
                status: code,
                message,
            },
        }
    }
}
