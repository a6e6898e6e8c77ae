//! HTTP collaborator surface for the auth core.
//!
//! The controller only needs four calls: a reachability probe, token
//! refresh, profile fetch and profile update. They sit behind the
//! [`SellerApi`] trait so tests can swap in a scripted implementation;
//! [`HttpSellerApi`] is the production client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::debug;

use crate::models::SellerPayload;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the seller backend.
const API_BASE_URL: &str = "https://api.sellerdesk.in/v1";

/// HTTP request timeout in seconds.
/// 30s allows for slow mobile networks while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Short timeout for the reachability probe; a probe that takes longer
/// than this is indistinguishable from offline.
const PROBE_TIMEOUT_SECS: u64 = 5;

/// New tokens returned by the refresh endpoint. The refresh token is
/// only rotated when the server decides to.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Profile fetch/update response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    pub seller: SellerPayload,
}

/// External HTTP surface consumed by the auth core.
#[async_trait]
pub trait SellerApi: Send + Sync {
    /// Cheap reachability probe. `Ok(false)` means the backend answered
    /// but reported itself unhealthy.
    async fn test_connection(&self) -> Result<bool, ApiError>;

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError>;

    async fn get_profile(&self, access_token: &str) -> Result<ProfileResponse, ApiError>;

    async fn update_profile(
        &self,
        access_token: &str,
        patch: &SellerPayload,
    ) -> Result<ProfileResponse, ApiError>;
}

/// Production client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpSellerApi {
    client: Client,
    base_url: String,
}

impl HttpSellerApi {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(API_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl SellerApi for HttpSellerApi {
    async fn test_connection(&self) -> Result<bool, ApiError> {
        let response = self
            .client
            .get(self.url("/health"))
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .send()
            .await?;
        debug!(status = %response.status(), "Connectivity probe response");
        Ok(response.status().is_success())
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/refresh"))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }

    async fn get_profile(&self, access_token: &str) -> Result<ProfileResponse, ApiError> {
        let response = self
            .client
            .get(self.url("/seller/profile"))
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }

    async fn update_profile(
        &self,
        access_token: &str,
        patch: &SellerPayload,
    ) -> Result<ProfileResponse, ApiError> {
        let response = self
            .client
            .patch(self.url("/seller/profile"))
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .json(patch)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_response_tolerates_missing_refresh_token() {
        let parsed: RefreshResponse =
            serde_json::from_str(r#"{"access_token":"new-at"}"#).expect("parse");
        assert_eq!(parsed.access_token, "new-at");
        assert!(parsed.refresh_token.is_none());

        let rotated: RefreshResponse =
            serde_json::from_str(r#"{"access_token":"new-at","refresh_token":"new-rt"}"#)
                .expect("parse");
        assert_eq!(rotated.refresh_token.as_deref(), Some("new-rt"));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let api =
            HttpSellerApi::with_base_url("https://staging.sellerdesk.in/v1/").expect("client");
        assert_eq!(
            api.url("/auth/refresh"),
            "https://staging.sellerdesk.in/v1/auth/refresh"
        );
    }
}
