//! HTTP client surface for the SellerDesk backend.
//!
//! Exposes the `SellerApi` trait (reachability probe, token refresh,
//! profile fetch/update) and the production `HttpSellerApi` client on
//! reqwest with bearer authentication.

pub mod client;
pub mod error;

pub use client::{HttpSellerApi, ProfileResponse, RefreshResponse, SellerApi};
pub use error::ApiError;
