//! Data models for the session/auth core.
//!
//! - `SellerProfile`, `SellerPayload`, `LoginResponse`: seller account data
//! - `NetworkState`, `ConnectionStatus`: connectivity reporting
//! - `PerformanceMetrics`: per-operation timing for diagnostics

pub mod metrics;
pub mod network;
pub mod seller;

pub use metrics::PerformanceMetrics;
pub use network::{ConnectionStatus, NetworkState};
pub use seller::{LoginResponse, SellerPayload, SellerProfile, SubscriptionPlan, VerificationStatus};
