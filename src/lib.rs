//! Session and authentication lifecycle core for the SellerDesk seller
//! app.
//!
//! The UI layer is an external consumer: it subscribes to
//! [`AuthSnapshot`] updates and calls the imperative surface on
//! [`AuthController`]. Everything below that surface - tiered credential
//! storage, token validity and refresh, backoff retries, connectivity
//! and app-lifecycle reactions, biometric gating - lives in this crate.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sellerdesk_auth::{AuthController, HttpSellerApi, SessionStore};
//! # use sellerdesk_auth::biometric::BiometricApi;
//! # async fn demo(biometrics: Arc<dyn BiometricApi>) -> anyhow::Result<()> {
//! let store = Arc::new(SessionStore::open_default()?);
//! let api = Arc::new(HttpSellerApi::new()?);
//! let controller = AuthController::new(store, api, biometrics);
//!
//! let mut state = controller.subscribe();
//! controller.start().await;
//! println!("authenticated: {}", state.borrow_and_update().is_authenticated);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod biometric;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod net;
pub mod retry;
pub mod store;

#[cfg(test)]
pub mod testutil;

pub use api::{ApiError, HttpSellerApi, SellerApi};
pub use auth::{AuthController, AuthPhase, AuthSnapshot, TokenManager, TokenPhase};
pub use biometric::{BiometricGate, BiometricSupport};
pub use error::{AuthError, AuthErrorKind};
pub use lifecycle::{AppPhase, LifecycleCoordinator};
pub use models::{
    ConnectionStatus, LoginResponse, NetworkState, PerformanceMetrics, SellerPayload,
    SellerProfile, SubscriptionPlan, VerificationStatus,
};
pub use net::ConnectivityMonitor;
pub use retry::{CancelSource, CancelToken, RetryExecutor, RetryPolicy};
pub use store::{SessionStore, StoreOutcome};
