//! Authentication core: token lifecycle and the controller state machine.
//!
//! - `TokenManager`: access-token expiry tracking and refresh exchange
//! - `AuthController`: the orchestrator the UI layer talks to

pub mod controller;
pub mod token;

pub use controller::{AuthController, AuthPhase, AuthSnapshot, TokenPhase};
pub use token::{TokenManager, DEFAULT_EXPIRY_BUFFER_SECS};
