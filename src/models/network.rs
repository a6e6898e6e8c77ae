//! Network reachability state produced by the connectivity monitor.

use serde::{Deserialize, Serialize};

/// Raw reachability report from the platform connectivity subscription.
///
/// Both booleans are tri-state: the platform may not know yet, which is
/// distinct from a definite yes/no.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NetworkState {
    pub is_connected: Option<bool>,
    pub is_internet_reachable: Option<bool>,
    /// Transport type string as reported by the platform ("wifi",
    /// "cellular", ...).
    pub transport: Option<String>,
}

impl NetworkState {
    /// Collapse the tri-state report into a connection status.
    /// Online requires a definite yes on both flags.
    pub fn status(&self) -> ConnectionStatus {
        if self.is_connected == Some(true) && self.is_internet_reachable == Some(true) {
            ConnectionStatus::Online
        } else {
            ConnectionStatus::Offline
        }
    }
}

/// Connection status exposed to the UI layer.
/// `Checking` only appears during an explicit `test_connection()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Online,
    Offline,
    Checking,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Online => "online",
            ConnectionStatus::Offline => "offline",
            ConnectionStatus::Checking => "checking",
        }
    }
}
