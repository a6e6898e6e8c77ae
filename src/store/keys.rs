//! Persisted key catalog and tier assignment.

/// Short-lived bearer token. Plain tier so the UI process can read it
/// without a keychain round trip on every request.
pub const ACCESS_TOKEN: &str = "accessToken";
/// Long-lived refresh credential. Secure tier.
pub const REFRESH_TOKEN: &str = "refreshToken";
/// Server-to-server API credential. Secure tier.
pub const API_TOKEN: &str = "apiToken";
pub const USER_TYPE: &str = "userType";
pub const SELLER_ID: &str = "sellerId";
/// Full seller profile as JSON.
pub const SELLER_DATA: &str = "sellerData";
pub const USER_PHONE: &str = "userPhone";
pub const IS_FIRST_TIME: &str = "isFirstTime";
pub const LAST_LOGIN: &str = "lastLogin";
pub const BIOMETRIC_ENABLED: &str = "biometricEnabled";
/// Background snapshot for crash-resume diagnostics, JSON.
pub const CRITICAL_DATA: &str = "criticalData";

/// Namespace prefix for secure-tier values that had to fall back to the
/// plain tier after a keychain failure.
pub const SECURE_FALLBACK_PREFIX: &str = "secure.";

/// Storage tier a key is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Secure,
    Plain,
}

pub fn tier_of(key: &str) -> Tier {
    match key {
        REFRESH_TOKEN | API_TOKEN => Tier::Secure,
        _ => Tier::Plain,
    }
}

/// Every key owned by the session; `logout()` clears all of them.
pub const SESSION_KEYS: [&str; 11] = [
    ACCESS_TOKEN,
    REFRESH_TOKEN,
    API_TOKEN,
    USER_TYPE,
    SELLER_ID,
    SELLER_DATA,
    USER_PHONE,
    IS_FIRST_TIME,
    LAST_LOGIN,
    BIOMETRIC_ENABLED,
    CRITICAL_DATA,
];
