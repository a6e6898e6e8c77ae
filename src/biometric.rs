//! Biometric gating: capability probe, prompt, and enable/disable
//! preference.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::store::{keys, SessionStore};

/// Platform biometric API. The prompt may fail (sensor busy, user hit
/// the hardware limit of bad attempts) independently of plain rejection.
#[async_trait]
pub trait BiometricApi: Send + Sync {
    fn has_hardware(&self) -> bool;
    fn is_enrolled(&self) -> bool;
    async fn prompt(&self, reason: &str) -> Result<bool, AuthError>;
}

/// Capability probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiometricSupport {
    pub hardware_present: bool,
    pub enrolled: bool,
}

impl BiometricSupport {
    pub fn usable(&self) -> bool {
        self.hardware_present && self.enrolled
    }
}

pub struct BiometricGate {
    api: Arc<dyn BiometricApi>,
    store: Arc<SessionStore>,
    // Hardware does not come and go; probe once per controller lifetime.
    support: OnceLock<BiometricSupport>,
}

impl BiometricGate {
    pub fn new(api: Arc<dyn BiometricApi>, store: Arc<SessionStore>) -> Self {
        Self {
            api,
            store,
            support: OnceLock::new(),
        }
    }

    /// Probe device capability once and cache the result.
    pub fn check_support(&self) -> BiometricSupport {
        *self.support.get_or_init(|| {
            let support = BiometricSupport {
                hardware_present: self.api.has_hardware(),
                enrolled: self.api.is_enrolled(),
            };
            debug!(
                hardware = support.hardware_present,
                enrolled = support.enrolled,
                "Biometric capability probed"
            );
            support
        })
    }

    pub fn supported(&self) -> bool {
        self.check_support().usable()
    }

    /// Issue the platform prompt. Refuses (returns `Ok(false)`) when the
    /// device has no usable biometrics instead of prompting into a void.
    pub async fn authenticate(&self) -> Result<bool, AuthError> {
        if !self.supported() {
            warn!("Biometric authenticate called without device support");
            return Ok(false);
        }
        self.api.prompt("Unlock your SellerDesk account").await
    }

    /// Enable or disable the biometric preference.
    ///
    /// Enabling requires a successful prompt first; the preference is
    /// only persisted after that check passes. Disabling persists
    /// immediately.
    pub async fn toggle(&self, enabled: bool) -> Result<bool, AuthError> {
        if enabled && !self.authenticate().await? {
            debug!("Biometric enable refused: prompt did not succeed");
            return Ok(false);
        }
        self.store
            .set(keys::BIOMETRIC_ENABLED, if enabled { "true" } else { "false" });
        Ok(true)
    }

    /// Current persisted preference.
    pub fn enabled(&self) -> bool {
        self.store
            .get(keys::BIOMETRIC_ENABLED)
            .map(|value| value == "true")
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{new_test_store, MockBiometricApi};

    #[tokio::test]
    async fn toggle_on_requires_successful_prompt() {
        let (store, _dir) = new_test_store();
        let api = Arc::new(MockBiometricApi::supported());
        api.set_prompt_result(false);
        let gate = BiometricGate::new(api.clone(), store.clone());

        assert!(!gate.toggle(true).await.expect("toggle"));
        assert!(!gate.enabled());

        api.set_prompt_result(true);
        assert!(gate.toggle(true).await.expect("toggle"));
        assert!(gate.enabled());
    }

    #[tokio::test]
    async fn toggle_off_persists_immediately() {
        let (store, _dir) = new_test_store();
        let api = Arc::new(MockBiometricApi::supported());
        api.set_prompt_result(true);
        let gate = BiometricGate::new(api.clone(), store);

        gate.toggle(true).await.expect("enable");
        let prompts_before = api.prompt_count();

        assert!(gate.toggle(false).await.expect("disable"));
        assert!(!gate.enabled());
        // Disabling never prompts
        assert_eq!(api.prompt_count(), prompts_before);
    }

    #[tokio::test]
    async fn unsupported_device_never_prompts() {
        let (store, _dir) = new_test_store();
        let api = Arc::new(MockBiometricApi::unsupported());
        let gate = BiometricGate::new(api.clone(), store);

        assert!(!gate.supported());
        assert!(!gate.authenticate().await.expect("authenticate"));
        assert_eq!(api.prompt_count(), 0);
    }
}
