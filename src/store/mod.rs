//! Tiered persisted key/value storage for session data.
//!
//! Secure-tier keys (refresh and API tokens) go to the OS keychain first;
//! on any keychain failure the value lands in a namespaced plain-tier entry
//! instead, and the degradation is logged but never surfaced to callers.
//! Storage operations report what happened through [`StoreOutcome`] values
//! rather than errors - callers branch, they never catch.

pub mod keys;
pub mod plain;
pub mod secure;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use keys::{tier_of, Tier, SECURE_FALLBACK_PREFIX};
use plain::PlainStore;
use secure::{KeyringBackend, SecureBackend};

/// Where a value actually ended up (or came from).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Served by the keychain.
    Secure,
    /// Served by the plain tier (the key's normal tier).
    Plain,
    /// A secure-tier key that degraded to the namespaced plain entry.
    PlainFallback,
    /// Both tiers failed. Callers tolerate this; the session simply will
    /// not survive a restart.
    Failed,
}

impl StoreOutcome {
    pub fn persisted(&self) -> bool {
        !matches!(self, StoreOutcome::Failed)
    }
}

/// Tiered key/value facade over the keychain and the plain JSON store.
pub struct SessionStore {
    plain: PlainStore,
    secure: Arc<dyn SecureBackend>,
}

impl SessionStore {
    /// Open a store rooted at the platform data directory.
    pub fn open_default() -> Result<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?
            .join("sellerdesk");
        Self::open(dir, Arc::new(KeyringBackend::new()))
    }

    /// Open a store with an explicit directory and secure backend.
    pub fn open(dir: PathBuf, secure: Arc<dyn SecureBackend>) -> Result<Self> {
        Ok(Self {
            plain: PlainStore::open(dir)?,
            secure,
        })
    }

    /// Read a value. Secure-tier keys check the keychain first, then the
    /// namespaced fallback entry; a keychain read failure is downgraded to
    /// a fallback read, never an error.
    pub fn get(&self, key: &str) -> Option<String> {
        match tier_of(key) {
            Tier::Plain => self.plain.get(key),
            Tier::Secure => match self.secure.get(key) {
                Ok(Some(value)) => Some(value),
                Ok(None) => self.plain.get(&fallback_key(key)),
                Err(err) => {
                    warn!(key, error = %err, "Keychain read failed, checking plain fallback");
                    self.plain.get(&fallback_key(key))
                }
            },
        }
    }

    /// Write a value to the key's tier, degrading secure-tier writes to
    /// the plain tier on keychain failure.
    pub fn set(&self, key: &str, value: &str) -> StoreOutcome {
        match tier_of(key) {
            Tier::Plain => match self.plain.set(key, value) {
                Ok(()) => StoreOutcome::Plain,
                Err(err) => {
                    warn!(key, error = %err, "Plain store write failed");
                    StoreOutcome::Failed
                }
            },
            Tier::Secure => match self.secure.set(key, value) {
                Ok(()) => {
                    // A stale fallback entry must not shadow the keychain
                    // value on a later degraded read.
                    let _ = self.plain.remove(&fallback_key(key));
                    StoreOutcome::Secure
                }
                Err(err) => {
                    warn!(key, error = %err, "Keychain write failed, degrading to plain tier");
                    match self.plain.set(&fallback_key(key), value) {
                        Ok(()) => StoreOutcome::PlainFallback,
                        Err(err) => {
                            warn!(key, error = %err, "Fallback write failed");
                            StoreOutcome::Failed
                        }
                    }
                }
            },
        }
    }

    /// Remove a key from every tier it could live in.
    pub fn remove(&self, key: &str) -> StoreOutcome {
        match tier_of(key) {
            Tier::Plain => match self.plain.remove(key) {
                Ok(()) => StoreOutcome::Plain,
                Err(err) => {
                    warn!(key, error = %err, "Plain store remove failed");
                    StoreOutcome::Failed
                }
            },
            Tier::Secure => {
                let secure_ok = match self.secure.delete(key) {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(key, error = %err, "Keychain delete failed");
                        false
                    }
                };
                let fallback_ok = match self.plain.remove(&fallback_key(key)) {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(key, error = %err, "Fallback remove failed");
                        false
                    }
                };
                match (secure_ok, fallback_ok) {
                    (true, _) => StoreOutcome::Secure,
                    (false, true) => StoreOutcome::PlainFallback,
                    (false, false) => StoreOutcome::Failed,
                }
            }
        }
    }

    /// Write several entries. Each entry is applied independently; a
    /// failure does not roll back earlier writes.
    pub fn multi_set(&self, pairs: &[(&str, &str)]) -> Vec<StoreOutcome> {
        pairs
            .iter()
            .map(|(key, value)| self.set(key, value))
            .collect()
    }

    /// Remove several keys, independently. Partial success is possible.
    pub fn multi_remove(&self, remove_keys: &[&str]) -> Vec<StoreOutcome> {
        debug!(count = remove_keys.len(), "Removing session keys");
        remove_keys.iter().map(|key| self.remove(key)).collect()
    }
}

fn fallback_key(key: &str) -> String {
    format!("{}{}", SECURE_FALLBACK_PREFIX, key)
}
