//! Plain-tier key/value storage backed by a JSON file.
//!
//! Unencrypted, ordinary storage. The whole map is rewritten on every
//! mutation; values are small (tokens, flags, one profile blob) so this
//! stays well under a millisecond.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::warn;

/// Store file name inside the app data directory.
const STORE_FILE: &str = "session_store.json";

pub struct PlainStore {
    path: PathBuf,
    map: Mutex<HashMap<String, String>>,
}

impl PlainStore {
    /// Open (or create) the store under `dir`. A corrupt store file is
    /// treated as empty rather than fatal - the session it held is lost,
    /// which the auth check handles as "not signed in".
    pub fn open(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store directory {}", dir.display()))?;
        let path = dir.join(STORE_FILE);

        let map = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(err) => {
                    warn!(error = %err, "Plain store file corrupt, starting empty");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.lock().expect("plain store lock").get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.map.lock().expect("plain store lock");
        map.insert(key.to_string(), value.to_string());
        self.flush(&map)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.map.lock().expect("plain store lock");
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&map)
    }

    fn flush(&self, map: &HashMap<String, String>) -> Result<()> {
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}
