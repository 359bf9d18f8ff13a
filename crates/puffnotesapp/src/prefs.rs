//! Small persisted preferences: the user's API key and onboarding flags.
//!
//! Stored as a flat JSON object of string values in `preferences.json` inside
//! the data directory. Keys are versioned so a format change can move to a
//! new key instead of migrating the old one.
//!
//! Without a data directory the preferences live in memory only and a single
//! warning is logged on the first write.

use crate::error::Result;
use crate::notice::Notice;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{debug, warn};
use uuid::Uuid;

pub const PREFERENCES_FILE: &str = "preferences.json";
pub const USER_API_KEY: &str = "puffnotes_groqUserApiKey_v1";

pub fn onboarding_key(variant: &str) -> String {
    format!("puffnotes_onboarding_{}_complete", variant)
}

pub struct Preferences {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
    unavailable_warning: Once,
}

impl Preferences {
    /// Load from `dir`, or start in-memory when there is no directory.
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        let path = dir.map(|d| d.join(PREFERENCES_FILE));
        let values = match &path {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(path)?;
                match serde_json::from_str(&raw) {
                    Ok(values) => values,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Ignoring unreadable preferences file");
                        BTreeMap::new()
                    }
                }
            }
            _ => BTreeMap::new(),
        };
        Ok(Self {
            path,
            values,
            unavailable_warning: Once::new(),
        })
    }

    /// Preferences that are never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: BTreeMap::new(),
            unavailable_warning: Once::new(),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.values.insert(key.to_string(), value.into());
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    pub fn user_api_key(&self) -> Option<String> {
        self.get(USER_API_KEY)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }

    /// Store the user's key, trimmed. A blank key removes it.
    pub fn set_user_api_key(&mut self, key: &str) -> Result<Notice> {
        let key = key.trim();
        if key.is_empty() {
            self.remove(USER_API_KEY)?;
            Ok(Notice::Info("API Key removed.".to_string()))
        } else {
            self.set(USER_API_KEY, key)?;
            Ok(Notice::Info("API Key saved!".to_string()))
        }
    }

    pub fn onboarding_complete(&self, variant: &str) -> bool {
        self.get(&onboarding_key(variant)) == Some("true")
    }

    pub fn mark_onboarding_complete(&mut self, variant: &str) -> Result<()> {
        self.set(&onboarding_key(variant), "true")
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            self.unavailable_warning.call_once(|| {
                warn!("No data directory available; preferences will not persist");
            });
            return Ok(());
        };
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let body = serde_json::to_string_pretty(&self.values)?;
        let tmp = dir.join(format!(".preferences-{}.tmp", Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, body) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(path = %path.display(), "Saved preferences");
        Ok(())
    }
}
