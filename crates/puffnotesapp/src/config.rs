//! # Configuration
//!
//! Configuration is loaded with [`confique`], layered in priority order:
//!
//! 1. **Environment variables**: `PUFFNOTES_BACKEND`, `PUFFNOTES_NOTES_DIR`, ...
//! 2. **Config file**: `puffnotes.toml` in the config directory.
//! 3. **Compiled defaults**: via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `backend` | `local` | `local` (a directory) or `drive` (Google Drive) |
//! | `notes_dir` | data dir `/notes` | Directory for the local backend |
//! | `local_debounce_ms` | `850` | Autosave delay for the local backend |
//! | `remote_debounce_ms` | `1500` | Autosave delay for Drive |
//! | `saved_indicator_ms` | `1500` | How long "Saved" stays visible |
//! | `groq_endpoint` | Groq chat completions | Beautify endpoint |
//! | `groq_model` | `llama-3.3-70b-versatile` | Beautify model |
//! | `temperature` | `0.4` | Beautify sampling temperature |
//! | `default_api_key` | empty | Shared key used when the user has none |
//! | `drive_api_base` | `https://www.googleapis.com/drive/v3` | Drive metadata API |
//! | `drive_upload_base` | `https://www.googleapis.com/upload/drive/v3` | Drive upload API |
//! | `drive_folder_name` | `puffnotes` | Folder holding the notes |
//! | `drive_token` | none | OAuth bearer token for Drive |

use crate::autosave::{LOCAL_DEBOUNCE, REMOTE_DEBOUNCE, SAVED_INDICATOR};
use crate::beautify::groq::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::editor::EditorTimings;
use crate::error::{PuffError, Result};
use crate::store::drive::{DriveEndpoints, DEFAULT_FOLDER_NAME};
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "puffnotes.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Local,
    Drive,
}

impl FromStr for Backend {
    type Err = PuffError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "drive" | "gdrive" | "online" => Ok(Backend::Drive),
            other => Err(PuffError::Config(format!(
                "unknown backend {:?} (expected \"local\" or \"drive\")",
                other
            ))),
        }
    }
}

/// Configuration for puffnotes, stored in `puffnotes.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PuffConfig {
    /// Storage backend: "local" or "drive".
    #[config(env = "PUFFNOTES_BACKEND", default = "local")]
    pub backend: String,

    /// Directory for the local backend.
    #[config(env = "PUFFNOTES_NOTES_DIR")]
    pub notes_dir: Option<PathBuf>,

    #[config(env = "PUFFNOTES_LOCAL_DEBOUNCE_MS", default = 850)]
    pub local_debounce_ms: u64,

    #[config(env = "PUFFNOTES_REMOTE_DEBOUNCE_MS", default = 1500)]
    pub remote_debounce_ms: u64,

    #[config(env = "PUFFNOTES_SAVED_INDICATOR_MS", default = 1500)]
    pub saved_indicator_ms: u64,

    #[config(
        env = "PUFFNOTES_GROQ_ENDPOINT",
        default = "https://api.groq.com/openai/v1/chat/completions"
    )]
    pub groq_endpoint: String,

    #[config(env = "PUFFNOTES_GROQ_MODEL", default = "llama-3.3-70b-versatile")]
    pub groq_model: String,

    #[config(env = "PUFFNOTES_TEMPERATURE", default = 0.4)]
    pub temperature: f32,

    /// Shared key used when the user has not set their own.
    #[config(env = "PUFFNOTES_DEFAULT_API_KEY", default = "")]
    pub default_api_key: String,

    #[config(
        env = "PUFFNOTES_DRIVE_API_BASE",
        default = "https://www.googleapis.com/drive/v3"
    )]
    pub drive_api_base: String,

    #[config(
        env = "PUFFNOTES_DRIVE_UPLOAD_BASE",
        default = "https://www.googleapis.com/upload/drive/v3"
    )]
    pub drive_upload_base: String,

    #[config(env = "PUFFNOTES_DRIVE_FOLDER", default = "puffnotes")]
    pub drive_folder_name: String,

    /// OAuth bearer token for Drive.
    #[config(env = "PUFFNOTES_DRIVE_TOKEN")]
    pub drive_token: Option<String>,
}

impl Default for PuffConfig {
    fn default() -> Self {
        let drive = DriveEndpoints::default();
        Self {
            backend: "local".to_string(),
            notes_dir: None,
            local_debounce_ms: LOCAL_DEBOUNCE.as_millis() as u64,
            remote_debounce_ms: REMOTE_DEBOUNCE.as_millis() as u64,
            saved_indicator_ms: SAVED_INDICATOR.as_millis() as u64,
            groq_endpoint: DEFAULT_ENDPOINT.to_string(),
            groq_model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            default_api_key: String::new(),
            drive_api_base: drive.api_base,
            drive_upload_base: drive.upload_base,
            drive_folder_name: DEFAULT_FOLDER_NAME.to_string(),
            drive_token: None,
        }
    }
}

impl PuffConfig {
    /// Load from the environment and `puffnotes.toml` in `config_dir`, if any.
    pub fn load(config_dir: Option<&Path>) -> Result<Self> {
        let mut builder = PuffConfig::builder().env();
        if let Some(dir) = config_dir {
            builder = builder.file(dir.join(CONFIG_FILE_NAME));
        }
        Ok(builder.load()?)
    }

    pub fn backend(&self) -> Result<Backend> {
        self.backend.parse()
    }

    pub fn timings(&self) -> EditorTimings {
        EditorTimings {
            local_debounce: Duration::from_millis(self.local_debounce_ms),
            remote_debounce: Duration::from_millis(self.remote_debounce_ms),
            saved_indicator: Duration::from_millis(self.saved_indicator_ms),
        }
    }

    pub fn drive_endpoints(&self) -> DriveEndpoints {
        DriveEndpoints {
            api_base: self.drive_api_base.trim_end_matches('/').to_string(),
            upload_base: self.drive_upload_base.trim_end_matches('/').to_string(),
        }
    }
}
