//! # Context Setup
//!
//! [`initialize`] turns configuration into a ready-to-use [`PuffContext`]:
//! the store for the chosen backend, the beautify client, the preferences
//! file and the API keys.
//!
//! ## Directories
//!
//! - **Config dir**: holds `puffnotes.toml`.
//! - **Data dir**: holds `preferences.json` and, for the local backend, the
//!   default `notes/` directory.
//!
//! Both come from the OS conventions (via the `directories` crate). Setting
//! `PUFFNOTES_DATA` points both at one directory instead, which is what the
//! tests do.
//!
//! ## Local Notes Directory
//!
//! Resolved in order: explicit override (`--dir`), `notes_dir` from the
//! config, `<data dir>/notes`. When none is available the local store is
//! created unsupported and degrades to no-ops.

use crate::beautify::groq::GroqClient;
use crate::beautify::{ApiKeys, Transformer};
use crate::config::{Backend, PuffConfig};
use crate::editor::Editor;
use crate::error::Result;
use crate::prefs::Preferences;
use crate::store::drive::{DriveStore, StaticToken};
use crate::store::local::{FixedFolder, LocalStore};
use crate::store::NoteStore;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub const DATA_ENV: &str = "PUFFNOTES_DATA";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PuffPaths {
    pub config_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl PuffPaths {
    pub fn discover() -> Self {
        if let Some(root) = std::env::var_os(DATA_ENV).filter(|v| !v.is_empty()) {
            return Self::at(PathBuf::from(root));
        }
        match ProjectDirs::from("", "", "puffnotes") {
            Some(dirs) => Self {
                config_dir: Some(dirs.config_dir().to_path_buf()),
                data_dir: Some(dirs.data_dir().to_path_buf()),
            },
            None => Self::default(),
        }
    }

    /// Config and data in one directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_dir: Some(root.clone()),
            data_dir: Some(root),
        }
    }

    pub fn default_notes_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| d.join("notes"))
    }
}

/// Overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub backend: Option<Backend>,
    pub notes_dir: Option<PathBuf>,
}

pub struct PuffContext {
    pub config: PuffConfig,
    pub paths: PuffPaths,
    pub backend: Backend,
    pub store: Arc<dyn NoteStore>,
    pub transformer: Arc<dyn Transformer>,
    pub preferences: Preferences,
    pub keys: ApiKeys,
}

impl PuffContext {
    pub fn editor(&self) -> Editor {
        Editor::new(
            self.store.clone(),
            self.transformer.clone(),
            self.keys.clone(),
            self.config.timings(),
        )
    }

    /// Local notes directory in effect, if the local backend is used.
    pub fn notes_dir(&self, options: &InitOptions) -> Option<PathBuf> {
        notes_dir_for(&self.config, &self.paths, options)
    }
}

pub fn initialize(paths: PuffPaths, options: InitOptions) -> Result<PuffContext> {
    let config = PuffConfig::load(paths.config_dir.as_deref())?;
    initialize_with_config(config, paths, options)
}

pub fn initialize_with_config(
    config: PuffConfig,
    paths: PuffPaths,
    options: InitOptions,
) -> Result<PuffContext> {
    let backend = match options.backend {
        Some(backend) => backend,
        None => config.backend()?,
    };

    let store: Arc<dyn NoteStore> = match backend {
        Backend::Local => match notes_dir_for(&config, &paths, &options) {
            Some(dir) => {
                debug!(dir = %dir.display(), "Using local notes directory");
                Arc::new(LocalStore::new(FixedFolder::new(dir)))
            }
            None => Arc::new(LocalStore::unsupported()),
        },
        Backend::Drive => Arc::new(
            DriveStore::new(StaticToken::new(config.drive_token.clone()))
                .with_endpoints(config.drive_endpoints())
                .with_folder_name(config.drive_folder_name.clone()),
        ),
    };

    let transformer: Arc<dyn Transformer> = Arc::new(
        GroqClient::new()
            .with_endpoint(config.groq_endpoint.clone())
            .with_model(config.groq_model.clone())
            .with_temperature(config.temperature),
    );

    let preferences = Preferences::open(paths.data_dir.as_deref())?;
    let keys = ApiKeys::new(
        preferences.user_api_key(),
        Some(config.default_api_key.clone()),
    );

    Ok(PuffContext {
        config,
        paths,
        backend,
        store,
        transformer,
        preferences,
        keys,
    })
}

fn notes_dir_for(config: &PuffConfig, paths: &PuffPaths, options: &InitOptions) -> Option<PathBuf> {
    options
        .notes_dir
        .clone()
        .or_else(|| config.notes_dir.clone())
        .or_else(|| paths.default_notes_dir())
}
