use crate::beautify::TransformError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PuffError {
    #[error("Note not found: {0}")]
    NotFound(String),

    #[error("No notes folder is bound yet")]
    StorageUnavailable,

    #[error("Invalid note name: {0:?}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Remote { status: u16, message: String },

    #[error("Failed to save note: {0}")]
    Persist(String),

    #[error("AI Beautify failed: {0}")]
    Transform(#[from] TransformError),

    #[error("An API key is required for beautification")]
    MissingCredential,

    #[error("The note is locked while an AI preview is open")]
    PreviewLocked,

    #[error("A beautify request is already running")]
    BeautifyBusy,

    #[error("Nothing to beautify: the note is empty")]
    NothingToBeautify,

    #[error("There is no AI preview to accept")]
    NoPreview,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("The editor session has ended")]
    SessionClosed,
}

impl PuffError {
    /// True for failures that mean the entry is gone rather than unreachable.
    pub fn is_not_found(&self) -> bool {
        match self {
            PuffError::NotFound(_) => true,
            PuffError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            PuffError::Remote { status, .. } => *status == 404,
            _ => false,
        }
    }
}

impl From<confique::Error> for PuffError {
    fn from(e: confique::Error) -> Self {
        PuffError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PuffError>;
