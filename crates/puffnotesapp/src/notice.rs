//! User-facing notices.
//!
//! The editor never prints. Whatever the user should hear about (a save, a
//! failure, a request for an API key) becomes a [`Notice`], and the front end
//! decides how to show it.

use crate::beautify::KeyPrompt;
use crate::error::PuffError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A save went through under this display name.
    Saved(String),
    PersistFailed { name: String, message: String },
    /// Manual save of a note without a name.
    NameRequired,
    NotFound(String),
    PromptForKey(KeyPrompt),
    TransformFailed(String),
    Warning(String),
    Info(String),
}

impl Notice {
    pub fn level(&self) -> MessageLevel {
        match self {
            Notice::Saved(_) => MessageLevel::Success,
            Notice::Info(_) => MessageLevel::Info,
            Notice::NameRequired | Notice::PromptForKey(_) | Notice::Warning(_) => {
                MessageLevel::Warning
            }
            Notice::PersistFailed { .. } | Notice::NotFound(_) | Notice::TransformFailed(_) => {
                MessageLevel::Error
            }
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Saved(name) => write!(f, "Saved {}", name),
            Notice::PersistFailed { name, message } => {
                write!(f, "Failed to save note: {}. Error: {}", name, message)
            }
            Notice::NameRequired => {
                f.write_str("Please enter a name for your note before saving.")
            }
            Notice::NotFound(name) => write!(f, "Could not load file: {}", name),
            Notice::PromptForKey(prompt) => f.write_str(prompt.message()),
            Notice::TransformFailed(message) => write!(f, "AI Beautify failed: {}", message),
            Notice::Warning(message) | Notice::Info(message) => f.write_str(message),
        }
    }
}

impl From<PuffError> for Notice {
    fn from(err: PuffError) -> Self {
        match err {
            PuffError::NotFound(name) => Notice::NotFound(name),
            PuffError::MissingCredential => Notice::PromptForKey(KeyPrompt::Missing),
            PuffError::Transform(e) => Notice::TransformFailed(e.message),
            other => Notice::Warning(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beautify::TransformError;

    #[test]
    fn levels() {
        assert_eq!(Notice::Saved("a".into()).level(), MessageLevel::Success);
        assert_eq!(Notice::NameRequired.level(), MessageLevel::Warning);
        assert_eq!(
            Notice::PersistFailed {
                name: "a".into(),
                message: "disk full".into()
            }
            .level(),
            MessageLevel::Error
        );
    }

    #[test]
    fn errors_convert_to_notices() {
        assert_eq!(
            Notice::from(PuffError::NotFound("gone.md".into())),
            Notice::NotFound("gone.md".into())
        );
        assert_eq!(
            Notice::from(PuffError::MissingCredential),
            Notice::PromptForKey(KeyPrompt::Missing)
        );
        assert_eq!(
            Notice::from(PuffError::Transform(TransformError::new(Some(500), "boom"))),
            Notice::TransformFailed("boom".into())
        );
    }

    #[test]
    fn display_mentions_the_name() {
        let text = Notice::PersistFailed {
            name: "ideas.md".into(),
            message: "disk full".into(),
        }
        .to_string();
        assert!(text.contains("ideas.md"));
        assert!(text.contains("disk full"));
    }
}
