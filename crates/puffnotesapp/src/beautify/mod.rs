//! # AI Beautify
//!
//! Beautify sends the note to a language model and shows the answer as a
//! preview next to the untouched note. The user then accepts it (the preview
//! replaces the note), rejects it, or asks for another attempt.
//!
//! ```text
//!  Idle ──start──▶ Requesting ──ok──▶ PreviewReady ──accept/reject──▶ Idle
//!                     │  ▲                 │
//!                     │  └───regenerate────┘
//!                     └──fail──▶ Idle
//! ```
//!
//! Regenerate always sends the text captured when the session started, never
//! the previous preview. Only one request runs at a time.
//!
//! ## Stale Results
//!
//! A request has no cancellation. Each request carries a session token, and
//! discarding the session (new note, opened note) bumps it, so a late answer
//! for an abandoned session resolves to nothing.
//!
//! ## Credentials
//!
//! [`ApiKeys`] picks the user's own key when set, the shared default key
//! otherwise. Failures with 401/403/429 are credential or rate-limit trouble
//! and map to a [`KeyPrompt`] that depends on which key was used.

use crate::error::{PuffError, Result};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod groq;

/// A failed transform call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransformError {
    /// HTTP status when the endpoint answered, `None` for transport failures.
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformErrorKind {
    CredentialOrRateLimit,
    Generic,
}

impl TransformError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn network(cause: impl fmt::Display) -> Self {
        Self::new(None, format!("Network error: {}", cause))
    }

    pub fn kind(&self) -> TransformErrorKind {
        match self.status {
            Some(401) | Some(403) | Some(429) => TransformErrorKind::CredentialOrRateLimit,
            _ => TransformErrorKind::Generic,
        }
    }
}

/// The remote text transform: `beautify(text, key) -> markdown`.
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn beautify(&self, text: &str, api_key: &str) -> std::result::Result<String, TransformError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    User,
    Default,
}

/// Why the user should be asked for a personal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrompt {
    /// Neither a user key nor a default key is available.
    Missing,
    /// The shared default key was refused or rate-limited.
    DefaultRejected,
    /// The user's own key was refused or rate-limited.
    UserKeyRejected,
}

impl KeyPrompt {
    /// The prompt to show for a failure, if it is credential related.
    pub fn for_failure(error: &TransformError, source: KeySource) -> Option<Self> {
        if error.kind() != TransformErrorKind::CredentialOrRateLimit {
            return None;
        }
        Some(match source {
            KeySource::Default => KeyPrompt::DefaultRejected,
            KeySource::User => KeyPrompt::UserKeyRejected,
        })
    }

    pub fn message(&self) -> &'static str {
        match self {
            KeyPrompt::Missing => {
                "An API key is required for beautification. Add your own free Groq API key to continue."
            }
            KeyPrompt::DefaultRejected => {
                "The default AI key might be rate-limited or invalid. Please enter your own free Groq API key to continue."
            }
            KeyPrompt::UserKeyRejected => {
                "Your Groq API key seems invalid or rate-limited. Please check it or generate a new one."
            }
        }
    }
}

/// The user's key and the shared default key.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    user: Option<String>,
    default: Option<String>,
}

impl ApiKeys {
    pub fn new(user: Option<String>, default: Option<String>) -> Self {
        Self {
            user: non_blank(user),
            default: non_blank(default),
        }
    }

    pub fn set_user(&mut self, key: Option<String>) {
        self.user = non_blank(key);
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// The key to use for the next request: user key first.
    pub fn resolve(&self) -> Option<(&str, KeySource)> {
        if let Some(key) = self.user.as_deref() {
            return Some((key, KeySource::User));
        }
        self.default.as_deref().map(|key| (key, KeySource::Default))
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("user", &self.user.as_deref().map(mask_key))
            .field("default", &self.default.as_deref().map(mask_key))
            .finish()
    }
}

fn non_blank(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

/// Show only the first and last four characters of a key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BeautifyPhase {
    Idle,
    Requesting,
    PreviewReady,
}

/// Text to send for one request, tagged with the session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeautifyRequest {
    pub token: u64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct BeautifySession {
    phase: BeautifyPhase,
    original: Option<String>,
    preview: Option<String>,
    token: u64,
}

impl Default for BeautifySession {
    fn default() -> Self {
        Self::new()
    }
}

impl BeautifySession {
    pub fn new() -> Self {
        Self {
            phase: BeautifyPhase::Idle,
            original: None,
            preview: None,
            token: 0,
        }
    }

    pub fn phase(&self) -> BeautifyPhase {
        self.phase
    }

    /// Requesting or holding a preview: the note is locked.
    pub fn is_active(&self) -> bool {
        self.phase != BeautifyPhase::Idle
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    /// Begin a session from the current note text.
    pub fn start(&mut self, current: &str) -> Result<BeautifyRequest> {
        if self.phase != BeautifyPhase::Idle {
            return Err(PuffError::BeautifyBusy);
        }
        if current.trim().is_empty() {
            return Err(PuffError::NothingToBeautify);
        }
        self.original = Some(current.to_string());
        self.preview = None;
        Ok(self.next_request(current.to_string()))
    }

    /// Ask again, from the snapshot taken at `start`.
    pub fn regenerate(&mut self) -> Result<BeautifyRequest> {
        match self.phase {
            BeautifyPhase::Requesting => Err(PuffError::BeautifyBusy),
            BeautifyPhase::Idle => Err(PuffError::NoPreview),
            BeautifyPhase::PreviewReady => {
                let text = self.original.clone().unwrap_or_default();
                Ok(self.next_request(text))
            }
        }
    }

    /// Apply the answer for `token`. Returns `None` when the answer belongs to
    /// an abandoned request.
    pub fn resolve(
        &mut self,
        token: u64,
        result: std::result::Result<String, TransformError>,
    ) -> Option<std::result::Result<(), TransformError>> {
        if token != self.token || self.phase != BeautifyPhase::Requesting {
            return None;
        }
        match result {
            Ok(text) => {
                self.preview = Some(text);
                self.phase = BeautifyPhase::PreviewReady;
                Some(Ok(()))
            }
            Err(e) => {
                self.clear();
                Some(Err(e))
            }
        }
    }

    /// Take the preview out and end the session.
    pub fn accept(&mut self) -> Result<String> {
        if self.phase != BeautifyPhase::PreviewReady {
            return Err(PuffError::NoPreview);
        }
        let text = self.preview.take().unwrap_or_default();
        self.clear();
        Ok(text)
    }

    pub fn reject(&mut self) -> Result<()> {
        if self.phase != BeautifyPhase::PreviewReady {
            return Err(PuffError::NoPreview);
        }
        self.clear();
        Ok(())
    }

    /// Drop the session, including any request still running.
    pub fn discard(&mut self) {
        if self.phase == BeautifyPhase::Requesting {
            self.token += 1;
        }
        self.clear();
    }

    fn next_request(&mut self, text: String) -> BeautifyRequest {
        self.token += 1;
        self.phase = BeautifyPhase::Requesting;
        BeautifyRequest {
            token: self.token,
            text,
        }
    }

    fn clear(&mut self) {
        self.phase = BeautifyPhase::Idle;
        self.original = None;
        self.preview = None;
    }
}
