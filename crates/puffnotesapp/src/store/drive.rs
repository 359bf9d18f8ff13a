//! Google Drive backed note store.
//!
//! Notes live as `text/markdown` files inside one dedicated folder. The folder
//! is found by name on sign-in and created when it does not exist yet, so
//! every later call is scoped by its id.
//!
//! Requests used:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | find folder / list notes | `GET {api}/files?q=...&fields=files(id,name)` |
//! | create folder | `POST {api}/files` (JSON metadata) |
//! | create note | `POST {upload}/files?uploadType=multipart` |
//! | update note | `PATCH {upload}/files/{id}?uploadType=multipart` |
//! | read note | `GET {api}/files/{id}?alt=media` |
//! | delete note | `DELETE {api}/files/{id}` |
//!
//! Every request carries `Authorization: Bearer <token>`. Failures come back
//! as `{"error": {"message": ...}}`, and that message is what the user sees.

use super::{BindOutcome, NamingPolicy, NoteStore, StoreKind};
use crate::error::{PuffError, Result};
use crate::model::{storage_name_for, BackingId, DocumentEntry, NOTE_MIME_TYPE};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const DEFAULT_FOLDER_NAME: &str = "puffnotes";

/// Sign-in capability. Returns `Ok(None)` when the user closes the prompt.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn sign_in(&self) -> Result<Option<String>>;
}

/// Token handed over by the host, e.g. from the environment.
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.trim().is_empty()))
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn sign_in(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone)]
pub struct DriveEndpoints {
    pub api_base: String,
    pub upload_base: String,
}

impl Default for DriveEndpoints {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct DriveSession {
    token: String,
    folder_id: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct DriveStore {
    http: reqwest::Client,
    endpoints: DriveEndpoints,
    folder_name: String,
    auth: Box<dyn TokenProvider>,
    session: RwLock<Option<DriveSession>>,
}

impl DriveStore {
    pub fn new(auth: impl TokenProvider + 'static) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints: DriveEndpoints::default(),
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            auth: Box::new(auth),
            session: RwLock::new(None),
        }
    }

    pub fn with_endpoints(mut self, endpoints: DriveEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_folder_name(mut self, name: impl Into<String>) -> Self {
        self.folder_name = name.into();
        self
    }

    pub fn folder_id(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.folder_id.clone())
    }

    fn session(&self) -> Result<DriveSession> {
        self.session
            .read()
            .clone()
            .ok_or(PuffError::StorageUnavailable)
    }

    async fn find_or_create_folder(&self, token: &str) -> Result<String> {
        let query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            quote(&self.folder_name),
            FOLDER_MIME_TYPE
        );
        let response = self
            .http
            .get(format!("{}/files", self.endpoints.api_base))
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
            .send()
            .await?;
        let found: FileList = check(response, "Failed to search for notes folder")
            .await?
            .json()
            .await?;
        if let Some(folder) = found.files.into_iter().next() {
            return Ok(folder.id);
        }

        info!(folder = %self.folder_name, "Creating notes folder on Drive");
        let response = self
            .http
            .post(format!("{}/files", self.endpoints.api_base))
            .bearer_auth(token)
            .json(&json!({ "name": self.folder_name, "mimeType": FOLDER_MIME_TYPE }))
            .send()
            .await?;
        let created: DriveFile = check(response, "Failed to create notes folder")
            .await?
            .json()
            .await?;
        Ok(created.id)
    }
}

#[async_trait]
impl NoteStore for DriveStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Drive
    }

    fn naming(&self) -> NamingPolicy {
        NamingPolicy::StoreAssigned
    }

    fn is_bound(&self) -> bool {
        self.session.read().is_some()
    }

    async fn bind_root(&self) -> Result<BindOutcome> {
        let Some(token) = self.auth.sign_in().await? else {
            debug!("Sign-in cancelled");
            return Ok(BindOutcome::Cancelled);
        };
        let folder_id = self.find_or_create_folder(&token).await?;
        info!(folder_id = %folder_id, "Bound Drive folder");
        *self.session.write() = Some(DriveSession { token, folder_id });
        Ok(BindOutcome::Bound)
    }

    async fn list_documents(&self) -> Result<Vec<DocumentEntry>> {
        let session = self.session()?;
        let query = format!(
            "'{}' in parents and mimeType='{}' and trashed=false",
            quote(&session.folder_id),
            NOTE_MIME_TYPE
        );
        let response = self
            .http
            .get(format!("{}/files", self.endpoints.api_base))
            .bearer_auth(&session.token)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
            .send()
            .await?;
        let list: FileList = check(response, "Failed to list notes from Google Drive")
            .await?
            .json()
            .await?;
        Ok(list
            .files
            .into_iter()
            .map(|f| DocumentEntry::new(f.name, BackingId::new(f.id)))
            .collect())
    }

    async fn read_document(&self, id: &BackingId) -> Result<String> {
        let session = self.session()?;
        let response = self
            .http
            .get(format!("{}/files/{}", self.endpoints.api_base, id))
            .bearer_auth(&session.token)
            .query(&[("alt", "media")])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PuffError::NotFound(id.to_string()));
        }
        Ok(check(response, "Failed to fetch note content")
            .await?
            .text()
            .await?)
    }

    async fn write_document(
        &self,
        name: &str,
        content: &str,
        id: Option<&BackingId>,
    ) -> Result<BackingId> {
        let session = self.session()?;
        let mut metadata = json!({
            "name": storage_name_for(name),
            "mimeType": NOTE_MIME_TYPE,
        });
        if id.is_none() {
            metadata["parents"] = json!([session.folder_id]);
        }

        let form = Form::new()
            .part(
                "metadata",
                Part::text(metadata.to_string()).mime_str("application/json")?,
            )
            .part(
                "file",
                Part::text(content.to_string()).mime_str(NOTE_MIME_TYPE)?,
            );

        let request = match id {
            Some(id) => self
                .http
                .patch(format!("{}/files/{}", self.endpoints.upload_base, id)),
            None => self
                .http
                .post(format!("{}/files", self.endpoints.upload_base)),
        };
        let response = request
            .bearer_auth(&session.token)
            .query(&[("uploadType", "multipart")])
            .multipart(form)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(PuffError::NotFound(id.to_string()));
            }
        }
        let saved: DriveFile = check(response, "Failed to save note").await?.json().await?;
        debug!(id = %saved.id, "Saved note to Drive");
        Ok(BackingId::new(saved.id))
    }

    async fn delete_document(&self, id: &BackingId) -> Result<bool> {
        let session = self.session()?;
        let response = self
            .http
            .delete(format!("{}/files/{}", self.endpoints.api_base, id))
            .bearer_auth(&session.token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response, "Failed to delete note").await?;
        Ok(true)
    }
}

/// Turn a non-2xx response into `PuffError::Remote`, preferring the message
/// from the JSON error body.
async fn check(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| format!("{}: {}", context, b.error.message))
        .unwrap_or_else(|_| format!("{}: {}", context, status));
    Err(PuffError::Remote {
        status: status.as_u16(),
        message,
    })
}

/// Escape a value for a single-quoted Drive query literal.
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_escapes_single_quotes() {
        assert_eq!(quote("it's"), "it\\'s");
        assert_eq!(quote("a\\b"), "a\\\\b");
        assert_eq!(quote("plain"), "plain");
    }

    #[test]
    fn blank_static_token_means_cancelled_sign_in() {
        let token = StaticToken::new(Some("   ".to_string()));
        assert!(token.0.is_none());
    }

    #[tokio::test]
    async fn sign_in_cancel_is_not_an_error() {
        let store = DriveStore::new(StaticToken::new(None));

        assert_eq!(store.bind_root().await.unwrap(), BindOutcome::Cancelled);
        assert!(!store.is_bound());
        assert!(matches!(
            store.list_documents().await,
            Err(PuffError::StorageUnavailable)
        ));
    }
}
