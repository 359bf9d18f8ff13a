use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use puffnotesapp::error::PuffError;
use puffnotesapp::model::BackingId;
use puffnotesapp::store::drive::{DriveEndpoints, DriveStore, StaticToken};
use puffnotesapp::store::{BindOutcome, NoteStore};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

const TOKEN: &str = "test-token";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

#[derive(Clone)]
struct MockFile {
    name: String,
    content: String,
    parent: String,
}

#[derive(Default)]
struct MockDrive {
    folders: Vec<(String, String)>,
    files: BTreeMap<String, MockFile>,
    next_id: u64,
    uploads: Vec<String>,
    folder_creates: usize,
    reject_uploads: bool,
}

impl MockDrive {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

type Shared = Arc<Mutex<MockDrive>>;

fn unauthorized(headers: &HeaderMap) -> Option<Response> {
    let expected = format!("Bearer {}", TOKEN);
    let ok = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);
    if ok {
        None
    } else {
        Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": {"message": "Invalid Credentials"}})),
            )
                .into_response(),
        )
    }
}

/// Bodies of the metadata part and the content part of a multipart upload.
fn multipart_parts(body: &str) -> (Value, String) {
    let parts: Vec<String> = body
        .split("\r\n\r\n")
        .skip(1)
        .map(|chunk| chunk.split("\r\n--").next().unwrap_or_default().to_string())
        .collect();
    let metadata = serde_json::from_str(&parts[0]).unwrap();
    (metadata, parts[1].clone())
}

async fn list_files(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Some(r) = unauthorized(&headers) {
        return r;
    }
    let q = params.get("q").cloned().unwrap_or_default();
    let drive = state.lock().unwrap();
    let files: Vec<Value> = if q.contains(FOLDER_MIME) {
        drive
            .folders
            .iter()
            .filter(|(_, name)| q.contains(&format!("name='{}'", name)))
            .map(|(id, name)| json!({"id": id, "name": name}))
            .collect()
    } else {
        drive
            .files
            .iter()
            .filter(|(_, f)| q.contains(&format!("'{}' in parents", f.parent)))
            .map(|(id, f)| json!({"id": id, "name": f.name}))
            .collect()
    };
    Json(json!({ "files": files })).into_response()
}

async fn create_folder(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(r) = unauthorized(&headers) {
        return r;
    }
    let mut drive = state.lock().unwrap();
    let id = drive.fresh_id("folder");
    let name = body["name"].as_str().unwrap_or_default().to_string();
    drive.folders.push((id.clone(), name.clone()));
    drive.folder_creates += 1;
    Json(json!({"id": id, "name": name})).into_response()
}

async fn read_file(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(r) = unauthorized(&headers) {
        return r;
    }
    match state.lock().unwrap().files.get(&id) {
        Some(file) => file.content.clone().into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"message": "File not found"}})),
        )
            .into_response(),
    }
}

async fn delete_file(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(r) = unauthorized(&headers) {
        return r;
    }
    match state.lock().unwrap().files.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn upload_create(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(r) = unauthorized(&headers) {
        return r;
    }
    assert_eq!(params.get("uploadType").map(String::as_str), Some("multipart"));
    let mut drive = state.lock().unwrap();
    drive.uploads.push(body.clone());
    if drive.reject_uploads {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"message": "Insufficient permissions"}})),
        )
            .into_response();
    }
    let (metadata, content) = multipart_parts(&body);
    let id = drive.fresh_id("file");
    let name = metadata["name"].as_str().unwrap_or_default().to_string();
    let parent = metadata["parents"][0].as_str().unwrap_or_default().to_string();
    drive.files.insert(
        id.clone(),
        MockFile {
            name: name.clone(),
            content,
            parent,
        },
    );
    Json(json!({"id": id, "name": name})).into_response()
}

async fn upload_update(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(r) = unauthorized(&headers) {
        return r;
    }
    let mut drive = state.lock().unwrap();
    drive.uploads.push(body.clone());
    let (metadata, content) = multipart_parts(&body);
    match drive.files.get_mut(&id) {
        Some(file) => {
            file.name = metadata["name"].as_str().unwrap_or_default().to_string();
            file.content = content;
            Json(json!({"id": id, "name": file.name})).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"message": "File not found"}})),
        )
            .into_response(),
    }
}

async fn serve(state: Shared) -> String {
    let router = Router::new()
        .route("/drive/v3/files", get(list_files).post(create_folder))
        .route("/drive/v3/files/{id}", get(read_file).delete(delete_file))
        .route("/upload/drive/v3/files", axum::routing::post(upload_create))
        .route("/upload/drive/v3/files/{id}", axum::routing::patch(upload_update))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn bound_store(state: &Shared) -> DriveStore {
    let base = serve(state.clone()).await;
    let store = DriveStore::new(StaticToken::new(Some(TOKEN.to_string()))).with_endpoints(
        DriveEndpoints {
            api_base: format!("{}/drive/v3", base),
            upload_base: format!("{}/upload/drive/v3", base),
        },
    );
    assert_eq!(store.bind_root().await.unwrap(), BindOutcome::Bound);
    store
}

#[tokio::test]
async fn bind_creates_folder_once() {
    let state = Shared::default();

    let first = bound_store(&state).await;
    let second = bound_store(&state).await;

    assert_eq!(state.lock().unwrap().folder_creates, 1);
    assert_eq!(first.folder_id(), second.folder_id());
}

#[tokio::test]
async fn create_then_read_round_trips() {
    let state = Shared::default();
    let store = bound_store(&state).await;

    let id = store
        .write_document("lecture.md", "# Week 1", None)
        .await
        .unwrap();

    assert_eq!(store.read_document(&id).await.unwrap(), "# Week 1");
    let listed = store.list_documents().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "lecture.md");
    assert_eq!(listed[0].id, id);

    let upload = state.lock().unwrap().uploads[0].clone();
    let folder_id = store.folder_id().unwrap();
    assert!(upload.contains(&format!("\"parents\":[\"{}\"]", folder_id)));
    assert!(upload.contains("text/markdown"));
}

#[tokio::test]
async fn update_keeps_id_and_omits_parents() {
    let state = Shared::default();
    let store = bound_store(&state).await;
    let id = store.write_document("draft.md", "v1", None).await.unwrap();

    let updated = store
        .write_document("final.md", "v2", Some(&id))
        .await
        .unwrap();

    assert_eq!(updated, id);
    assert_eq!(store.read_document(&id).await.unwrap(), "v2");
    assert_eq!(store.list_documents().await.unwrap()[0].name, "final.md");
    let upload = state.lock().unwrap().uploads[1].clone();
    assert!(!upload.contains("parents"));
}

#[tokio::test]
async fn duplicate_names_get_distinct_ids() {
    let state = Shared::default();
    let store = bound_store(&state).await;

    let a = store.write_document("untitled.md", "a", None).await.unwrap();
    let b = store.write_document("untitled.md", "b", None).await.unwrap();

    assert_ne!(a, b);
    assert_eq!(store.list_documents().await.unwrap().len(), 2);
}

#[tokio::test]
async fn missing_files_map_to_not_found_and_false() {
    let state = Shared::default();
    let store = bound_store(&state).await;
    let ghost = BackingId::new("file-999");

    assert!(matches!(
        store.read_document(&ghost).await,
        Err(PuffError::NotFound(_))
    ));
    assert!(!store.delete_document(&ghost).await.unwrap());
}

#[tokio::test]
async fn delete_removes_file() {
    let state = Shared::default();
    let store = bound_store(&state).await;
    let id = store.write_document("gone.md", "x", None).await.unwrap();

    assert!(store.delete_document(&id).await.unwrap());
    assert!(store.list_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn error_message_from_body_is_surfaced() {
    let state = Shared::default();
    let store = bound_store(&state).await;
    state.lock().unwrap().reject_uploads = true;

    let err = store
        .write_document("x.md", "x", None)
        .await
        .unwrap_err();

    match err {
        PuffError::Remote { status, message } => {
            assert_eq!(status, 403);
            assert!(message.contains("Insufficient permissions"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn listing_is_scoped_to_the_notes_folder() {
    let state = Shared::default();
    let store = bound_store(&state).await;
    store.write_document("mine.md", "x", None).await.unwrap();
    state.lock().unwrap().files.insert(
        "file-elsewhere".into(),
        MockFile {
            name: "other.md".into(),
            content: "y".into(),
            parent: "folder-other".into(),
        },
    );

    let names: Vec<String> = store
        .list_documents()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();

    assert_eq!(names, vec!["mine.md"]);
}
