use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use puffnotesapp::beautify::groq::{GroqClient, DEFAULT_MODEL, SYSTEM_PROMPT};
use puffnotesapp::beautify::{TransformErrorKind, Transformer};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: String,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn completions(
    State(canned): State<Canned>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    canned.seen.lock().unwrap().push((auth, body));
    (
        canned.status,
        [("content-type", "application/json")],
        canned.body.clone(),
    )
        .into_response()
}

async fn serve(status: StatusCode, body: Value) -> (GroqClient, Arc<Mutex<Vec<(Option<String>, Value)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let canned = Canned {
        status,
        body: body.to_string(),
        seen: seen.clone(),
    };
    let router = Router::new()
        .route("/openai/v1/chat/completions", post(completions))
        .with_state(canned);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    let client =
        GroqClient::new().with_endpoint(format!("http://{}/openai/v1/chat/completions", addr));
    (client, seen)
}

#[tokio::test]
async fn returns_first_choice_content() {
    let (client, seen) = serve(
        StatusCode::OK,
        json!({"choices": [{"message": {"role": "assistant", "content": "# Photosynthesis\n\nDetails."}}]}),
    )
    .await;

    let text = client.beautify("photosynth.. light?", "gsk_test").await.unwrap();

    assert_eq!(text, "# Photosynthesis\n\nDetails.");
    let seen = seen.lock().unwrap();
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer gsk_test"));
    assert_eq!(body["model"], DEFAULT_MODEL);
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "photosynth.. light?");
}

#[tokio::test]
async fn rate_limit_carries_status_and_body_message() {
    let (client, _) = serve(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"message": "Rate limit reached for model"}}),
    )
    .await;

    let err = client.beautify("notes", "gsk_test").await.unwrap_err();

    assert_eq!(err.status, Some(429));
    assert_eq!(err.kind(), TransformErrorKind::CredentialOrRateLimit);
    assert_eq!(err.message, "Rate limit reached for model");
}

#[tokio::test]
async fn server_error_without_body_message_uses_status_line() {
    let (client, _) = serve(StatusCode::INTERNAL_SERVER_ERROR, json!({"oops": true})).await;

    let err = client.beautify("notes", "gsk_test").await.unwrap_err();

    assert_eq!(err.status, Some(500));
    assert_eq!(err.kind(), TransformErrorKind::Generic);
    assert_eq!(err.message, "Groq API error: 500 Internal Server Error");
}

#[tokio::test]
async fn missing_choices_yield_empty_text() {
    let (client, _) = serve(StatusCode::OK, json!({"id": "cmpl-1"})).await;

    let text = client.beautify("notes", "gsk_test").await.unwrap();

    assert_eq!(text, "");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = GroqClient::new().with_endpoint(format!("http://{}/v1", addr));

    let err = client.beautify("notes", "gsk_test").await.unwrap_err();

    assert_eq!(err.status, None);
    assert!(err.message.starts_with("Network error:"));
}
