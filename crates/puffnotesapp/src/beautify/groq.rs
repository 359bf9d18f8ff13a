//! Groq chat-completions client.
//!
//! The endpoint speaks the OpenAI chat format: one system message with the
//! note-writing instructions, one user message with the note.

use super::{TransformError, Transformer};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TEMPERATURE: f32 = 0.4;

pub const SYSTEM_PROMPT: &str = "You are an academic note-generation assistant.
The user will provide rough, sparse, or partial notes in the form of topic names, unordered bullet points, incomplete phrases, vague outlines, or fragmented thoughts. Your task is to transform this into a highly detailed, logically organized, and polished academic note.
You must intelligently infer what the user intended, expand on short or unclear entries (e.g., \"func... sth? idk\"), correct typos, and fill in any missing background or context. If the user provided some content, continue from where they left off and complete the note fully.
Your output must be exhaustive and informative. Include as much detail as needed to make the final note self-contained, coherent, and useful for someone studying the topic for the first time. Cover all foundational concepts, important distinctions, examples, and any key insights or historical context if relevant. However, avoid unnecessary repetition or filler. Depth is welcome, but only when it adds meaningful value.
Format your output as clean, human-readable markdown. Use proper structure: headings, subheadings, paragraphs, bullet points, tables, and code snippets or examples where applicable.
Do not ask questions, explain what you're doing, or include any commentary. Output only the final note and nothing else.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl Default for GroqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GroqClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transformer for GroqClient {
    async fn beautify(&self, text: &str, api_key: &str) -> Result<String, TransformError> {
        if api_key.trim().is_empty() {
            return Err(TransformError::new(
                Some(401),
                "API key required for beautification.",
            ));
        }

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: self.temperature,
        };

        debug!(model = %self.model, chars = text.len(), "Sending beautify request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(TransformError::network)?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&raw)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| {
                    format!(
                        "Groq API error: {} {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or_default()
                    )
                    .trim_end()
                    .to_string()
                });
            warn!(status = status.as_u16(), "Beautify request rejected");
            return Err(TransformError::new(Some(status.as_u16()), message));
        }

        let parsed: ChatResponse = response.json().await.map_err(|_| {
            TransformError::new(None, "Failed to parse successful response from Groq.")
        })?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default())
    }
}
