use crate::beautify::{TransformError, Transformer};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Transformer that answers from a script and records what it was sent.
///
/// When the script runs out it echoes the input back.
#[derive(Default)]
pub struct ScriptedTransformer {
    replies: Mutex<VecDeque<Result<String, TransformError>>>,
    inputs: Mutex<Vec<String>>,
    keys: Mutex<Vec<String>>,
    latency: Option<Duration>,
}

impl ScriptedTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, error: TransformError) -> Self {
        self.replies.lock().push_back(Err(error));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }

    pub fn keys_used(&self) -> Vec<String> {
        self.keys.lock().clone()
    }
}

#[async_trait]
impl Transformer for ScriptedTransformer {
    async fn beautify(&self, text: &str, api_key: &str) -> Result<String, TransformError> {
        self.inputs.lock().push(text.to_string());
        self.keys.lock().push(api_key.to_string());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let next = self.replies.lock().pop_front();
        next.unwrap_or_else(|| Ok(text.to_string()))
    }
}
