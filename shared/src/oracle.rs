//! The model oracle: one abstracted call contract against the external LLM
//! service, with a global admission gate bounding in-flight requests.
//!
//! Retries do not live here; the orchestrator wraps each invocation.

use std::sync::Arc;

use async_trait::async_trait;
use openai::chat::{ChatCompletion, ChatCompletionMessage, ChatCompletionMessageRole};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::config::Settings;
use crate::error::{EvalError, Result};
use crate::json_relaxed;

/// A single model call: prompt in, one JSON object out.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<Value>;

    /// Model identity participating in cache fingerprints.
    fn model_id(&self) -> &str;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatCompletionMessage],
    temperature: f32,
}

fn msg(role: ChatCompletionMessageRole, txt: &str) -> ChatCompletionMessage {
    ChatCompletionMessage {
        role,
        content: Some(txt.to_string()),
        ..Default::default()
    }
}

/// OpenAI-compatible chat-completions client. The admission gate is shared
/// across every document in flight; batch parallelism above the gate simply
/// queues here.
pub struct ChatOracle {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    gate: Arc<Semaphore>,
}

impl ChatOracle {
    pub fn new(base_url: &str, api_key: &str, model: &str, max_in_flight: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            gate: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.openai_api_base,
            &settings.openai_api_key,
            &settings.model_name,
            settings.oracle_concurrency,
        )
    }
}

#[async_trait]
impl Oracle for ChatOracle {
    async fn invoke(&self, prompt: &str) -> Result<Value> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| EvalError::Upstream("admission gate closed".into()))?;

        let messages = vec![
            msg(
                ChatCompletionMessageRole::System,
                "You are an evaluation engine. Return exactly one JSON object.",
            ),
            msg(ChatCompletionMessageRole::User, prompt),
        ];
        let req = ChatRequest {
            model: &self.model,
            messages: &messages,
            temperature: 0.0,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(model = %self.model, "\u{2192} chat request");
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                error!("network error to model service: {e}");
                EvalError::Upstream(e.to_string())
            })?;

        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .map_err(|e| EvalError::Upstream(e.to_string()))?;
        debug!(
            status = %status,
            "\u{2190} body = {}",
            String::from_utf8_lossy(&bytes[..bytes.len().min(1024)])
        );

        if !status.is_success() {
            return Err(EvalError::Http(status.as_u16()));
        }

        let chat: ChatCompletion = serde_json::from_slice(&bytes)
            .map_err(|e| EvalError::Upstream(format!("invalid completion envelope: {e}")))?;
        let answer = chat
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        json_relaxed::parse_object(&answer)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
