//! Minimal client for OpenAI-compatible `/embeddings` and `/chat/completions`.

use ragdesk_core::ModelError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Inference(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            chat_model: chat_model.into(),
            embedding_model: embedding_model.into(),
            temperature,
        })
    }

    pub async fn embeddings(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let body = EmbeddingRequest { model: &self.embedding_model, input: text };
        let raw = self.post("/embeddings", &body).await?;
        parse_embedding(&raw)
    }

    /// Single-turn completion with `prompt` as the only user message.
    pub async fn chat(&self, prompt: &str) -> Result<String, ModelError> {
        let body = ChatRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };
        let raw = self.post("/chat/completions", &body).await?;
        parse_chat(&raw)
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<String, ModelError> {
        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(send_error)?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(send_error)?;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(path, status, elapsed_ms, "model_api_call");
        if !(200..300).contains(&status) {
            return Err(classify_status(status, text));
        }
        Ok(text)
    }
}

fn send_error(e: reqwest::Error) -> ModelError {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        ModelError::Transient(e.to_string())
    } else {
        ModelError::Api { status: e.status().map_or(0, |s| s.as_u16()), message: e.to_string() }
    }
}

/// Rate limiting and server faults are transient; every other non-2xx is not.
pub fn classify_status(status: u16, body: String) -> ModelError {
    if status == 429 || status >= 500 {
        ModelError::Transient(format!("status {status}: {body}"))
    } else {
        ModelError::Api { status, message: body }
    }
}

pub fn parse_embedding(raw: &str) -> Result<Vec<f32>, ModelError> {
    let resp: EmbeddingResponse =
        serde_json::from_str(raw).map_err(|e| ModelError::InvalidResponse(format!("embeddings: {e}")))?;
    resp.data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ModelError::InvalidResponse("embeddings: no vector returned".into()))
}

pub fn parse_chat(raw: &str) -> Result<String, ModelError> {
    let resp: ChatResponse =
        serde_json::from_str(raw).map_err(|e| ModelError::InvalidResponse(format!("chat completion: {e}")))?;
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ModelError::InvalidResponse("chat completion: no content".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        assert!(classify_status(429, "slow down".into()).is_transient());
        assert!(classify_status(503, String::new()).is_transient());
        assert!(!classify_status(401, "bad key".into()).is_transient());
        assert!(matches!(classify_status(400, "bad".into()), ModelError::Api { status: 400, .. }));
    }

    #[test]
    fn parses_first_embedding() {
        let raw = r#"{"data":[{"embedding":[0.1,0.2],"index":0}],"model":"m"}"#;
        assert_eq!(parse_embedding(raw).unwrap(), vec![0.1, 0.2]);
        assert!(matches!(parse_embedding(r#"{"data":[]}"#), Err(ModelError::InvalidResponse(_))));
    }

    #[test]
    fn parses_chat_content() {
        let raw = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Yes."}}]}"#;
        assert_eq!(parse_chat(raw).unwrap(), "Yes.");
        assert!(parse_chat("not json").is_err());
        assert!(parse_chat(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#).is_err());
    }
}
