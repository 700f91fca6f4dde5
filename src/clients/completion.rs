// src/clients/completion.rs

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;

use crate::{config::AiConfig, error::AppError};

/// Parameters of one completion call.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Text-completion endpoint. Returns the raw response body; interpreting the
/// envelope is the caller's job.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AppError>;
}

/// OpenAI-compatible chat-completions client (Moonshot/Kimi by default).
#[derive(Clone)]
pub struct HttpCompletionClient {
    http: reqwest::Client,
    api_url: String,
}

impl HttpCompletionClient {
    pub fn new(config: &AiConfig) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !config.api_key.is_empty() {
            let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| AppError::Config(format!("AI_API_KEY is not a valid header value: {}", e)))?;
            headers.insert(AUTHORIZATION, bearer);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AppError> {
        tracing::debug!("Calling completion endpoint, model: {}", request.model);

        let body = serde_json::json!({
            "model": request.model,
            "messages": [
                {"role": "user", "content": request.prompt}
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let response = self
            .http
            .post(&self.api_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}
