// src/services/generator.rs

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::{
    clients::completion::{CompletionClient, CompletionRequest},
    config::{AI_MAX_ATTEMPTS, AiConfig},
    error::AppError,
    models::{
        generation::{ChoiceImportRecord, GenerateRequest, QuestionImportRecord},
        question::QuestionType,
    },
    services::prompt::{JSON_END_MARKER, JSON_START_MARKER, build_prompt, requested_types},
};

/// Drafts questions with a language model: prompt, bounded retry, parse.
#[derive(Clone)]
pub struct QuestionGenerator {
    client: Arc<dyn CompletionClient>,
    config: AiConfig,
}

/// Shape of the JSON block the prompt asks for.
#[derive(Debug, Deserialize)]
struct GeneratedBatch {
    questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedQuestion {
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default)]
    question_type: String,
    #[serde(default)]
    multi: bool,
    difficulty: Option<String>,
    score: Option<f64>,
    #[serde(default)]
    choices: Vec<GeneratedChoice>,
    answer: Option<String>,
    analysis: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedChoice {
    #[serde(default)]
    content: String,
    #[serde(default)]
    is_correct: bool,
    sort: Option<i32>,
}

impl QuestionGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, config: AiConfig) -> Self {
        Self { client, config }
    }

    /// Import-shaped records for the request, filed under `req.category_id`.
    /// The records are not validated for completeness here.
    ///
    /// When every attempt fails the error is `AiUnavailable`. A reply that was never
    /// valid JSON shows up as `MalformedAiResponse` in its `last` field, so callers
    /// that care about malformed output must look there.
    pub async fn generate(&self, req: &GenerateRequest) -> Result<Vec<QuestionImportRecord>, AppError> {
        req.validate()?;
        if requested_types(req).is_empty() {
            return Err(AppError::BadRequest(
                "at least one of CHOICE, JUDGE, TEXT must be requested".to_string(),
            ));
        }

        let prompt = build_prompt(req);
        tracing::debug!("Generation prompt:\n{}", prompt);

        let content = self.call_with_retry(&prompt).await?;
        let records = parse_questions(&content, req.category_id)?;

        tracing::info!(
            "Generated {} questions about '{}' (asked for {})",
            records.len(),
            req.topic,
            req.count
        );
        Ok(records)
    }

    /// Up to `AI_MAX_ATTEMPTS` calls, pausing `retry_delay` between failures.
    async fn call_with_retry(&self, prompt: &str) -> Result<String, AppError> {
        let request = CompletionRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut last_error = None;
        for attempt in 1..=AI_MAX_ATTEMPTS {
            match self.attempt(&request).await {
                Ok(content) => {
                    if attempt > 1 {
                        tracing::info!("AI call succeeded on attempt {}", attempt);
                    }
                    return Ok(content);
                }
                Err(e) => {
                    tracing::warn!("AI call attempt {}/{} failed: {}", attempt, AI_MAX_ATTEMPTS, e);
                    last_error = Some(e);
                }
            }

            if attempt < AI_MAX_ATTEMPTS {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        let last = last_error.unwrap_or_else(|| AppError::Internal("no AI attempt was made".to_string()));
        tracing::error!("AI call failed after {} attempts: {}", AI_MAX_ATTEMPTS, last);
        Err(AppError::AiUnavailable {
            attempts: AI_MAX_ATTEMPTS,
            last: Box::new(last),
        })
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<String, AppError> {
        let body = tokio::time::timeout(self.config.timeout, self.client.complete(request))
            .await
            .map_err(|_| {
                AppError::Upstream(format!(
                    "AI call timed out after {}s",
                    self.config.timeout.as_secs()
                ))
            })??;
        extract_content(&body)
    }
}

/// Pulls `choices[0].message.content` out of a chat-completions envelope.
/// An `error` field, a non-JSON body or empty content are all failures.
fn extract_content(body: &str) -> Result<String, AppError> {
    let envelope: Value = serde_json::from_str(body).map_err(|e| AppError::MalformedAiResponse {
        reason: format!("response body is not JSON: {}", e),
        content: body.to_string(),
    })?;

    if let Some(err) = envelope.get("error").filter(|e| !e.is_null()) {
        return Err(AppError::Upstream(format!("AI endpoint reported an error: {}", err)));
    }

    let content = envelope
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if content.is_empty() {
        return Err(AppError::MalformedAiResponse {
            reason: "response carries no content".to_string(),
            content: body.to_string(),
        });
    }

    tracing::debug!("AI content:\n{}", content);
    Ok(content.to_string())
}

/// Text between the first opening marker and the next closing marker.
pub fn extract_fenced_json(content: &str) -> Result<&str, AppError> {
    let malformed = |reason: &str| AppError::MalformedAiResponse {
        reason: reason.to_string(),
        content: content.to_string(),
    };

    let start = content
        .find(JSON_START_MARKER)
        .ok_or_else(|| malformed("missing opening ```json marker"))?;
    let body_start = start + JSON_START_MARKER.len();

    match content[body_start..].find(JSON_END_MARKER) {
        Some(len) => Ok(content[body_start..body_start + len].trim()),
        None if content[..start].contains(JSON_END_MARKER) => {
            Err(malformed("closing marker precedes opening marker"))
        }
        None => Err(malformed("missing closing ``` marker")),
    }
}

/// Maps the fenced `questions` array to import records under `category_id`.
pub fn parse_questions(content: &str, category_id: i64) -> Result<Vec<QuestionImportRecord>, AppError> {
    let json = extract_fenced_json(content)?;
    let batch: GeneratedBatch =
        serde_json::from_str(json).map_err(|e| AppError::MalformedAiResponse {
            reason: format!("fenced block is not a question batch: {}", e),
            content: content.to_string(),
        })?;

    let records = batch
        .questions
        .into_iter()
        .map(|q| {
            let choices = if QuestionType::parse(&q.question_type) == QuestionType::Choice {
                q.choices
                    .into_iter()
                    .map(|c| ChoiceImportRecord {
                        content: c.content,
                        is_correct: c.is_correct,
                        sort: c.sort,
                    })
                    .collect()
            } else {
                Vec::new()
            };

            QuestionImportRecord {
                title: q.title,
                question_type: q.question_type,
                multi: q.multi,
                difficulty: q.difficulty,
                score: q.score.map(|s| s.round() as i32),
                analysis: q.analysis,
                category_id,
                choices,
                answer: q.answer,
            }
        })
        .collect();

    Ok(records)
}
