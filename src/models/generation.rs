// src/models/generation.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// DTO for asking the model to draft questions.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[validate(length(min = 1, max = 200, message = "Topic must be between 1 and 200 chars"))]
    pub topic: String,

    #[validate(range(min = 1, max = 50))]
    pub count: u32,

    /// Any of 'CHOICE', 'JUDGE', 'TEXT'.
    #[validate(length(min = 1))]
    pub types: Vec<String>,

    /// Ask for a mix of single- and multi-select choice questions.
    #[serde(default)]
    pub include_multiple: bool,

    pub difficulty: Option<String>,

    #[validate(length(max = 2000))]
    pub requirements: Option<String>,

    /// Category the generated questions will be filed under.
    #[validate(range(min = 1))]
    pub category_id: i64,
}

/// A question in import shape: produced by the AI generator or a spreadsheet,
/// validated separately, then persisted through the question lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionImportRecord {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub question_type: String,
    #[serde(default)]
    pub multi: bool,
    pub difficulty: Option<String>,
    pub score: Option<i32>,
    pub analysis: Option<String>,
    pub category_id: i64,
    #[serde(default)]
    pub choices: Vec<ChoiceImportRecord>,
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceImportRecord {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_correct: bool,
    pub sort: Option<i32>,
}

/// Outcome of a batch import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub imported: usize,
    pub failures: Vec<String>,
}
