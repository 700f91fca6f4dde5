// src/models/question.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    /// Question type: 'CHOICE', 'JUDGE' or 'TEXT'.
    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: String,

    pub title: String,

    /// Multi-select flag, only meaningful for CHOICE questions.
    pub multi: bool,

    /// 'EASY', 'MEDIUM' or 'HARD'.
    pub difficulty: String,

    pub category_id: i64,

    /// Base score of the question.
    pub score: i32,

    pub analysis: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Attached by hydration, sorted by `sort` ascending. Empty for non-CHOICE questions.
    #[sqlx(skip)]
    #[serde(default)]
    pub choices: Vec<QuestionChoice>,

    #[sqlx(skip)]
    #[serde(default)]
    pub answer: Option<QuestionAnswer>,

    /// Score override when the question is read through a paper.
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_score: Option<Decimal>,
}

impl Question {
    pub fn kind(&self) -> QuestionType {
        QuestionType::parse(&self.question_type)
    }
}

/// Represents the 'question_choices' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionChoice {
    pub id: i64,
    pub question_id: i64,
    pub content: String,
    pub is_correct: bool,
    /// 0-based position; determines the displayed letter (0 -> A).
    pub sort: i32,
}

/// Represents the 'question_answers' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswer {
    pub id: i64,
    pub question_id: i64,
    /// Correct letters for CHOICE ("A,C"), "TRUE"/"FALSE" for JUDGE, free text for TEXT.
    pub answer: String,
}

/// Known question kinds. Anything else is kept as `Other` so stored data never fails to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionType {
    Choice,
    Judge,
    Text,
    Other,
}

impl QuestionType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CHOICE" => QuestionType::Choice,
            "JUDGE" => QuestionType::Judge,
            "TEXT" => QuestionType::Text,
            _ => QuestionType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Choice => "CHOICE",
            QuestionType::Judge => "JUDGE",
            QuestionType::Text => "TEXT",
            QuestionType::Other => "OTHER",
        }
    }

    /// Display order inside a paper: choice, judge, text, then everything else.
    pub fn paper_rank(&self) -> u8 {
        match self {
            QuestionType::Choice => 1,
            QuestionType::Judge => 2,
            QuestionType::Text => 3,
            QuestionType::Other => 4,
        }
    }
}

/// DTO for creating or updating a question together with its choices and answer.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 20))]
    pub question_type: String,

    #[validate(length(min = 1, max = 2000, message = "Title length must be between 1 and 2000 chars"))]
    pub title: String,

    #[serde(default)]
    pub multi: bool,

    #[validate(length(min = 1, max = 20))]
    pub difficulty: String,

    #[validate(range(min = 1))]
    pub category_id: i64,

    #[validate(range(min = 0, max = 1000))]
    pub score: i32,

    #[validate(length(max = 5000))]
    pub analysis: Option<String>,

    /// Only read for CHOICE questions. Caller-supplied `sort` is ignored.
    #[serde(default)]
    #[validate(nested)]
    pub choices: Vec<ChoiceRequest>,

    /// Only read for JUDGE / TEXT questions; CHOICE answers are derived.
    #[validate(length(max = 5000))]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub sort: Option<i32>,
}

/// Fully derived write set handed to the store: choices carry their final
/// 0-based sort and `answer` is the final answer text.
#[derive(Debug, Clone)]
pub struct QuestionDraft {
    pub question_type: String,
    pub title: String,
    pub multi: bool,
    pub difficulty: String,
    pub category_id: i64,
    pub score: i32,
    pub analysis: Option<String>,
    pub choices: Vec<ChoiceDraft>,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceDraft {
    pub content: String,
    pub is_correct: bool,
    pub sort: i32,
}

/// Optional filters for question paging. Empty strings are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFilter {
    pub category_id: Option<i64>,
    pub difficulty: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<String>,
    /// Substring match on the title.
    pub keyword: Option<String>,
}

impl QuestionFilter {
    /// Drops blank string filters so callers can pass raw query values.
    pub fn normalized(&self) -> Self {
        fn keep(v: &Option<String>) -> Option<String> {
            v.as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        }
        Self {
            category_id: self.category_id,
            difficulty: keep(&self.difficulty),
            question_type: keep(&self.question_type),
            keyword: keep(&self.keyword),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult<T> {
    pub records: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}
