// src/models/paper.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::Question;

/// Represents the 'papers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,

    /// 'DRAFT', 'PUBLISHED' or 'STOPPED'.
    pub status: String,

    /// Exam duration in minutes.
    pub duration: i32,

    pub question_count: i32,
    pub total_score: Decimal,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Attached at read time, never stored on the paper row.
    #[sqlx(skip)]
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Paper {
    pub fn state(&self) -> Option<PaperStatus> {
        PaperStatus::parse(&self.status)
    }
}

/// Represents the 'paper_questions' link table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperQuestion {
    pub id: i64,
    pub paper_id: i64,
    pub question_id: i64,
    /// Score at selection time; may differ from the question's base score.
    pub score: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperStatus {
    Draft,
    Published,
    Stopped,
}

impl PaperStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Some(PaperStatus::Draft),
            "PUBLISHED" => Some(PaperStatus::Published),
            "STOPPED" => Some(PaperStatus::Stopped),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaperStatus::Draft => "DRAFT",
            PaperStatus::Published => "PUBLISHED",
            PaperStatus::Stopped => "STOPPED",
        }
    }
}

/// DTO for manual paper composition.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ComposePaperRequest {
    #[validate(length(min = 1, max = 100, message = "Paper name must be between 1 and 100 chars"))]
    pub name: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, max = 1440))]
    pub duration: i32,

    /// Question id -> score override.
    #[serde(default)]
    pub questions: BTreeMap<i64, Decimal>,
}

/// Paper row ready for insertion.
#[derive(Debug, Clone)]
pub struct NewPaper {
    pub name: String,
    pub description: Option<String>,
    pub status: PaperStatus,
    pub duration: i32,
    pub question_count: i32,
    pub total_score: Decimal,
}

/// Query parameters for listing papers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperListParams {
    /// Substring match on the name.
    pub name: Option<String>,
    pub status: Option<String>,
}
