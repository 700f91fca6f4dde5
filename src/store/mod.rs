// src/store/mod.rs

//! Persistence gateway.
//!
//! Services talk to storage only through these traits. Every method that
//! touches more than one table is a single all-or-nothing unit of work in
//! the implementation.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        category::Category,
        paper::{NewPaper, Paper, PaperStatus},
        question::{Question, QuestionAnswer, QuestionChoice, QuestionDraft, QuestionFilter},
    },
};

pub mod memory;
pub mod postgres;
pub mod ranking;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// All categories ordered by `sort` ascending (id as tiebreak).
    async fn list_categories(&self) -> Result<Vec<Category>, AppError>;
    async fn find_category(&self, id: i64) -> Result<Option<Category>, AppError>;
    /// True when a sibling under `parent_id` already uses `name`, ignoring `exclude_id`.
    async fn category_name_taken(
        &self,
        parent_id: i64,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError>;
    async fn count_child_categories(&self, parent_id: i64) -> Result<i64, AppError>;
    async fn insert_category(&self, parent_id: i64, name: &str, sort: i32) -> Result<Category, AppError>;
    async fn update_category(&self, id: i64, name: &str, sort: i32) -> Result<bool, AppError>;
    async fn delete_category(&self, id: i64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError>;

    /// True when another question already uses `title`. `question_type` narrows the
    /// check to one type; `exclude_id` skips the question being edited.
    async fn question_title_taken(
        &self,
        question_type: Option<&str>,
        title: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError>;

    /// category_id -> number of questions, for the whole bank in one query.
    async fn question_counts_by_category(&self) -> Result<HashMap<i64, i64>, AppError>;
    async fn count_questions_in_category(&self, category_id: i64) -> Result<i64, AppError>;

    /// Newest first. Returns the page and the total matching count.
    async fn list_questions(
        &self,
        filter: &QuestionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Question>, i64), AppError>;

    /// Newest questions whose id is not in `exclude`.
    async fn recent_questions_excluding(
        &self,
        exclude: &[i64],
        limit: i64,
    ) -> Result<Vec<Question>, AppError>;

    /// Choices of every question in `question_ids` (single range query).
    async fn choices_for(&self, question_ids: &[i64]) -> Result<Vec<QuestionChoice>, AppError>;
    /// Answers of every question in `question_ids` (single range query).
    async fn answers_for(&self, question_ids: &[i64]) -> Result<Vec<QuestionAnswer>, AppError>;

    /// Writes question row, then choices, then answer. Returns the new id.
    async fn insert_question(&self, draft: &QuestionDraft) -> Result<i64, AppError>;
    /// Updates the question row, replaces all choices, upserts the answer.
    /// Returns false when `id` does not exist.
    async fn replace_question(&self, id: i64, draft: &QuestionDraft) -> Result<bool, AppError>;
    /// Deletes question row, then choices, then answer. Returns false when `id` does not exist.
    async fn delete_question(&self, id: i64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait PaperStore: Send + Sync {
    /// Writes the paper row and one link row per `(question_id, score)`.
    async fn insert_paper(
        &self,
        paper: &NewPaper,
        links: &[(i64, rust_decimal::Decimal)],
    ) -> Result<Paper, AppError>;
    async fn find_paper(&self, id: i64) -> Result<Option<Paper>, AppError>;
    /// Newest first.
    async fn list_papers(
        &self,
        name_keyword: Option<&str>,
        status: Option<PaperStatus>,
    ) -> Result<Vec<Paper>, AppError>;
    async fn update_paper_status(&self, id: i64, status: PaperStatus) -> Result<bool, AppError>;
    /// Deletes the paper and its link rows.
    async fn delete_paper(&self, id: i64) -> Result<bool, AppError>;

    /// Questions linked to the paper in link order, with `paper_score` set.
    async fn questions_for_paper(&self, paper_id: i64) -> Result<Vec<Question>, AppError>;
    /// Number of link rows pointing at the question.
    async fn count_paper_links(&self, question_id: i64) -> Result<i64, AppError>;
}

/// The whole gateway.
pub trait Store: CategoryStore + QuestionStore + PaperStore {}

impl<T: CategoryStore + QuestionStore + PaperStore> Store for T {}
