// src/services/paper.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        paper::{ComposePaperRequest, NewPaper, Paper, PaperListParams, PaperStatus},
        question::Question,
    },
    services::hydrate::fill_choices_and_answers,
    store::Store,
};

#[derive(Clone)]
pub struct PaperService {
    store: Arc<dyn Store>,
}

impl PaperService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a DRAFT paper from `question id -> score` selections.
    /// The paper row and its link rows are written together.
    pub async fn compose_manual(&self, req: ComposePaperRequest) -> Result<Paper, AppError> {
        req.validate()?;

        if let Some((id, score)) = req.questions.iter().find(|(_, score)| **score < Decimal::ZERO) {
            return Err(AppError::BadRequest(format!(
                "question {} has a negative score {}",
                id, score
            )));
        }

        for id in req.questions.keys() {
            if self.store.find_question(*id).await?.is_none() {
                return Err(AppError::not_found("question", *id));
            }
        }

        let links: Vec<(i64, Decimal)> = req.questions.iter().map(|(id, score)| (*id, *score)).collect();
        let total_score: Decimal = links.iter().map(|(_, score)| *score).sum();

        let new_paper = NewPaper {
            name: req.name.trim().to_string(),
            description: req.description,
            status: PaperStatus::Draft,
            duration: req.duration,
            question_count: links.len() as i32,
            total_score,
        };

        let paper = self.store.insert_paper(&new_paper, &links).await?;
        tracing::info!(
            "Composed paper '{}' (#{}) with {} questions, total score {}",
            paper.name,
            paper.id,
            paper.question_count,
            paper.total_score
        );
        Ok(paper)
    }

    /// Paper with its questions grouped by type (choice, judge, text, other).
    pub async fn detail(&self, id: i64) -> Result<Paper, AppError> {
        let mut paper = self
            .store
            .find_paper(id)
            .await?
            .ok_or_else(|| AppError::not_found("paper", id))?;

        let mut questions = self.store.questions_for_paper(id).await?;
        if questions.is_empty() {
            tracing::warn!("Paper '{}' (#{}) has no questions", paper.name, id);
            paper.questions = Vec::new();
            return Ok(paper);
        }

        sort_by_type(&mut questions);
        fill_choices_and_answers(self.store.as_ref(), &mut questions).await?;
        paper.questions = questions;
        Ok(paper)
    }

    /// Newest first. Blank filters are ignored.
    pub async fn list(&self, params: &PaperListParams) -> Result<Vec<Paper>, AppError> {
        let name = params
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let status = match params.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(PaperStatus::parse(raw).ok_or_else(|| {
                AppError::BadRequest(format!("unknown paper status '{}'", raw))
            })?),
            None => None,
        };

        self.store.list_papers(name, status).await
    }

    /// Moves a paper to PUBLISHED or STOPPED.
    pub async fn update_status(&self, id: i64, status: &str) -> Result<(), AppError> {
        let target = match PaperStatus::parse(status) {
            Some(s @ (PaperStatus::Published | PaperStatus::Stopped)) => s,
            _ => {
                return Err(AppError::BadRequest(format!(
                    "paper status can only be set to PUBLISHED or STOPPED, got '{}'",
                    status
                )));
            }
        };

        let paper = self
            .store
            .find_paper(id)
            .await?
            .ok_or_else(|| AppError::not_found("paper", id))?;

        if target == PaperStatus::Published && paper.question_count == 0 {
            return Err(AppError::InvalidOperation(format!(
                "paper '{}' has no questions and cannot be published",
                paper.name
            )));
        }

        if !self.store.update_paper_status(id, target).await? {
            return Err(AppError::not_found("paper", id));
        }
        tracing::info!("Paper '{}' (#{}) is now {}", paper.name, id, target.as_str());
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let paper = self
            .store
            .find_paper(id)
            .await?
            .ok_or_else(|| AppError::not_found("paper", id))?;

        if paper.state() == Some(PaperStatus::Published) {
            return Err(AppError::InvalidOperation(format!(
                "paper '{}' is published and cannot be deleted",
                paper.name
            )));
        }

        if !self.store.delete_paper(id).await? {
            return Err(AppError::not_found("paper", id));
        }
        tracing::info!("Deleted paper '{}' (#{})", paper.name, id);
        Ok(())
    }
}

/// Stable: questions of the same type keep their link order.
fn sort_by_type(questions: &mut [Question]) {
    questions.sort_by_key(|q| q.kind().paper_rank());
}
