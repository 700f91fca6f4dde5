// src/services/question.rs

use std::sync::Arc;

use validator::Validate;

use crate::{
    config::MAX_PAGE_SIZE,
    error::AppError,
    models::{
        generation::{ImportSummary, QuestionImportRecord},
        question::{
            ChoiceDraft, ChoiceRequest, PageResult, Question, QuestionDraft, QuestionFilter,
            QuestionRequest, QuestionType,
        },
    },
    services::{
        hydrate::fill_choices_and_answers,
        import::{MAX_CHOICES, check_record},
        popular::PopularityRecorder,
    },
    store::Store,
};

/// Default base score for imported questions that do not carry one.
const DEFAULT_IMPORT_SCORE: i32 = 5;

/// Owns question + choices + answer as one unit.
#[derive(Clone)]
pub struct QuestionService {
    store: Arc<dyn Store>,
    popularity: PopularityRecorder,
}

impl QuestionService {
    pub fn new(store: Arc<dyn Store>, popularity: PopularityRecorder) -> Self {
        Self { store, popularity }
    }

    pub async fn create(&self, req: QuestionRequest) -> Result<Question, AppError> {
        req.validate()?;
        let draft = build_draft(&req)?;

        if self
            .store
            .question_title_taken(Some(&draft.question_type), &draft.title, None)
            .await?
        {
            return Err(AppError::DuplicateName(format!(
                "a {} question titled '{}' already exists",
                draft.question_type, draft.title
            )));
        }

        let id = self.store.insert_question(&draft).await?;
        tracing::info!("Created {} question #{}: {}", draft.question_type, id, draft.title);
        self.load(id).await
    }

    /// Replaces the question row, all of its choices and its answer.
    pub async fn update(&self, id: i64, req: QuestionRequest) -> Result<Question, AppError> {
        req.validate()?;
        let draft = build_draft(&req)?;

        if self.store.find_question(id).await?.is_none() {
            return Err(AppError::not_found("question", id));
        }

        if self
            .store
            .question_title_taken(Some(&draft.question_type), &draft.title, Some(id))
            .await?
        {
            return Err(AppError::DuplicateName(format!(
                "another {} question titled '{}' already exists",
                draft.question_type, draft.title
            )));
        }

        if !self.store.replace_question(id, &draft).await? {
            return Err(AppError::not_found("question", id));
        }
        tracing::info!("Updated question #{}", id);
        self.load(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let question = self
            .store
            .find_question(id)
            .await?
            .ok_or_else(|| AppError::not_found("question", id))?;

        let links = self.store.count_paper_links(id).await?;
        if links > 0 {
            return Err(AppError::ReferencedEntity {
                message: format!(
                    "question '{}' is still used by {} paper entries",
                    question.title, links
                ),
                count: links,
            });
        }

        if !self.store.delete_question(id).await? {
            return Err(AppError::not_found("question", id));
        }
        tracing::info!("Deleted question #{}", id);
        Ok(())
    }

    /// Hydrated question. Every successful read also counts as a view.
    pub async fn detail(&self, id: i64) -> Result<Question, AppError> {
        let question = self.load(id).await?;
        self.popularity.record(id);
        Ok(question)
    }

    /// Newest first. `page` is 1-based; `size` is clamped to `1..=MAX_PAGE_SIZE`.
    pub async fn page(
        &self,
        filter: &QuestionFilter,
        page: i64,
        size: i64,
    ) -> Result<PageResult<Question>, AppError> {
        let page = page.max(1);
        let size = size.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) * size;

        let (mut records, total) = self
            .store
            .list_questions(&filter.normalized(), offset, size)
            .await?;
        fill_choices_and_answers(self.store.as_ref(), &mut records).await?;

        Ok(PageResult {
            records,
            total,
            page,
            size,
        })
    }

    /// Creates each record on its own; one bad record does not stop the batch.
    pub async fn import_records(
        &self,
        records: Vec<QuestionImportRecord>,
    ) -> Result<ImportSummary, AppError> {
        let total = records.len();
        let mut imported = 0;
        let mut failures = Vec::new();

        for (idx, record) in records.into_iter().enumerate() {
            let outcome = match check_record(&record) {
                Ok(()) => self.create(record.into()).await.map_err(|e| e.to_string()),
                Err(reason) => Err(reason),
            };
            match outcome {
                Ok(_) => imported += 1,
                Err(reason) => {
                    tracing::warn!("Import of question {} failed: {}", idx + 1, reason);
                    failures.push(format!("question {}: {}", idx + 1, reason));
                }
            }
        }

        tracing::info!("Imported {}/{} questions", imported, total);
        Ok(ImportSummary {
            total,
            imported,
            failures,
        })
    }

    async fn load(&self, id: i64) -> Result<Question, AppError> {
        let question = self
            .store
            .find_question(id)
            .await?
            .ok_or_else(|| AppError::not_found("question", id))?;

        let mut one = [question];
        fill_choices_and_answers(self.store.as_ref(), &mut one).await?;
        let [question] = one;
        Ok(question)
    }
}

/// Normalizes a request into the exact rows to write.
/// Choice positions become their `sort`; the caller's `sort` is ignored.
fn build_draft(req: &QuestionRequest) -> Result<QuestionDraft, AppError> {
    let kind = QuestionType::parse(&req.question_type);
    let (choices, answer) = match kind {
        QuestionType::Choice => {
            check_choices(&req.choices)?;
            let choices: Vec<ChoiceDraft> = req
                .choices
                .iter()
                .enumerate()
                .map(|(idx, c)| ChoiceDraft {
                    content: c.content.trim().to_string(),
                    is_correct: c.is_correct,
                    sort: idx as i32,
                })
                .collect();
            let answer = derive_choice_answer(&choices);
            (choices, answer)
        }
        QuestionType::Judge | QuestionType::Text => {
            let answer = req
                .answer
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .ok_or_else(|| {
                    AppError::BadRequest(format!("a {} question needs an answer", kind.as_str()))
                })?;
            let answer = if kind == QuestionType::Judge {
                let verdict = answer.to_ascii_uppercase();
                if verdict != "TRUE" && verdict != "FALSE" {
                    return Err(AppError::BadRequest(format!(
                        "a JUDGE answer must be TRUE or FALSE, got '{}'",
                        answer
                    )));
                }
                verdict
            } else {
                answer.to_string()
            };
            (Vec::new(), answer)
        }
        QuestionType::Other => {
            return Err(AppError::BadRequest(format!(
                "unsupported question type '{}'",
                req.question_type
            )));
        }
    };

    Ok(QuestionDraft {
        question_type: kind.as_str().to_string(),
        title: req.title.trim().to_string(),
        multi: kind == QuestionType::Choice && req.multi,
        difficulty: req.difficulty.trim().to_ascii_uppercase(),
        category_id: req.category_id,
        score: req.score,
        analysis: req.analysis.clone(),
        choices,
        answer,
    })
}

fn check_choices(choices: &[ChoiceRequest]) -> Result<(), AppError> {
    if choices.len() < 2 {
        return Err(AppError::BadRequest(
            "a choice question needs at least 2 choices".to_string(),
        ));
    }
    if choices.len() > MAX_CHOICES {
        return Err(AppError::BadRequest(format!(
            "a choice question allows at most {} choices",
            MAX_CHOICES
        )));
    }
    if !choices.iter().any(|c| c.is_correct) {
        return Err(AppError::BadRequest(
            "a choice question needs at least 1 correct choice".to_string(),
        ));
    }
    Ok(())
}

/// Comma-joined letters of the correct choices, `sort` 0 being 'A'.
pub fn derive_choice_answer(choices: &[ChoiceDraft]) -> String {
    choices
        .iter()
        .filter(|c| c.is_correct)
        .map(|c| char::from(b'A' + c.sort as u8).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl From<QuestionImportRecord> for QuestionRequest {
    fn from(record: QuestionImportRecord) -> Self {
        let mut choices = record.choices;
        // Records without a sort keep their position after the sorted ones.
        choices.sort_by_key(|c| c.sort.unwrap_or(i32::MAX));

        QuestionRequest {
            question_type: record.question_type,
            title: record.title,
            multi: record.multi,
            difficulty: record.difficulty.unwrap_or_else(|| "MEDIUM".to_string()),
            category_id: record.category_id,
            score: record.score.unwrap_or(DEFAULT_IMPORT_SCORE),
            analysis: record.analysis,
            choices: choices
                .into_iter()
                .map(|c| ChoiceRequest {
                    content: c.content,
                    is_correct: c.is_correct,
                    sort: c.sort,
                })
                .collect(),
            answer: record.answer,
        }
    }
}
