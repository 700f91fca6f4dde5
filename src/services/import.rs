// src/services/import.rs

//! Completeness checks for questions arriving in import shape
//! (AI generator output or spreadsheet rows).

use crate::models::{
    generation::QuestionImportRecord,
    question::QuestionType,
};

/// Largest number of choices a question can letter (A..Z).
pub const MAX_CHOICES: usize = 26;

/// Checks every record and returns one message per broken record,
/// numbered from 1 ("question 3: answer is required").
pub fn validate_import_records(records: &[QuestionImportRecord]) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| {
            check_record(record)
                .err()
                .map(|reason| format!("question {}: {}", idx + 1, reason))
        })
        .collect()
}

/// Returns the first problem found in a single record.
pub fn check_record(record: &QuestionImportRecord) -> Result<(), String> {
    if record.title.trim().is_empty() {
        return Err("title is required".to_string());
    }

    match QuestionType::parse(&record.question_type) {
        QuestionType::Choice => {
            if record.choices.len() < 2 {
                return Err("a choice question needs at least 2 choices".to_string());
            }
            if record.choices.len() > MAX_CHOICES {
                return Err(format!("a choice question allows at most {} choices", MAX_CHOICES));
            }
            if let Some(pos) = record.choices.iter().position(|c| c.content.trim().is_empty()) {
                return Err(format!("choice {} has no content", pos + 1));
            }
            if !record.choices.iter().any(|c| c.is_correct) {
                return Err("a choice question needs at least 1 correct choice".to_string());
            }
        }
        kind @ (QuestionType::Judge | QuestionType::Text) => {
            let answer = record.answer.as_deref().map(str::trim).unwrap_or_default();
            if answer.is_empty() {
                return Err("answer is required".to_string());
            }
            if kind == QuestionType::Judge
                && !answer.eq_ignore_ascii_case("TRUE")
                && !answer.eq_ignore_ascii_case("FALSE")
            {
                return Err(format!("judge answer must be TRUE or FALSE, got '{}'", answer));
            }
        }
        QuestionType::Other => {
            return Err(format!("unsupported question type '{}'", record.question_type));
        }
    }

    Ok(())
}
