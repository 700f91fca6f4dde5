// src/services/hydrate.rs

use std::collections::HashMap;

use crate::{
    error::AppError,
    models::question::{Question, QuestionAnswer, QuestionChoice, QuestionType},
    store::QuestionStore,
};

/// Attaches answers (all questions) and choices (CHOICE questions, sorted by
/// `sort`) using exactly two range queries, whatever the list size.
pub async fn fill_choices_and_answers<S>(store: &S, questions: &mut [Question]) -> Result<(), AppError>
where
    S: QuestionStore + ?Sized,
{
    if questions.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
    let choices = store.choices_for(&ids).await?;
    let answers = store.answers_for(&ids).await?;

    attach(questions, choices, answers);
    Ok(())
}

fn attach(questions: &mut [Question], choices: Vec<QuestionChoice>, answers: Vec<QuestionAnswer>) {
    let mut choice_map: HashMap<i64, Vec<QuestionChoice>> = HashMap::new();
    for choice in choices {
        choice_map.entry(choice.question_id).or_default().push(choice);
    }
    let answer_map: HashMap<i64, QuestionAnswer> =
        answers.into_iter().map(|a| (a.question_id, a)).collect();

    for question in questions.iter_mut() {
        // Cloned, not moved: the same id may occur more than once in the list.
        question.answer = answer_map.get(&question.id).cloned();
        if question.kind() == QuestionType::Choice {
            let mut own = choice_map.get(&question.id).cloned().unwrap_or_default();
            own.sort_by_key(|c| c.sort);
            question.choices = own;
        }
    }
}
