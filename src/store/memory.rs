// src/store/memory.rs

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::{
    error::AppError,
    models::{
        category::Category,
        paper::{NewPaper, Paper, PaperQuestion, PaperStatus},
        question::{Question, QuestionAnswer, QuestionChoice, QuestionDraft, QuestionFilter},
    },
    store::{CategoryStore, PaperStore, QuestionStore},
};

/// In-process gateway with the same semantics as `PgStore`, including the
/// unique `(parent_id, name)` and `(type, title)` constraints.
/// Each method holds the lock for its whole unit of work, so multi-row writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    last_id: i64,
    categories: BTreeMap<i64, Category>,
    questions: BTreeMap<i64, Question>,
    choices: Vec<QuestionChoice>,
    answers: Vec<QuestionAnswer>,
    papers: BTreeMap<i64, Paper>,
    links: Vec<PaperQuestion>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn push_choices(&mut self, question_id: i64, draft: &QuestionDraft) {
        for choice in &draft.choices {
            let id = self.next_id();
            self.choices.push(QuestionChoice {
                id,
                question_id,
                content: choice.content.clone(),
                is_correct: choice.is_correct,
                sort: choice.sort,
            });
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(a: &Question, b: &Question) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

fn matches_filter(question: &Question, filter: &QuestionFilter) -> bool {
    filter.category_id.is_none_or(|id| question.category_id == id)
        && filter
            .difficulty
            .as_deref()
            .is_none_or(|d| question.difficulty == d)
        && filter
            .question_type
            .as_deref()
            .is_none_or(|t| question.question_type == t)
        && filter.keyword.as_deref().is_none_or(|k| {
            question.title.to_lowercase().contains(&k.to_lowercase())
        })
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let tables = self.tables.lock().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.sort.cmp(&b.sort).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn find_category(&self, id: i64) -> Result<Option<Category>, AppError> {
        Ok(self.tables.lock().await.categories.get(&id).cloned())
    }

    async fn category_name_taken(
        &self,
        parent_id: i64,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .categories
            .values()
            .any(|c| c.parent_id == parent_id && c.name == name && Some(c.id) != exclude_id))
    }

    async fn count_child_categories(&self, parent_id: i64) -> Result<i64, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.categories.values().filter(|c| c.parent_id == parent_id).count() as i64)
    }

    async fn insert_category(&self, parent_id: i64, name: &str, sort: i32) -> Result<Category, AppError> {
        let mut tables = self.tables.lock().await;
        if tables
            .categories
            .values()
            .any(|c| c.parent_id == parent_id && c.name == name)
        {
            return Err(AppError::DuplicateName(format!(
                "unique constraint (parent_id, name) violated for '{}'",
                name
            )));
        }

        let category = Category {
            id: tables.next_id(),
            name: name.to_string(),
            parent_id,
            sort,
            created_at: Some(Utc::now()),
            count: 0,
            children: Vec::new(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, name: &str, sort: i32) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        match tables.categories.get_mut(&id) {
            Some(category) => {
                category.name = name.to_string();
                category.sort = sort;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_category(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.tables.lock().await.categories.remove(&id).is_some())
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        Ok(self.tables.lock().await.questions.get(&id).cloned())
    }

    async fn question_title_taken(
        &self,
        question_type: Option<&str>,
        title: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.questions.values().any(|q| {
            q.title == title
                && question_type.is_none_or(|t| q.question_type == t)
                && Some(q.id) != exclude_id
        }))
    }

    async fn question_counts_by_category(&self) -> Result<HashMap<i64, i64>, AppError> {
        let tables = self.tables.lock().await;
        let mut counts = HashMap::new();
        for question in tables.questions.values() {
            *counts.entry(question.category_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count_questions_in_category(&self, category_id: i64) -> Result<i64, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .questions
            .values()
            .filter(|q| q.category_id == category_id)
            .count() as i64)
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Question>, i64), AppError> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<Question> = tables
            .questions
            .values()
            .filter(|q| matches_filter(q, filter))
            .cloned()
            .collect();
        matching.sort_by(newest_first);

        let total = matching.len() as i64;
        let records = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((records, total))
    }

    async fn recent_questions_excluding(
        &self,
        exclude: &[i64],
        limit: i64,
    ) -> Result<Vec<Question>, AppError> {
        let excluded: HashSet<i64> = exclude.iter().copied().collect();
        let tables = self.tables.lock().await;
        let mut candidates: Vec<Question> = tables
            .questions
            .values()
            .filter(|q| !excluded.contains(&q.id))
            .cloned()
            .collect();
        candidates.sort_by(newest_first);
        candidates.truncate(limit.max(0) as usize);
        Ok(candidates)
    }

    async fn choices_for(&self, question_ids: &[i64]) -> Result<Vec<QuestionChoice>, AppError> {
        let wanted: HashSet<i64> = question_ids.iter().copied().collect();
        let tables = self.tables.lock().await;
        Ok(tables
            .choices
            .iter()
            .filter(|c| wanted.contains(&c.question_id))
            .cloned()
            .collect())
    }

    async fn answers_for(&self, question_ids: &[i64]) -> Result<Vec<QuestionAnswer>, AppError> {
        let wanted: HashSet<i64> = question_ids.iter().copied().collect();
        let tables = self.tables.lock().await;
        Ok(tables
            .answers
            .iter()
            .filter(|a| wanted.contains(&a.question_id))
            .cloned()
            .collect())
    }

    async fn insert_question(&self, draft: &QuestionDraft) -> Result<i64, AppError> {
        let mut tables = self.tables.lock().await;
        if tables
            .questions
            .values()
            .any(|q| q.question_type == draft.question_type && q.title == draft.title)
        {
            return Err(AppError::DuplicateName(format!(
                "unique constraint (type, title) violated for '{}'",
                draft.title
            )));
        }

        let id = tables.next_id();
        let now = Utc::now();
        tables.questions.insert(
            id,
            Question {
                id,
                question_type: draft.question_type.clone(),
                title: draft.title.clone(),
                multi: draft.multi,
                difficulty: draft.difficulty.clone(),
                category_id: draft.category_id,
                score: draft.score,
                analysis: draft.analysis.clone(),
                created_at: Some(now),
                updated_at: Some(now),
                choices: Vec::new(),
                answer: None,
                paper_score: None,
            },
        );
        tables.push_choices(id, draft);
        let answer_id = tables.next_id();
        tables.answers.push(QuestionAnswer {
            id: answer_id,
            question_id: id,
            answer: draft.answer.clone(),
        });
        Ok(id)
    }

    async fn replace_question(&self, id: i64, draft: &QuestionDraft) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.questions.values().any(|q| {
            q.id != id && q.question_type == draft.question_type && q.title == draft.title
        }) {
            return Err(AppError::DuplicateName(format!(
                "unique constraint (type, title) violated for '{}'",
                draft.title
            )));
        }

        match tables.questions.get_mut(&id) {
            Some(question) => {
                question.question_type = draft.question_type.clone();
                question.title = draft.title.clone();
                question.multi = draft.multi;
                question.difficulty = draft.difficulty.clone();
                question.category_id = draft.category_id;
                question.score = draft.score;
                question.analysis = draft.analysis.clone();
                question.updated_at = Some(Utc::now());
            }
            None => return Ok(false),
        }

        tables.choices.retain(|c| c.question_id != id);
        tables.push_choices(id, draft);

        match tables.answers.iter().position(|a| a.question_id == id) {
            Some(index) => tables.answers[index].answer = draft.answer.clone(),
            None => {
                let answer_id = tables.next_id();
                tables.answers.push(QuestionAnswer {
                    id: answer_id,
                    question_id: id,
                    answer: draft.answer.clone(),
                });
            }
        }
        Ok(true)
    }

    async fn delete_question(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.questions.remove(&id).is_none() {
            return Ok(false);
        }
        tables.choices.retain(|c| c.question_id != id);
        tables.answers.retain(|a| a.question_id != id);
        Ok(true)
    }
}

#[async_trait]
impl PaperStore for MemoryStore {
    async fn insert_paper(&self, paper: &NewPaper, links: &[(i64, Decimal)]) -> Result<Paper, AppError> {
        let mut tables = self.tables.lock().await;
        let created = Paper {
            id: tables.next_id(),
            name: paper.name.clone(),
            description: paper.description.clone(),
            status: paper.status.as_str().to_string(),
            duration: paper.duration,
            question_count: paper.question_count,
            total_score: paper.total_score,
            created_at: Some(Utc::now()),
            questions: Vec::new(),
        };
        tables.papers.insert(created.id, created.clone());

        for (question_id, score) in links {
            let id = tables.next_id();
            tables.links.push(PaperQuestion {
                id,
                paper_id: created.id,
                question_id: *question_id,
                score: *score,
            });
        }
        Ok(created)
    }

    async fn find_paper(&self, id: i64) -> Result<Option<Paper>, AppError> {
        Ok(self.tables.lock().await.papers.get(&id).cloned())
    }

    async fn list_papers(
        &self,
        name_keyword: Option<&str>,
        status: Option<PaperStatus>,
    ) -> Result<Vec<Paper>, AppError> {
        let tables = self.tables.lock().await;
        let mut papers: Vec<Paper> = tables
            .papers
            .values()
            .filter(|p| {
                name_keyword.is_none_or(|k| p.name.to_lowercase().contains(&k.to_lowercase()))
                    && status.is_none_or(|s| p.status == s.as_str())
            })
            .cloned()
            .collect();
        papers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(papers)
    }

    async fn update_paper_status(&self, id: i64, status: PaperStatus) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        match tables.papers.get_mut(&id) {
            Some(paper) => {
                paper.status = status.as_str().to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_paper(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.papers.remove(&id).is_none() {
            return Ok(false);
        }
        tables.links.retain(|l| l.paper_id != id);
        Ok(true)
    }

    async fn questions_for_paper(&self, paper_id: i64) -> Result<Vec<Question>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .links
            .iter()
            .filter(|l| l.paper_id == paper_id)
            .filter_map(|l| {
                tables.questions.get(&l.question_id).map(|q| {
                    let mut question = q.clone();
                    question.paper_score = Some(l.score);
                    question
                })
            })
            .collect())
    }

    async fn count_paper_links(&self, question_id: i64) -> Result<i64, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.links.iter().filter(|l| l.question_id == question_id).count() as i64)
    }
}
