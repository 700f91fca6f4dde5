// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    models::{
        category::Category,
        paper::{NewPaper, Paper, PaperStatus},
        question::{Question, QuestionAnswer, QuestionChoice, QuestionDraft, QuestionFilter},
    },
    store::{CategoryStore, PaperStore, QuestionStore},
};

const CATEGORY_COLUMNS: &str = "id, name, parent_id, sort, created_at";
const QUESTION_COLUMNS: &str =
    "id, type, title, multi, difficulty, category_id, score, analysis, created_at, updated_at";
const PAPER_COLUMNS: &str =
    "id, name, description, status, duration, question_count, total_score, created_at";

/// Postgres-backed persistence gateway.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Row shape of the paper -> questions join.
#[derive(FromRow)]
struct LinkedQuestionRow {
    #[sqlx(flatten)]
    question: Question,
    paper_score: Decimal,
}

/// Wraps a keyword for `ILIKE` substring matching. `%`, `_` and `\` match literally.
fn like_pattern(keyword: Option<&str>) -> Option<String> {
    keyword.map(|k| {
        let escaped = k
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    })
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories ORDER BY sort ASC, id ASC",
            CATEGORY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn find_category(&self, id: i64) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE id = $1",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn category_name_taken(
        &self,
        parent_id: i64,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM categories
                WHERE parent_id = $1
                  AND name = $2
                  AND ($3::BIGINT IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(parent_id)
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn count_child_categories(&self, parent_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories WHERE parent_id = $1")
            .bind(parent_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_category(&self, parent_id: i64, name: &str, sort: i32) -> Result<Category, AppError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (name, parent_id, sort) VALUES ($1, $2, $3) RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(name)
        .bind(parent_id)
        .bind(sort)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update_category(&self, id: i64, name: &str, sort: i32) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE categories SET name = $1, sort = $2 WHERE id = $3")
            .bind(name)
            .bind(sort)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_category(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {} FROM questions WHERE id = $1",
            QUESTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn question_title_taken(
        &self,
        question_type: Option<&str>,
        title: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM questions
                WHERE title = $1
                  AND ($2::TEXT IS NULL OR type = $2)
                  AND ($3::BIGINT IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(title)
        .bind(question_type)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn question_counts_by_category(&self) -> Result<HashMap<i64, i64>, AppError> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT category_id, COUNT(*) FROM questions GROUP BY category_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn count_questions_in_category(&self, category_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions WHERE category_id = $1")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Question>, i64), AppError> {
        // Unified query handling optional filters
        const WHERE_CLAUSE: &str = r#"
            WHERE ($1::BIGINT IS NULL OR category_id = $1)
              AND ($2::TEXT IS NULL OR difficulty = $2)
              AND ($3::TEXT IS NULL OR type = $3)
              AND ($4::TEXT IS NULL OR title ILIKE $4 ESCAPE '\')
        "#;
        let pattern = like_pattern(filter.keyword.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM questions {}", WHERE_CLAUSE))
            .bind(filter.category_id)
            .bind(filter.difficulty.as_deref())
            .bind(filter.question_type.as_deref())
            .bind(pattern.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let records = sqlx::query_as::<_, Question>(&format!(
            "SELECT {} FROM questions {} ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6",
            QUESTION_COLUMNS, WHERE_CLAUSE
        ))
        .bind(filter.category_id)
        .bind(filter.difficulty.as_deref())
        .bind(filter.question_type.as_deref())
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((records, total))
    }

    async fn recent_questions_excluding(
        &self,
        exclude: &[i64],
        limit: i64,
    ) -> Result<Vec<Question>, AppError> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {} FROM questions WHERE id <> ALL($1) ORDER BY created_at DESC, id DESC LIMIT $2",
            QUESTION_COLUMNS
        ))
        .bind(exclude)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn choices_for(&self, question_ids: &[i64]) -> Result<Vec<QuestionChoice>, AppError> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Use QueryBuilder for dynamic IN clause
        let mut query_builder = QueryBuilder::<Postgres>::new(
            "SELECT id, question_id, content, is_correct, sort FROM question_choices WHERE question_id IN (",
        );
        let mut separated = query_builder.separated(",");
        for id in question_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let choices = query_builder
            .build_query_as::<QuestionChoice>()
            .fetch_all(&self.pool)
            .await?;
        Ok(choices)
    }

    async fn answers_for(&self, question_ids: &[i64]) -> Result<Vec<QuestionAnswer>, AppError> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder = QueryBuilder::<Postgres>::new(
            "SELECT id, question_id, answer FROM question_answers WHERE question_id IN (",
        );
        let mut separated = query_builder.separated(",");
        for id in question_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let answers = query_builder
            .build_query_as::<QuestionAnswer>()
            .fetch_all(&self.pool)
            .await?;
        Ok(answers)
    }

    async fn insert_question(&self, draft: &QuestionDraft) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO questions
            (type, title, multi, difficulty, category_id, score, analysis)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&draft.question_type)
        .bind(&draft.title)
        .bind(draft.multi)
        .bind(&draft.difficulty)
        .bind(draft.category_id)
        .bind(draft.score)
        .bind(&draft.analysis)
        .fetch_one(&mut *tx)
        .await?;

        for choice in &draft.choices {
            sqlx::query(
                "INSERT INTO question_choices (question_id, content, is_correct, sort) VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(&choice.content)
            .bind(choice.is_correct)
            .bind(choice.sort)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("INSERT INTO question_answers (question_id, answer) VALUES ($1, $2)")
            .bind(id)
            .bind(&draft.answer)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn replace_question(&self, id: i64, draft: &QuestionDraft) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE questions SET
                type = $1, title = $2, multi = $3, difficulty = $4,
                category_id = $5, score = $6, analysis = $7, updated_at = NOW()
            WHERE id = $8
            "#,
        )
        .bind(&draft.question_type)
        .bind(&draft.title)
        .bind(draft.multi)
        .bind(&draft.difficulty)
        .bind(draft.category_id)
        .bind(draft.score)
        .bind(&draft.analysis)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Ok(false);
        }

        sqlx::query("DELETE FROM question_choices WHERE question_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for choice in &draft.choices {
            sqlx::query(
                "INSERT INTO question_choices (question_id, content, is_correct, sort) VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(&choice.content)
            .bind(choice.is_correct)
            .bind(choice.sort)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO question_answers (question_id, answer)
            VALUES ($1, $2)
            ON CONFLICT (question_id) DO UPDATE SET answer = EXCLUDED.answer
            "#,
        )
        .bind(id)
        .bind(&draft.answer)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_question(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM question_choices WHERE question_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM question_answers WHERE question_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl PaperStore for PgStore {
    async fn insert_paper(&self, paper: &NewPaper, links: &[(i64, Decimal)]) -> Result<Paper, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Paper>(&format!(
            r#"
            INSERT INTO papers (name, description, status, duration, question_count, total_score)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PAPER_COLUMNS
        ))
        .bind(&paper.name)
        .bind(&paper.description)
        .bind(paper.status.as_str())
        .bind(paper.duration)
        .bind(paper.question_count)
        .bind(paper.total_score)
        .fetch_one(&mut *tx)
        .await?;

        if !links.is_empty() {
            let mut builder =
                QueryBuilder::<Postgres>::new("INSERT INTO paper_questions (paper_id, question_id, score) ");
            builder.push_values(links, |mut row, (question_id, score)| {
                row.push_bind(created.id)
                    .push_bind(*question_id)
                    .push_bind(*score);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn find_paper(&self, id: i64) -> Result<Option<Paper>, AppError> {
        let paper = sqlx::query_as::<_, Paper>(&format!("SELECT {} FROM papers WHERE id = $1", PAPER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(paper)
    }

    async fn list_papers(
        &self,
        name_keyword: Option<&str>,
        status: Option<PaperStatus>,
    ) -> Result<Vec<Paper>, AppError> {
        let pattern = like_pattern(name_keyword);
        let papers = sqlx::query_as::<_, Paper>(&format!(
            r#"
            SELECT {} FROM papers
            WHERE ($1::TEXT IS NULL OR name ILIKE $1 ESCAPE '\')
              AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            "#,
            PAPER_COLUMNS
        ))
        .bind(pattern.as_deref())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(papers)
    }

    async fn update_paper_status(&self, id: i64, status: PaperStatus) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE papers SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_paper(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM paper_questions WHERE paper_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM papers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn questions_for_paper(&self, paper_id: i64) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query_as::<_, LinkedQuestionRow>(
            r#"
            SELECT
                q.id, q.type, q.title, q.multi, q.difficulty, q.category_id,
                q.score, q.analysis, q.created_at, q.updated_at,
                pq.score AS paper_score
            FROM paper_questions pq
            JOIN questions q ON q.id = pq.question_id
            WHERE pq.paper_id = $1
            ORDER BY pq.id ASC
            "#,
        )
        .bind(paper_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut question = row.question;
                question.paper_score = Some(row.paper_score);
                question
            })
            .collect())
    }

    async fn count_paper_links(&self, question_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM paper_questions WHERE question_id = $1")
            .bind(question_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
