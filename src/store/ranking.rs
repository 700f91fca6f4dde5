// src/store/ranking.rs

//! Ranking cache: score-ordered members under a key (sorted-set semantics).

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tokio::sync::Mutex;

use crate::error::AppError;

/// A member of a ranking with its current score.
#[derive(Debug, Clone, Copy, PartialEq, FromRow)]
pub struct RankedMember {
    pub member: i64,
    pub score: f64,
}

#[async_trait]
pub trait RankingCache: Send + Sync {
    /// Atomically adds `delta` to the member's score (creating it at 0) and returns the new score.
    async fn increment_score(&self, key: &str, member: i64, delta: f64) -> Result<f64, AppError>;

    /// Up to `k` members with the highest scores, highest first.
    async fn top_with_scores(&self, key: &str, k: usize) -> Result<Vec<RankedMember>, AppError>;
}

/// Ranking kept in the `question_rankings` table.
/// Increments are single upsert statements, so concurrent bumps never lose updates.
#[derive(Clone)]
pub struct PgRanking {
    pool: PgPool,
}

impl PgRanking {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RankingCache for PgRanking {
    async fn increment_score(&self, key: &str, member: i64, delta: f64) -> Result<f64, AppError> {
        let score = sqlx::query_scalar::<_, f64>(
            r#"
            INSERT INTO question_rankings (rank_key, member, score)
            VALUES ($1, $2, $3)
            ON CONFLICT (rank_key, member) DO UPDATE SET
                score = question_rankings.score + EXCLUDED.score
            RETURNING score
            "#,
        )
        .bind(key)
        .bind(member)
        .bind(delta)
        .fetch_one(&self.pool)
        .await?;
        Ok(score)
    }

    async fn top_with_scores(&self, key: &str, k: usize) -> Result<Vec<RankedMember>, AppError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let members = sqlx::query_as::<_, RankedMember>(
            r#"
            SELECT member, score
            FROM question_rankings
            WHERE rank_key = $1
            ORDER BY score DESC, member ASC
            LIMIT $2
            "#,
        )
        .bind(key)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }
}

/// In-process ranking used by tests and local runs.
#[derive(Default)]
pub struct MemoryRanking {
    sets: Mutex<HashMap<String, HashMap<i64, f64>>>,
}

impl MemoryRanking {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RankingCache for MemoryRanking {
    async fn increment_score(&self, key: &str, member: i64, delta: f64) -> Result<f64, AppError> {
        let mut sets = self.sets.lock().await;
        let score = sets
            .entry(key.to_string())
            .or_default()
            .entry(member)
            .or_insert(0.0);
        *score += delta;
        Ok(*score)
    }

    async fn top_with_scores(&self, key: &str, k: usize) -> Result<Vec<RankedMember>, AppError> {
        let sets = self.sets.lock().await;
        let mut members: Vec<RankedMember> = sets
            .get(key)
            .map(|set| {
                set.iter()
                    .map(|(member, score)| RankedMember {
                        member: *member,
                        score: *score,
                    })
                    .collect()
            })
            .unwrap_or_default();
        members.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.member.cmp(&b.member)));
        members.truncate(k);
        Ok(members)
    }
}
