// src/services/popular.rs

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    config::POPULAR_QUESTIONS_KEY,
    error::AppError,
    models::question::Question,
    services::hydrate::fill_choices_and_answers,
    store::{Store, ranking::RankingCache},
};

/// Counts question views in the ranking cache without holding up the reader.
#[derive(Clone)]
pub struct PopularityRecorder {
    ranking: Arc<dyn RankingCache>,
}

impl PopularityRecorder {
    pub fn new(ranking: Arc<dyn RankingCache>) -> Self {
        Self { ranking }
    }

    /// Spawns a +1 increment for `question_id`. Failures are logged and never
    /// reach the caller; the handle is only useful to tests that want to wait.
    pub fn record(&self, question_id: i64) -> JoinHandle<()> {
        let ranking = Arc::clone(&self.ranking);
        tokio::spawn(async move {
            match ranking
                .increment_score(POPULAR_QUESTIONS_KEY, question_id, 1.0)
                .await
            {
                Ok(score) => {
                    tracing::debug!("Question {} popularity is now {}", question_id, score)
                }
                Err(e) => {
                    tracing::error!("Failed to bump popularity of question {}: {}", question_id, e)
                }
            }
        })
    }
}

/// Hot-question list: ranked ids from the cache, topped up with the newest questions.
#[derive(Clone)]
pub struct HotQuestionResolver {
    store: Arc<dyn Store>,
    ranking: Arc<dyn RankingCache>,
}

impl HotQuestionResolver {
    pub fn new(store: Arc<dyn Store>, ranking: Arc<dyn RankingCache>) -> Self {
        Self { store, ranking }
    }

    /// Exactly `n` hydrated questions when the bank has that many, otherwise all of them.
    ///
    /// Ranked questions come first (highest score first), followed by the newest
    /// questions that were not in the ranking. Ids that no longer resolve are skipped.
    pub async fn top_n(&self, n: usize) -> Result<Vec<Question>, AppError> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut ranked = match self.ranking.top_with_scores(POPULAR_QUESTIONS_KEY, n).await {
            Ok(ranked) => ranked,
            Err(e) => {
                tracing::warn!("Ranking cache unavailable, serving newest questions only: {}", e);
                Vec::new()
            }
        };
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        let cached_ids: Vec<i64> = ranked.iter().map(|r| r.member).collect();
        let mut questions = Vec::with_capacity(n);
        for entry in &ranked {
            match self.store.find_question(entry.member).await? {
                Some(question) => questions.push(question),
                None => tracing::warn!(
                    "Ranking references question {} which no longer exists, skipping",
                    entry.member
                ),
            }
        }

        if questions.len() < n {
            let missing = (n - questions.len()) as i64;
            let fallback = self
                .store
                .recent_questions_excluding(&cached_ids, missing)
                .await?;
            tracing::debug!(
                "Hot list: {} from ranking, {} from newest",
                questions.len(),
                fallback.len()
            );
            questions.extend(fallback);
        }

        fill_choices_and_answers(self.store.as_ref(), &mut questions).await?;
        Ok(questions)
    }
}
