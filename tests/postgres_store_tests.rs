// tests/postgres_store_tests.rs

//! Round trips against a live Postgres. Run with
//! `DATABASE_URL=... cargo test --test postgres_store_tests -- --ignored`.

use std::collections::BTreeMap;
use std::sync::Arc;

use exam_bank::{
    config::{Config, POPULAR_QUESTIONS_KEY},
    error::AppError,
    models::{
        category::{CreateCategoryRequest, ROOT_PARENT_ID},
        paper::ComposePaperRequest,
        question::{ChoiceRequest, QuestionFilter, QuestionRequest},
    },
    state::AppState,
    store::{PaperStore, PgStore, QuestionStore, ranking::PgRanking, ranking::RankingCache},
};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;

struct UnreachableClient;

#[async_trait::async_trait]
impl exam_bank::clients::completion::CompletionClient for UnreachableClient {
    async fn complete(
        &self,
        _request: &exam_bank::clients::completion::CompletionRequest,
    ) -> Result<String, AppError> {
        Err(AppError::Upstream("no AI endpoint in store tests".to_string()))
    }
}

async fn spawn_app() -> (AppState, Arc<PgStore>, Arc<PgRanking>) {
    // Note: For Postgres, you must have a running database.
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url,
        rust_log: "error".to_string(),
        log_dir: "logs".to_string(),
        ai: Default::default(),
    };

    let store = Arc::new(PgStore::new(pool.clone()));
    let ranking = Arc::new(PgRanking::new(pool));
    let state = AppState::new(config, store.clone(), ranking.clone(), Arc::new(UnreachableClient));
    (state, store, ranking)
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

fn capital_question(title: &str, category_id: i64, choices: &[(&str, bool)]) -> QuestionRequest {
    QuestionRequest {
        question_type: "CHOICE".to_string(),
        title: title.to_string(),
        multi: false,
        difficulty: "EASY".to_string(),
        category_id,
        score: 5,
        analysis: None,
        choices: choices
            .iter()
            .map(|(content, is_correct)| ChoiceRequest {
                content: content.to_string(),
                is_correct: *is_correct,
                sort: None,
            })
            .collect(),
        answer: None,
    }
}

#[tokio::test]
#[ignore]
async fn unique_constraint_maps_to_duplicate_name() {
    let (state, store, _) = spawn_app().await;
    let name = unique("cat");
    state
        .categories
        .add_category(CreateCategoryRequest { name: name.clone(), parent_id: ROOT_PARENT_ID, sort: 0 })
        .await
        .unwrap();

    // Bypass the service check to hit the table constraint directly
    let raced = exam_bank::store::CategoryStore::insert_category(store.as_ref(), ROOT_PARENT_ID, &name, 0).await;

    assert!(matches!(raced, Err(AppError::DuplicateName(_))));
}

#[tokio::test]
#[ignore]
async fn question_lifecycle_round_trip() {
    // Arrange
    let (state, store, _) = spawn_app().await;
    let category = state
        .categories
        .add_category(CreateCategoryRequest { name: unique("geo"), parent_id: ROOT_PARENT_ID, sort: 0 })
        .await
        .unwrap();
    let title = unique("capital");

    // Act: create, update, delete
    let created = state
        .questions
        .create(capital_question(
            &title,
            category.id,
            &[("Paris", false), ("London", false), ("Berlin", true), ("Rome", false)],
        ))
        .await
        .unwrap();
    assert_eq!(created.answer.as_ref().unwrap().answer, "C");

    let updated = state
        .questions
        .update(created.id, capital_question(&title, category.id, &[("X", true), ("Y", false)]))
        .await
        .unwrap();
    assert_eq!(updated.answer.as_ref().unwrap().answer, "A");
    assert_eq!(store.choices_for(&[created.id]).await.unwrap().len(), 2);

    let paper = state
        .papers
        .compose_manual(ComposePaperRequest {
            name: unique("paper"),
            questions: BTreeMap::from([(created.id, Decimal::new(45, 1))]),
            ..Default::default()
        })
        .await
        .unwrap();
    let detail = state.papers.detail(paper.id).await.unwrap();
    assert_eq!(detail.questions[0].paper_score, Some(Decimal::new(45, 1)));

    let blocked = state.questions.delete(created.id).await;
    assert!(matches!(blocked, Err(AppError::ReferencedEntity { count: 1, .. })));

    state.papers.delete(paper.id).await.unwrap();
    assert_eq!(store.count_paper_links(created.id).await.unwrap(), 0);
    state.questions.delete(created.id).await.unwrap();

    // Assert
    assert!(store.choices_for(&[created.id]).await.unwrap().is_empty());
    assert!(store.answers_for(&[created.id]).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn ranking_increments_accumulate() {
    let (_, _, ranking) = spawn_app().await;
    let key = unique(POPULAR_QUESTIONS_KEY);

    ranking.increment_score(&key, 1, 1.0).await.unwrap();
    ranking.increment_score(&key, 2, 1.0).await.unwrap();
    let score = ranking.increment_score(&key, 2, 1.0).await.unwrap();

    assert_eq!(score, 2.0);
    let top = ranking.top_with_scores(&key, 5).await.unwrap();
    let members: Vec<i64> = top.iter().map(|m| m.member).collect();
    assert_eq!(members, vec![2, 1]);
}

#[tokio::test]
#[ignore]
async fn keyword_wildcards_match_literally() {
    let (state, _, _) = spawn_app().await;
    let category = state
        .categories
        .add_category(CreateCategoryRequest { name: unique("kw"), parent_id: ROOT_PARENT_ID, sort: 0 })
        .await
        .unwrap();
    let marker = unique("mark");
    state
        .questions
        .create(capital_question(&format!("{} 100% timber", marker), category.id, &[("a", true), ("b", false)]))
        .await
        .unwrap();
    state
        .questions
        .create(capital_question(&format!("{} 100 timber", marker), category.id, &[("a", true), ("b", false)]))
        .await
        .unwrap();

    let filter = QuestionFilter {
        category_id: Some(category.id),
        keyword: Some("100%".to_string()),
        ..Default::default()
    };
    let page = state.questions.page(&filter, 1, 10).await.unwrap();

    assert_eq!(page.total, 1);
    assert!(page.records[0].title.contains("100%"));
}
