// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use exam_bank::{
    clients::completion::{CompletionClient, CompletionRequest},
    config::{AiConfig, Config},
    error::AppError,
    models::{
        category::{Category, CreateCategoryRequest},
        question::{ChoiceRequest, Question, QuestionRequest},
    },
    state::AppState,
    store::{
        MemoryStore,
        ranking::{MemoryRanking, RankedMember, RankingCache},
    },
};

/// Completion client that replays queued replies and records every prompt it sees.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, AppError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Result<String, AppError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Upstream("no scripted reply left".to_string())))
    }
}

/// Ranking cache whose backend is down: every call fails and is counted.
#[derive(Default)]
pub struct OfflineRanking {
    calls: AtomicUsize,
}

impl OfflineRanking {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RankingCache for OfflineRanking {
    async fn increment_score(&self, _key: &str, _member: i64, _delta: f64) -> Result<f64, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Upstream("ranking backend is offline".to_string()))
    }

    async fn top_with_scores(&self, _key: &str, _k: usize) -> Result<Vec<RankedMember>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Upstream("ranking backend is offline".to_string()))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub ranking: Arc<MemoryRanking>,
    pub client: Arc<ScriptedClient>,
}

/// App over in-memory backends with no scripted AI replies.
pub fn spawn_app() -> TestApp {
    spawn_app_with_replies(Vec::new())
}

pub fn spawn_app_with_replies(replies: Vec<Result<String, AppError>>) -> TestApp {
    let config = Config {
        database_url: String::new(),
        rust_log: "error".to_string(),
        log_dir: "logs".to_string(),
        ai: AiConfig {
            retry_delay: Duration::from_millis(1),
            ..AiConfig::default()
        },
    };

    let store = Arc::new(MemoryStore::new());
    let ranking = Arc::new(MemoryRanking::new());
    let client = Arc::new(ScriptedClient::new(replies));
    let state = AppState::new(config, store.clone(), ranking.clone(), client.clone());

    TestApp {
        state,
        store,
        ranking,
        client,
    }
}

/// App whose ranking cache fails on every call.
pub fn spawn_app_with_offline_ranking() -> (AppState, Arc<OfflineRanking>) {
    let config = Config {
        database_url: String::new(),
        rust_log: "error".to_string(),
        log_dir: "logs".to_string(),
        ai: AiConfig::default(),
    };

    let ranking = Arc::new(OfflineRanking::default());
    let state = AppState::new(
        config,
        Arc::new(MemoryStore::new()),
        ranking.clone(),
        Arc::new(ScriptedClient::default()),
    );
    (state, ranking)
}

/// Chat-completions envelope carrying `content`.
pub fn envelope(content: &str) -> String {
    serde_json::json!({
        "id": "cmpl-test",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}}
        ]
    })
    .to_string()
}

pub async fn add_category(app: &TestApp, name: &str, parent_id: i64) -> Category {
    app.state
        .categories
        .add_category(CreateCategoryRequest {
            name: name.to_string(),
            parent_id,
            sort: 0,
        })
        .await
        .expect("Failed to add category")
}

pub fn choice_request(title: &str, category_id: i64, choices: &[(&str, bool)]) -> QuestionRequest {
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

pub fn answered_request(kind: &str, title: &str, category_id: i64, answer: &str) -> QuestionRequest {
    QuestionRequest {
        question_type: kind.to_string(),
        title: title.to_string(),
        multi: false,
        difficulty: "MEDIUM".to_string(),
        category_id,
        score: 2,
        analysis: Some("analysis".to_string()),
        choices: Vec::new(),
        answer: Some(answer.to_string()),
    }
}

/// Creates a TEXT question with the given title.
pub async fn add_text_question(app: &TestApp, title: &str, category_id: i64) -> Question {
    app.state
        .questions
        .create(answered_request("TEXT", title, category_id, "reference answer"))
        .await
        .expect("Failed to create question")
}
