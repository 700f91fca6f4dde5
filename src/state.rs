// src/state.rs

use std::sync::Arc;

use crate::{
    clients::completion::CompletionClient,
    config::Config,
    services::{
        category::CategoryService,
        generator::QuestionGenerator,
        paper::PaperService,
        popular::{HotQuestionResolver, PopularityRecorder},
        question::QuestionService,
    },
    store::{Store, ranking::RankingCache},
};

/// Everything a caller needs, wired over one store, one ranking and one AI client.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub categories: CategoryService,
    pub questions: QuestionService,
    pub papers: PaperService,
    pub popular: HotQuestionResolver,
    pub generator: QuestionGenerator,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        ranking: Arc<dyn RankingCache>,
        client: Arc<dyn CompletionClient>,
    ) -> Self {
        let recorder = PopularityRecorder::new(Arc::clone(&ranking));
        Self {
            categories: CategoryService::new(Arc::clone(&store)),
            questions: QuestionService::new(Arc::clone(&store), recorder),
            papers: PaperService::new(Arc::clone(&store)),
            popular: HotQuestionResolver::new(store, ranking),
            generator: QuestionGenerator::new(client, config.ai.clone()),
            config,
        }
    }
}
