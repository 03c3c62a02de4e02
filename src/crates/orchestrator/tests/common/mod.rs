//! Stub fetchers and generators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use llm::TextGenerator;
use orchestrator::analysis::{AggregatorSettings, ResultAggregator};
use orchestrator::execution::{ScrapeOrchestrator, TaskRunner};
use orchestrator::realtime::ProgressBus;
use orchestrator::sources::{
    AppStoreReview, FetcherRegistry, ForumPost, PlayReview, SearchResult, SourceFetcher,
    SourceKind, SourcePayload, SourceRequest,
};
use orchestrator::store::{TaskStore, DEFAULT_RETENTION};
use orchestrator::{OrchestratorError, Result};

pub const HEADER: &str = "type | category | title | description | frequency | severity | sample_reviews | recommendation | priority_score | sources";

/// Reply with one critical bug and one positive finding.
pub fn analysis_reply() -> String {
    format!(
        "{}\n\
         bug | crash | App crashes | Crashes on launch | 3 | critical | [\"crash\",\"freeze\"] | Fix null check | 9 | google_play_store\n\
         positive_review | design | Clean look | Users like the layout | 5 | low | [\"love it\"] | Keep it | 3 | reddit",
        HEADER
    )
}

/// Returns `count` items of the requested kind, or fails.
pub struct StubFetcher {
    count: Option<usize>,
}

impl StubFetcher {
    pub fn items(count: usize) -> Arc<dyn SourceFetcher> {
        Arc::new(Self { count: Some(count) })
    }

    pub fn failing() -> Arc<dyn SourceFetcher> {
        Arc::new(Self { count: None })
    }
}

#[async_trait]
impl SourceFetcher for StubFetcher {
    async fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload> {
        let Some(count) = self.count else {
            return Err(OrchestratorError::SourceFetch {
                kind: request.kind(),
                reason: "connection reset".to_string(),
            });
        };

        Ok(match request {
            SourceRequest::GooglePlayStore { product_id, platform } => SourcePayload::GooglePlayStore {
                product_id: product_id.clone(),
                platform: platform.clone(),
                reviews: (0..count)
                    .map(|i| PlayReview {
                        rating: Some(if i % 2 == 0 { 5.0 } else { 3.0 }),
                        snippet: format!("play review {}", i),
                        likes: Some(i as u64),
                        iso_date: Some("2025-01-01T00:00:00Z".to_string()),
                    })
                    .collect(),
            },
            SourceRequest::AppleAppStore { product_id, country, .. } => SourcePayload::AppleAppStore {
                product_id: product_id.clone(),
                country: country.clone(),
                reviews: (0..count)
                    .map(|i| AppStoreReview {
                        title: format!("apple {}", i),
                        text: "fine | mostly".to_string(),
                        rating: Some(4.0),
                        ..Default::default()
                    })
                    .collect(),
            },
            SourceRequest::Reddit { keyword, .. } => SourcePayload::Reddit {
                keyword: keyword.clone(),
                posts: (0..count)
                    .map(|i| ForumPost {
                        title: format!("thread {}", i),
                        body: "it keeps\ncrashing".to_string(),
                        comments: vec!["same".to_string(), "me too".to_string()],
                        ..Default::default()
                    })
                    .collect(),
            },
            SourceRequest::GoogleSearch { query } => SourcePayload::GoogleSearch {
                query: query.clone(),
                results: (0..count)
                    .map(|i| SearchResult {
                        link: format!("https://example.com/review/{}", i),
                        snippet: "a review".to_string(),
                        ..Default::default()
                    })
                    .collect(),
            },
        })
    }
}

/// Hands out scripted replies in order and records every prompt.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<llm::Result<String>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<llm::Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> llm::Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(llm::LlmError::InvalidResponse("no reply scripted".into())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn memory_store() -> TaskStore {
    TaskStore::in_memory(ProgressBus::default(), DEFAULT_RETENTION)
}

pub fn runner(
    store: TaskStore,
    fetchers: Vec<(SourceKind, Arc<dyn SourceFetcher>)>,
    generator: Arc<dyn TextGenerator>,
) -> TaskRunner {
    let registry = fetchers
        .into_iter()
        .fold(FetcherRegistry::new(), |registry, (kind, fetcher)| registry.with(kind, fetcher));
    let aggregator = ResultAggregator::new(generator, AggregatorSettings::default());
    TaskRunner::new(store, ScrapeOrchestrator::new(registry), Some(aggregator))
}
