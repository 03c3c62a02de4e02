//! The source fetcher seam

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::sources::model::{SourceKind, SourcePayload, SourceRequest};
use crate::Result;

/// Fetches items for one source.
///
/// A fetcher either returns a payload of the same kind as the request or
/// fails with [`crate::OrchestratorError::SourceFetch`]. An empty payload is
/// not an error here; the orchestrator decides what empty means.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload>;
}

/// Fetchers keyed by the source kind they serve.
#[derive(Clone, Default)]
pub struct FetcherRegistry {
    fetchers: HashMap<SourceKind, Arc<dyn SourceFetcher>>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `fetcher` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: SourceKind, fetcher: Arc<dyn SourceFetcher>) {
        self.fetchers.insert(kind, fetcher);
    }

    pub fn with(mut self, kind: SourceKind, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.register(kind, fetcher);
        self
    }

    pub fn get(&self, kind: SourceKind) -> Option<Arc<dyn SourceFetcher>> {
        self.fetchers.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<SourceKind> {
        let mut kinds: Vec<_> = self.fetchers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}
