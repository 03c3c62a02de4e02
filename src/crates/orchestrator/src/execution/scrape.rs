//! Source fan-out
//!
//! Every configured source is fetched on its own tokio task so that an error
//! or a panic in one fetcher cannot cancel or taint its siblings. The join
//! always waits for all of them.

use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::sources::{FetcherRegistry, SourceKind, SourcePayload, SourceRequest};
use crate::{OrchestratorError, Result};

/// A source that was dropped from the fan-out, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub kind: SourceKind,
    pub reason: String,
}

/// What survived the fan-out.
#[derive(Debug, Clone, Default)]
pub struct FanOutOutcome {
    /// Non-empty payloads, in request order
    pub payloads: Vec<SourcePayload>,
    pub failures: Vec<SourceFailure>,
}

impl FanOutOutcome {
    pub fn sources(&self) -> Vec<SourceKind> {
        self.payloads.iter().map(SourcePayload::kind).collect()
    }

    pub fn item_count(&self) -> usize {
        self.payloads.iter().map(SourcePayload::item_count).sum()
    }
}

/// Runs the per-source fetches for one task.
#[derive(Clone)]
pub struct ScrapeOrchestrator {
    registry: FetcherRegistry,
}

impl ScrapeOrchestrator {
    pub fn new(registry: FetcherRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FetcherRegistry {
        &self.registry
    }

    /// Fetch every source concurrently and keep the usable payloads.
    ///
    /// Failed and empty sources are logged and recorded in
    /// [`FanOutOutcome::failures`]. Fails with
    /// [`OrchestratorError::NoUsableData`] when nothing usable is left, and
    /// with [`OrchestratorError::Configuration`] when `requests` is empty.
    pub async fn fan_out(&self, task_id: &str, requests: &[SourceRequest]) -> Result<FanOutOutcome> {
        if requests.is_empty() {
            return Err(OrchestratorError::Configuration(
                "No sources configured for scraping".to_string(),
            ));
        }

        let handles: Vec<_> = requests
            .iter()
            .cloned()
            .map(|request| {
                let fetcher = self.registry.get(request.kind());
                tokio::spawn(async move {
                    match fetcher {
                        Some(fetcher) => fetcher.fetch(&request).await,
                        None => Err(OrchestratorError::SourceFetch {
                            kind: request.kind(),
                            reason: "no fetcher registered".to_string(),
                        }),
                    }
                })
            })
            .collect();

        let joined = join_all(handles).await;

        let mut outcome = FanOutOutcome::default();
        for (request, joined) in requests.iter().zip(joined) {
            let kind = request.kind();
            let result = joined.unwrap_or_else(|e| {
                Err(OrchestratorError::SourceFetch {
                    kind,
                    reason: format!("fetch task aborted: {}", e),
                })
            });

            let reason = match result {
                Ok(payload) if payload.kind() != kind => {
                    format!("fetcher returned a {} payload", payload.kind())
                }
                Ok(payload) if payload.is_empty() => "no items returned".to_string(),
                Ok(payload) => {
                    info!(
                        task_id = %task_id,
                        source = %kind,
                        items = payload.item_count(),
                        "Source fetched"
                    );
                    outcome.payloads.push(payload);
                    continue;
                }
                Err(OrchestratorError::SourceFetch { reason, .. }) => reason,
                Err(e) => e.to_string(),
            };

            warn!(
                task_id = %task_id,
                source = %kind,
                target = %request.target(),
                reason = %reason,
                "Dropping source"
            );
            outcome.failures.push(SourceFailure { kind, reason });
        }

        if outcome.payloads.is_empty() {
            error!(
                task_id = %task_id,
                failed = outcome.failures.len(),
                "No source produced usable data"
            );
            return Err(OrchestratorError::NoUsableData);
        }

        Ok(outcome)
    }
}
