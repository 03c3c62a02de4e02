//! Combined document builder
//!
//! Each surviving source becomes one block: a banner, a few metadata lines,
//! and its items as a TOON table. Blocks are separated by a blank line, which
//! is also where the aggregator prefers to cut batches.

use rtoon::{sanitize_field, TableWriter};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

use crate::sources::model::{SourceKind, SourcePayload};
use crate::{OrchestratorError, Result};

const PLAY_HEADER: &[&str] = &["rating", "snippet", "likes", "iso_date"];
const APPLE_HEADER: &[&str] = &["title", "text", "rating", "review_date", "reviewed_version"];
const REDDIT_HEADER: &[&str] = &["title", "posted", "comment_count_stat", "body_text", "comments_text"];
const SEARCH_HEADER: &[&str] = &["link", "snippet", "source", "rich_snippet", "sitelinks"];

/// Separator between document blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Item counts for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub total_items: usize,
    pub analyzed_items: usize,
}

/// Per-source item counts for a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSummary(BTreeMap<SourceKind, SourceSummary>);

impl DataSummary {
    pub fn insert(&mut self, kind: SourceKind, summary: SourceSummary) {
        self.0.insert(kind, summary);
    }

    pub fn get(&self, kind: SourceKind) -> Option<&SourceSummary> {
        self.0.get(&kind)
    }

    pub fn source_count(&self) -> usize {
        self.0.len()
    }

    pub fn sources(&self) -> impl Iterator<Item = SourceKind> + '_ {
        self.0.keys().copied()
    }

    /// Sum of analyzed items across all sources.
    pub fn total_analyzed(&self) -> usize {
        self.0.values().map(|s| s.analyzed_items).sum()
    }
}

/// The merged input for the analysis step.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedDocument {
    pub text: String,
    pub data_summary: DataSummary,
    /// Non-zero star ratings from rating-bearing sources
    pub ratings: Vec<f64>,
    /// Unique search result links, capped
    pub search_urls: Vec<String>,
}

/// Build the combined document from the payloads that survived the fan-out.
///
/// Empty payloads are skipped. Fails when nothing is left to render.
pub fn build_document(payloads: &[SourcePayload], max_search_urls: usize) -> Result<CombinedDocument> {
    let mut blocks = Vec::new();
    let mut data_summary = DataSummary::default();
    let mut ratings = Vec::new();

    for payload in payloads.iter().filter(|p| !p.is_empty()) {
        blocks.push(render_block(payload)?);
        let count = payload.item_count();
        data_summary.insert(
            payload.kind(),
            SourceSummary {
                total_items: count,
                analyzed_items: count,
            },
        );
        ratings.extend(payload.ratings());
    }

    if blocks.is_empty() {
        return Err(OrchestratorError::DocumentBuild(
            "no source produced any items".to_string(),
        ));
    }

    let text = blocks.join(BLOCK_SEPARATOR);
    let search_urls = extract_search_urls(payloads, max_search_urls);
    info!(
        sources = data_summary.source_count(),
        chars = text.len(),
        urls = search_urls.len(),
        "Built combined document"
    );

    Ok(CombinedDocument {
        text,
        data_summary,
        ratings,
        search_urls,
    })
}

/// Unique links from search payloads, in order, at most `max`.
pub fn extract_search_urls(payloads: &[SourcePayload], max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    payloads
        .iter()
        .flat_map(|p| p.search_links())
        .filter(|link| seen.insert(*link))
        .take(max)
        .map(str::to_string)
        .collect()
}

fn render_block(payload: &SourcePayload) -> Result<String> {
    let source = payload.kind().as_str();
    let total = payload.item_count();

    let block = match payload {
        SourcePayload::GooglePlayStore {
            product_id,
            platform,
            reviews,
        } => {
            let mut table = TableWriter::new(PLAY_HEADER);
            for r in reviews {
                table.push_row(&[
                    opt_number(r.rating),
                    r.snippet.clone(),
                    r.likes.map(|l| l.to_string()).unwrap_or_default(),
                    r.iso_date.clone().unwrap_or_default(),
                ])?;
            }
            format!(
                "=== GOOGLE PLAY STORE REVIEWS ===\nSource: {}\nProduct ID: {}\nPlatform: {}\nTotal Reviews: {}\n\nReviews (TOON format):\n{}",
                source,
                sanitize_field(product_id),
                sanitize_field(platform),
                total,
                table.finish()
            )
        }
        SourcePayload::AppleAppStore {
            product_id,
            country,
            reviews,
        } => {
            let mut table = TableWriter::new(APPLE_HEADER);
            for r in reviews {
                table.push_row(&[
                    r.title.clone(),
                    r.text.clone(),
                    opt_number(r.rating),
                    r.review_date.clone().unwrap_or_default(),
                    r.reviewed_version.clone().unwrap_or_default(),
                ])?;
            }
            format!(
                "=== APPLE APP STORE REVIEWS ===\nSource: {}\nProduct ID: {}\nCountry: {}\nTotal Reviews: {}\n\nReviews (TOON format):\n{}",
                source,
                sanitize_field(product_id),
                sanitize_field(country),
                total,
                table.finish()
            )
        }
        SourcePayload::Reddit { keyword, posts } => {
            let mut table = TableWriter::new(REDDIT_HEADER);
            for p in posts {
                table.push_row(&[
                    p.title.clone(),
                    p.posted.clone().unwrap_or_default(),
                    p.comment_count.map(|c| c.to_string()).unwrap_or_default(),
                    p.body.clone(),
                    p.comments
                        .iter()
                        .map(|c| sanitize_field(c).trim().to_string())
                        .collect::<Vec<_>>()
                        .join("; "),
                ])?;
            }
            format!(
                "=== REDDIT POSTS ===\nSource: {}\nKeyword: {}\nTotal Posts: {}\n\nPosts (TOON format):\n{}",
                source,
                sanitize_field(keyword),
                total,
                table.finish()
            )
        }
        SourcePayload::GoogleSearch { query, results } => {
            let mut table = TableWriter::new(SEARCH_HEADER);
            for r in results {
                table.push_row(&[
                    r.link.clone(),
                    r.snippet.clone(),
                    r.source.clone().unwrap_or_default(),
                    r.rich_snippet.as_ref().map(|v| v.to_string()).unwrap_or_default(),
                    r.sitelinks.as_ref().map(|v| v.to_string()).unwrap_or_default(),
                ])?;
            }
            format!(
                "=== GOOGLE SEARCH RESULTS ===\nSource: {}\nQuery: {}\nTotal Results: {}\n\nResults (TOON format):\n{}",
                source,
                sanitize_field(query),
                total,
                table.finish()
            )
        }
    };
    Ok(block)
}

/// Whole numbers render without a fractional part.
fn opt_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}
