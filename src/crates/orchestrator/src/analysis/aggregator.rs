//! Generation driver: single call or paced batches, then parse

use llm::TextGenerator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::findings::{parse_findings, HEADER_WORDS};
use super::prompts::{analysis_prompt, batch_prompt, BatchPosition, PromptContext};
use super::sentiment::SentimentAnalysis;
use crate::sources::{CombinedDocument, BLOCK_SEPARATOR};
use crate::{OrchestratorError, Result};

/// Characters per estimated token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Tuning for [`ResultAggregator`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSettings {
    /// Above this estimate the document is batched
    pub token_threshold: usize,
    /// Upper bound on characters per batch
    pub batch_char_budget: usize,
    /// A batch is cut at a block boundary only past this fraction of the budget
    pub boundary_ratio: f64,
    /// Pause between consecutive batch calls
    pub batch_pause: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            token_threshold: 200_000,
            batch_char_budget: 600_000,
            boundary_ratio: 0.8,
            batch_pause: Duration::from_secs(7),
        }
    }
}

/// How the reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ProcessingMode {
    Single,
    /// Number of batches that returned a reply
    Batched(usize),
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingMode::Single => write!(f, "single"),
            ProcessingMode::Batched(n) => write!(f, "batched:{}", n),
        }
    }
}

impl From<ProcessingMode> for String {
    fn from(mode: ProcessingMode) -> Self {
        mode.to_string()
    }
}

impl TryFrom<String> for ProcessingMode {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if value == "single" {
            return Ok(ProcessingMode::Single);
        }
        value
            .strip_prefix("batched:")
            .and_then(|n| n.parse().ok())
            .map(ProcessingMode::Batched)
            .ok_or_else(|| format!("invalid processing mode: {}", value))
    }
}

/// One slice of the document. Offsets are in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Everything the analysis step hands back to the task.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub analysis: SentimentAnalysis,
    pub processing_mode: ProcessingMode,
    /// Reply text the findings were parsed from, merged when batched
    pub toon_text: String,
    pub skipped_rows: usize,
}

/// Rough token estimate used to pick single or batched mode.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// Split `text` into batches of at most `budget` characters.
///
/// A batch that is not the last one is cut at its last block separator when
/// that separator sits strictly past `boundary_ratio * budget`. The separator
/// itself belongs to neither batch.
pub fn split_batches(text: &str, budget: usize, boundary_ratio: f64) -> Vec<Batch<'_>> {
    let budget = budget.max(1);
    let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let total = offsets.len();
    offsets.push(text.len());

    let threshold = budget as f64 * boundary_ratio;
    let separator_chars = BLOCK_SEPARATOR.chars().count();
    let mut batches = Vec::new();
    let mut start = 0;

    while start < total {
        let mut end = (start + budget).min(total);
        let mut slice = &text[offsets[start]..offsets[end]];

        if end < total {
            if let Some(byte_pos) = slice.rfind(BLOCK_SEPARATOR) {
                let char_pos = slice[..byte_pos].chars().count();
                if char_pos as f64 > threshold {
                    slice = &slice[..byte_pos];
                    end = start + char_pos + separator_chars;
                }
            }
        }

        batches.push(Batch {
            text: slice,
            start,
            end,
        });
        start = end;
    }
    batches
}

/// Sends the combined document for generation and turns the reply into
/// analytics.
pub struct ResultAggregator {
    generator: Arc<dyn TextGenerator>,
    settings: AggregatorSettings,
}

impl ResultAggregator {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: AggregatorSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Whether `document` will be sent in batches.
    pub fn needs_batching(&self, document: &CombinedDocument) -> bool {
        estimate_tokens(&document.text) > self.settings.token_threshold
    }

    /// Analyze a combined document.
    ///
    /// # Errors
    ///
    /// `Generation` if the call fails, or if every batch fails. `Parse` if
    /// the reply holds no usable findings.
    pub async fn analyze(&self, document: &CombinedDocument, product_name: &str) -> Result<AnalysisOutcome> {
        let ctx = PromptContext {
            product_name,
            search_urls: &document.search_urls,
        };

        let (toon_text, processing_mode) = if self.needs_batching(document) {
            self.generate_batched(&document.text, &ctx).await?
        } else {
            (self.generate_single(&document.text, &ctx).await?, ProcessingMode::Single)
        };

        let parsed = parse_findings(&toon_text)?;
        let analysis = SentimentAnalysis::from_findings(
            parsed.findings,
            &document.ratings,
            &document.data_summary,
        );

        info!(
            mode = %processing_mode,
            findings = analysis.finding_count(),
            skipped = parsed.skipped_rows,
            "Analysis complete"
        );

        Ok(AnalysisOutcome {
            analysis,
            processing_mode,
            toon_text,
            skipped_rows: parsed.skipped_rows,
        })
    }

    async fn generate_single(&self, text: &str, ctx: &PromptContext<'_>) -> Result<String> {
        info!(
            model = self.generator.model_name(),
            chars = text.len(),
            "Sending document in a single call"
        );
        let prompt = analysis_prompt(text, ctx);
        let reply = self.generator.generate(&prompt).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(OrchestratorError::Generation("empty reply".to_string()));
        }
        Ok(reply.to_string())
    }

    async fn generate_batched(
        &self,
        text: &str,
        ctx: &PromptContext<'_>,
    ) -> Result<(String, ProcessingMode)> {
        let batches = split_batches(
            text,
            self.settings.batch_char_budget,
            self.settings.boundary_ratio,
        );
        let total = text.chars().count();
        let count = batches.len();
        info!(
            model = self.generator.model_name(),
            batches = count,
            chars = total,
            "Document over threshold, sending in batches"
        );

        let mut replies = Vec::with_capacity(count);
        for (index, batch) in batches.iter().enumerate() {
            if index > 0 && !self.settings.batch_pause.is_zero() {
                tokio::time::sleep(self.settings.batch_pause).await;
            }

            let position = BatchPosition {
                number: index + 1,
                count,
                start: batch.start,
                end: batch.end,
                total,
            };
            let prompt = batch_prompt(batch.text, ctx, &position);

            match self.generator.generate(&prompt).await {
                Ok(reply) if !reply.trim().is_empty() => {
                    info!(batch = position.number, chars = batch.text.len(), "Batch processed");
                    replies.push(reply.trim().to_string());
                }
                Ok(_) => warn!(batch = position.number, "Batch returned an empty reply, skipping"),
                Err(e) => warn!(batch = position.number, error = %e, "Batch failed, skipping"),
            }
        }

        if replies.is_empty() {
            return Err(OrchestratorError::Generation(format!(
                "all {} batches failed",
                count
            )));
        }

        let merged = rtoon::merge_tables(&replies, HEADER_WORDS);
        Ok((merged, ProcessingMode::Batched(replies.len())))
    }
}
