//! Analysis of the combined document
//!
//! [`ResultAggregator`] sends the document for generation, in one call or in
//! paced batches, and parses the TOON reply into [`Finding`]s. The findings
//! then feed [`SentimentAnalysis`]. [`prioritize`] plans a sprint from a
//! completed task's reply text.

pub mod aggregator;
pub mod findings;
pub mod prioritize;
pub mod prompts;
pub mod sentiment;

pub use aggregator::{
    estimate_tokens, split_batches, AggregatorSettings, AnalysisOutcome, Batch, ProcessingMode,
    ResultAggregator,
};
pub use findings::{parse_findings, Finding, FindingType, ParsedFindings, Severity};
pub use prioritize::{clean_json_response, prioritize, PrioritizationPlan, PrioritizeRequest};
pub use sentiment::{Level, OverallSentiment, PriorityAction, SentimentAnalysis, SummaryCounts};
