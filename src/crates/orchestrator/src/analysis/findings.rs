//! Findings read from the model's TOON reply

use rtoon::{parse_list_field, parse_table, restore_text, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::{OrchestratorError, Result};

/// Columns the reply table is asked to carry, in order.
pub const FINDING_COLUMNS: [&str; 10] = [
    "type",
    "category",
    "title",
    "description",
    "frequency",
    "severity",
    "sample_reviews",
    "recommendation",
    "priority_score",
    "sources",
];

/// Words that identify the header row.
pub const HEADER_WORDS: &[&str] = &["type", "category", "title"];

/// Rows with fewer fields than this are rejected.
pub const MIN_ROW_FIELDS: usize = 3;

/// Most sample reviews kept per finding.
pub const MAX_SAMPLE_REVIEWS: usize = 3;

const DEFAULT_CATEGORY: &str = "other";
const DEFAULT_FREQUENCY: u32 = 1;
const DEFAULT_PRIORITY: i64 = 5;

/// The category a finding belongs to.
///
/// Unrecognised values are kept as [`FindingType::Other`] so nothing the model
/// said is lost, but they are not counted in any bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FindingType {
    Bug,
    FeatureRequest,
    Requirement,
    UsabilityFriction,
    PainPoint,
    PositiveReview,
    AiInsight,
    Other(String),
}

impl FindingType {
    pub fn as_str(&self) -> &str {
        match self {
            FindingType::Bug => "bug",
            FindingType::FeatureRequest => "feature_request",
            FindingType::Requirement => "requirement",
            FindingType::UsabilityFriction => "usability_friction",
            FindingType::PainPoint => "pain_point",
            FindingType::PositiveReview => "positive_review",
            FindingType::AiInsight => "ai_insight",
            FindingType::Other(raw) => raw,
        }
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "bug" => FindingType::Bug,
            "feature_request" => FindingType::FeatureRequest,
            "requirement" => FindingType::Requirement,
            "usability_friction" => FindingType::UsabilityFriction,
            "pain_point" => FindingType::PainPoint,
            "positive_review" => FindingType::PositiveReview,
            "ai_insight" => FindingType::AiInsight,
            _ => FindingType::Other(raw.trim().to_string()),
        }
    }
}

impl From<String> for FindingType {
    fn from(raw: String) -> Self {
        FindingType::parse(&raw)
    }
}

impl From<FindingType> for String {
    fn from(value: FindingType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How bad a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Severity {
    /// Reads a severity, falling back to `Medium` for anything unknown.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

/// One categorized observation from the reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    pub category: String,
    pub title: String,
    pub description: String,
    pub frequency: u32,
    pub severity: Severity,
    pub sample_reviews: Vec<String>,
    pub recommendation: String,
    pub priority_score: i64,
    pub sources: Vec<String>,
}

impl Finding {
    /// Builds a finding from a split row.
    ///
    /// Returns `None` when the row is too short to be a finding. Every other
    /// problem is absorbed by a default.
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        if fields.len() < MIN_ROW_FIELDS {
            return None;
        }
        let field = |i: usize| fields.get(i).map(String::as_str).unwrap_or("");

        let category = match field(1) {
            "" => DEFAULT_CATEGORY.to_string(),
            other => other.to_string(),
        };

        let mut sample_reviews: Vec<String> = parse_list_field(field(6))
            .iter()
            .map(|s| restore_text(s))
            .filter(|s| !s.is_empty())
            .collect();
        sample_reviews.truncate(MAX_SAMPLE_REVIEWS);

        let sources = field(9)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Some(Finding {
            finding_type: FindingType::parse(field(0)),
            category,
            title: restore_text(field(2)),
            description: restore_text(field(3)),
            frequency: parse_frequency(field(4)),
            severity: Severity::parse_lenient(field(5)),
            sample_reviews,
            recommendation: restore_text(field(7)),
            priority_score: field(8).trim().parse().unwrap_or(DEFAULT_PRIORITY),
            sources,
        })
    }
}

/// Frequency must be a positive integer; anything else counts once.
fn parse_frequency(raw: &str) -> u32 {
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => DEFAULT_FREQUENCY,
    }
}

/// Findings read from one reply, with the count of rejected rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFindings {
    pub findings: Vec<Finding>,
    pub skipped_rows: usize,
    pub header_matched: bool,
}

/// Parse a TOON reply into findings.
///
/// The header is the first line naming `type`, `category` and `title`, or
/// line 0 when no such line exists. Short rows are skipped and counted.
/// Fails only when no finding survives.
pub fn parse_findings(text: &str) -> Result<ParsedFindings> {
    let table = parse_table(text.trim(), HEADER_WORDS);
    if !table.header_matched {
        warn!("No header row found in reply, treating the first line as header");
    }

    let mut findings = Vec::with_capacity(table.len());
    let mut skipped_rows = 0;
    for Row {
        line_number,
        fields,
    } in &table.rows
    {
        match Finding::from_fields(fields) {
            Some(finding) => findings.push(finding),
            None => {
                debug!(line = line_number, fields = fields.len(), "Skipping malformed row");
                skipped_rows += 1;
            }
        }
    }

    info!(
        findings = findings.len(),
        skipped = skipped_rows,
        "Parsed findings from reply"
    );

    if findings.is_empty() {
        return Err(OrchestratorError::Parse(format!(
            "no valid findings in reply ({} rows rejected)",
            skipped_rows
        )));
    }

    Ok(ParsedFindings {
        findings,
        skipped_rows,
        header_matched: table.header_matched,
    })
}
