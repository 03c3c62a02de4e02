//! Analytics derived from a set of findings

use serde::{Deserialize, Serialize};

use super::findings::{Finding, FindingType, Severity};
use crate::sources::DataSummary;

const MAX_CRITICAL_BUG_ACTIONS: usize = 3;
const MAX_REQUIREMENT_ACTIONS: usize = 2;
const MAX_FRICTION_ACTIONS: usize = 2;
const MAX_PRIORITY_ACTIONS: usize = 7;

/// Share used for every bucket when no finding carries sentiment.
pub const EVEN_SHARE: f64 = 33.3;

/// Coarse impact or effort level attached to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Medium,
    Low,
}

/// A recommended next step derived from the findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityAction {
    pub action: String,
    pub reason: String,
    pub expected_impact: Level,
    pub effort_required: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallSentiment {
    pub positive_percentage: f64,
    pub negative_percentage: f64,
    pub neutral_percentage: f64,
    pub average_rating: f64,
    pub total_reviews_analyzed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    pub bugs: usize,
    pub features: usize,
    pub requirements: usize,
    pub usability: usize,
    pub pain_points: usize,
    pub positive: usize,
    pub ai_insights: usize,
}

/// The analytics attached to a completed task.
///
/// Built once from the parsed findings and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub overall_sentiment: OverallSentiment,
    pub summary_counts: SummaryCounts,
    pub bugs: Vec<Finding>,
    pub feature_requests: Vec<Finding>,
    pub requirements: Vec<Finding>,
    pub usability_frictions: Vec<Finding>,
    pub pain_points: Vec<Finding>,
    pub positive_reviews: Vec<Finding>,
    pub ai_insights: Vec<Finding>,
    pub priority_actions: Vec<PriorityAction>,
    pub key_insights: Vec<String>,
}

impl SentimentAnalysis {
    /// Derives the analytics.
    ///
    /// `ratings` are the numeric ratings from rating-bearing sources; zeros
    /// are ignored. Findings of an unrecognised type are not bucketed.
    pub fn from_findings(findings: Vec<Finding>, ratings: &[f64], summary: &DataSummary) -> Self {
        let mut buckets = Buckets::default();
        for finding in findings {
            buckets.push(finding);
        }

        let overall_sentiment = OverallSentiment {
            total_reviews_analyzed: summary.total_analyzed(),
            average_rating: average_rating(ratings),
            ..buckets.shares()
        };
        let priority_actions = buckets.priority_actions();
        let key_insights = buckets.key_insights(&overall_sentiment);

        let Buckets {
            bugs,
            feature_requests,
            requirements,
            usability_frictions,
            pain_points,
            positive_reviews,
            ai_insights,
        } = buckets;

        SentimentAnalysis {
            overall_sentiment,
            summary_counts: SummaryCounts {
                bugs: bugs.len(),
                features: feature_requests.len(),
                requirements: requirements.len(),
                usability: usability_frictions.len(),
                pain_points: pain_points.len(),
                positive: positive_reviews.len(),
                ai_insights: ai_insights.len(),
            },
            bugs,
            feature_requests,
            requirements,
            usability_frictions,
            pain_points,
            positive_reviews,
            ai_insights,
            priority_actions,
            key_insights,
        }
    }

    /// Total number of findings across all buckets.
    pub fn finding_count(&self) -> usize {
        let c = &self.summary_counts;
        c.bugs + c.features + c.requirements + c.usability + c.pain_points + c.positive + c.ai_insights
    }
}

#[derive(Default)]
struct Buckets {
    bugs: Vec<Finding>,
    feature_requests: Vec<Finding>,
    requirements: Vec<Finding>,
    usability_frictions: Vec<Finding>,
    pain_points: Vec<Finding>,
    positive_reviews: Vec<Finding>,
    ai_insights: Vec<Finding>,
}

impl Buckets {
    fn push(&mut self, finding: Finding) {
        let bucket = match finding.finding_type {
            FindingType::Bug => &mut self.bugs,
            FindingType::FeatureRequest => &mut self.feature_requests,
            FindingType::Requirement => &mut self.requirements,
            FindingType::UsabilityFriction => &mut self.usability_frictions,
            FindingType::PainPoint => &mut self.pain_points,
            FindingType::PositiveReview => &mut self.positive_reviews,
            FindingType::AiInsight => &mut self.ai_insights,
            FindingType::Other(_) => return,
        };
        bucket.push(finding);
    }

    fn shares(&self) -> OverallSentiment {
        let positive = frequency_sum(&self.positive_reviews);
        let negative = frequency_sum(&self.bugs) + frequency_sum(&self.pain_points);
        let neutral = frequency_sum(&self.feature_requests) + frequency_sum(&self.requirements);
        let total = positive + negative + neutral;

        let (positive_percentage, negative_percentage, neutral_percentage) = if total == 0 {
            (EVEN_SHARE, EVEN_SHARE, EVEN_SHARE)
        } else {
            let pct = |n: u64| round_to(n as f64 / total as f64 * 100.0, 1);
            (pct(positive), pct(negative), pct(neutral))
        };

        OverallSentiment {
            positive_percentage,
            negative_percentage,
            neutral_percentage,
            average_rating: 0.0,
            total_reviews_analyzed: 0,
        }
    }

    fn critical_bugs(&self) -> Vec<&Finding> {
        self.bugs
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .collect()
    }

    fn priority_actions(&self) -> Vec<PriorityAction> {
        let mut actions = Vec::new();

        for bug in top_by_priority(self.critical_bugs(), MAX_CRITICAL_BUG_ACTIONS) {
            actions.push(PriorityAction {
                action: format!("Fix critical bug: {}", bug.title),
                reason: format!("Critical severity with {} mentions", bug.frequency),
                expected_impact: Level::High,
                effort_required: Level::High,
            });
        }

        for req in top_by_priority(self.requirements.iter().collect(), MAX_REQUIREMENT_ACTIONS) {
            actions.push(PriorityAction {
                action: format!("Implement required feature: {}", req.title),
                reason: format!("Expected by users ({} mentions)", req.frequency),
                expected_impact: Level::High,
                effort_required: Level::Medium,
            });
        }

        for friction in top_by_priority(
            self.usability_frictions.iter().collect(),
            MAX_FRICTION_ACTIONS,
        ) {
            actions.push(PriorityAction {
                action: format!("Fix UX issue: {}", friction.title),
                reason: format!("Causes user frustration ({} mentions)", friction.frequency),
                expected_impact: Level::Medium,
                effort_required: Level::Low,
            });
        }

        actions.truncate(MAX_PRIORITY_ACTIONS);
        actions
    }

    fn key_insights(&self, overall: &OverallSentiment) -> Vec<String> {
        let mut insights = Vec::new();

        if let Some(top) = self.bugs.first() {
            insights.push(format!(
                "Found {} bugs, {} critical. Top issue: {}",
                self.bugs.len(),
                top_by_priority(self.critical_bugs(), MAX_CRITICAL_BUG_ACTIONS).len(),
                top.title
            ));
        }

        if let Some(top) = most_frequent(&self.feature_requests) {
            insights.push(format!(
                "Top feature request: {} ({} mentions)",
                top.title, top.frequency
            ));
        }

        if let Some(top) = most_frequent(&self.positive_reviews) {
            insights.push(format!("Users love: {} ({} mentions)", top.title, top.frequency));
        }

        insights.push(format!(
            "Overall sentiment: {:.1}% positive, {:.1}% negative",
            overall.positive_percentage, overall.negative_percentage
        ));

        if !self.ai_insights.is_empty() {
            insights.push(format!(
                "AI identified {} patterns/correlations across sources",
                self.ai_insights.len()
            ));
        }

        insights
    }
}

fn frequency_sum(findings: &[Finding]) -> u64 {
    findings.iter().map(|f| u64::from(f.frequency)).sum()
}

/// Highest priority first; ties keep reply order.
fn top_by_priority(mut findings: Vec<&Finding>, limit: usize) -> Vec<&Finding> {
    findings.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
    findings.truncate(limit);
    findings
}

/// First finding with the highest frequency.
fn most_frequent(findings: &[Finding]) -> Option<&Finding> {
    let mut best: Option<&Finding> = None;
    for finding in findings {
        match best {
            Some(current) if finding.frequency <= current.frequency => {}
            _ => best = Some(finding),
        }
    }
    best
}

fn average_rating(ratings: &[f64]) -> f64 {
    let rated: Vec<f64> = ratings.iter().copied().filter(|r| *r != 0.0).collect();
    if rated.is_empty() {
        return 0.0;
    }
    round_to(rated.iter().sum::<f64>() / rated.len() as f64, 2)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{SourceKind, SourceSummary};

    fn finding(kind: FindingType, title: &str, frequency: u32, severity: Severity, priority: i64) -> Finding {
        Finding {
            finding_type: kind,
            category: "other".into(),
            title: title.into(),
            description: String::new(),
            frequency,
            severity,
            sample_reviews: vec![],
            recommendation: String::new(),
            priority_score: priority,
            sources: vec![],
        }
    }

    fn summary(analyzed: &[usize]) -> DataSummary {
        let mut summary = DataSummary::default();
        for (kind, n) in SourceKind::ALL.iter().zip(analyzed) {
            summary.insert(
                *kind,
                SourceSummary {
                    total_items: *n,
                    analyzed_items: *n,
                },
            );
        }
        summary
    }

    #[test]
    fn test_sentiment_shares() {
        let findings = vec![
            finding(FindingType::PositiveReview, "Fast", 6, Severity::Low, 3),
            finding(FindingType::Bug, "Crash", 3, Severity::High, 8),
            finding(FindingType::PainPoint, "Price", 1, Severity::Medium, 5),
            finding(FindingType::FeatureRequest, "Dark mode", 2, Severity::Low, 4),
        ];
        let analysis = SentimentAnalysis::from_findings(findings, &[], &summary(&[5, 7]));
        let overall = &analysis.overall_sentiment;
        assert_eq!(overall.positive_percentage, 50.0);
        assert_eq!(overall.negative_percentage, 33.3);
        assert_eq!(overall.neutral_percentage, 16.7);
        assert_eq!(overall.total_reviews_analyzed, 12);
    }

    #[test]
    fn test_even_share_without_sentiment() {
        let findings = vec![finding(FindingType::AiInsight, "Pattern", 4, Severity::Low, 5)];
        let analysis = SentimentAnalysis::from_findings(findings, &[], &DataSummary::default());
        let overall = &analysis.overall_sentiment;
        assert_eq!(overall.positive_percentage, 33.3);
        assert_eq!(overall.negative_percentage, 33.3);
        assert_eq!(overall.neutral_percentage, 33.3);
        assert_eq!(
            analysis.key_insights,
            vec![
                "Overall sentiment: 33.3% positive, 33.3% negative".to_string(),
                "AI identified 1 patterns/correlations across sources".to_string(),
            ]
        );
    }

    #[test]
    fn test_average_rating_ignores_zero() {
        let analysis = SentimentAnalysis::from_findings(
            vec![finding(FindingType::Bug, "x", 1, Severity::Low, 1)],
            &[5.0, 0.0, 4.0, 4.0],
            &DataSummary::default(),
        );
        assert_eq!(analysis.overall_sentiment.average_rating, 4.33);

        let analysis = SentimentAnalysis::from_findings(vec![], &[0.0], &DataSummary::default());
        assert_eq!(analysis.overall_sentiment.average_rating, 0.0);
    }

    #[test]
    fn test_priority_actions_order_and_caps() {
        let mut findings = Vec::new();
        for (i, p) in [4, 9, 7, 9].iter().enumerate() {
            findings.push(finding(FindingType::Bug, &format!("bug{}", i), 2, Severity::Critical, *p));
        }
        findings.push(finding(FindingType::Bug, "minor", 9, Severity::Low, 10));
        for (i, p) in [1, 3, 2].iter().enumerate() {
            findings.push(finding(FindingType::Requirement, &format!("req{}", i), 1, Severity::High, *p));
        }
        for (i, p) in [5, 6, 1].iter().enumerate() {
            findings.push(finding(FindingType::UsabilityFriction, &format!("ux{}", i), 1, Severity::Medium, *p));
        }

        let analysis = SentimentAnalysis::from_findings(findings, &[], &DataSummary::default());
        let actions: Vec<&str> = analysis.priority_actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(
            actions,
            vec![
                "Fix critical bug: bug1",
                "Fix critical bug: bug3",
                "Fix critical bug: bug2",
                "Implement required feature: req1",
                "Implement required feature: req2",
                "Fix UX issue: ux1",
                "Fix UX issue: ux0",
            ]
        );
        assert_eq!(analysis.priority_actions[0].reason, "Critical severity with 2 mentions");
        assert_eq!(analysis.priority_actions[3].effort_required, Level::Medium);
        assert_eq!(analysis.priority_actions[6].expected_impact, Level::Medium);
        assert_eq!(analysis.priority_actions[6].effort_required, Level::Low);

        assert_eq!(
            analysis.key_insights[0],
            "Found 5 bugs, 3 critical. Top issue: bug0"
        );
    }

    #[test]
    fn test_key_insights_pick_first_most_frequent() {
        let findings = vec![
            finding(FindingType::FeatureRequest, "Export", 4, Severity::Low, 5),
            finding(FindingType::FeatureRequest, "Widgets", 4, Severity::Low, 5),
            finding(FindingType::PositiveReview, "Clean UI", 2, Severity::Low, 5),
            finding(FindingType::PositiveReview, "Sync", 8, Severity::Low, 5),
        ];
        let analysis = SentimentAnalysis::from_findings(findings, &[], &DataSummary::default());
        assert_eq!(
            analysis.key_insights,
            vec![
                "Top feature request: Export (4 mentions)".to_string(),
                "Users love: Sync (8 mentions)".to_string(),
                "Overall sentiment: 55.6% positive, 0.0% negative".to_string(),
            ]
        );
    }

    #[test]
    fn test_bug_insight_counts_critical_bugs_with_actions() {
        let findings = (0..5)
            .map(|i| finding(FindingType::Bug, &format!("Bug {}", i), 2, Severity::Critical, 9 - i))
            .collect();
        let analysis = SentimentAnalysis::from_findings(findings, &[], &DataSummary::default());

        assert_eq!(analysis.summary_counts.bugs, 5);
        assert_eq!(analysis.priority_actions.len(), 3);
        assert_eq!(analysis.key_insights[0], "Found 5 bugs, 3 critical. Top issue: Bug 0");
    }

    #[test]
    fn test_unknown_types_not_counted() {
        let findings = vec![
            finding(FindingType::Other("security".into()), "Leak", 9, Severity::Critical, 9),
            finding(FindingType::Bug, "Crash", 1, Severity::Critical, 9),
        ];
        let analysis = SentimentAnalysis::from_findings(findings, &[], &DataSummary::default());
        assert_eq!(analysis.finding_count(), 1);
        assert_eq!(analysis.summary_counts.bugs, 1);
        assert_eq!(analysis.overall_sentiment.negative_percentage, 100.0);
    }
}
