use orchestrator::analysis::{parse_findings, FindingType, Level, SentimentAnalysis, Severity};
use orchestrator::sources::DataSummary;
use orchestrator::OrchestratorError;

#[test]
fn test_minimal_header_with_one_bug() {
    let reply = "type|category|title\n\
                 bug|crash|App crashes|Crashes on launch|3|critical|[\"crash\",\"freeze\"]|Fix null check|9|google_play_store";

    let parsed = parse_findings(reply).unwrap();
    assert!(parsed.header_matched);
    assert_eq!(parsed.skipped_rows, 0);
    assert_eq!(parsed.findings.len(), 1);

    let bug = &parsed.findings[0];
    assert_eq!(bug.finding_type, FindingType::Bug);
    assert_eq!(bug.frequency, 3);
    assert_eq!(bug.severity, Severity::Critical);
    assert_eq!(bug.sample_reviews, vec!["crash", "freeze"]);
    assert_eq!(bug.priority_score, 9);
    assert_eq!(bug.sources, vec!["google_play_store"]);

    let analysis = SentimentAnalysis::from_findings(parsed.findings, &[], &DataSummary::default());
    assert_eq!(analysis.summary_counts.bugs, 1);
    let action = &analysis.priority_actions[0];
    assert_eq!(action.action, "Fix critical bug: App crashes");
    assert_eq!(action.expected_impact, Level::High);
}

#[test]
fn test_reply_with_prose_and_broken_rows() {
    let reply = "Here is the analysis you asked for.\n\
                 \n\
                 type | category | title | description | frequency | severity | sample_reviews | recommendation | priority_score | sources\n\
                 feature_request | sync | Offline mode | Wants offline use | 4 | urgent | [\"offline\"] | Cache data | 6 | reddit\n\
                 bug | login\n\
                 pain_point | pricing | Too expensive | Price went up | many | high | [] | Review pricing | 7 | apple_app_store\n";

    let parsed = parse_findings(reply).unwrap();
    assert_eq!(parsed.findings.len(), 2);
    assert_eq!(parsed.skipped_rows, 1);

    let feature = &parsed.findings[0];
    assert_eq!(feature.title, "Offline mode");
    assert_eq!(feature.severity, Severity::Medium);

    // A frequency that is not a number still counts once
    let pain = &parsed.findings[1];
    assert_eq!(pain.finding_type, FindingType::PainPoint);
    assert_eq!(pain.frequency, 1);

    let analysis = SentimentAnalysis::from_findings(parsed.findings, &[4.0, 0.0, 2.0], &DataSummary::default());
    let overall = &analysis.overall_sentiment;
    assert_eq!(overall.neutral_percentage, 80.0);
    assert_eq!(overall.negative_percentage, 20.0);
    assert_eq!(overall.positive_percentage, 0.0);
    assert_eq!(overall.average_rating, 3.0);
}

#[test]
fn test_insights_only_gives_even_split() {
    let reply = "type|category|title|description|frequency|severity|sample_reviews|recommendation|priority_score|sources\n\
                 ai_insight|trend|Users compare with rivals|Often mentioned|8|low|[]|Watch competitors|2|google_search";

    let parsed = parse_findings(reply).unwrap();
    let analysis = SentimentAnalysis::from_findings(parsed.findings, &[], &DataSummary::default());

    let overall = &analysis.overall_sentiment;
    assert_eq!(overall.positive_percentage, 33.3);
    assert_eq!(overall.negative_percentage, 33.3);
    assert_eq!(overall.neutral_percentage, 33.3);
    assert_eq!(analysis.summary_counts.ai_insights, 1);
}

#[test]
fn test_header_only_reply_is_rejected() {
    let err = parse_findings("type|category|title\n").unwrap_err();
    assert!(matches!(err, OrchestratorError::Parse(_)));
}

#[test]
fn test_same_reply_gives_identical_analysis() {
    let reply = "type | category | title | description | frequency | severity | sample_reviews | recommendation | priority_score | sources\n\
                 bug | crash | App crashes | Crashes on launch | 3 | critical | [\"crash\",\"freeze\"] | Fix null check | 9 | google_play_store\n\
                 bug | sync | Lost notes | Notes vanish | 3 | critical | [\"gone\"] | Add backup | 9 | reddit\n\
                 feature_request | ui | Dark mode | Night use | 4 | low | [] | Add theme | 6 | reddit, google_search\n\
                 feature_request | ui | Widgets | Home screen | 4 | low | [] | Add widget | 5 | reddit\n\
                 positive_review | design | Clean look | Nice layout | 5 | low | [\"love it\"] | Keep it | 3 | apple_app_store\n\
                 ai_insight | trend | Crash after update | Correlated with 2.1 | 2 | high | [] | Roll back | 8 | google_play_store";
    let ratings = [5.0, 3.0, 0.0, 4.0];

    let analyze = || {
        let parsed = parse_findings(reply).unwrap();
        SentimentAnalysis::from_findings(parsed.findings, &ratings, &DataSummary::default())
    };
    let first = analyze();
    let second = analyze();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.key_insights[1], "Top feature request: Dark mode (4 mentions)");
}
