//! Prompt templates for the analysis calls

use super::findings::FINDING_COLUMNS;

/// Template for a single call over the whole document
const ANALYSIS_PROMPT: &str = r#"You are an experienced product analyst who reads user feedback for a living.

Reply with a TOON table only. Do not write JSON, markdown or any prose around the table.

WHAT TO DO:
1. Read every review and discussion in the data below, whatever source it came from.
2. {url_task}
3. {social_task}
4. Put every finding into exactly one of these types:
{finding_types}
5. Look across sources for patterns nobody stated outright and report them as ai_insight.

TABLE HEADER:
{header}

RULES:
{rules}

DATA (TOON tables, one block per source):
{document}
{urls_section}{social_section}
Reply with the header row followed by one row per finding and nothing else."#;

/// Template for one slice of a large document
const BATCH_PROMPT: &str = r#"You are an experienced product analyst. Categorize the user feedback below.

Reply with a TOON table only. Do not write JSON, markdown or any prose around the table.

WHAT TO DO:
1. Read all of the data in this slice.
2. {url_task}
3. {social_task}
4. Put every finding into exactly one of these types:
{finding_types}
5. Report cross-source patterns as ai_insight.

TABLE HEADER:
{header}

RULES:
{rules}

{batch_info}
{document}
{urls_section}{social_section}
Reply with the header row followed by one row per finding and nothing else."#;

const FINDING_TYPES: &[(&str, &str)] = &[
    ("bug", "crashes, errors and features that do not work"),
    ("feature_request", "new capabilities or improvements users ask for"),
    ("requirement", "things users expect as a baseline but cannot find"),
    ("usability_friction", "interface and flow problems that slow users down"),
    ("pain_point", "broader dissatisfaction such as price, support or trust"),
    ("positive_review", "what users praise"),
    ("ai_insight", "patterns and correlations you notice across the data"),
];

const RULES: &[&str] = &[
    "The first line is the header row, exactly as given",
    "One finding per line",
    "sample_reviews is a JSON array of short quotes, for example [\"keeps crashing\",\"lost my notes\"]",
    "sources is a comma separated list drawn from reddit, google_play_store, apple_app_store, google_search, social_media",
    "Write [PIPE] wherever a text field would contain a | character",
    "severity is one of critical, high, medium, low",
    "priority_score is a whole number from 1 to 10, higher is more urgent",
];

/// Inputs shared by both prompt shapes.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub product_name: &'a str,
    pub search_urls: &'a [String],
}

/// Where a batch sits in the whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPosition {
    /// 1-based
    pub number: usize,
    pub count: usize,
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl BatchPosition {
    pub fn is_first(&self) -> bool {
        self.number == 1
    }

    pub fn describe(&self) -> String {
        format!(
            "Batch {} of {} (text chars {} to {} of {})",
            self.number, self.count, self.start, self.end, self.total
        )
    }
}

/// Prompt for analyzing the whole document in one call.
pub fn analysis_prompt(document: &str, ctx: &PromptContext<'_>) -> String {
    fill(ANALYSIS_PROMPT, document, ctx, true, "")
}

/// Prompt for one batch. Only the first batch carries the URL and social
/// media sections.
pub fn batch_prompt(slice: &str, ctx: &PromptContext<'_>, position: &BatchPosition) -> String {
    fill(BATCH_PROMPT, slice, ctx, position.is_first(), &position.describe())
}

fn fill(
    template: &str,
    document: &str,
    ctx: &PromptContext<'_>,
    with_extras: bool,
    batch_info: &str,
) -> String {
    let has_urls = with_extras && !ctx.search_urls.is_empty();
    let has_social = with_extras && !ctx.product_name.trim().is_empty();

    let url_task = if has_urls {
        "Open the search result URLs listed after the data and include what their pages say."
    } else {
        "Work from the data provided."
    };
    let social_task = if has_social {
        format!(
            "Search social media for \"{} review\" and include what you find.",
            ctx.product_name.trim()
        )
    } else {
        "Do not look for additional sources.".to_string()
    };

    let urls_section = if has_urls {
        urls_section(ctx.search_urls)
    } else {
        String::new()
    };
    let social_section = if has_social {
        social_section(ctx.product_name.trim())
    } else {
        String::new()
    };

    template
        .replace("{url_task}", url_task)
        .replace("{social_task}", &social_task)
        .replace("{finding_types}", &finding_types())
        .replace("{header}", &FINDING_COLUMNS.join(" | "))
        .replace("{rules}", &rules())
        .replace("{urls_section}", &urls_section)
        .replace("{social_section}", &social_section)
        .replace("{batch_info}", batch_info)
        // Last, so placeholders inside scraped text are left alone
        .replace("{document}", document)
}

fn finding_types() -> String {
    FINDING_TYPES
        .iter()
        .map(|(name, meaning)| format!("   - {}: {}", name, meaning))
        .collect::<Vec<_>>()
        .join("\n")
}

fn rules() -> String {
    RULES
        .iter()
        .map(|rule| format!("- {}", rule))
        .collect::<Vec<_>>()
        .join("\n")
}

fn urls_section(urls: &[String]) -> String {
    let list = urls
        .iter()
        .map(|url| format!("- {}", url))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "\nGOOGLE SEARCH URLs TO ANALYZE (open each with your URL context tool):\n{}\n",
        list
    )
}

fn social_section(product_name: &str) -> String {
    format!(
        "\nSOCIAL MEDIA SEARCH:\nSearch for \"{} review\" on social platforms and add those findings with source social_media.\n",
        product_name
    )
}
