//! SerpAPI-backed fetchers for store reviews and web search

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::sources::fetcher::SourceFetcher;
use crate::sources::model::{
    AppStoreReview, PlayReview, SearchResult, SourceKind, SourcePayload, SourceRequest,
};
use crate::{OrchestratorError, Result};

pub const SERPAPI_BASE_URL: &str = "https://serpapi.com/search.json";

/// Fetches Google Play reviews, App Store reviews and Google organic results
/// through SerpAPI.
#[derive(Clone)]
pub struct SerpApiFetcher {
    client: Client,
    api_key: String,
    base_url: String,
    play_reviews: u32,
}

impl SerpApiFetcher {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        play_reviews: u32,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            OrchestratorError::Configuration(format!("failed to build HTTP client: {}", e))
        })?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            play_reviews,
        })
    }

    /// Source kinds this fetcher serves.
    pub fn kinds() -> [SourceKind; 3] {
        [
            SourceKind::GooglePlayStore,
            SourceKind::AppleAppStore,
            SourceKind::GoogleSearch,
        ]
    }

    async fn get_json(&self, kind: SourceKind, params: &[(&str, String)]) -> Result<Value> {
        let fail = |reason: String| OrchestratorError::SourceFetch { kind, reason };

        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("api_key", &self.api_key)])
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| fail(e.to_string()))?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(fail(error.to_string()));
        }
        if !status.is_success() {
            return Err(fail(format!("HTTP {}", status)));
        }
        Ok(body)
    }

    async fn fetch_play(&self, product_id: &str, platform: &str) -> Result<SourcePayload> {
        info!(product_id, platform, "Fetching Google Play reviews");
        let body = self
            .get_json(
                SourceKind::GooglePlayStore,
                &[
                    ("engine", "google_play_product".to_string()),
                    ("store", "apps".to_string()),
                    ("product_id", product_id.to_string()),
                    ("all_reviews", "true".to_string()),
                    ("platform", platform.to_string()),
                    ("sort_by", "2".to_string()),
                    ("num", self.play_reviews.to_string()),
                ],
            )
            .await?;

        let reviews = parse_play_reviews(&body);
        info!(product_id, count = reviews.len(), "Fetched Google Play reviews");
        Ok(SourcePayload::GooglePlayStore {
            product_id: product_id.to_string(),
            platform: platform.to_string(),
            reviews,
        })
    }

    async fn fetch_apple(&self, product_id: &str, country: &str, target: u32) -> Result<SourcePayload> {
        info!(product_id, country, target, "Fetching App Store reviews");
        let target = target as usize;
        let mut reviews = Vec::new();
        let mut page = 1u32;

        while reviews.len() < target {
            debug!(product_id, page, "Requesting App Store page");
            let body = self
                .get_json(
                    SourceKind::AppleAppStore,
                    &[
                        ("engine", "apple_reviews".to_string()),
                        ("product_id", product_id.to_string()),
                        ("country", country.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            let (page_reviews, has_next) = parse_apple_page(&body);
            if page_reviews.is_empty() {
                warn!(product_id, page, "No reviews on page, stopping");
                break;
            }
            reviews.extend(page_reviews);
            if !has_next {
                break;
            }
            page += 1;
        }

        reviews.truncate(target);
        info!(product_id, count = reviews.len(), "Fetched App Store reviews");
        Ok(SourcePayload::AppleAppStore {
            product_id: product_id.to_string(),
            country: country.to_string(),
            reviews,
        })
    }

    async fn fetch_search(&self, product: &str) -> Result<SourcePayload> {
        let query = format!("{} Review", product);
        info!(query = %query, "Fetching Google search results");
        let body = self
            .get_json(
                SourceKind::GoogleSearch,
                &[("engine", "google".to_string()), ("q", query.clone())],
            )
            .await?;

        let results = parse_organic_results(&body);
        info!(query = %query, count = results.len(), "Fetched Google search results");
        Ok(SourcePayload::GoogleSearch { query, results })
    }
}

#[async_trait]
impl SourceFetcher for SerpApiFetcher {
    async fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload> {
        match request {
            SourceRequest::GooglePlayStore {
                product_id,
                platform,
            } => self.fetch_play(product_id, platform).await,
            SourceRequest::AppleAppStore {
                product_id,
                country,
                target_reviews,
            } => self.fetch_apple(product_id, country, *target_reviews).await,
            SourceRequest::GoogleSearch { query } => self.fetch_search(query).await,
            SourceRequest::Reddit { .. } => Err(OrchestratorError::SourceFetch {
                kind: SourceKind::Reddit,
                reason: "not served by SerpAPI".to_string(),
            }),
        }
    }
}

pub(crate) fn str_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

pub(crate) fn opt_str_field(value: &Value, key: &str) -> Option<String> {
    Some(str_field(value, key)).filter(|s| !s.is_empty())
}

pub(crate) fn f64_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn u64_field(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn parse_play_reviews(body: &Value) -> Vec<PlayReview> {
    array(body, "reviews")
        .iter()
        .map(|r| PlayReview {
            rating: f64_field(r, "rating"),
            snippet: str_field(r, "snippet"),
            likes: u64_field(r, "likes"),
            iso_date: opt_str_field(r, "iso_date"),
        })
        .collect()
}

fn parse_apple_page(body: &Value) -> (Vec<AppStoreReview>, bool) {
    let reviews = array(body, "reviews")
        .iter()
        .map(|r| AppStoreReview {
            title: str_field(r, "title"),
            text: str_field(r, "text"),
            rating: f64_field(r, "rating"),
            review_date: opt_str_field(r, "review_date"),
            reviewed_version: opt_str_field(r, "reviewed_version"),
        })
        .collect();
    let has_next = body
        .get("serpapi_pagination")
        .and_then(|p| p.get("next"))
        .is_some();
    (reviews, has_next)
}

fn parse_organic_results(body: &Value) -> Vec<SearchResult> {
    array(body, "organic_results")
        .iter()
        .map(|r| SearchResult {
            link: str_field(r, "link"),
            snippet: str_field(r, "snippet"),
            source: opt_str_field(r, "source"),
            rich_snippet: r.get("rich_snippet").cloned(),
            sitelinks: r.get("sitelinks").cloned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_play_reviews() {
        let body = json!({
            "reviews": [
                {"rating": 5, "snippet": "Love it", "likes": 12, "iso_date": "2024-05-01T00:00:00Z"},
                {"rating": "2", "snippet": "Crashes"}
            ]
        });
        let reviews = parse_play_reviews(&body);
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].rating, Some(5.0));
        assert_eq!(reviews[0].likes, Some(12));
        assert_eq!(reviews[1].rating, Some(2.0));
        assert_eq!(reviews[1].iso_date, None);
    }

    #[test]
    fn test_parse_apple_page_pagination() {
        let body = json!({
            "reviews": [{"title": "Meh", "text": "Slow", "rating": 3, "reviewed_version": "1.2"}],
            "serpapi_pagination": {"next": "https://serpapi.com/..."}
        });
        let (reviews, has_next) = parse_apple_page(&body);
        assert!(has_next);
        assert_eq!(reviews[0].reviewed_version.as_deref(), Some("1.2"));

        let (reviews, has_next) = parse_apple_page(&json!({"reviews": []}));
        assert!(reviews.is_empty());
        assert!(!has_next);
    }

    #[test]
    fn test_parse_organic_results_keeps_rich_fields() {
        let body = json!({
            "organic_results": [{
                "link": "https://example.com/review",
                "snippet": "Solid app",
                "source": "Example",
                "rich_snippet": {"top": {"extensions": ["4.5 stars"]}}
            }]
        });
        let results = parse_organic_results(&body);
        assert_eq!(results[0].link, "https://example.com/review");
        assert!(results[0].rich_snippet.is_some());
        assert!(results[0].sitelinks.is_none());
        assert!(parse_organic_results(&json!({})).is_empty());
    }
}
