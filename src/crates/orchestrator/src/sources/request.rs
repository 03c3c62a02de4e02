//! Multi-source scrape request

use serde::{Deserialize, Serialize};

use crate::sources::model::{SourceKind, SourceRequest};
use crate::{OrchestratorError, Result};

/// Google Play parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GooglePlayParams {
    pub product_id: String,
    #[serde(default = "default_platform")]
    pub platform: String,
}

/// App Store parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppleStoreParams {
    pub product_id: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_target_reviews")]
    pub target_reviews: u32,
}

/// Forum search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditParams {
    pub keyword: String,
    #[serde(default = "default_limit_pages")]
    pub limit_pages: u32,
}

/// Web search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleSearchParams {
    pub product_name: String,
}

/// The configuration a task is created from.
///
/// Store sources run only when their parameters are given. Reddit and web
/// search run by default and fall back to `product_name` for their query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub product_name: String,
    #[serde(default)]
    pub google_play: Option<GooglePlayParams>,
    #[serde(default)]
    pub apple_store: Option<AppleStoreParams>,
    #[serde(default)]
    pub reddit: Option<RedditParams>,
    #[serde(default)]
    pub google_search: Option<GoogleSearchParams>,
    #[serde(default = "default_true")]
    pub include_reddit: bool,
    #[serde(default = "default_true")]
    pub include_google_search: bool,
}

impl ScrapeRequest {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            google_play: None,
            apple_store: None,
            reddit: None,
            google_search: None,
            include_reddit: true,
            include_google_search: true,
        }
    }

    pub fn with_google_play(mut self, product_id: impl Into<String>) -> Self {
        self.google_play = Some(GooglePlayParams {
            product_id: product_id.into(),
            platform: default_platform(),
        });
        self
    }

    pub fn with_apple_store(mut self, product_id: impl Into<String>) -> Self {
        self.apple_store = Some(AppleStoreParams {
            product_id: product_id.into(),
            country: default_country(),
            target_reviews: default_target_reviews(),
        });
        self
    }

    pub fn without_reddit(mut self) -> Self {
        self.include_reddit = false;
        self
    }

    pub fn without_google_search(mut self) -> Self {
        self.include_google_search = false;
        self
    }

    /// One request per configured source, in a fixed order.
    pub fn source_requests(&self) -> Vec<SourceRequest> {
        let mut requests = Vec::new();

        if let Some(play) = &self.google_play {
            requests.push(SourceRequest::GooglePlayStore {
                product_id: play.product_id.clone(),
                platform: play.platform.clone(),
            });
        }
        if let Some(apple) = &self.apple_store {
            requests.push(SourceRequest::AppleAppStore {
                product_id: apple.product_id.clone(),
                country: apple.country.clone(),
                target_reviews: apple.target_reviews,
            });
        }
        if self.include_reddit {
            let (keyword, limit_pages) = match &self.reddit {
                Some(r) => (r.keyword.clone(), r.limit_pages),
                None => (self.product_name.clone(), default_limit_pages()),
            };
            requests.push(SourceRequest::Reddit {
                keyword,
                limit_pages,
            });
        }
        if self.include_google_search {
            let query = self
                .google_search
                .as_ref()
                .map(|g| g.product_name.clone())
                .unwrap_or_else(|| self.product_name.clone());
            requests.push(SourceRequest::GoogleSearch { query });
        }

        requests
    }

    pub fn sources(&self) -> Vec<SourceKind> {
        self.source_requests().iter().map(SourceRequest::kind).collect()
    }

    /// Validate the request before a task is created.
    pub fn validate(&self) -> Result<()> {
        if self.product_name.trim().is_empty() {
            return Err(OrchestratorError::Configuration(
                "product_name must not be empty".to_string(),
            ));
        }
        if let Some(play) = &self.google_play {
            if play.product_id.trim().is_empty() {
                return Err(OrchestratorError::Configuration(
                    "google_play.product_id must not be empty".to_string(),
                ));
            }
        }
        if let Some(apple) = &self.apple_store {
            if apple.product_id.trim().is_empty() {
                return Err(OrchestratorError::Configuration(
                    "apple_store.product_id must not be empty".to_string(),
                ));
            }
            if !(1..=500).contains(&apple.target_reviews) {
                return Err(OrchestratorError::Configuration(format!(
                    "apple_store.target_reviews must be between 1 and 500, got {}",
                    apple.target_reviews
                )));
            }
        }
        if let Some(reddit) = &self.reddit {
            if reddit.keyword.trim().is_empty() {
                return Err(OrchestratorError::Configuration(
                    "reddit.keyword must not be empty".to_string(),
                ));
            }
            if !(1..=50).contains(&reddit.limit_pages) {
                return Err(OrchestratorError::Configuration(format!(
                    "reddit.limit_pages must be between 1 and 50, got {}",
                    reddit.limit_pages
                )));
            }
        }
        if self.source_requests().is_empty() {
            return Err(OrchestratorError::Configuration(
                "No sources configured for scraping".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_platform() -> String {
    "phone".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_target_reviews() -> u32 {
    199
}

fn default_limit_pages() -> u32 {
    2
}

fn default_true() -> bool {
    true
}
