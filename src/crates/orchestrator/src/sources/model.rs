//! Source identifiers, per-source requests and the items they return

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kinds of source a task can draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    GooglePlayStore,
    AppleAppStore,
    Reddit,
    GoogleSearch,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::GooglePlayStore,
        SourceKind::AppleAppStore,
        SourceKind::Reddit,
        SourceKind::GoogleSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::GooglePlayStore => "google_play_store",
            SourceKind::AppleAppStore => "apple_app_store",
            SourceKind::Reddit => "reddit",
            SourceKind::GoogleSearch => "google_search",
        }
    }

    /// Human-readable name used in logs and progress messages.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::GooglePlayStore => "Google Play Store",
            SourceKind::AppleAppStore => "Apple App Store",
            SourceKind::Reddit => "Reddit",
            SourceKind::GoogleSearch => "Google Search",
        }
    }

    /// Whether items from this source carry a numeric star rating.
    pub fn is_rating_bearing(&self) -> bool {
        matches!(self, SourceKind::GooglePlayStore | SourceKind::AppleAppStore)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| format!("unknown source: {}", s))
    }
}

/// Parameters for one source fetch, tagged by source kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceRequest {
    GooglePlayStore {
        product_id: String,
        platform: String,
    },
    AppleAppStore {
        product_id: String,
        country: String,
        target_reviews: u32,
    },
    Reddit {
        keyword: String,
        limit_pages: u32,
    },
    GoogleSearch {
        query: String,
    },
}

impl SourceRequest {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceRequest::GooglePlayStore { .. } => SourceKind::GooglePlayStore,
            SourceRequest::AppleAppStore { .. } => SourceKind::AppleAppStore,
            SourceRequest::Reddit { .. } => SourceKind::Reddit,
            SourceRequest::GoogleSearch { .. } => SourceKind::GoogleSearch,
        }
    }

    /// Short description of the target, e.g. the product id or keyword.
    pub fn target(&self) -> &str {
        match self {
            SourceRequest::GooglePlayStore { product_id, .. }
            | SourceRequest::AppleAppStore { product_id, .. } => product_id,
            SourceRequest::Reddit { keyword, .. } => keyword,
            SourceRequest::GoogleSearch { query } => query,
        }
    }
}

/// A Google Play review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayReview {
    pub rating: Option<f64>,
    pub snippet: String,
    pub likes: Option<u64>,
    pub iso_date: Option<String>,
}

/// An App Store review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppStoreReview {
    pub title: String,
    pub text: String,
    pub rating: Option<f64>,
    pub review_date: Option<String>,
    pub reviewed_version: Option<String>,
}

/// A forum thread with its top comments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForumPost {
    pub title: String,
    pub posted: Option<String>,
    pub comment_count: Option<u64>,
    pub body: String,
    pub comments: Vec<String>,
    pub url: Option<String>,
}

/// An organic web search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub link: String,
    pub snippet: String,
    pub source: Option<String>,
    pub rich_snippet: Option<serde_json::Value>,
    pub sitelinks: Option<serde_json::Value>,
}

/// What a fetch returned, tagged by source kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourcePayload {
    GooglePlayStore {
        product_id: String,
        platform: String,
        reviews: Vec<PlayReview>,
    },
    AppleAppStore {
        product_id: String,
        country: String,
        reviews: Vec<AppStoreReview>,
    },
    Reddit {
        keyword: String,
        posts: Vec<ForumPost>,
    },
    GoogleSearch {
        query: String,
        results: Vec<SearchResult>,
    },
}

impl SourcePayload {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourcePayload::GooglePlayStore { .. } => SourceKind::GooglePlayStore,
            SourcePayload::AppleAppStore { .. } => SourceKind::AppleAppStore,
            SourcePayload::Reddit { .. } => SourceKind::Reddit,
            SourcePayload::GoogleSearch { .. } => SourceKind::GoogleSearch,
        }
    }

    pub fn item_count(&self) -> usize {
        match self {
            SourcePayload::GooglePlayStore { reviews, .. } => reviews.len(),
            SourcePayload::AppleAppStore { reviews, .. } => reviews.len(),
            SourcePayload::Reddit { posts, .. } => posts.len(),
            SourcePayload::GoogleSearch { results, .. } => results.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Non-zero star ratings carried by the items.
    pub fn ratings(&self) -> Vec<f64> {
        let ratings: Box<dyn Iterator<Item = Option<f64>>> = match self {
            SourcePayload::GooglePlayStore { reviews, .. } => {
                Box::new(reviews.iter().map(|r| r.rating))
            }
            SourcePayload::AppleAppStore { reviews, .. } => {
                Box::new(reviews.iter().map(|r| r.rating))
            }
            _ => Box::new(std::iter::empty()),
        };
        ratings.flatten().filter(|r| *r != 0.0).collect()
    }

    /// Links of search results, in order.
    pub fn search_links(&self) -> Vec<&str> {
        match self {
            SourcePayload::GoogleSearch { results, .. } => results
                .iter()
                .map(|r| r.link.as_str())
                .filter(|link| !link.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}
