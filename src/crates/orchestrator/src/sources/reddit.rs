//! Forum thread fetcher over Reddit's public JSON listings

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::sources::fetcher::SourceFetcher;
use crate::sources::model::{ForumPost, SourceKind, SourcePayload, SourceRequest};
use crate::sources::serpapi::{str_field, u64_field};
use crate::{OrchestratorError, Result};

pub const REDDIT_BASE_URL: &str = "https://old.reddit.com";

const PAGE_SIZE: u32 = 25;
const COMMENTS_PER_POST: usize = 20;
const USER_AGENT: &str = "reviewpulse-orchestrator/0.1";

/// Searches Reddit for `"{keyword} Review"` and collects each thread's body
/// and top comments.
#[derive(Clone)]
pub struct RedditFetcher {
    client: Client,
    base_url: String,
}

impl RedditFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                OrchestratorError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<Value> {
        let fail = |reason: String| OrchestratorError::SourceFetch {
            kind: SourceKind::Reddit,
            reason,
        };
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fail(format!("HTTP {}", response.status())));
        }
        response.json().await.map_err(|e| fail(e.to_string()))
    }

    async fn fetch_comments(&self, permalink: &str) -> Vec<String> {
        let url = format!("{}{}.json", self.base_url, permalink.trim_end_matches('/'));
        match self
            .get_json(&url, &[("limit", COMMENTS_PER_POST.to_string())])
            .await
        {
            Ok(body) => parse_comments(&body),
            Err(e) => {
                debug!(permalink, error = %e, "Could not load thread comments");
                Vec::new()
            }
        }
    }

    async fn search(&self, keyword: &str, limit_pages: u32) -> Result<SourcePayload> {
        let query = format!("{} Review", keyword);
        let url = format!("{}/search.json", self.base_url);
        let mut listings = Vec::new();
        let mut after: Option<String> = None;

        for page in 1..=limit_pages {
            let mut params = vec![
                ("q", query.clone()),
                ("sort", "relevance".to_string()),
                ("limit", PAGE_SIZE.to_string()),
            ];
            if let Some(cursor) = &after {
                params.push(("after", cursor.clone()));
            }

            let body = self.get_json(&url, &params).await?;
            let (posts, next) = parse_listing(&body);
            debug!(keyword, page, count = posts.len(), "Fetched search page");
            listings.extend(posts);

            match next {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        let comment_fetches = listings.iter().map(|(_, permalink)| async move {
            match permalink {
                Some(p) => self.fetch_comments(p).await,
                None => Vec::new(),
            }
        });
        let comments = join_all(comment_fetches).await;

        let posts: Vec<ForumPost> = listings
            .into_iter()
            .zip(comments)
            .map(|((mut post, _), comments)| {
                post.comment_count = post.comment_count.or(Some(comments.len() as u64));
                post.comments = comments;
                post
            })
            .collect();

        info!(keyword, count = posts.len(), "Fetched Reddit threads");
        Ok(SourcePayload::Reddit {
            keyword: keyword.to_string(),
            posts,
        })
    }
}

#[async_trait]
impl SourceFetcher for RedditFetcher {
    async fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload> {
        match request {
            SourceRequest::Reddit {
                keyword,
                limit_pages,
            } => self.search(keyword, *limit_pages).await,
            other => Err(OrchestratorError::SourceFetch {
                kind: other.kind(),
                reason: "not served by the Reddit fetcher".to_string(),
            }),
        }
    }
}

/// Posts on one listing page with their permalinks, plus the next-page cursor.
fn parse_listing(body: &Value) -> (Vec<(ForumPost, Option<String>)>, Option<String>) {
    let data = body.get("data");
    let posts = data
        .and_then(|d| d.get("children"))
        .and_then(Value::as_array)
        .map(|children| {
            children
                .iter()
                .filter_map(|child| child.get("data"))
                .map(|post| {
                    let permalink = Some(str_field(post, "permalink")).filter(|p| !p.is_empty());
                    let posted = post
                        .get("created_utc")
                        .and_then(Value::as_f64)
                        .and_then(|ts| chrono::DateTime::from_timestamp(ts as i64, 0))
                        .map(|dt| dt.to_rfc3339());
                    let url = permalink.as_ref().map(|p| format!("https://www.reddit.com{}", p));
                    (
                        ForumPost {
                            title: str_field(post, "title"),
                            posted,
                            comment_count: u64_field(post, "num_comments"),
                            body: str_field(post, "selftext"),
                            comments: Vec::new(),
                            url,
                        },
                        permalink,
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    let next = data
        .and_then(|d| d.get("after"))
        .and_then(Value::as_str)
        .map(str::to_string);
    (posts, next)
}

/// Comment bodies from a thread document (`[post, comments]`).
fn parse_comments(body: &Value) -> Vec<String> {
    body.get(1)
        .and_then(|listing| listing.get("data"))
        .and_then(|d| d.get("children"))
        .and_then(Value::as_array)
        .map(|children| {
            children
                .iter()
                .filter(|c| c.get("kind").and_then(Value::as_str) == Some("t1"))
                .filter_map(|c| c.get("data"))
                .map(|c| str_field(c, "body"))
                .filter(|b| !b.trim().is_empty())
                .take(COMMENTS_PER_POST)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_listing() {
        let body = json!({
            "data": {
                "after": "t3_next",
                "children": [
                    {"kind": "t3", "data": {
                        "title": "Is it worth it?",
                        "created_utc": 1700000000.0,
                        "num_comments": 4,
                        "selftext": "Thinking of switching",
                        "permalink": "/r/apps/comments/abc/is_it_worth_it/"
                    }}
                ]
            }
        });
        let (posts, next) = parse_listing(&body);
        assert_eq!(next.as_deref(), Some("t3_next"));
        assert_eq!(posts.len(), 1);
        let (post, permalink) = &posts[0];
        assert_eq!(post.title, "Is it worth it?");
        assert_eq!(post.comment_count, Some(4));
        assert!(post.posted.as_deref().unwrap_or("").starts_with("2023-11-14"));
        assert_eq!(permalink.as_deref(), Some("/r/apps/comments/abc/is_it_worth_it/"));
    }

    #[test]
    fn test_parse_comments_skips_non_comments() {
        let body = json!([
            {"data": {"children": []}},
            {"data": {"children": [
                {"kind": "t1", "data": {"body": "Works for me"}},
                {"kind": "more", "data": {"count": 10}},
                {"kind": "t1", "data": {"body": "  "}}
            ]}}
        ]);
        assert_eq!(parse_comments(&body), vec!["Works for me"]);
        assert!(parse_comments(&json!({})).is_empty());
    }
}
