//! Review and search sources
//!
//! Requests and payloads are tagged per source kind so the orchestrator can
//! dispatch on the tag. Fetchers sit behind [`SourceFetcher`] and are looked
//! up in a [`FetcherRegistry`].

pub mod document;
pub mod fetcher;
pub mod model;
pub mod reddit;
pub mod request;
pub mod serpapi;

pub use document::{
    build_document, extract_search_urls, CombinedDocument, DataSummary, SourceSummary,
    BLOCK_SEPARATOR,
};
pub use fetcher::{FetcherRegistry, SourceFetcher};
pub use model::{
    AppStoreReview, ForumPost, PlayReview, SearchResult, SourceKind, SourcePayload, SourceRequest,
};
pub use reddit::RedditFetcher;
pub use request::{AppleStoreParams, GooglePlayParams, GoogleSearchParams, RedditParams, ScrapeRequest};
pub use serpapi::SerpApiFetcher;
