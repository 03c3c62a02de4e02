//! Scrape, task lookup and prioritize handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::analysis::PrioritizeRequest;
use crate::api::error::ApiResult;
use crate::api::models::{PrioritizeResponse, ScrapeResponse};
use crate::api::routes::AppState;
use crate::sources::{
    AppleStoreParams, GoogleSearchParams, GooglePlayParams, RedditParams, ScrapeRequest,
};
use crate::store::TaskView;

/// Handler for POST /api/v1/scrape
///
/// Creates the task and returns at once; the run continues in the background.
pub async fn start_scrape(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> ApiResult<Json<ScrapeResponse>> {
    let started = state.service.start_scrape(request).await?;
    Ok(Json(started.into()))
}

/// Handler for GET /api/v1/task/:id
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<TaskView>> {
    Ok(Json(state.service.get_task(&task_id).await?))
}

/// Handler for POST /api/v1/prioritize
pub async fn prioritize(
    State(state): State<AppState>,
    Json(request): Json<PrioritizeRequest>,
) -> ApiResult<Json<PrioritizeResponse>> {
    let plan = state.service.prioritize(&request).await?;
    Ok(Json(PrioritizeResponse {
        task_id: request.task_id,
        plan,
    }))
}

/// Handler for POST /api/v1/scrape/google-play
pub async fn scrape_google_play(
    state: State<AppState>,
    Json(params): Json<GooglePlayParams>,
) -> ApiResult<Json<ScrapeResponse>> {
    let mut request = single_source(&params.product_id);
    request.google_play = Some(params);
    start_scrape(state, Json(request)).await
}

/// Handler for POST /api/v1/scrape/apple-store
pub async fn scrape_apple_store(
    state: State<AppState>,
    Json(params): Json<AppleStoreParams>,
) -> ApiResult<Json<ScrapeResponse>> {
    let mut request = single_source(&params.product_id);
    request.apple_store = Some(params);
    start_scrape(state, Json(request)).await
}

/// Handler for POST /api/v1/scrape/reddit
pub async fn scrape_reddit(
    state: State<AppState>,
    Json(params): Json<RedditParams>,
) -> ApiResult<Json<ScrapeResponse>> {
    let mut request = single_source(&params.keyword);
    request.include_reddit = true;
    request.reddit = Some(params);
    start_scrape(state, Json(request)).await
}

/// Handler for POST /api/v1/scrape/google-search
pub async fn scrape_google_search(
    state: State<AppState>,
    Json(params): Json<GoogleSearchParams>,
) -> ApiResult<Json<ScrapeResponse>> {
    let mut request = single_source(&params.product_name);
    request.include_google_search = true;
    request.google_search = Some(params);
    start_scrape(state, Json(request)).await
}

fn single_source(product_name: &str) -> ScrapeRequest {
    ScrapeRequest::new(product_name)
        .without_reddit()
        .without_google_search()
}
