//! Scrape and prioritize responses

use serde::{Deserialize, Serialize};

use crate::analysis::PrioritizationPlan;
use crate::services::StartedTask;
use crate::store::TaskStatus;

/// Response to POST /api/v1/scrape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub message: String,
    /// Path of the live progress socket for this task
    pub websocket_url: String,
}

impl From<StartedTask> for ScrapeResponse {
    fn from(started: StartedTask) -> Self {
        let websocket_url = format!("/ws/task/{}", started.task_id);
        let sources: Vec<&str> = started.sources.iter().map(|kind| kind.as_str()).collect();
        Self {
            task_id: started.task_id,
            status: started.status,
            message: format!("Scraping task started for sources: {}", sources.join(", ")),
            websocket_url,
        }
    }
}

/// Response to POST /api/v1/prioritize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrioritizeResponse {
    pub task_id: String,
    pub plan: PrioritizationPlan,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceKind;

    #[test]
    fn test_scrape_response_points_at_socket() {
        let response = ScrapeResponse::from(StartedTask {
            task_id: "abc".into(),
            status: TaskStatus::Pending,
            sources: vec![SourceKind::Reddit, SourceKind::GoogleSearch],
        });
        assert_eq!(response.websocket_url, "/ws/task/abc");
        assert_eq!(
            response.message,
            "Scraping task started for sources: reddit, google_search"
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "pending");
    }
}
