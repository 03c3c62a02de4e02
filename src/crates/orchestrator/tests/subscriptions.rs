mod common;

use std::sync::Arc;
use std::time::Duration;

use common::memory_store;
use orchestrator::realtime::{ChannelObserver, ObserverMessage, SubscriptionManager, SubscriptionSettings};
use orchestrator::store::TaskStatus;

fn manager(store: &orchestrator::store::TaskStore) -> SubscriptionManager {
    SubscriptionManager::new(
        store.clone(),
        SubscriptionSettings {
            poll_interval: Duration::from_millis(200),
            send_timeout: Duration::from_millis(500),
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_late_subscriber_sees_completed_snapshot() {
    let store = memory_store();
    store.create("done", Vec::new(), serde_json::json!({})).await.unwrap();
    store
        .update_status("done", TaskStatus::Running, 40, "Working")
        .await
        .unwrap();
    store
        .update_status("done", TaskStatus::Completed, 100, "Analysis complete!")
        .await
        .unwrap();

    let manager = manager(&store);
    let (observer, mut rx) = ChannelObserver::channel("late", 8);
    manager.subscribe("done", Arc::new(observer)).await.unwrap();

    match rx.recv().await {
        Some(ObserverMessage::Snapshot(view)) => {
            assert_eq!(view.status, TaskStatus::Completed);
            assert_eq!(view.progress, 100);
        }
        other => panic!("expected snapshot, got {:?}", other),
    }

    // No replay of earlier progress, only the summary from the first poll
    match rx.recv().await {
        Some(ObserverMessage::Final(summary)) => assert_eq!(summary.status, TaskStatus::Completed),
        other => panic!("expected final summary, got {:?}", other),
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!manager.has_listener("done"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_task_gets_not_found_snapshot() {
    let store = memory_store();
    let manager = manager(&store);
    let (observer, mut rx) = ChannelObserver::channel("o", 8);
    let id = manager.subscribe("ghost", Arc::new(observer)).await.unwrap();

    let message = rx.recv().await.unwrap();
    assert_eq!(message, ObserverMessage::not_found("ghost"));
    let json: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
    assert_eq!(json["error"], "Task not found");

    assert!(manager.unsubscribe("ghost", id));
    assert!(!manager.has_listener("ghost"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_task_summary_carries_error() {
    let store = memory_store();
    store.create("bad", Vec::new(), serde_json::json!({})).await.unwrap();

    let manager = manager(&store);
    let (observer, mut rx) = ChannelObserver::channel("o", 8);
    manager.subscribe("bad", Arc::new(observer)).await.unwrap();
    assert!(matches!(rx.recv().await, Some(ObserverMessage::Snapshot(_))));

    store.set_error("bad", "No valid results from any scraper").await.unwrap();

    match rx.recv().await {
        Some(ObserverMessage::Progress(event)) => {
            assert_eq!(event.status, TaskStatus::Failed);
            assert_eq!(event.progress, 0);
            assert_eq!(event.total, 100);
        }
        other => panic!("expected progress, got {:?}", other),
    }
    match rx.recv().await {
        Some(ObserverMessage::Final(summary)) => {
            assert_eq!(summary.progress, 0);
            assert!(!summary.result_available);
            assert_eq!(summary.error.as_deref(), Some("No valid results from any scraper"));
        }
        other => panic!("expected final summary, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_last_observer_leaving_stops_listener() {
    let store = memory_store();
    store.create("t", Vec::new(), serde_json::json!({})).await.unwrap();
    let manager = manager(&store);

    let (first, _rx1) = ChannelObserver::channel("a", 8);
    let (second, _rx2) = ChannelObserver::channel("b", 8);
    let a = manager.subscribe("t", Arc::new(first)).await.unwrap();
    let b = manager.subscribe("t", Arc::new(second)).await.unwrap();
    assert_eq!(manager.observer_count("t"), 2);
    assert!(manager.has_listener("t"));

    manager.unsubscribe("t", a);
    assert!(manager.has_listener("t"));
    manager.unsubscribe("t", b);
    assert!(!manager.has_listener("t"));
    assert_eq!(manager.active_tasks(), 0);
}
