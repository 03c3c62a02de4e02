//! Per-task progress channels

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

use super::events::ProgressEvent;

/// Default per-task channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Publish/subscribe channel keyed by task id.
///
/// Delivery is best effort. Events published while a task has no subscriber
/// are dropped, and a lagging receiver loses the oldest events. Readers that
/// need the current state read the store.
#[derive(Clone)]
pub struct ProgressBus {
    channels: Arc<DashMap<String, broadcast::Sender<ProgressEvent>>>,
    capacity: usize,
}

impl ProgressBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Publish an event on its task's channel.
    ///
    /// Returns the number of receivers reached.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        let task_id = event.task_id.clone();
        let Some(sender) = self.channels.get(&task_id).map(|s| s.clone()) else {
            trace!(task_id = %task_id, "No subscribers, event dropped");
            return 0;
        };

        match sender.send(event) {
            Ok(n) => n,
            Err(_) => {
                // Every receiver is gone
                self.channels
                    .remove_if(&task_id, |_, s| s.receiver_count() == 0);
                0
            }
        }
    }

    /// Open a receiver for a task's channel, creating the channel if needed.
    pub fn subscribe(&self, task_id: &str) -> broadcast::Receiver<ProgressEvent> {
        self.channels
            .entry(task_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drop a task's channel once nobody listens to it.
    pub fn release_if_unused(&self, task_id: &str) -> bool {
        self.channels
            .remove_if(task_id, |_, s| s.receiver_count() == 0)
            .is_some()
    }

    pub fn has_channel(&self, task_id: &str) -> bool {
        self.channels.contains_key(task_id)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStatus;

    fn event(task: &str, progress: u8) -> ProgressEvent {
        ProgressEvent::new(task, TaskStatus::Running, progress, "working")
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let bus = ProgressBus::default();
        assert_eq!(bus.publish(event("t1", 5)), 0);
        assert!(!bus.has_channel("t1"));
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = ProgressBus::default();
        let mut a = bus.subscribe("t1");
        let mut b = bus.subscribe("t1");
        let mut other = bus.subscribe("t2");

        assert_eq!(bus.publish(event("t1", 5)), 2);
        assert_eq!(bus.publish(event("t1", 10)), 2);

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.recv().await.unwrap().progress, 5);
            assert_eq!(rx.recv().await.unwrap().progress, 10);
        }
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_channel_released_when_unused() {
        let bus = ProgressBus::default();
        let rx = bus.subscribe("t1");
        assert!(!bus.release_if_unused("t1"));
        drop(rx);
        assert!(bus.release_if_unused("t1"));
        assert_eq!(bus.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_after_receivers_dropped_cleans_up() {
        let bus = ProgressBus::default();
        drop(bus.subscribe("t1"));
        assert_eq!(bus.publish(event("t1", 5)), 0);
        assert!(!bus.has_channel("t1"));
    }

    #[tokio::test]
    async fn test_lagging_receiver_loses_oldest() {
        let bus = ProgressBus::new(2);
        let mut rx = bus.subscribe("t1");
        for p in [1, 2, 3] {
            bus.publish(event("t1", p));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.unwrap().progress, 2);
    }
}
