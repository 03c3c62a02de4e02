//! Observer seam

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::{WsError, WsResult};
use super::events::ObserverMessage;

/// Something that wants a task's messages.
///
/// A failed delivery gets the observer removed from the task.
#[async_trait]
pub trait Observer: Send + Sync {
    async fn deliver(&self, message: ObserverMessage) -> WsResult<()>;
}

/// Observer backed by an mpsc queue, drained by a connection's writer.
#[derive(Clone)]
pub struct ChannelObserver {
    id: String,
    tx: mpsc::Sender<ObserverMessage>,
}

impl ChannelObserver {
    pub fn new(id: impl Into<String>, tx: mpsc::Sender<ObserverMessage>) -> Self {
        Self { id: id.into(), tx }
    }

    /// Observer plus the receiving end of its queue
    pub fn channel(id: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<ObserverMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(id, tx), rx)
    }
}

#[async_trait]
impl Observer for ChannelObserver {
    async fn deliver(&self, message: ObserverMessage) -> WsResult<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| WsError::ClientDisconnected(self.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_observer_delivers() {
        let (observer, mut rx) = ChannelObserver::channel("o1", 4);
        observer.deliver(ObserverMessage::Ping).await.unwrap();
        assert_eq!(rx.recv().await, Some(ObserverMessage::Ping));
    }

    #[tokio::test]
    async fn test_closed_receiver_is_disconnect() {
        let (observer, rx) = ChannelObserver::channel("o1", 4);
        drop(rx);
        let err = observer.deliver(ObserverMessage::Ping).await.unwrap_err();
        assert_eq!(err, WsError::ClientDisconnected("o1".into()));
    }
}
