//! Live progress distribution
//!
//! The [`ProgressBus`] carries one broadcast channel per task. The
//! [`SubscriptionManager`] sits on top: it replays a snapshot to each new
//! observer, runs one listener per observed task, and sends a final summary
//! once the task is done.

pub mod bus;
pub mod error;
pub mod events;
pub mod manager;
pub mod observer;

pub use bus::{ProgressBus, DEFAULT_CHANNEL_CAPACITY};
pub use error::{WsError, WsResult};
pub use events::{FinalSummary, ObserverMessage, ProgressEvent, PROGRESS_TOTAL};
pub use manager::{ObserverId, SubscriptionManager, SubscriptionSettings};
pub use observer::{ChannelObserver, Observer};
