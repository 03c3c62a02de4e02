//! Observer delivery errors

use std::fmt;

/// Errors delivering a message to an observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsError {
    /// The observer's connection is gone
    ClientDisconnected(String),
    /// Delivery did not finish in time (transient)
    Timeout { observer_id: String, timeout_ms: u64 },
    /// The observer's outbound queue is full (transient)
    BackpressureFull { observer_id: String },
    /// Message could not be encoded
    InvalidMessage(String),
    /// Socket-level failure
    ConnectionError(String),
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WsError::ClientDisconnected(id) => write!(f, "Observer {} disconnected", id),
            WsError::Timeout {
                observer_id,
                timeout_ms,
            } => write!(f, "Delivery to {} timed out after {}ms", observer_id, timeout_ms),
            WsError::BackpressureFull { observer_id } => {
                write!(f, "Outbound queue full for {}", observer_id)
            }
            WsError::InvalidMessage(msg) => write!(f, "Invalid message: {}", msg),
            WsError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
        }
    }
}

impl std::error::Error for WsError {}

impl WsError {
    /// Check if error is transient (can retry)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WsError::Timeout { .. } | WsError::BackpressureFull { .. } | WsError::ConnectionError(_)
        )
    }
}

/// Result type for observer delivery
pub type WsResult<T> = std::result::Result<T, WsError>;
