//! Broker transport trait for message-queue delivery

use thiserror::Error;

/// Connectivity-class failures from the broker transport.
///
/// Every variant is retryable: the retry policy in [`crate::broker::BrokerLink`]
/// treats "broker unreachable" and "channel closed by peer" identically, with a
/// full reconnect-and-resend cycle. There is no permanently-rejected message.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Channel error: {0}")]
    Channel(String),
    #[error("Stream lost: {0}")]
    Stream(String),
}

/// Trait for single-attempt broker operations
///
/// Production: AMQP connection + channel via `lapin`
/// Testing: recorded publishes with configurable failures
///
/// Implementations own the connection and channel state exclusively; callers
/// only see connected/disconnected. Retry and backoff live one layer up in
/// `BrokerLink` so they can be tested against this seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BrokerTransport: Send + Sync {
    /// Establish a connection, open a channel, and declare the durable
    /// target queue. One attempt; no internal retry.
    async fn connect(&self) -> Result<(), BrokerError>;

    /// Whether the last known connection state is usable.
    fn is_connected(&self) -> bool;

    /// Hand one message to the channel and wait for the transport-level
    /// acknowledgement. One attempt; no internal retry.
    async fn publish(&self, message: &str) -> Result<(), BrokerError>;
}
