//! Delivery guarantee layer over the broker transport
//!
//! `BrokerLink` owns the retry discipline: connect and publish block the
//! caller, retrying with a fixed backoff until the broker cooperates. There
//! is no retry bound; if the broker is down for an extended period the
//! process is expected to be supervised externally. Blocking the scan loop
//! here is intentional backpressure: no further files are declared ready
//! while delivery is stalled.

use std::sync::Arc;
use std::time::Duration;

use crate::traits::BrokerTransport;

pub struct BrokerLink {
    transport: Arc<dyn BrokerTransport>,
    backoff: Duration,
}

impl BrokerLink {
    pub fn new(transport: Arc<dyn BrokerTransport>, backoff: Duration) -> Self {
        Self { transport, backoff }
    }

    /// Connect to the broker, retrying forever with a fixed backoff.
    ///
    /// Returns only once a connection is established, the channel is open,
    /// and the durable queue is declared.
    pub async fn connect(&self) {
        loop {
            match self.transport.connect().await {
                Ok(()) => {
                    tracing::info!("Connected to broker");
                    return;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Connection to broker failed");
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }

    /// Deliver one message, retrying forever until the broker accepts it.
    ///
    /// Any connectivity-class failure tears down the connection assumption,
    /// reconnects, waits the backoff, and resends the same message. The
    /// message is never abandoned; the call returns only after the transport
    /// acknowledged delivery. A call in progress is not cancellable.
    pub async fn publish(&self, message: &str) {
        loop {
            if !self.transport.is_connected() {
                self.connect().await;
            }
            match self.transport.publish(message).await {
                Ok(()) => {
                    tracing::info!(message = %message, "Sent to broker");
                    return;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to send message, reconnecting to broker");
                    self.connect().await;
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }
}
