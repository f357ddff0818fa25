//! lapin-based AMQP broker transport implementation

use std::sync::Mutex;

use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};

use crate::config::BrokerConfig;
use crate::traits::{BrokerError, BrokerTransport};

struct AmqpState {
    connection: Connection,
    channel: Channel,
}

/// Single connection + channel to RabbitMQ.
///
/// The connection handle is owned here and nowhere else; callers interact
/// only through the [`BrokerTransport`] contract. Heartbeats run on lapin's
/// background I/O driver, so nothing needs to service the connection from
/// the scan loop.
pub struct AmqpTransport {
    uri: String,
    queue: String,
    state: Mutex<Option<AmqpState>>,
}

impl AmqpTransport {
    pub fn new(config: &BrokerConfig) -> Self {
        tracing::debug!(
            host = %config.host,
            port = config.port,
            queue = %config.queue,
            "Initialized AMQP transport"
        );
        Self {
            uri: config.amqp_uri(),
            queue: config.queue.clone(),
            state: Mutex::new(None),
        }
    }

    /// Grab a channel clone without holding the lock across an await point.
    fn current_channel(&self) -> Option<Channel> {
        self.state
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.channel.clone())
    }
}

fn map_error(e: lapin::Error) -> BrokerError {
    match e {
        lapin::Error::IOError(_) => BrokerError::Stream(e.to_string()),
        lapin::Error::InvalidChannel(_) | lapin::Error::InvalidChannelState(_) => {
            BrokerError::Channel(e.to_string())
        }
        _ => BrokerError::Connection(e.to_string()),
    }
}

#[async_trait::async_trait]
impl BrokerTransport for AmqpTransport {
    async fn connect(&self) -> Result<(), BrokerError> {
        let connection = Connection::connect(&self.uri, ConnectionProperties::default())
            .await
            .map_err(map_error)?;
        let channel = connection.create_channel().await.map_err(map_error)?;
        // Publisher confirms give the transport-level acknowledgement that
        // publish() is contracted to wait for
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(map_error)?;
        channel
            .queue_declare(
                &self.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(map_error)?;

        tracing::info!(queue = %self.queue, "Broker channel open, durable queue declared");
        *self.state.lock().unwrap() = Some(AmqpState {
            connection,
            channel,
        });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.connection.status().connected() && s.channel.status().connected())
            .unwrap_or(false)
    }

    async fn publish(&self, message: &str) -> Result<(), BrokerError> {
        let channel = self
            .current_channel()
            .ok_or_else(|| BrokerError::Connection("not connected".to_string()))?;

        let confirm = channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                message.as_bytes(),
                BasicProperties::default(),
            )
            .await
            .map_err(map_error)?;
        let confirmation = confirm.await.map_err(map_error)?;

        if matches!(confirmation, Confirmation::Nack(_)) {
            return Err(BrokerError::Channel("publish nacked by broker".to_string()));
        }
        Ok(())
    }
}
