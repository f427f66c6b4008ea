use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::commands::{
    parse_command, CommandEnvelope, CommandRouter, ConcertCommandService, GameCommandService,
    MessagePayload,
};
use crate::messenger::{ChannelId, Messenger};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Inbound side of the chat connection. A `None` message means the stream
/// closed cleanly.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_message(&self) -> Result<Option<MessagePayload>, TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopGatewayTransport;

#[async_trait]
impl GatewayTransport for NoopGatewayTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_message(&self) -> Result<Option<MessagePayload>, TransportError> {
        Ok(None)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Connects to the gateway, pumps inbound messages through the command
/// router, and replies on the originating channel. Transport failures are
/// retried with exponential backoff; routing failures are logged and the
/// pump continues.
pub struct GatewayRunner<C, G> {
    transport: Arc<dyn GatewayTransport>,
    router: CommandRouter<C, G>,
    messenger: Arc<dyn Messenger>,
    command_prefix: String,
    reconnect_policy: ReconnectPolicy,
}

impl<C, G> GatewayRunner<C, G>
where
    C: ConcertCommandService,
    G: GameCommandService,
{
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        router: CommandRouter<C, G>,
        messenger: Arc<dyn Messenger>,
        command_prefix: impl Into<String>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self {
            transport,
            router,
            messenger,
            command_prefix: command_prefix.into(),
            reconnect_policy,
        }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "gateway transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "gateway retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening gateway transport connection");
        self.transport.connect().await?;
        info!(attempt, "gateway transport connected");

        loop {
            let Some(message) = self.transport.next_message().await? else {
                info!(attempt, "gateway transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            self.handle_message(message).await;
        }
    }

    async fn handle_message(&self, message: MessagePayload) {
        let Some(command) = parse_command(&self.command_prefix, &message.text) else {
            debug!(
                event_name = "ingress.message.ignored",
                message_id = %message.message_id,
                "message is not a command"
            );
            return;
        };

        info!(
            event_name = "ingress.command.received",
            message_id = %message.message_id,
            correlation_id = %message.message_id,
            channel_id = %message.channel_id,
            author = %message.author,
            "received command"
        );

        let envelope = CommandEnvelope {
            channel_id: message.channel_id.clone(),
            author: message.author.clone(),
            correlation_id: message.message_id.clone(),
        };

        let reply = match self.router.route(command, &envelope).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    event_name = "ingress.command.route_failed",
                    message_id = %message.message_id,
                    correlation_id = %message.message_id,
                    error = %error,
                    "command routing failed; continuing gateway loop"
                );
                return;
            }
        };

        let channel = ChannelId(message.channel_id.clone());
        for text in &reply.messages {
            if let Err(error) = self.messenger.send(&channel, text).await {
                warn!(
                    event_name = "egress.message.send_failed",
                    message_id = %message.message_id,
                    correlation_id = %message.message_id,
                    channel_id = %message.channel_id,
                    error = %error,
                    "reply delivery failed; continuing gateway loop"
                );
                return;
            }
        }
    }
}
