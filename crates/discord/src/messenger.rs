use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelId(pub String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessengerError {
    #[error("channel `{0}` could not be resolved")]
    ChannelUnresolved(String),
    #[error("message delivery failed: {0}")]
    Delivery(String),
}

/// Outbound delivery port. Digest chunks arrive one call per chunk, already
/// bounded; the messenger never re-splits or batches them.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn resolve_channel(&self, name: &str) -> Result<ChannelId, MessengerError>;
    async fn send(&self, channel: &ChannelId, text: &str) -> Result<(), MessengerError>;
}

/// Offline messenger used until a live transport is wired up: resolves every
/// channel to itself and logs sends instead of delivering them.
#[derive(Default)]
pub struct NoopMessenger;

#[async_trait]
impl Messenger for NoopMessenger {
    async fn resolve_channel(&self, name: &str) -> Result<ChannelId, MessengerError> {
        Ok(ChannelId(name.to_owned()))
    }

    async fn send(&self, channel: &ChannelId, text: &str) -> Result<(), MessengerError> {
        debug!(
            event_name = "egress.message.noop",
            channel = %channel.0,
            length = text.len(),
            "noop messenger dropped outbound message"
        );
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::{ChannelId, Messenger, NoopMessenger};

    #[tokio::test]
    async fn noop_messenger_resolves_and_accepts_sends() {
        let messenger = NoopMessenger;
        let channel = messenger.resolve_channel("concerts").await.expect("resolve");
        assert_eq!(channel, ChannelId("concerts".to_owned()));
        messenger.send(&channel, "hello").await.expect("send");
    }
}
