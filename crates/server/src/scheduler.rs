use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use encore_core::digest;
use encore_discord::messenger::{Messenger, MessengerError};
use encore_store::MappingService;

/// Pushes the periodic concert digest to the announcement channel.
pub struct DigestScheduler {
    mapping: Arc<MappingService>,
    messenger: Arc<dyn Messenger>,
    channel: String,
    data_dir: PathBuf,
    chunk_len: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub users_announced: usize,
    pub users_skipped: usize,
}

impl DigestScheduler {
    pub fn new(
        mapping: Arc<MappingService>,
        messenger: Arc<dyn Messenger>,
        channel: String,
        data_dir: PathBuf,
        chunk_len: usize,
    ) -> Self {
        Self { mapping, messenger, channel, data_dir, chunk_len }
    }

    /// Runs one digest tick. The channel is resolved up front so a missing
    /// channel aborts the whole tick instead of failing user by user.
    pub async fn run_scheduled_digest(
        &self,
        correlation_id: &str,
    ) -> Result<TickSummary, MessengerError> {
        let channel_id = self.messenger.resolve_channel(&self.channel).await?;

        let map = self.mapping.snapshot().await;
        let mut summary = TickSummary::default();

        for (user, source_ids) in map.users() {
            let rendered =
                digest::render_for_user(&self.data_dir, user, source_ids, self.chunk_len);
            for error in &rendered.skipped {
                warn!(
                    event_name = "scheduler.digest.source_skipped",
                    correlation_id,
                    user = %user,
                    source = %error.source_id(),
                    error = %error,
                    "skipped source file during scheduled digest"
                );
            }
            if rendered.is_empty() {
                summary.users_skipped += 1;
                continue;
            }

            let header = format!("## Concert update for @{user}");
            if let Err(error) = self.send_all(&channel_id, header, rendered.chunks).await {
                warn!(
                    event_name = "scheduler.digest.delivery_failed",
                    correlation_id,
                    user = %user,
                    error = %error,
                    "could not deliver digest"
                );
                summary.users_skipped += 1;
                continue;
            }
            summary.users_announced += 1;
        }

        info!(
            event_name = "scheduler.digest.tick_complete",
            correlation_id,
            users_announced = summary.users_announced,
            users_skipped = summary.users_skipped,
            "scheduled digest finished"
        );
        Ok(summary)
    }

    async fn send_all(
        &self,
        channel_id: &encore_discord::messenger::ChannelId,
        header: String,
        chunks: Vec<String>,
    ) -> Result<(), MessengerError> {
        self.messenger.send(channel_id, &header).await?;
        for chunk in &chunks {
            self.messenger.send(channel_id, chunk).await?;
        }
        Ok(())
    }

    /// Starts the interval loop. The first immediate interval tick is
    /// consumed so the digest only fires after a full period has elapsed.
    pub fn spawn(self: Arc<Self>, interval_hours: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_period(interval_hours));
            interval.tick().await;
            loop {
                interval.tick().await;
                let correlation_id = Uuid::new_v4().to_string();
                if let Err(error) = self.run_scheduled_digest(&correlation_id).await {
                    warn!(
                        event_name = "scheduler.digest.tick_failed",
                        correlation_id = %correlation_id,
                        error = %error,
                        "scheduled digest aborted"
                    );
                }
            }
        })
    }
}

/// Config supplies the interval in hours; saturate rather than overflow on
/// absurd values.
fn tick_period(interval_hours: u64) -> Duration {
    Duration::from_secs(interval_hours.saturating_mul(3600))
}
