use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use encore_core::games::GameCatalog;
use encore_core::{digest, sources, LinkOutcome, SourceId, UserId};
use encore_discord::commands::{
    CommandEnvelope, CommandReply, CommandRouteError, ConcertCommandService, GameCommandService,
};
use encore_store::MappingService;

/// The live `concerts`/`artists` command implementation over the mapping
/// service and the digest generator.
pub struct ConcertHandlers {
    mapping: Arc<MappingService>,
    data_dir: PathBuf,
    chunk_len: usize,
}

impl ConcertHandlers {
    pub fn new(mapping: Arc<MappingService>, data_dir: PathBuf, chunk_len: usize) -> Self {
        Self { mapping, data_dir, chunk_len }
    }
}

#[async_trait]
impl ConcertCommandService for ConcertHandlers {
    async fn add_source(
        &self,
        user: &str,
        source: &str,
        envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        let user = UserId::new(user);
        let source = SourceId::normalize(source);

        match self.mapping.add_source(user.clone(), source.clone()).await {
            Ok(LinkOutcome::Linked) => {
                Ok(CommandReply::single(format!("Linked {user} to {source}.")))
            }
            Ok(LinkOutcome::AlreadyLinked) => {
                Ok(CommandReply::single(format!("{source} already linked to {user}.")))
            }
            // The in-memory link is kept; only the write failed. Surface it
            // so the requester knows the link may not survive a restart.
            Err(error) => {
                warn!(
                    event_name = "command.concerts.persist_failed",
                    correlation_id = %envelope.correlation_id,
                    user = %user,
                    source = %source,
                    error = %error,
                    "mapping persist failed"
                );
                Ok(CommandReply::single(format!(
                    "Linked {user} to {source}, but saving the mapping failed: {error}"
                )))
            }
        }
    }

    async fn list_digest(
        &self,
        user: &str,
        envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        let user = UserId::new(user);
        let Some(source_ids) = self.mapping.list_sources(&user).await else {
            return Ok(CommandReply::single(format!("No file linked for {user}.")));
        };

        let rendered = digest::render_for_user(&self.data_dir, &user, &source_ids, self.chunk_len);
        let mut messages = rendered.chunks;
        for error in &rendered.skipped {
            warn!(
                event_name = "command.concerts.source_skipped",
                correlation_id = %envelope.correlation_id,
                user = %user,
                source = %error.source_id(),
                error = %error,
                "skipped source file during digest"
            );
            messages.push(format!("Could not read {}: {error}", error.source_id()));
        }
        if messages.is_empty() {
            messages.push(format!("No upcoming concerts found for {user}."));
        }

        Ok(CommandReply::from_messages(messages))
    }

    async fn list_files(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        match sources::available_sources(&self.data_dir) {
            Ok(source_ids) if source_ids.is_empty() => {
                Ok(CommandReply::single("No concert source files are available."))
            }
            Ok(source_ids) => {
                let mut message = String::from("The following files are available to watch:");
                for source_id in &source_ids {
                    message.push('\n');
                    message.push_str(source_id.as_str());
                }
                Ok(CommandReply::single(message))
            }
            Err(error) => {
                warn!(
                    event_name = "command.concerts.files_failed",
                    correlation_id = %envelope.correlation_id,
                    data_dir = %self.data_dir.display(),
                    error = %error,
                    "could not list source files"
                );
                Ok(CommandReply::single("Sorry, I had trouble listing the source files!"))
            }
        }
    }

    async fn list_artists(
        &self,
        source: &str,
        envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        let source = SourceId::normalize(source);
        match sources::artist_names(&self.data_dir, &source) {
            Ok(names) => {
                let mut message = format!("Here are all of the artists in the file {source}:\n");
                message.push_str(&names.join("\n"));
                Ok(CommandReply::single(message))
            }
            Err(error) => {
                warn!(
                    event_name = "command.artists.failed",
                    correlation_id = %envelope.correlation_id,
                    source = %source,
                    error = %error,
                    "could not list artists"
                );
                Ok(CommandReply::single("Sorry, I had trouble getting the info for that!"))
            }
        }
    }
}

/// The live `games` command implementation over the board-game catalog.
pub struct GameHandlers {
    catalog: Arc<GameCatalog>,
    chunk_len: usize,
}

impl GameHandlers {
    pub fn new(catalog: Arc<GameCatalog>, chunk_len: usize) -> Self {
        Self { catalog, chunk_len }
    }
}

#[async_trait]
impl GameCommandService for GameHandlers {
    async fn list_games(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        if self.catalog.is_empty() {
            return Ok(CommandReply::single("No board game information is available."));
        }
        Ok(CommandReply::from_messages(self.catalog.render_list(self.chunk_len)))
    }

    async fn game_info(
        &self,
        name: &str,
        _envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        match self.catalog.render_info(name) {
            Some(card) => Ok(CommandReply::single(card)),
            None => Ok(CommandReply::single(format!(
                "Sorry, I don't have information for {}.",
                name.trim()
            ))),
        }
    }

    async fn games_for_players(
        &self,
        count: u32,
        _envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        if self.catalog.is_empty() {
            return Ok(CommandReply::single("No board game information is available."));
        }
        Ok(CommandReply::from_messages(self.catalog.render_players(count, self.chunk_len)))
    }
}
