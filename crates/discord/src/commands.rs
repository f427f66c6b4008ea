use async_trait::async_trait;
use thiserror::Error;

/// One inbound chat message as delivered by the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagePayload {
    pub message_id: String,
    pub channel_id: String,
    pub author: String,
    pub text: String,
}

/// Context carried alongside a routed command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub channel_id: String,
    pub author: String,
    pub correlation_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Concerts(ConcertCommand),
    Artists { source: String },
    Games(GameCommand),
    Help,
    Usage { message: String },
    Unknown { verb: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConcertCommand {
    Add { user: String, source: String },
    List { user: String },
    Files,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameCommand {
    List,
    Info { name: String },
    Players { count: u32 },
}

/// An ordered sequence of outbound messages produced by one command. Each
/// entry is delivered as a separate message and respects the chunk bound.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandReply {
    pub messages: Vec<String>,
}

impl CommandReply {
    pub fn single(message: impl Into<String>) -> Self {
        Self { messages: vec![message.into()] }
    }

    pub fn from_messages(messages: Vec<String>) -> Self {
        Self { messages }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

/// Parses a raw message into a command. Returns `None` when the message does
/// not start with the command prefix; ordinary chat is not ours to answer.
/// Recognized verbs with missing or invalid arguments become `Usage` replies
/// instead of errors.
pub fn parse_command(prefix: &str, text: &str) -> Option<BotCommand> {
    let trimmed = text.trim();
    let rest = trimmed.strip_prefix(prefix)?;

    let mut parts = rest.split_whitespace();
    let verb = parts.next()?.to_ascii_lowercase();

    let command = match verb.as_str() {
        "concerts" => parse_concerts_command(&mut parts),
        "artists" => match parts.next() {
            Some(source) => BotCommand::Artists { source: source.to_owned() },
            None => usage("Usage: `artists <file>`"),
        },
        "games" => parse_games_command(&mut parts),
        "help" => BotCommand::Help,
        _ => BotCommand::Unknown { verb },
    };

    Some(command)
}

fn parse_concerts_command<'a>(parts: &mut impl Iterator<Item = &'a str>) -> BotCommand {
    match parts.next().map(str::to_ascii_lowercase).as_deref() {
        Some("add") => match (parts.next(), parts.next()) {
            (Some(user), Some(source)) => BotCommand::Concerts(ConcertCommand::Add {
                user: user.to_owned(),
                source: source.to_owned(),
            }),
            _ => usage("Usage: `concerts add <user> <file>`"),
        },
        Some("list") => match parts.next() {
            Some(user) => BotCommand::Concerts(ConcertCommand::List { user: user.to_owned() }),
            None => usage("Usage: `concerts list <user>`"),
        },
        Some("files") => BotCommand::Concerts(ConcertCommand::Files),
        _ => usage("Usage: `concerts add|list|files`"),
    }
}

fn parse_games_command<'a>(parts: &mut impl Iterator<Item = &'a str>) -> BotCommand {
    match parts.next().map(str::to_ascii_lowercase).as_deref() {
        Some("list") => BotCommand::Games(GameCommand::List),
        Some("info") => {
            let name = parts.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                usage("Please provide a game name.")
            } else {
                BotCommand::Games(GameCommand::Info { name })
            }
        }
        Some("players") => match parts.next().map(str::parse::<u32>) {
            Some(Ok(count)) if count >= 1 => {
                BotCommand::Games(GameCommand::Players { count })
            }
            _ => usage("Please provide a valid number of players."),
        },
        _ => usage("Usage: `games list|info <name>|players <n>`. Try `games list` to see the available games."),
    }
}

fn usage(message: &str) -> BotCommand {
    BotCommand::Usage { message: message.to_owned() }
}

pub fn help_message() -> String {
    [
        "Here is what I can do:",
        "`concerts add <user> <file>` - subscribe a user to a concert source file",
        "`concerts list <user>` - upcoming concerts from that user's files",
        "`concerts files` - source files available to watch",
        "`artists <file>` - all artists in one source file",
        "`games list` - the available board games",
        "`games info <name>` - details for one board game",
        "`games players <n>` - games that support n players",
    ]
    .join("\n")
}

#[async_trait]
pub trait ConcertCommandService: Send + Sync {
    async fn add_source(
        &self,
        user: &str,
        source: &str,
        envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError>;

    async fn list_digest(
        &self,
        user: &str,
        envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError>;

    async fn list_files(&self, envelope: &CommandEnvelope)
        -> Result<CommandReply, CommandRouteError>;

    async fn list_artists(
        &self,
        source: &str,
        envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError>;
}

#[async_trait]
pub trait GameCommandService: Send + Sync {
    async fn list_games(&self, envelope: &CommandEnvelope)
        -> Result<CommandReply, CommandRouteError>;

    async fn game_info(
        &self,
        name: &str,
        envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError>;

    async fn games_for_players(
        &self,
        count: u32,
        envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError>;
}

pub struct CommandRouter<C, G> {
    concerts: C,
    games: G,
}

impl<C, G> CommandRouter<C, G>
where
    C: ConcertCommandService,
    G: GameCommandService,
{
    pub fn new(concerts: C, games: G) -> Self {
        Self { concerts, games }
    }

    pub async fn route(
        &self,
        command: BotCommand,
        envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        match command {
            BotCommand::Concerts(ConcertCommand::Add { user, source }) => {
                self.concerts.add_source(&user, &source, envelope).await
            }
            BotCommand::Concerts(ConcertCommand::List { user }) => {
                self.concerts.list_digest(&user, envelope).await
            }
            BotCommand::Concerts(ConcertCommand::Files) => {
                self.concerts.list_files(envelope).await
            }
            BotCommand::Artists { source } => self.concerts.list_artists(&source, envelope).await,
            BotCommand::Games(GameCommand::List) => self.games.list_games(envelope).await,
            BotCommand::Games(GameCommand::Info { name }) => {
                self.games.game_info(&name, envelope).await
            }
            BotCommand::Games(GameCommand::Players { count }) => {
                self.games.games_for_players(count, envelope).await
            }
            BotCommand::Help => Ok(CommandReply::single(help_message())),
            BotCommand::Usage { message } => Ok(CommandReply::single(message)),
            BotCommand::Unknown { verb } => Ok(CommandReply::single(format!(
                "Sorry, I don't know `{verb}`. Try `help` for the available commands."
            ))),
        }
    }
}

#[derive(Default)]
pub struct NoopConcertCommandService;

#[async_trait]
impl ConcertCommandService for NoopConcertCommandService {
    async fn add_source(
        &self,
        user: &str,
        source: &str,
        _envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::single(format!("Linked {user} to {source}.")))
    }

    async fn list_digest(
        &self,
        user: &str,
        _envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::single(format!("No file linked for {user}.")))
    }

    async fn list_files(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::single("No concert source files are available."))
    }

    async fn list_artists(
        &self,
        source: &str,
        _envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::single(format!("Here are all of the artists in the file {source}:")))
    }
}

#[derive(Default)]
pub struct NoopGameCommandService;

#[async_trait]
impl GameCommandService for NoopGameCommandService {
    async fn list_games(
        &self,
        _envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::single("## Here are the available games:"))
    }

    async fn game_info(
        &self,
        name: &str,
        _envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::single(format!("Sorry, I don't have information for {name}.")))
    }

    async fn games_for_players(
        &self,
        count: u32,
        _envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::single(format!("## Here are the games that support {count} players:")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{
        parse_command, BotCommand, CommandEnvelope, CommandReply, CommandRouteError, CommandRouter,
        ConcertCommand, ConcertCommandService, GameCommand, GameCommandService,
        NoopConcertCommandService, NoopGameCommandService,
    };
    use async_trait::async_trait;

    fn envelope() -> CommandEnvelope {
        CommandEnvelope {
            channel_id: "C1".to_owned(),
            author: "alice".to_owned(),
            correlation_id: "req-1".to_owned(),
        }
    }

    #[test]
    fn unprefixed_chat_is_not_a_command() {
        assert_eq!(parse_command("!", "hello everyone"), None);
        assert_eq!(parse_command("!", ""), None);
    }

    #[test]
    fn parses_concert_verbs() {
        assert_eq!(
            parse_command("!", "!concerts add alice bandA.json"),
            Some(BotCommand::Concerts(ConcertCommand::Add {
                user: "alice".to_owned(),
                source: "bandA.json".to_owned(),
            }))
        );
        assert_eq!(
            parse_command("!", "!concerts list alice"),
            Some(BotCommand::Concerts(ConcertCommand::List { user: "alice".to_owned() }))
        );
        assert_eq!(
            parse_command("!", "!concerts files"),
            Some(BotCommand::Concerts(ConcertCommand::Files))
        );
    }

    #[test]
    fn missing_arguments_become_usage_replies() {
        assert!(matches!(parse_command("!", "!concerts add alice"), Some(BotCommand::Usage { .. })));
        assert!(matches!(parse_command("!", "!concerts list"), Some(BotCommand::Usage { .. })));
        assert!(matches!(parse_command("!", "!artists"), Some(BotCommand::Usage { .. })));
    }

    #[test]
    fn games_info_joins_multi_word_names() {
        assert_eq!(
            parse_command("!", "!games info Ticket to Ride"),
            Some(BotCommand::Games(GameCommand::Info { name: "Ticket to Ride".to_owned() }))
        );
    }

    #[test]
    fn games_players_rejects_non_numeric_and_zero_counts() {
        assert!(matches!(parse_command("!", "!games players many"), Some(BotCommand::Usage { .. })));
        assert!(matches!(parse_command("!", "!games players 0"), Some(BotCommand::Usage { .. })));
        assert_eq!(
            parse_command("!", "!games players 4"),
            Some(BotCommand::Games(GameCommand::Players { count: 4 }))
        );
    }

    #[test]
    fn unknown_verb_is_preserved_for_the_reply() {
        assert_eq!(
            parse_command("!", "!dance"),
            Some(BotCommand::Unknown { verb: "dance".to_owned() })
        );
    }

    #[tokio::test]
    async fn router_answers_help_and_unknown_without_services() {
        let router = CommandRouter::new(NoopConcertCommandService, NoopGameCommandService);

        let help = router.route(BotCommand::Help, &envelope()).await.expect("help");
        assert!(help.messages[0].contains("concerts add"));

        let unknown = router
            .route(BotCommand::Unknown { verb: "dance".to_owned() }, &envelope())
            .await
            .expect("unknown");
        assert!(unknown.messages[0].contains("`dance`"));
    }

    #[tokio::test]
    async fn router_calls_service_entrypoints() {
        #[derive(Default)]
        struct Recording {
            calls: Mutex<Vec<&'static str>>,
        }

        #[async_trait]
        impl ConcertCommandService for &Recording {
            async fn add_source(
                &self,
                _user: &str,
                _source: &str,
                _envelope: &CommandEnvelope,
            ) -> Result<CommandReply, CommandRouteError> {
                self.calls.lock().expect("lock").push("add");
                Ok(CommandReply::default())
            }

            async fn list_digest(
                &self,
                _user: &str,
                _envelope: &CommandEnvelope,
            ) -> Result<CommandReply, CommandRouteError> {
                self.calls.lock().expect("lock").push("list");
                Ok(CommandReply::default())
            }

            async fn list_files(
                &self,
                _envelope: &CommandEnvelope,
            ) -> Result<CommandReply, CommandRouteError> {
                self.calls.lock().expect("lock").push("files");
                Ok(CommandReply::default())
            }

            async fn list_artists(
                &self,
                _source: &str,
                _envelope: &CommandEnvelope,
            ) -> Result<CommandReply, CommandRouteError> {
                self.calls.lock().expect("lock").push("artists");
                Ok(CommandReply::default())
            }
        }

        #[async_trait]
        impl GameCommandService for &Recording {
            async fn list_games(
                &self,
                _envelope: &CommandEnvelope,
            ) -> Result<CommandReply, CommandRouteError> {
                self.calls.lock().expect("lock").push("games-list");
                Ok(CommandReply::default())
            }

            async fn game_info(
                &self,
                _name: &str,
                _envelope: &CommandEnvelope,
            ) -> Result<CommandReply, CommandRouteError> {
                self.calls.lock().expect("lock").push("games-info");
                Ok(CommandReply::default())
            }

            async fn games_for_players(
                &self,
                _count: u32,
                _envelope: &CommandEnvelope,
            ) -> Result<CommandReply, CommandRouteError> {
                self.calls.lock().expect("lock").push("games-players");
                Ok(CommandReply::default())
            }
        }

        let recording = Recording::default();
        let router = CommandRouter::new(&recording, &recording);

        for text in [
            "!concerts add alice bandA.json",
            "!concerts list alice",
            "!concerts files",
            "!artists bandA.json",
            "!games list",
            "!games info Catan",
            "!games players 4",
        ] {
            let command = parse_command("!", text).expect("command");
            router.route(command, &envelope()).await.expect("route");
        }

        let calls = recording.calls.lock().expect("lock");
        assert_eq!(
            &*calls,
            &["add", "list", "files", "artists", "games-list", "games-info", "games-players"]
        );
    }
}
