use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub storage: StorageConfig,
    pub digest: DigestConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub bot_token: SecretString,
    pub guild_id: Option<String>,
    pub command_prefix: String,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub mapping_path: PathBuf,
    pub board_games_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct DigestConfig {
    pub channel: String,
    pub interval_hours: u64,
    pub max_chunk_len: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub mapping_path: Option<PathBuf>,
    pub digest_channel: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                bot_token: String::new().into(),
                guild_id: None,
                command_prefix: "!".to_string(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("data"),
                mapping_path: PathBuf::from("data/user_sources.json"),
                board_games_path: PathBuf::from("data/board_games_data.json"),
            },
            digest: DigestConfig {
                channel: "concerts".to_string(),
                interval_hours: 168,
                max_chunk_len: crate::digest::MAX_CHUNK_LEN,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), health_check_port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("encore.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(bot_token_value) = discord.bot_token {
                self.discord.bot_token = bot_token_value.into();
            }
            if let Some(guild_id) = discord.guild_id {
                self.discord.guild_id = Some(guild_id);
            }
            if let Some(command_prefix) = discord.command_prefix {
                self.discord.command_prefix = command_prefix;
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(data_dir) = storage.data_dir {
                self.storage.data_dir = data_dir;
            }
            if let Some(mapping_path) = storage.mapping_path {
                self.storage.mapping_path = mapping_path;
            }
            if let Some(board_games_path) = storage.board_games_path {
                self.storage.board_games_path = board_games_path;
            }
        }

        if let Some(digest) = patch.digest {
            if let Some(channel) = digest.channel {
                self.digest.channel = channel;
            }
            if let Some(interval_hours) = digest.interval_hours {
                self.digest.interval_hours = interval_hours;
            }
            if let Some(max_chunk_len) = digest.max_chunk_len {
                self.digest.max_chunk_len = max_chunk_len;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ENCORE_DISCORD_BOT_TOKEN") {
            self.discord.bot_token = value.into();
        }
        if let Some(value) = read_env("ENCORE_DISCORD_GUILD_ID") {
            self.discord.guild_id = Some(value);
        }
        if let Some(value) = read_env("ENCORE_DISCORD_COMMAND_PREFIX") {
            self.discord.command_prefix = value;
        }

        if let Some(value) = read_env("ENCORE_STORAGE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("ENCORE_STORAGE_MAPPING_PATH") {
            self.storage.mapping_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("ENCORE_STORAGE_BOARD_GAMES_PATH") {
            self.storage.board_games_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("ENCORE_DIGEST_CHANNEL") {
            self.digest.channel = value;
        }
        if let Some(value) = read_env("ENCORE_DIGEST_INTERVAL_HOURS") {
            self.digest.interval_hours = parse_u64("ENCORE_DIGEST_INTERVAL_HOURS", &value)?;
        }
        if let Some(value) = read_env("ENCORE_DIGEST_MAX_CHUNK_LEN") {
            self.digest.max_chunk_len =
                parse_u64("ENCORE_DIGEST_MAX_CHUNK_LEN", &value)? as usize;
        }

        if let Some(value) = read_env("ENCORE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ENCORE_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("ENCORE_SERVER_HEALTH_CHECK_PORT", &value)?;
        }

        let log_level = read_env("ENCORE_LOGGING_LEVEL").or_else(|| read_env("ENCORE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ENCORE_LOGGING_FORMAT").or_else(|| read_env("ENCORE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.discord.bot_token = bot_token.into();
        }
        if let Some(data_dir) = overrides.data_dir {
            self.storage.data_dir = data_dir;
        }
        if let Some(mapping_path) = overrides.mapping_path {
            self.storage.mapping_path = mapping_path;
        }
        if let Some(digest_channel) = overrides.digest_channel {
            self.digest.channel = digest_channel;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discord.command_prefix.trim().is_empty() {
            return Err(ConfigError::Validation(
                "discord.command_prefix must not be empty".to_string(),
            ));
        }

        if self.storage.mapping_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.mapping_path must not be empty".to_string(),
            ));
        }

        if self.digest.channel.trim().is_empty() {
            return Err(ConfigError::Validation("digest.channel must not be empty".to_string()));
        }
        if self.digest.interval_hours == 0 {
            return Err(ConfigError::Validation(
                "digest.interval_hours must be greater than zero".to_string(),
            ));
        }
        if self.digest.max_chunk_len == 0 || self.digest.max_chunk_len > 4000 {
            return Err(ConfigError::Validation(
                "digest.max_chunk_len must be in range 1..=4000".to_string(),
            ));
        }

        if self.server.health_check_port == 0 {
            return Err(ConfigError::Validation(
                "server.health_check_port must be greater than zero".to_string(),
            ));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Validation(
                    "logging.level must be one of trace|debug|info|warn|error".to_string(),
                ))
            }
        }

        Ok(())
    }

    /// Whether a real chat transport can be wired up. An empty token keeps
    /// the bot in offline mode (noop transport) rather than failing startup.
    pub fn has_bot_token(&self) -> bool {
        !self.discord.bot_token.expose_secret().trim().is_empty()
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("encore.toml"), PathBuf::from("config/encore.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    storage: Option<StoragePatch>,
    digest: Option<DigestPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    bot_token: Option<String>,
    guild_id: Option<String>,
    command_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    data_dir: Option<PathBuf>,
    mapping_path: Option<PathBuf>,
    board_games_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct DigestPatch {
    channel: Option<String>,
    interval_hours: Option<u64>,
    max_chunk_len: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_without_any_sources() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.digest.interval_hours == 168, "default interval should be weekly")?;
        ensure(config.digest.max_chunk_len == 1000, "default chunk bound should be 1000")?;
        ensure(!config.has_bot_token(), "default config should have no bot token")?;
        ensure(
            config.storage.mapping_path == PathBuf::from("data/user_sources.json"),
            "default mapping path",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ENCORE_BOT_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("encore.toml");
            fs::write(
                &path,
                r#"
[discord]
bot_token = "${TEST_ENCORE_BOT_TOKEN}"

[digest]
channel = "weekly-concerts"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.discord.bot_token.expose_secret() == "token-from-env",
                "bot token should be loaded from environment",
            )?;
            ensure(config.digest.channel == "weekly-concerts", "channel should come from file")
        })();

        clear_vars(&["TEST_ENCORE_BOT_TOKEN"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ENCORE_DIGEST_CHANNEL", "from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("encore.toml");
            fs::write(
                &path,
                r#"
[digest]
channel = "from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.digest.channel == "from-env", "env channel should win over file")?;
            ensure(config.logging.level == "debug", "override log level should win over file")
        })();

        clear_vars(&["ENCORE_DIGEST_CHANNEL"]);
        result
    }

    #[test]
    fn validation_rejects_zero_interval() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ENCORE_DIGEST_INTERVAL_HOURS", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("interval_hours")
            );
            ensure(has_message, "validation failure should mention interval_hours")
        })();

        clear_vars(&["ENCORE_DIGEST_INTERVAL_HOURS"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ENCORE_LOG_LEVEL", "warn");
        env::set_var("ENCORE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warn log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["ENCORE_LOG_LEVEL", "ENCORE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn secret_token_is_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ENCORE_DISCORD_BOT_TOKEN", "super-secret-token");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("super-secret-token"), "debug output should not contain token")?;
            ensure(config.has_bot_token(), "token presence should be detected")
        })();

        clear_vars(&["ENCORE_DISCORD_BOT_TOKEN"]);
        result
    }
}
