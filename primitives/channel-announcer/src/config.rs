//! Command-line and environment configuration.

use crate::reconcile::PostTarget;
use clap::Parser;
use slack_common::{DEFAULT_BASE_URL, SlackConfig};
use std::fmt;
use std::time::Duration;

/// Announces Slack channels created since the previous run.
#[derive(Parser, Clone)]
#[command(name = "channel-announcer")]
#[command(about = "Posts an announcement for every Slack channel it has not seen before")]
pub struct Args {
    /// Slack bot token.
    #[arg(short, long, env = "CHANNEL_ANNOUNCER_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Channel the announcements are posted to.
    #[arg(
        short,
        long,
        env = "CHANNEL_ANNOUNCER_POST_CHANNEL",
        default_value = "#announce_new_channels"
    )]
    pub post_channel: String,

    /// Display name used for the announcements.
    #[arg(
        short,
        long,
        env = "CHANNEL_ANNOUNCER_BOT_NAME",
        default_value = "Hey, There's a New Channel!"
    )]
    pub bot_name: String,

    /// Emoji used as the bot's avatar.
    #[arg(
        short,
        long,
        env = "CHANNEL_ANNOUNCER_ICON_EMOJI",
        default_value = ":new:"
    )]
    pub icon_emoji: String,

    /// Seen-set database (`postgres://...` or `sqlite:...`).
    #[arg(
        short,
        long,
        env = "DATABASE_URL",
        hide_env_values = true,
        value_parser = DatabaseConfig::parse
    )]
    pub database_url: DatabaseConfig,

    /// Slack Web API base URL.
    #[arg(long, env = "CHANNEL_ANNOUNCER_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub api_base_url: String,

    /// Request timeout in seconds.
    #[arg(long, env = "CHANNEL_ANNOUNCER_TIMEOUT", default_value = "30")]
    pub timeout: u64,

    /// Number of retries on failed Slack requests.
    #[arg(
        short,
        long,
        env = "CHANNEL_ANNOUNCER_RETRIES",
        default_value = "3",
        value_parser = clap::value_parser!(u32).range(0..=10)
    )]
    pub retries: u32,

    /// Skip channels that are already archived.
    #[arg(long, env = "CHANNEL_ANNOUNCER_EXCLUDE_ARCHIVED")]
    pub exclude_archived: bool,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn slack_config(&self) -> SlackConfig {
        SlackConfig {
            token: self.token.clone(),
            base_url: self.api_base_url.clone(),
            timeout: Duration::from_secs(self.timeout),
            retries: self.retries,
        }
    }

    pub fn post_target(&self) -> PostTarget {
        PostTarget {
            destination: self.post_channel.clone(),
            display_name: self.bot_name.clone(),
            icon: self.icon_emoji.clone(),
        }
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("token", &"<redacted>")
            .field("post_channel", &self.post_channel)
            .field("bot_name", &self.bot_name)
            .field("icon_emoji", &self.icon_emoji)
            .field("database_url", &self.database_url)
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("exclude_archived", &self.exclude_archived)
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// SQL engine behind the seen-set store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    Sqlite,
}

/// Validated database connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    backend: DatabaseBackend,
    url: String,
}

impl DatabaseConfig {
    /// Accepts `postgres://`, `postgresql://` and `sqlite:` URLs.
    pub fn parse(url: &str) -> Result<Self, String> {
        let url = url.trim();
        let (scheme, rest) = url
            .split_once(':')
            .ok_or_else(|| format!("'{url}' is not a database URL"))?;

        let backend = match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => {
                if !rest.starts_with("//") || rest.len() <= 2 {
                    return Err(format!("'{scheme}:' URL is missing a host"));
                }
                DatabaseBackend::Postgres
            }
            "sqlite" => {
                if rest.is_empty() {
                    return Err("'sqlite:' URL is missing a path".to_string());
                }
                DatabaseBackend::Sqlite
            }
            other => return Err(format!("unsupported database scheme '{other}'")),
        };

        Ok(Self {
            backend,
            url: url.to_string(),
        })
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("url", &"<redacted>")
            .finish()
    }
}
