//! # configs
//!
//! Layered application settings. Sources, lowest precedence first:
//! built-in defaults, an optional `retro-board.toml` in the working
//! directory, a `.env` file, then `RETRO__SECTION__KEY` environment variables.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

/// Salt used when none is configured. Fine for local runs only.
pub const DEV_IDENTITY_SALT: &str = "retro-board-dev-salt";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub boards: BoardSettings,
    pub sessions: SessionSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Postgres URL. Unset means the in-memory store.
    #[serde(default)]
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub identity_salt: SecretString,
    /// Recovery credential for deleting any board. Unset disables it.
    #[serde(default)]
    pub bypass_secret: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardSettings {
    pub link_length: usize,
    pub link_max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub recency_window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

impl Settings {
    /// Loads `.env`, the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self::defaults()?
            .add_source(File::with_name("retro-board").required(false))
            .add_source(
                Environment::with_prefix("RETRO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Self::from_config(config)
    }

    /// Builder pre-populated with every default.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("database.max_connections", 10_i64)?
            .set_default("auth.identity_salt", DEV_IDENTITY_SALT)?
            .set_default("boards.link_length", 12_i64)?
            .set_default("boards.link_max_attempts", 5_i64)?
            .set_default("sessions.recency_window_secs", 120_i64)?
            .set_default("log.level", "info")?
            .set_default("log.json", false)?)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.boards.link_length == 0 {
            return Err(ConfigError::Invalid { key: "boards.link_length", reason: "must be at least 1" });
        }
        if self.boards.link_max_attempts == 0 {
            return Err(ConfigError::Invalid { key: "boards.link_max_attempts", reason: "must be at least 1" });
        }
        if self.sessions.recency_window_secs == 0 {
            return Err(ConfigError::Invalid { key: "sessions.recency_window_secs", reason: "must be at least 1" });
        }
        Ok(())
    }

    pub fn uses_dev_identity_salt(&self) -> bool {
        use secrecy::ExposeSecret;
        self.auth.identity_salt.expose_secret() == DEV_IDENTITY_SALT
    }
}
