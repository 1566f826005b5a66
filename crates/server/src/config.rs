//! Server configuration.
//!
//! Layered, highest priority first:
//! 1. CLI arguments
//! 2. Environment variables (`BOARD_*`, via clap `env`; `.env` is loaded first)
//! 3. TOML file given with `--config`
//! 4. Compiled defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;
use strum_macros::{Display, EnumString};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Which [`db::store::ProcedureStore`] backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StoreKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BoardConfigFile {
    server: ServerFileConfig,
    store: StoreFileConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    kind: Option<StoreKind>,
    database_url: Option<String>,
}

#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Procedure board server")]
pub struct CliArgs {
    /// Address to listen on.
    #[arg(short, long, env = "BOARD_BIND")]
    pub bind: Option<String>,

    /// Path to a TOML config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Store backend: `sqlite` or `memory`.
    #[arg(long, env = "BOARD_STORE")]
    pub store: Option<StoreKind>,

    /// SQLite connection string, used when the store is `sqlite`.
    #[arg(long, env = "BOARD_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Log level filter (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[arg(long, env = "BOARD_LOG")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    pub bind_addr: String,
    pub store: StoreKind,
    pub database_url: String,
    pub log_level: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            store: StoreKind::Sqlite,
            database_url: "sqlite://board.db".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl BoardConfig {
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = match cli.config.as_deref() {
            Some(path) => load_config_file(path)?,
            None => BoardConfigFile::default(),
        };
        Ok(Self::resolve(cli, &file))
    }

    fn resolve(cli: &CliArgs, file: &BoardConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            store: cli.store.or(file.store.kind).unwrap_or(defaults.store),
            database_url: cli
                .database_url
                .clone()
                .or_else(|| file.store.database_url.clone())
                .unwrap_or(defaults.database_url),
            log_level: cli
                .log_level
                .clone()
                .or_else(|| file.server.log_level.clone())
                .unwrap_or(defaults.log_level),
        }
    }
}

fn load_config_file(path: &Path) -> Result<BoardConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}
