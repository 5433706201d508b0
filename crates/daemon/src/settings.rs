// Daemon configuration: optional qless.toml layered under QLESS_* env vars

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "qless.toml";
const FALLBACK_DB_PATH: &str = "~/.qless/queue.db";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// One category document to seed at startup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryDocument {
    pub name: String,
    pub categories: Vec<String>,
}

/// Operator account to provision at startup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperatorAccount {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Write logs to a daily-rotated file here instead of stdout
    #[serde(default)]
    pub log_dir: Option<String>,

    #[serde(default)]
    pub category_documents: Vec<CategoryDocument>,

    #[serde(default)]
    pub operators: Vec<OperatorAccount>,
}

fn default_db_path() -> String {
    ProjectDirs::from("dev", "qless", "qless")
        .map(|dirs| dirs.data_dir().join("queue.db").to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_DB_PATH.to_string())
}

impl DaemonConfig {
    /// Load `path` (if present) and then `QLESS_*` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("QLESS").separator("__"))
            .build()
            .and_then(Config::try_deserialize)
            .with_context(|| format!("Failed to load configuration from {}", path))
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .and_then(Config::try_deserialize)
            .context("Invalid configuration")
    }

    /// Database location with `~` expanded. `:memory:` and `sqlite:` URLs
    /// are passed through.
    pub fn database_url(&self) -> String {
        if self.db_path.starts_with("sqlite:") || self.db_path == ":memory:" {
            return self.db_path.clone();
        }
        shellexpand::tilde(&self.db_path).into_owned()
    }

    /// Directory that must exist before the database can be created
    pub fn database_dir(&self) -> Option<PathBuf> {
        let url = self.database_url();
        if url.starts_with("sqlite:") || url == ":memory:" {
            return None;
        }
        PathBuf::from(url)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).into_owned()))
    }
}
