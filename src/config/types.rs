//! Configuration types.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 2022;

/// Signing secret used when none is configured. Only fit for development.
pub const DEV_TOKEN_SECRET: &str = "compliance-tracker-dev-secret";

/// Longest accepted token lifetime (one year).
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Storage and listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("compliance-tracker/compliance.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Bearer token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens.
    #[serde(default = "default_token_secret")]
    pub token_secret: String,

    /// Token lifetime in hours (default: 8).
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: default_token_secret(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

fn default_token_secret() -> String {
    DEV_TOKEN_SECRET.to_string()
}

fn default_token_ttl_hours() -> i64 {
    8
}

impl Config {
    /// Load configuration from a single YAML file, without tier merging.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Whether tokens are signed with the built-in development secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.auth.token_secret == DEV_TOKEN_SECRET
    }

    /// Reject values that cannot be used at runtime.
    pub fn validate(&self) -> Result<()> {
        let ttl = self.auth.token_ttl_hours;
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&ttl) {
            bail!(
                "auth.token_ttl_hours must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_HOURS,
                ttl
            );
        }
        Ok(())
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
