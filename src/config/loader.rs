//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Built-in defaults
    Defaults = 0,
    /// `~/.compliance-tracker/config.yaml`
    User = 1,
    /// `./compliance-tracker/config.yaml`
    Project = 2,
    /// `--config` or `COMPLIANCE_CONFIG_PATH`
    Explicit = 3,
    /// `COMPLIANCE_*` environment variables
    Environment = 4,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::Explicit => write!(f, "explicit"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub user_dir: Option<PathBuf>,
    pub project_dir: Option<PathBuf>,
    /// Explicit config file, merged above both directories.
    pub explicit_file: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover(None)
    }
}

impl ConfigPaths {
    /// Discover configuration paths. `explicit` wins over `COMPLIANCE_CONFIG_PATH`.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        let explicit_file = explicit.or_else(|| {
            std::env::var("COMPLIANCE_CONFIG_PATH")
                .ok()
                .map(PathBuf::from)
        });

        Self {
            user_dir: dirs::home_dir().map(|h| h.join(".compliance-tracker")),
            project_dir: Some(PathBuf::from("compliance-tracker")),
            explicit_file,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(user_dir: Option<PathBuf>, project_dir: Option<PathBuf>) -> Self {
        Self {
            user_dir,
            project_dir,
            explicit_file: None,
        }
    }
}

/// Read a tier's YAML file. Missing files are skipped; unreadable or
/// malformed files are skipped with a warning.
fn read_tier(tier: ConfigTier, path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(%tier, path = %path.display(), error = %e, "Skipping unreadable config file");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => {
            debug!(%tier, path = %path.display(), "Loaded config file");
            Some(value)
        }
        Err(e) => {
            warn!(%tier, path = %path.display(), error = %e, "Skipping malformed config file");
            None
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Highest-priority file that contributed to the config.
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load from all tiers, reading overrides from the process environment.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self> {
        Self::load_with(ConfigPaths::discover(explicit), |key| std::env::var(key).ok())
    }

    /// Load with explicit paths and an environment lookup.
    pub fn load_with<F>(paths: ConfigPaths, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut configs: Vec<Value> = Vec::new();
        let mut config_path = None;

        configs.push(serde_json::to_value(Config::default())?);

        for (tier, dir) in [
            (ConfigTier::User, &paths.user_dir),
            (ConfigTier::Project, &paths.project_dir),
        ] {
            if let Some(dir) = dir {
                let file = dir.join("config.yaml");
                if let Some(value) = read_tier(tier, &file) {
                    configs.push(value);
                    config_path = Some(file);
                }
            }
        }

        // An explicit file must exist and parse
        if let Some(ref file) = paths.explicit_file {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("reading config file {}", file.display()))?;
            let value: Value = serde_yaml::from_str(&content)
                .with_context(|| format!("parsing config file {}", file.display()))?;
            configs.push(value);
            config_path = Some(file.clone());
        }

        let merged = deep_merge_all(configs);
        let mut config: Config = serde_json::from_value(merged)?;

        Self::apply_env_overrides(&mut config, env);
        config.validate()?;

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    /// Apply `COMPLIANCE_*` overrides. Unparseable numbers are ignored with a warning.
    fn apply_env_overrides<F>(config: &mut Config, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = env("COMPLIANCE_DB_PATH") {
            config.server.db_path = PathBuf::from(db_path);
        }

        if let Some(host) = env("COMPLIANCE_HOST") {
            config.server.host = host;
        }

        if let Some(port) = env("COMPLIANCE_PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid COMPLIANCE_PORT"),
            }
        }

        if let Some(secret) = env("COMPLIANCE_TOKEN_SECRET") {
            config.auth.token_secret = secret;
        }

        if let Some(ttl) = env("COMPLIANCE_TOKEN_TTL_HOURS") {
            match ttl.parse() {
                Ok(ttl) => config.auth.token_ttl_hours = ttl,
                Err(_) => warn!(value = %ttl, "Ignoring invalid COMPLIANCE_TOKEN_TTL_HOURS"),
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
