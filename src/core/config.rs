//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "csvgrader.yaml";

/// A grading target the user can pick from
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TargetBlock {
    /// Identifier sent as `target_block`
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

impl fmt::Display for TargetBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// csvgrader configuration with layered hierarchy
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// URL of the grading endpoint's import handler
    pub endpoint: Option<String>,

    /// Bearer token sent to the endpoint
    pub token: Option<String>,

    /// Target used when none is given on the command line
    pub default_target: Option<String>,

    /// Max grade used when none is given on the command line
    pub max_grade: Option<f64>,

    /// HTTP timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Known targets offered for interactive selection
    pub targets: Vec<TargetBlock>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order.
    ///
    /// `local` replaces `./csvgrader.yaml` when given.
    pub fn load_from(local: Option<&Path>) -> Self {
        let mut config = Config::default();

        // 1. Global user config (~/.config/csvgrader/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 2. Local config (./csvgrader.yaml or --config)
        let local_path = local
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));
        if let Some(local) = Self::read_file(&local_path) {
            config.merge(local);
        }

        // 3. Environment variables
        config.merge(Self::from_env());

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("ignoring unreadable config {}: {}", path.display(), e);
                None
            }
        }
    }

    fn from_env() -> Config {
        Config {
            endpoint: std::env::var("CSVGRADER_ENDPOINT").ok(),
            token: std::env::var("CSVGRADER_TOKEN").ok(),
            default_target: std::env::var("CSVGRADER_TARGET").ok(),
            max_grade: std::env::var("CSVGRADER_MAX_GRADE")
                .ok()
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|g| g.is_finite()),
            timeout_secs: None,
            targets: Vec::new(),
        }
    }

    /// Get the path to the global config file.
    ///
    /// `CSVGRADER_CONFIG_DIR` overrides the platform config directory.
    pub fn global_config_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("CSVGRADER_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("config.yaml"));
        }
        directories::ProjectDirs::from("", "", "csvgrader")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint;
        }
        if other.token.is_some() {
            self.token = other.token;
        }
        if other.default_target.is_some() {
            self.default_target = other.default_target;
        }
        if other.max_grade.is_some() {
            self.max_grade = other.max_grade;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if !other.targets.is_empty() {
            self.targets = other.targets;
        }
    }

    /// Request timeout, defaulting to 30 seconds
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.timeout_secs
                .unwrap_or(crate::core::endpoint::DEFAULT_TIMEOUT_SECS),
        )
    }
}
