//! Configuration for folderlink

use crate::ingest::exclude::ExclusionRules;
use crate::ingest::mime::{MimeType, ACCEPTED_FILE_TYPES};
use crate::ingest::walker::WalkOptions;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `api.auth_token`.
pub const TOKEN_ENV: &str = "FOLDERLINK_API_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            auth_token: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// MIME types eligible for upload. Must be a subset of the built-in
    /// accepted list.
    pub accepted_types: Vec<String>,
    /// Extra glob patterns matched against each path component.
    pub exclude: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            accepted_types: ACCEPTED_FILE_TYPES.iter().map(|t| t.as_str().to_string()).collect(),
            exclude: Vec::new(),
        }
    }
}

impl IngestConfig {
    pub fn walk_options(&self) -> Result<WalkOptions> {
        let mut accepted = Vec::with_capacity(self.accepted_types.len());
        for raw in &self.accepted_types {
            let ty = MimeType::parse(raw);
            if ty == MimeType::Unknown {
                bail!("ingest.accepted_types: unsupported MIME type {raw:?}");
            }
            accepted.push(ty);
        }
        let exclusions = ExclusionRules::new(self.exclude.as_slice()).context("ingest.exclude")?;
        Ok(WalkOptions::new(accepted, exclusions))
    }
}

impl Config {
    /// Load from `path` if given, otherwise from the default location.
    /// A missing file yields defaults; the token env var always wins.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(p) => PathBuf::from(shellexpand::tilde(p).to_string()),
            None => Self::config_path(),
        };
        let mut config = Self::load_from(&path)?;
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.is_empty() {
                config.api.auth_token = Some(token);
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.api.timeout_secs == 0 {
            bail!("api.timeout_secs must be greater than zero");
        }
        self.ingest.walk_options()?;
        Ok(())
    }

    /// `<config dir>/folderlink/config.toml`, or `config.toml` in the
    /// working directory when no home directory is available.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "folderlink")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
