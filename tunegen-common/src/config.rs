//! Configuration loading for the tunegen gateway
//!
//! Per-field resolution priority: environment variable → TOML config file →
//! compiled default. The token and model slug keep the environment variable
//! names the deployment scripts already export (`REPLICATE_API_TOKEN`,
//! `REPLICATE_MODEL`).

use crate::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable naming the TOML config file to load
pub const CONFIG_PATH_ENV: &str = "TUNEGEN_CONFIG";

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "tunegen.toml";

/// Gateway configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listen address
    pub bind_addr: SocketAddr,
    /// Directory for transient uploaded-audio files
    pub tmp_dir: PathBuf,
    pub provider: ProviderConfig,
    pub worker: WorkerConfig,
}

/// Remote inference provider settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API token; jobs fail with a configuration error when absent
    pub api_token: Option<String>,
    /// Model slug, e.g. "meta/musicgen"
    pub model: String,
    /// API base URL (overridable for self-hosted gateways and tests)
    pub base_url: String,
    /// Delay between prediction status polls
    pub poll_interval_ms: u64,
    /// Overall deadline for one remote job; expiry fails the task
    pub job_timeout_secs: u64,
}

/// Background job pool settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum number of jobs talking to the provider at once.
    /// Submissions past the limit wait in the queued state.
    pub max_concurrent_jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".parse().expect("valid default address"),
            tmp_dir: std::env::temp_dir().join("tunegen"),
            provider: ProviderConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            model: "meta/musicgen".to_string(),
            base_url: "https://api.replicate.com".to_string(),
            poll_interval_ms: 1500,
            job_timeout_secs: 300,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
        }
    }
}

impl Config {
    /// Load configuration with env → TOML → default priority.
    ///
    /// The TOML path comes from `TUNEGEN_CONFIG`, falling back to
    /// `tunegen.toml` in the working directory; a missing file is not an
    /// error, a malformed one is.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Apply environment variable overrides on top of file/default values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("REPLICATE_API_TOKEN") {
            if !token.trim().is_empty() {
                if self.provider.api_token.is_some() {
                    warn!("provider API token set in both environment and config file; using environment");
                }
                self.provider.api_token = Some(token);
            }
        }
        if let Ok(model) = std::env::var("REPLICATE_MODEL") {
            if !model.trim().is_empty() {
                self.provider.model = model;
            }
        }
        if let Ok(url) = std::env::var("TUNEGEN_PROVIDER_BASE_URL") {
            if !url.trim().is_empty() {
                self.provider.base_url = url;
            }
        }
        if let Ok(addr) = std::env::var("TUNEGEN_BIND_ADDR") {
            match addr.parse() {
                Ok(parsed) => self.bind_addr = parsed,
                Err(e) => warn!(addr = %addr, error = %e, "ignoring invalid TUNEGEN_BIND_ADDR"),
            }
        }
        if let Ok(dir) = std::env::var("TUNEGEN_TMP_DIR") {
            if !dir.trim().is_empty() {
                self.tmp_dir = PathBuf::from(dir);
            }
        }
        if let Ok(n) = std::env::var("TUNEGEN_MAX_CONCURRENT_JOBS") {
            match n.parse::<usize>() {
                Ok(parsed) if parsed > 0 => self.worker.max_concurrent_jobs = parsed,
                _ => warn!(value = %n, "ignoring invalid TUNEGEN_MAX_CONCURRENT_JOBS"),
            }
        }
        if let Ok(secs) = std::env::var("TUNEGEN_JOB_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(parsed) if parsed > 0 => self.provider.job_timeout_secs = parsed,
                _ => warn!(value = %secs, "ignoring invalid TUNEGEN_JOB_TIMEOUT_SECS"),
            }
        }
    }

    /// True once a provider API token has been resolved from any source
    pub fn provider_configured(&self) -> bool {
        self.provider
            .api_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}
