use crate::catch_all::CatchAllConfig;
use crate::patterns::{default_patterns, PatternKey};
use crate::provider::ApiProvider;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PARALLEL_REQUESTS: i64 = 50;

/// User settings, persisted as YAML. Every field has a serde default so a
/// partial file still loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_provider")]
    pub api_provider: ApiProvider,
    /// Base endpoint URL; the `email` query parameter is appended per call.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Requests dispatched concurrently per chunk. Non-positive values fall
    /// back to the default at use time rather than failing the load.
    #[serde(default = "default_parallel_requests")]
    pub max_parallel_requests: i64,
    /// HTTP timeout per validation call, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_patterns")]
    pub email_patterns: Vec<PatternKey>,
    #[serde(default)]
    pub catch_all: CatchAllConfig,
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_provider() -> ApiProvider {
    ApiProvider::Bazzigate
}

fn default_api_url() -> String {
    default_provider().default_endpoint().to_string()
}

fn default_parallel_requests() -> i64 {
    DEFAULT_PARALLEL_REQUESTS
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_database_path() -> String {
    "leadspark.db".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_provider: default_provider(),
            api_url: default_api_url(),
            api_key: String::new(),
            max_parallel_requests: default_parallel_requests(),
            timeout_seconds: default_timeout_seconds(),
            email_patterns: default_patterns(),
            catch_all: CatchAllConfig::default(),
            database_path: default_database_path(),
        }
    }
}

impl Settings {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {path}"))?;
        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {path}"))?;
        Ok(settings)
    }

    pub fn to_file(&self, path: &str) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings file: {path}"))?;
        Ok(())
    }

    /// Endpoint to call: the configured URL, or the provider default when the
    /// configured one is blank.
    pub fn endpoint(&self) -> &str {
        if self.api_url.trim().is_empty() {
            self.api_provider.default_endpoint()
        } else {
            &self.api_url
        }
    }

    /// Chunk width for the batch runner; misconfigured values fall back to
    /// the default rather than stalling or unbounding the batch.
    pub fn effective_parallelism(&self) -> usize {
        if self.max_parallel_requests > 0 {
            self.max_parallel_requests as usize
        } else {
            DEFAULT_PARALLEL_REQUESTS as usize
        }
    }
}
