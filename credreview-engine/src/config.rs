use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::commit::{CommitSettings, DraftCleanupPolicy, DEFAULT_MUTATION_TIMEOUT};
use crate::draft_store::DRAFT_DB_FILE_NAME;

#[derive(Clone)]
pub struct Config {
    /// Root of the registry API, e.g. `https://registry.example/api/v1`.
    pub registry_base_url: String,
    /// Optional bearer token sent with every registry request.
    pub registry_api_token: Option<String>,
    /// Directory for the on-device draft database.
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    pub mutation_timeout: Duration,
    pub cleanup_policy: DraftCleanupPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let registry_base_url = env::var("REGISTRY_BASE_URL")
            .context("REGISTRY_BASE_URL environment variable is required")?;
        if registry_base_url.trim().is_empty() {
            bail!("REGISTRY_BASE_URL must not be empty");
        }

        let registry_api_token = parse_api_token(env::var("REGISTRY_API_TOKEN").ok());

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let mutation_timeout = parse_timeout_secs(env::var("MUTATION_TIMEOUT_SECS").ok())
            .context("MUTATION_TIMEOUT_SECS must be a positive number of seconds")?;

        let cleanup_policy = parse_cleanup_policy(env::var("DRAFT_CLEANUP_POLICY").ok())
            .context("DRAFT_CLEANUP_POLICY is invalid")?;

        Ok(Config {
            registry_base_url,
            registry_api_token,
            state_dir,
            mutation_timeout,
            cleanup_policy,
        })
    }

    pub fn commit_settings(&self) -> CommitSettings {
        CommitSettings {
            mutation_timeout: self.mutation_timeout,
            cleanup_policy: self.cleanup_policy,
        }
    }

    pub fn draft_db_path(&self) -> PathBuf {
        self.state_dir.join(DRAFT_DB_FILE_NAME)
    }
}

/// Parse REGISTRY_API_TOKEN from an optional string value.
///
/// Returns None if the value is missing, empty, or contains only whitespace,
/// so a blank variable never produces an empty `Authorization` header.
pub fn parse_api_token(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Parse MUTATION_TIMEOUT_SECS. Missing means the default; zero is refused.
pub fn parse_timeout_secs(value: Option<String>) -> Result<Duration> {
    let Some(value) = value else {
        return Ok(DEFAULT_MUTATION_TIMEOUT);
    };
    let secs = value
        .trim()
        .parse::<u64>()
        .with_context(|| format!("'{}' is not a whole number", value))?;
    if secs == 0 {
        bail!("timeout must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}

pub fn parse_cleanup_policy(value: Option<String>) -> Result<DraftCleanupPolicy> {
    match value {
        Some(value) => value.parse(),
        None => Ok(DraftCleanupPolicy::default()),
    }
}
