use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use repodrive_core::{Backoff, RepoId, RetryPolicy};

use crate::sync::engine::{EngineOptions, MoveOrder};

const DEFAULT_MAX_ATTEMPTS: u64 = 5;
const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;
const DEFAULT_BACKOFF_MAX_MS: u64 = 60_000;
const DEFAULT_PACING_MS: u64 = 100;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub repo: RepoId,
    pub token: String,
    pub branch: Option<String>,
    pub api_url: Option<String>,
    pub state_dir: PathBuf,
    pub retry: RetryPolicy,
    pub engine: EngineOptions,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let repo = std::env::var("REPODRIVE_REPO").context("REPODRIVE_REPO is not set")?;
        let repo = RepoId::parse(&repo)
            .with_context(|| format!("REPODRIVE_REPO must be owner/name, got `{repo}`"))?;
        let token = read_string_env("REPODRIVE_TOKEN")
            .or_else(|| read_string_env("GITHUB_TOKEN"))
            .context("REPODRIVE_TOKEN or GITHUB_TOKEN must be set")?;
        let state_dir = read_string_env("REPODRIVE_STATE_DIR")
            .map(|value| match dirs::home_dir() {
                Some(home) => expand_with_home(&value, &home),
                None => PathBuf::from(value),
            })
            .unwrap_or_else(default_state_dir);

        let base = Duration::from_millis(read_u64_env(
            "REPODRIVE_BACKOFF_BASE_MS",
            DEFAULT_BACKOFF_BASE_MS,
        ));
        let max = Duration::from_millis(read_u64_env(
            "REPODRIVE_BACKOFF_MAX_MS",
            DEFAULT_BACKOFF_MAX_MS,
        ));
        let attempts = read_u64_env("REPODRIVE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS);
        let retry = RetryPolicy::new(
            u32::try_from(attempts).unwrap_or(u32::MAX),
            Backoff::new(base, max, true),
        );

        let move_order = match read_string_env("REPODRIVE_MOVE_ORDER") {
            Some(value) => parse_move_order(&value)?,
            None => MoveOrder::default(),
        };
        // Zero is a valid pacing, so this one skips read_u64_env's filter.
        let pacing = std::env::var("REPODRIVE_PACING_MS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_PACING_MS));

        Ok(Self {
            repo,
            token,
            branch: read_string_env("REPODRIVE_BRANCH"),
            api_url: read_string_env("REPODRIVE_API_URL"),
            state_dir,
            retry,
            engine: EngineOptions { move_order, pacing },
        })
    }
}

fn parse_move_order(value: &str) -> anyhow::Result<MoveOrder> {
    match value.trim().to_ascii_lowercase().as_str() {
        "copy-first" | "copy_first" => Ok(MoveOrder::CopyFirst),
        "delete-first" | "delete_first" => Ok(MoveOrder::DeleteFirst),
        other => anyhow::bail!("REPODRIVE_MOVE_ORDER must be copy-first or delete-first, got `{other}`"),
    }
}

fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("repodrive")
}

fn read_string_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_u64_env(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
