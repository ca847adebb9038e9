//! Runtime configuration built from the environment.
//!
//! Each subsystem gets its own small config struct with a `from_env`
//! constructor so defaults live next to the knobs they control and tests can
//! construct configs directly.

use std::env;
use std::time::Duration;

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

fn env_duration_secs(key: &str, default_secs: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

/// Policy knobs for background delete jobs and the shared worker pool.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Concurrent workers per batch. Kept low to stay inside provider
    /// rate limits.
    pub concurrency: usize,
    /// Pause after each mutate call before a worker takes its next item.
    pub inter_op_delay: Duration,
    /// How long a terminal job stays queryable before the reaper drops it.
    pub retention: Duration,
    /// Sweep interval for the job/session reaper task.
    pub reap_interval: Duration,
}

impl JobConfig {
    pub fn from_env() -> Self {
        Self {
            concurrency: env_usize("DELETE_JOB_CONCURRENCY", 6).max(1),
            inter_op_delay: env_duration_millis("DELETE_JOB_DELAY_MS", 150),
            retention: env_duration_secs("JOB_RETENTION_SECS", 3_600),
            reap_interval: env_duration_secs("JOB_REAP_INTERVAL_SECS", 60),
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Configuration for the remote mail provider client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_string("GMAIL_API_BASE_URL", "https://gmail.googleapis.com"),
            request_timeout: env_duration_millis("GMAIL_TIMEOUT_MS", 30_000),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Session-store policy. The login flow that mints sessions is external;
/// the optional bootstrap pair seeds one session at startup for local
/// development.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_ttl: Duration,
    pub bootstrap_token: Option<String>,
    pub bootstrap_access_token: Option<String>,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            session_ttl: env_duration_secs("SESSION_TTL_SECS", 24 * 60 * 60),
            bootstrap_token: env_opt_string("SESSION_BOOTSTRAP_TOKEN"),
            bootstrap_access_token: env_opt_string("SESSION_BOOTSTRAP_ACCESS_TOKEN"),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
