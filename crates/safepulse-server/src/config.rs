//! Server configuration from the environment

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use agent_core::{AgentConfig, GenerationOptions, RetryPolicy};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// JSON dataset of crime reports; the built-in sample when unset
    pub crime_data_path: Option<PathBuf>,

    pub max_iterations: usize,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,

    /// Covers every retry attempt plus model latency
    pub deadline: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            crime_data_path: None,
            max_iterations: 10,
            retry_attempts: 3,
            retry_backoff: Duration::from_secs(30),
            deadline: Duration::from_secs(180),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            crime_data_path: std::env::var_os("CRIME_DATA_PATH").map(PathBuf::from),
            max_iterations: env_or("AGENT_MAX_ITERATIONS", defaults.max_iterations)?,
            retry_attempts: env_or("AGENT_RETRY_ATTEMPTS", defaults.retry_attempts)?,
            retry_backoff: Duration::from_secs(env_or(
                "AGENT_RETRY_BACKOFF_SECS",
                defaults.retry_backoff.as_secs(),
            )?),
            deadline: Duration::from_secs(env_or(
                "AGENT_DEADLINE_SECS",
                defaults.deadline.as_secs(),
            )?),
        })
    }

    /// Agent settings for `model`; the system prompt is filled in by the
    /// analysis service from its tools
    pub fn agent_config(&self, model: &str) -> AgentConfig {
        AgentConfig {
            max_iterations: self.max_iterations,
            generation: GenerationOptions {
                model: model.to_string(),
                ..Default::default()
            },
            retry: RetryPolicy::new(self.retry_attempts, self.retry_backoff),
            deadline: Some(self.deadline),
            ..Default::default()
        }
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_backoff, Duration::from_secs(30));
        assert!(config.deadline >= config.retry_backoff * config.retry_attempts);
    }

    #[test]
    fn test_agent_config() {
        let agent = ServerConfig::default().agent_config("llama-3.1-8b-instant");
        assert_eq!(agent.generation.model, "llama-3.1-8b-instant");
        assert_eq!(agent.max_iterations, 10);
        assert_eq!(agent.retry.max_attempts, 3);
        assert_eq!(agent.deadline, Some(Duration::from_secs(180)));
    }

    #[test]
    fn test_env_or_falls_back_when_unset() {
        let value: u32 = env_or("SAFEPULSE_TEST_SURELY_UNSET", 7).unwrap();
        assert_eq!(value, 7);
    }
}
