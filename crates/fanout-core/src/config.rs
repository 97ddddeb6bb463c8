use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Backoff parameters for posting filenames to the coordinator (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRetryConfig {
    /// Maximum number of send attempts per batch report (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for ReportRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.25,
            max_delay_secs: 5,
        }
    }
}

impl ReportRetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Where the queue coordinator listens and how its frames are laid out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// TCP address of the coordinator, e.g. "127.0.0.1:5050".
    pub addr: String,
    /// Fixed width of the length prefix and command header, in bytes.
    pub header_size: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5050".to_string(),
            header_size: crate::queue::DEFAULT_HEADER_SIZE,
        }
    }
}

/// Global configuration loaded from `~/.config/fanout/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Maximum number of batches in flight at once (outer pool size).
    pub process_cap: usize,
    /// Maximum links per batch and threads per outer worker.
    pub thread_cap: usize,
    /// Number of retry rounds after the first round.
    pub max_retries: u32,
    /// Whole-transfer timeout for a single link, in seconds.
    pub fetch_timeout_secs: u64,
    /// Connect timeout for a single link, in seconds.
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Optional report retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub report_retry: Option<ReportRetryConfig>,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            process_cap: 8,
            thread_cap: 4,
            max_retries: 5,
            fetch_timeout_secs: 120,
            connect_timeout_secs: 30,
            coordinator: CoordinatorConfig::default(),
            report_retry: None,
        }
    }
}

impl FanoutConfig {
    pub fn report_policy(&self) -> RetryPolicy {
        self.report_retry.clone().unwrap_or_default().to_policy()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fanout")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FanoutConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FanoutConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FanoutConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = FanoutConfig::default();
        assert_eq!(cfg.process_cap, 8);
        assert_eq!(cfg.thread_cap, 4);
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.fetch_timeout_secs, 120);
        assert_eq!(cfg.coordinator.header_size, 32);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = FanoutConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: FanoutConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.process_cap, cfg.process_cap);
        assert_eq!(parsed.thread_cap, cfg.thread_cap);
        assert_eq!(parsed.coordinator.addr, cfg.coordinator.addr);
    }

    #[test]
    fn config_toml_custom_values_without_coordinator() {
        let toml = r#"
            process_cap = 2
            thread_cap = 3
            max_retries = 1
            fetch_timeout_secs = 10
            connect_timeout_secs = 5
        "#;
        let cfg: FanoutConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.process_cap, 2);
        assert_eq!(cfg.thread_cap, 3);
        assert_eq!(cfg.max_retries, 1);
        assert_eq!(cfg.coordinator.addr, "127.0.0.1:5050");
        assert!(cfg.report_retry.is_none());
    }

    #[test]
    fn config_toml_report_retry_section() {
        let toml = r#"
            process_cap = 8
            thread_cap = 4
            max_retries = 5
            fetch_timeout_secs = 120
            connect_timeout_secs = 30

            [coordinator]
            addr = "10.0.0.2:9000"
            header_size = 24

            [report_retry]
            max_attempts = 4
            base_delay_secs = 0.5
            max_delay_secs = 2
        "#;
        let cfg: FanoutConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.coordinator.addr, "10.0.0.2:9000");
        assert_eq!(cfg.coordinator.header_size, 24);
        let policy = cfg.report_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(2));
    }
}
