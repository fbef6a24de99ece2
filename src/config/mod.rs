use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::behaviors::retry::RetryPolicy;
use crate::host::HostOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    /// Delay before the slow-server warning, in milliseconds
    #[serde(default = "default_warn_after_ms")]
    pub warn_after_ms: u64,

    /// Total delay before the blind resubmit, in milliseconds
    #[serde(default = "default_retry_after_ms")]
    pub retry_after_ms: u64,

    /// Resubmit at the retry deadline, or stop at the warning
    #[serde(default = "default_true")]
    pub resubmit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeSection {
    /// Auto-dismiss delay for flash notices, in milliseconds
    #[serde(default = "default_dismiss_after_ms")]
    pub dismiss_after_ms: u64,

    /// Raise a desktop notification for error-severity notices
    #[serde(default)]
    pub desktop_notifications: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DemoSection {
    /// Simulated server response delay; absent means the server never
    /// responds, which leaves the retry cycle observable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub retry: RetrySection,

    #[serde(default)]
    pub notices: NoticeSection,

    #[serde(default)]
    pub demo: DemoSection,
}

fn default_warn_after_ms() -> u64 {
    7_000
}

fn default_retry_after_ms() -> u64 {
    30_000
}

fn default_dismiss_after_ms() -> u64 {
    45_000
}

fn default_true() -> bool {
    true
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            warn_after_ms: default_warn_after_ms(),
            retry_after_ms: default_retry_after_ms(),
            resubmit: true,
        }
    }
}

impl Default for NoticeSection {
    fn default() -> Self {
        Self {
            dismiss_after_ms: default_dismiss_after_ms(),
            desktop_notifications: false,
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("foliant");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => return Ok(config.validated()),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
        }

        let config = AppConfig::default();
        let _ = config.save();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject timing combinations that would invert the retry stages.
    pub fn validated(mut self) -> Self {
        if self.retry.retry_after_ms <= self.retry.warn_after_ms {
            tracing::warn!(
                warn_after_ms = self.retry.warn_after_ms,
                retry_after_ms = self.retry.retry_after_ms,
                "retry_after_ms must exceed warn_after_ms, using defaults"
            );
            self.retry = RetrySection::default();
        }
        self
    }

    pub fn host_options(&self) -> HostOptions {
        HostOptions {
            retry: RetryPolicy {
                warn_after: Duration::from_millis(self.retry.warn_after_ms),
                retry_after: Duration::from_millis(self.retry.retry_after_ms),
                resubmit: self.retry.resubmit,
            },
            dismiss_after: Duration::from_millis(self.notices.dismiss_after_ms),
        }
    }
}
