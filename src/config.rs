use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extensions::ManagerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Where extension directories live. Empty means the platform default.
    pub extensions_dir: Option<PathBuf>,
    /// Verbose logging; also lets `RUST_LOG` override the level.
    pub debug: bool,
    pub watchdog: WatchdogConfig,
    pub menu: MenuConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub period_ms: u64,
    pub poll_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    pub kill_grace_ms: u64,
    /// Stop waiting for killed workers after the grace period.
    pub detach_killed: bool,
}

#[allow(clippy::derivable_impls)]
impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            extensions_dir: None,
            debug: false,
            watchdog: WatchdogConfig::default(),
            menu: MenuConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            period_ms: 10_000,
            poll_ms: 100,
        }
    }
}

impl Default for MenuConfig {
    fn default() -> Self {
        // One frame at 60 Hz.
        Self { timeout_ms: 16 }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            kill_grace_ms: 500,
            detach_killed: false,
        }
    }
}

impl RuntimeConfig {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("nova")
            .join("extensions.toml")
    }

    /// Load config from the default location, or return defaults if not found
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let mut config = if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "failed to parse config");
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read config");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.validate();
        config
    }

    /// Validate and clamp config values to acceptable ranges
    fn validate(&mut self) {
        self.watchdog.period_ms = self.watchdog.period_ms.clamp(100, 600_000);
        self.watchdog.poll_ms = self.watchdog.poll_ms.clamp(10, 5_000);
        self.menu.timeout_ms = self.menu.timeout_ms.clamp(1, 1_000);
        self.shutdown.kill_grace_ms = self.shutdown.kill_grace_ms.min(60_000);

        if matches!(&self.extensions_dir, Some(dir) if dir.as_os_str().is_empty()) {
            self.extensions_dir = None;
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;

        Ok(())
    }
}

impl From<&RuntimeConfig> for ManagerConfig {
    fn from(config: &RuntimeConfig) -> Self {
        let defaults = ManagerConfig::default();
        Self {
            extensions_dir: config
                .extensions_dir
                .as_ref()
                .map(|dir| PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).as_ref()))
                .unwrap_or(defaults.extensions_dir),
            watchdog_period: Duration::from_millis(config.watchdog.period_ms),
            watchdog_poll: Duration::from_millis(config.watchdog.poll_ms),
            menu_timeout: Duration::from_millis(config.menu.timeout_ms),
            kill_grace: Duration::from_millis(config.shutdown.kill_grace_ms),
            detach_killed_workers: config.shutdown.detach_killed,
        }
    }
}
