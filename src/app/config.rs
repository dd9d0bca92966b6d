use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::dispatch::HandlerConfig;
use crate::notify::{BusKind, DEFAULT_CAPACITY};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Bus to snoop on
    #[serde(default)]
    pub bus: BusKind,
    /// Notification queue settings
    #[serde(default)]
    pub queue: QueueConfig,
    /// Which notifications trigger the handlers
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Handlers run for every matching notification
    #[serde(default = "default_handlers")]
    pub handlers: Vec<HandlerConfig>,
}

fn default_handlers() -> Vec<HandlerConfig> {
    vec![HandlerConfig::ping_phone(), HandlerConfig::play_sound()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: BusKind::default(),
            queue: QueueConfig::default(),
            dispatch: DispatchConfig::default(),
            handlers: default_handlers(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Records buffered before the listener waits for consumers
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl QueueConfig {
    /// The configured capacity, or an error when it is zero
    pub fn checked_capacity(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.capacity).context("queue.capacity must be at least 1")
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Handlers run when the summary contains this text
    #[serde(default = "default_summary_marker")]
    pub summary_marker: String,
}

fn default_summary_marker() -> String {
    "urgent".to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            summary_marker: default_summary_marker(),
        }
    }
}

impl Config {
    /// Load from the default location, writing a default file on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            if let Err(e) = config.save_to(&config_path) {
                tracing::warn!("Failed to save default config: {}", e);
            }
            Ok(config)
        }
    }

    /// Load and validate a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// `~/.config/notif-snoop/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let base_dirs = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))?;
        Ok(base_dirs.home_dir().join(".config/notif-snoop/config.toml"))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.queue.checked_capacity()?;

        let mut names = HashSet::new();
        for handler in &self.handlers {
            if handler.name.trim().is_empty() {
                anyhow::bail!("handler name must not be empty");
            }
            if handler.program.trim().is_empty() {
                anyhow::bail!("handler {} has no program", handler.name);
            }
            if !names.insert(handler.name.as_str()) {
                anyhow::bail!("duplicate handler name: {}", handler.name);
            }
        }
        Ok(())
    }
}
