use crate::batch::MAX_TASKS_PER_CALL;
use crate::console::DEFAULT_CONSOLE_BASE_URL;
use crate::error::LaunchError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Launcher settings.
/// Loaded from ~/.config/ecs-runner/config.yaml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// AWS region; the SDK default chain decides when unset.
    #[serde(default)]
    pub region: Option<String>,
    /// Custom ECS endpoint, e.g. LocalStack.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_max_per_call")]
    pub max_per_call: u32,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_console_base_url")]
    pub console_base_url: String,
    /// Default task template on disk. The built-in template is used when unset.
    #[serde(default)]
    pub template_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: None,
            endpoint_url: None,
            max_per_call: default_max_per_call(),
            poll_interval_secs: default_poll_interval_secs(),
            console_base_url: default_console_base_url(),
            template_path: None,
        }
    }
}

fn default_max_per_call() -> u32 {
    MAX_TASKS_PER_CALL
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_console_base_url() -> String {
    DEFAULT_CONSOLE_BASE_URL.to_string()
}

impl Settings {
    /// Load settings from the default path, falling back to defaults.
    pub fn load_default() -> Result<Self, LaunchError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, LaunchError> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&contents)
            .map_err(|e| LaunchError::Config(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Default settings file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("ecs-runner")
            .join("config.yaml")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn validate(&self) -> Result<(), LaunchError> {
        if self.max_per_call == 0 || self.max_per_call > MAX_TASKS_PER_CALL {
            return Err(LaunchError::Config(format!(
                "max_per_call must be between 1 and {}, got {}",
                MAX_TASKS_PER_CALL, self.max_per_call
            )));
        }
        Ok(())
    }
}
