use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub terminal: TerminalConfig,
}

/// File sync behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between reconcile ticks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Number of spaces each tab is expanded to when a file is loaded
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,

    /// Re-list the current directory on every tick
    #[serde(default = "default_true")]
    pub refresh_listing: bool,
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_tab_width() -> usize {
    2
}

fn default_true() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            tab_width: default_tab_width(),
            refresh_listing: true,
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Embedded terminal behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Shell binary; `$SHELL` when unset
    #[serde(default)]
    pub shell: Option<String>,

    #[serde(default = "default_login_flag")]
    pub login_flag: String,

    #[serde(default = "default_exec_flag")]
    pub exec_flag: String,

    /// Source `~/.<shell>rc` before every command
    #[serde(default = "default_true")]
    pub source_rc: bool,

    /// Text appended after every finished command
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Line prefix marking a submitted command
    #[serde(default = "default_prompt_marker")]
    pub prompt_marker: String,

    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
}

fn default_login_flag() -> String {
    "-l".to_string()
}

fn default_exec_flag() -> String {
    "-c".to_string()
}

fn default_prompt() -> String {
    "$ ".to_string()
}

fn default_prompt_marker() -> String {
    "$".to_string()
}

fn default_read_chunk_size() -> usize {
    1024
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            shell: None,
            login_flag: default_login_flag(),
            exec_flag: default_exec_flag(),
            source_rc: true,
            prompt: default_prompt(),
            prompt_marker: default_prompt_marker(),
            read_chunk_size: default_read_chunk_size(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "sync.poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.terminal.read_chunk_size == 0 {
            return Err(ConfigError::Validation(
                "terminal.read_chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.terminal.prompt_marker.is_empty() {
            return Err(ConfigError::Validation(
                "terminal.prompt_marker cannot be empty".to_string(),
            ));
        }

        if !self.terminal.prompt.starts_with(&self.terminal.prompt_marker) {
            return Err(ConfigError::Validation(
                "terminal.prompt must start with terminal.prompt_marker".to_string(),
            ));
        }

        if self.terminal.exec_flag.is_empty() {
            return Err(ConfigError::Validation(
                "terminal.exec_flag cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
