//! Process environment inputs: home directory and shell.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub home: PathBuf,
    pub shell: String,
}

impl Environment {
    /// Read `HOME` and `SHELL`, falling back to `/` and `sh`.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::var("HOME").ok(), std::env::var("SHELL").ok())
    }

    pub fn from_vars(home: Option<String>, shell: Option<String>) -> Self {
        let home = home
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));
        let shell = shell
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "sh".to_string());
        Self { home, shell }
    }

    /// Startup directory: `cwd` made absolute, or home when that is the
    /// filesystem root.
    pub fn initial_dir(&self, cwd: &Path) -> std::io::Result<PathBuf> {
        let dir = std::path::absolute(cwd)?;
        if dir.parent().is_none() {
            return Ok(self.home.clone());
        }
        Ok(dir)
    }
}
