//! Unified path management for memo configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/memo/              # Config directory
//! ├── config.toml              # Application configuration
//! ├── session.json             # Persisted session token
//! └── logs/                    # Application logs
//!     └── memo.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolves every memo path from one root.
///
/// The default root is the platform config directory joined with `memo`; tests and the
/// `--config` flag pass an explicit root instead.
#[derive(Debug, Clone)]
pub struct MemoPaths {
    root: Option<PathBuf>,
}

impl MemoPaths {
    const APP_DIR: &'static str = "memo";

    /// Creates a resolver. `None` uses the platform config directory.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Returns the memo configuration directory (e.g. `~/.config/memo/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(Self::APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    pub fn session_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("session.json"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("logs"))
    }
}

impl Default for MemoPaths {
    fn default() -> Self {
        Self::new(None)
    }
}
