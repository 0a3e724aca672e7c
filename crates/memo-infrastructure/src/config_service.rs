//! Configuration service implementation.
//!
//! Loads the root configuration from `~/.config/memo/config.toml` and applies
//! environment overrides on top.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use memo_core::MemoError;
use memo_core::config::MemoConfig;
use memo_core::error::Result;

use crate::paths::MemoPaths;

pub const ENV_SUPABASE_URL: &str = "MEMO_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "MEMO_SUPABASE_ANON_KEY";

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<MemoConfig>>>,
}

impl ConfigService {
    /// Creates a ConfigService reading `config.toml` under the given paths.
    ///
    /// The configuration is loaded lazily on first access.
    pub fn new(paths: &MemoPaths) -> Result<Self> {
        let path = paths
            .config_file()
            .map_err(|e| MemoError::config(e.to_string()))?;
        Ok(Self::with_path(path))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<MemoConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let mut loaded = Self::load_config(&self.path)?;
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());

        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    /// Reads the config file, writing a default one when it does not exist yet.
    fn load_config(path: &Path) -> Result<MemoConfig> {
        if !path.exists() {
            let default_config = MemoConfig::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            tracing::info!(path = %path.display(), "Created default config");
            return Ok(default_config);
        }

        let raw = std::fs::read_to_string(path)?;
        let config: MemoConfig = toml::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }
}

/// Applies `MEMO_SUPABASE_URL` / `MEMO_SUPABASE_ANON_KEY` when set and non-empty.
pub fn apply_env_overrides(config: &mut MemoConfig, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(url) = non_empty(ENV_SUPABASE_URL) {
        config.supabase.url = url;
    }
    if let Some(key) = non_empty(ENV_SUPABASE_ANON_KEY) {
        config.supabase.anon_key = key;
    }
}
