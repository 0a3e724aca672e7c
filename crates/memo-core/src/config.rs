use serde::{Deserialize, Serialize};

use crate::error::{MemoError, Result};

pub const DEFAULT_NOTES_TABLE: &str = "notes";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoConfig {
    #[serde(default)]
    pub supabase: SupabaseSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SupabaseSettings {
    /// Project URL, e.g. `https://xyz.supabase.co`
    #[serde(default)]
    pub url: String,
    /// Public anon key sent as the `apikey` header
    #[serde(default)]
    pub anon_key: String,
    #[serde(default = "default_notes_table")]
    pub notes_table: String,
}

impl Default for SupabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            notes_table: default_notes_table(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_notes_table() -> String {
    DEFAULT_NOTES_TABLE.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl MemoConfig {
    /// Checks that the remote store can be reached with this configuration.
    pub fn validate_remote(&self) -> Result<()> {
        if self.supabase.url.trim().is_empty() {
            return Err(MemoError::config(
                "supabase.url is not set (config.toml or MEMO_SUPABASE_URL)",
            ));
        }
        if self.supabase.anon_key.trim().is_empty() {
            return Err(MemoError::config(
                "supabase.anon_key is not set (config.toml or MEMO_SUPABASE_ANON_KEY)",
            ));
        }
        Ok(())
    }
}
