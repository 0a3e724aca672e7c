//! Collaborators for the prompt: the remote Supabase project or an in-process stand-in.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use memo_core::config::MemoConfig;
use memo_core::confirm::Confirmer;
use memo_core::entry::EntryStore;
use memo_core::session::{Session, SessionFeed};
use memo_infrastructure::{
    InMemoryEntryStore, InMemorySessionFeed, MemoPaths, SessionTokenStore, SupabaseEntryStore,
    SupabaseSessionFeed,
};

/// The sign-in side of the session feed in use.
pub enum Backend {
    Offline(Arc<InMemorySessionFeed>),
    Supabase(Arc<SupabaseSessionFeed>),
}

impl Backend {
    /// Builds the feed and store. Offline mode keeps everything in memory for this run.
    pub fn connect(
        offline: bool,
        config: &MemoConfig,
        paths: &MemoPaths,
    ) -> Result<(Self, Arc<dyn SessionFeed>, Arc<dyn EntryStore>)> {
        if offline {
            tracing::info!("Starting in offline mode");
            let feed = Arc::new(InMemorySessionFeed::new());
            let session_feed: Arc<dyn SessionFeed> = feed.clone();
            let store: Arc<dyn EntryStore> = Arc::new(InMemoryEntryStore::new());
            return Ok((Self::Offline(feed), session_feed, store));
        }

        config.validate_remote()?;
        let token_store = SessionTokenStore::new(paths.session_file()?);
        let feed = Arc::new(SupabaseSessionFeed::new(&config.supabase, token_store));
        let session_feed: Arc<dyn SessionFeed> = feed.clone();
        let store: Arc<dyn EntryStore> = Arc::new(SupabaseEntryStore::new(&config.supabase));
        tracing::info!(url = %config.supabase.url, "Using Supabase project");
        Ok((Self::Supabase(feed), session_feed, store))
    }

    /// Signs in. The resulting session reaches the screen through the feed.
    pub async fn sign_in(&self, email: &str, password: &str) -> memo_core::error::Result<()> {
        match self {
            Self::Offline(feed) => {
                // Any credentials work offline; the email doubles as the user id
                let mut session = Session::new(email, "offline");
                session.user.email = Some(email.to_string());
                feed.sign_in(session).await;
                Ok(())
            }
            Self::Supabase(feed) => feed.sign_in_with_password(email, password).await.map(|_| ()),
        }
    }
}

/// Asks on the terminal and accepts `y` or `yes`.
pub struct PromptConfirmer;

#[async_trait]
impl Confirmer for PromptConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        print!("{} {} ", prompt.bright_yellow(), "[y/N]".bright_black());
        let _ = io::stdout().flush();

        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;
        match answer {
            Ok(Ok(line)) => is_yes(&line),
            _ => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_remote_mode_requires_settings() {
        let dir = std::env::temp_dir();
        let paths = MemoPaths::new(Some(dir));
        let result = Backend::connect(false, &MemoConfig::default(), &paths);
        assert!(result.is_err());
    }

    #[test]
    fn test_offline_mode_needs_no_settings() {
        let paths = MemoPaths::new(None);
        let (backend, _, _) = Backend::connect(true, &MemoConfig::default(), &paths).unwrap();
        assert!(matches!(backend, Backend::Offline(_)));
    }
}
