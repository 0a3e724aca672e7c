//! Single-screen controller for the notes UI.
//!
//! `NotesScreen` wires the session monitor, entry cache, mutation pipeline and editor
//! together. The front end only renders what this exposes and forwards user actions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use memo_core::MemoError;
use memo_core::confirm::Confirmer;
use memo_core::entry::{Entry, EntryStore};
use memo_core::error::Result;
use memo_core::notification::Notifier;
use memo_core::session::{Session, SessionFeed};
use tokio::task::JoinHandle;

use crate::editor::{Editor, Submission};
use crate::entry::{EntryCache, MutationPipeline};
use crate::session_monitor::SessionMonitor;

/// Where the front end should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// No session: show the sign-in entry point.
    SignIn,
    Notes,
}

pub struct NotesScreen {
    feed: Arc<dyn SessionFeed>,
    monitor: SessionMonitor,
    cache: EntryCache,
    follower: JoinHandle<()>,
    pipeline: MutationPipeline,
    editor: Mutex<Editor>,
    confirmer: Arc<dyn Confirmer>,
}

impl NotesScreen {
    /// Resolves the session and, if there is one, starts loading its entries.
    pub async fn start(
        feed: Arc<dyn SessionFeed>,
        store: Arc<dyn EntryStore>,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        let monitor = SessionMonitor::start(Arc::clone(&feed)).await;
        let cache = EntryCache::new(Arc::clone(&store), monitor.subscribe());
        // Scope to the resolved session now so the first settle waits for the first fetch
        cache.reset_for_session(monitor.current().as_ref());
        let follower = cache.follow_session();
        let pipeline = MutationPipeline::new(store, monitor.subscribe(), cache.clone(), notifier);

        Self {
            feed,
            monitor,
            cache,
            follower,
            pipeline,
            editor: Mutex::new(Editor::new()),
            confirmer,
        }
    }

    pub fn route(&self) -> Route {
        if self.monitor.is_authenticated() {
            Route::Notes
        } else {
            Route::SignIn
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.monitor.current()
    }

    /// Waits until the session cell leads to `route`, then scopes the cache to it.
    pub async fn wait_for_route(&self, route: Route) {
        let mut rx = self.monitor.subscribe();
        let wanted = route == Route::Notes;
        // The sender lives in the monitor, which outlives this borrow
        let session = match rx.wait_for(|session| session.is_some() == wanted).await {
            Ok(session) => session.clone(),
            Err(_) => return,
        };
        // The follower may not have seen the change yet
        self.cache.reset_for_session(session.as_ref());
    }

    /// Latest settled entries, newest first.
    ///
    /// On a fetch failure the previous snapshot is returned along with the error.
    pub async fn entries(&self) -> (Vec<Entry>, Option<MemoError>) {
        match self.cache.settle().await {
            Ok(entries) => (entries, None),
            Err(e) => (self.cache.list(), Some(e)),
        }
    }

    /// Re-fetches the list regardless of pending invalidations.
    pub async fn refresh(&self) -> Result<Vec<Entry>> {
        self.cache.refresh().await
    }

    pub fn cache(&self) -> &EntryCache {
        &self.cache
    }

    /// A copy of the editor state for rendering.
    pub fn editor(&self) -> Editor {
        self.lock_editor().clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.lock_editor().set_title(title);
    }

    pub fn set_content(&self, content: impl Into<String>) {
        self.lock_editor().set_content(content);
    }

    pub fn start_edit(&self, entry: Entry) -> Result<()> {
        self.lock_editor().start_edit(entry)
    }

    pub fn cancel_edit(&self) -> Result<()> {
        self.lock_editor().cancel_edit()
    }

    /// Submits the draft as a create or an update, depending on the editor mode.
    ///
    /// Validation failures return before any remote call. Remote failures have already
    /// been notified when this returns; the draft is kept so the user can retry.
    pub async fn submit(&self) -> Result<()> {
        let submission = self.lock_editor().begin_submit()?;
        let outcome = match &submission {
            Submission::Create { title, content } => self.pipeline.create(title, content).await,
            Submission::Update { id, title, content } => {
                self.pipeline.update(id, title, content).await
            }
        };
        self.lock_editor().finish_submit(&outcome);
        outcome
    }

    /// Deletes `entry` after the user confirms. Returns whether a delete was attempted
    /// and succeeded; a declined confirmation makes no remote call.
    pub async fn delete_entry(&self, entry: &Entry) -> Result<bool> {
        let prompt = format!("Delete \"{}\"?", entry.title);
        if !self.confirmer.confirm(&prompt).await {
            tracing::debug!(entry_id = %entry.id, "Delete declined");
            return Ok(false);
        }
        self.pipeline.delete(&entry.id).await?;

        let mut editor = self.lock_editor();
        if !editor.is_pending() && editor.editing_id() == Some(&entry.id) {
            // The row being edited is gone
            editor.reset();
        }
        Ok(true)
    }

    /// Signs out through the feed and drops the local draft and cached rows.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.feed.sign_out().await;
        self.lock_editor().reset();
        self.cache.reset_for_session(None);
        match &result {
            Ok(()) => tracing::info!("Signed out"),
            Err(e) => tracing::warn!("Remote sign-out failed, local session cleared: {}", e),
        }
        result
    }

    /// Stops following the session feed.
    pub fn shutdown(&self) {
        self.follower.abort();
        self.monitor.shutdown();
    }

    fn lock_editor(&self) -> MutexGuard<'_, Editor> {
        self.editor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NotesScreen {
    fn drop(&mut self) {
        self.follower.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memo_core::confirm::AutoConfirm;
    use memo_core::notification::ChannelNotifier;
    use memo_infrastructure::{InMemoryEntryStore, InMemorySessionFeed};

    async fn screen(feed: Arc<InMemorySessionFeed>, confirm: bool) -> NotesScreen {
        let (notifier, _rx) = ChannelNotifier::channel();
        NotesScreen::start(
            feed,
            Arc::new(InMemoryEntryStore::new()),
            Arc::new(notifier),
            Arc::new(AutoConfirm(confirm)),
        )
        .await
    }

    #[tokio::test]
    async fn test_routes_follow_session() {
        let feed = Arc::new(InMemorySessionFeed::new());
        let screen = screen(feed.clone(), true).await;
        assert_eq!(screen.route(), Route::SignIn);

        feed.sign_in(Session::new("alice", "t")).await;
        screen.wait_for_route(Route::Notes).await;
        assert_eq!(screen.session().unwrap().owner().as_str(), "alice");
    }

    #[tokio::test]
    async fn test_deleting_edited_entry_resets_editor() {
        let feed = Arc::new(InMemorySessionFeed::with_session(Session::new("alice", "t")));
        let screen = screen(feed, true).await;
        screen.set_title("A");
        screen.set_content("B");
        screen.submit().await.unwrap();

        let (entries, _) = screen.entries().await;
        screen.start_edit(entries[0].clone()).unwrap();
        assert!(screen.delete_entry(&entries[0]).await.unwrap());
        assert!(screen.editor().editing_id().is_none());
    }
}
