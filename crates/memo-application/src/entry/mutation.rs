//! Create/update/delete against the remote store.
//!
//! Each mutation requires a session, runs exactly once, and on success invalidates the
//! entry cache before notifying the user. Failures become failure notifications here;
//! the returned error only lets the caller decide whether to reset its own state.

use std::sync::Arc;

use memo_core::MemoError;
use memo_core::entry::{EntryId, EntryPatch, EntryStore, NewEntry};
use memo_core::error::Result;
use memo_core::notification::{Notification, Notifier};
use memo_core::session::Session;
use tokio::sync::watch;

use super::cache::EntryCache;

pub struct MutationPipeline {
    store: Arc<dyn EntryStore>,
    session: watch::Receiver<Option<Session>>,
    cache: EntryCache,
    notifier: Arc<dyn Notifier>,
}

impl MutationPipeline {
    pub fn new(
        store: Arc<dyn EntryStore>,
        session: watch::Receiver<Option<Session>>,
        cache: EntryCache,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            session,
            cache,
            notifier,
        }
    }

    fn require_session(&self) -> Result<Session> {
        self.session.borrow().clone().ok_or(MemoError::AuthAbsent)
    }

    /// Creates an entry owned by the signed-in user.
    pub async fn create(&self, title: &str, content: &str) -> Result<()> {
        let session = self.require_session()?;
        let entry = NewEntry {
            title: title.to_string(),
            content: content.to_string(),
            owner: session.owner().clone(),
        };
        let result = self.store.insert(&session, entry).await;
        self.complete(result, "Note created", "create")
    }

    /// Replaces title and content of `id`. Owner and creation time are untouched.
    pub async fn update(&self, id: &EntryId, title: &str, content: &str) -> Result<()> {
        let session = self.require_session()?;
        let patch = EntryPatch {
            title: title.to_string(),
            content: content.to_string(),
        };
        let result = self.store.update_by_id(&session, id, patch).await;
        self.complete(result, "Note updated", "update")
            .inspect(|_| tracing::debug!(entry_id = %id, "Update committed"))
    }

    /// Deletes `id` unconditionally. Asking the user is the caller's job.
    pub async fn delete(&self, id: &EntryId) -> Result<()> {
        let session = self.require_session()?;
        let result = self.store.delete_by_id(&session, id).await;
        self.complete(result, "Note deleted", "delete")
            .inspect(|_| tracing::debug!(entry_id = %id, "Delete committed"))
    }

    fn complete(&self, result: Result<()>, success: &str, action: &str) -> Result<()> {
        match result {
            Ok(()) => {
                let generation = self.cache.invalidate();
                tracing::info!(generation, "Note {} succeeded", action);
                self.notifier.notify(Notification::success(success));
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Note {} failed: {}", action, e);
                self.notifier.notify(Notification::failure(e.to_string()));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memo_core::notification::NotificationLevel;
    use memo_infrastructure::InMemoryEntryStore;

    // Mock Notifier for testing
    #[derive(Default)]
    struct RecordingNotifier {
        seen: std::sync::Mutex<Vec<Notification>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: Notification) {
            self.seen.lock().unwrap().push(notification);
        }
    }

    struct Fixture {
        store: Arc<InMemoryEntryStore>,
        notifier: Arc<RecordingNotifier>,
        cache: EntryCache,
        pipeline: MutationPipeline,
        _tx: watch::Sender<Option<Session>>,
    }

    fn fixture(session: Option<Session>) -> Fixture {
        let store = Arc::new(InMemoryEntryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let (tx, rx) = watch::channel(session);
        let cache = EntryCache::new(store.clone(), rx.clone());
        let pipeline = MutationPipeline::new(store.clone(), rx, cache.clone(), notifier.clone());
        Fixture {
            store,
            notifier,
            cache,
            pipeline,
            _tx: tx,
        }
    }

    #[tokio::test]
    async fn test_create_invalidates_and_notifies() {
        let f = fixture(Some(Session::new("alice", "t")));
        f.pipeline.create("A", "B").await.unwrap();

        assert!(f.cache.is_stale());
        let entries = f.cache.settle().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "A");
        assert_eq!(entries[0].owner.as_str(), "alice");

        let seen = f.notifier.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[Notification::success("Note created")]);
    }

    #[tokio::test]
    async fn test_store_rejection_is_notified_verbatim() {
        let f = fixture(Some(Session::new("alice", "t")));
        f.store.set_failure(Some("duplicate key value")).await;

        let err = f.pipeline.create("A", "B").await.unwrap_err();
        assert!(err.is_remote());
        assert!(!f.cache.is_stale());

        let seen = f.notifier.seen.lock().unwrap();
        assert_eq!(seen[0].level, NotificationLevel::Failure);
        assert_eq!(seen[0].message, "duplicate key value");
    }

    #[tokio::test]
    async fn test_no_session_short_circuits() {
        let f = fixture(None);
        let id = EntryId::new("x");

        assert_eq!(f.pipeline.create("A", "B").await, Err(MemoError::AuthAbsent));
        assert_eq!(f.pipeline.update(&id, "A", "B").await, Err(MemoError::AuthAbsent));
        assert_eq!(f.pipeline.delete(&id).await, Err(MemoError::AuthAbsent));

        assert_eq!(f.store.calls().total(), 0);
        assert!(f.notifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_id_fails_without_invalidating() {
        let f = fixture(Some(Session::new("alice", "t")));
        f.pipeline.create("A", "B").await.unwrap();
        let before = f.cache.settle().await.unwrap();

        let err = f.pipeline.delete(&EntryId::new("missing")).await.unwrap_err();
        assert!(err.is_remote());
        assert!(!f.cache.is_stale());
        assert_eq!(f.cache.list(), before);
    }

    #[tokio::test]
    async fn test_update_keeps_identity() {
        let f = fixture(Some(Session::new("alice", "t")));
        f.pipeline.create("A", "B").await.unwrap();
        let original = f.cache.settle().await.unwrap().remove(0);

        f.pipeline.update(&original.id, "A2", "B2").await.unwrap();
        let updated = f.cache.settle().await.unwrap().remove(0);

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.owner, original.owner);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!((updated.title.as_str(), updated.content.as_str()), ("A2", "B2"));
    }
}
