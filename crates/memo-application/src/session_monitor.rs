//! Session monitor.
//!
//! Holds the latest known session in a single observable cell. The cell is filled once
//! from the feed's one-shot lookup and then kept current by a listener task that
//! republishes every change pushed by the feed. Readers only ever see the latest value.

use std::sync::{Arc, Mutex, PoisonError};

use memo_core::session::{FeedEvent, Session, SessionFeed, SessionSubscription};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct SessionMonitor {
    state: Arc<watch::Sender<Option<Session>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionMonitor {
    /// Resolves the current session, publishes it, and starts following the feed.
    pub async fn start(feed: Arc<dyn SessionFeed>) -> Self {
        // Subscribe before resolving so a change racing the lookup is not lost
        let subscription = feed.subscribe();
        let initial = resolve(feed.as_ref()).await;
        match &initial {
            Some(session) => tracing::info!(user_id = %session.owner(), "Session restored"),
            None => tracing::info!("No session on start"),
        }

        let (tx, _rx) = watch::channel(initial);
        let state = Arc::new(tx);
        let listener = tokio::spawn(listen(feed, subscription, Arc::clone(&state)));

        Self {
            state,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// The latest published session.
    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// A receiver that always observes the latest published session.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    /// Stops following the feed. The last published value stays readable.
    pub fn shutdown(&self) {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            // Aborting drops the subscription, which unsubscribes from the feed
            handle.abort();
            tracing::debug!("Session monitor stopped");
        }
    }
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One-shot lookup. A failed lookup counts as no session.
async fn resolve(feed: &dyn SessionFeed) -> Option<Session> {
    match feed.current_session().await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Failed to resolve session, treating as signed out: {}", e);
            None
        }
    }
}

async fn listen(
    feed: Arc<dyn SessionFeed>,
    mut subscription: SessionSubscription,
    state: Arc<watch::Sender<Option<Session>>>,
) {
    while let Some(event) = subscription.recv().await {
        let session = match event {
            FeedEvent::Changed(change) => {
                tracing::info!(event = ?change.event, "Session changed");
                change.session
            }
            FeedEvent::Lagged(missed) => {
                tracing::warn!(missed, "Session feed lagged, re-resolving");
                resolve(feed.as_ref()).await
            }
        };
        state.send_replace(session);
    }
    tracing::debug!("Session feed closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use memo_core::error::Result;
    use memo_core::session::{SessionChange, SESSION_FEED_CAPACITY};
    use memo_core::MemoError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::broadcast;

    // Mock SessionFeed for testing
    struct MockFeed {
        current: std::sync::Mutex<Result<Option<Session>>>,
        resolutions: AtomicUsize,
        tx: broadcast::Sender<SessionChange>,
    }

    impl MockFeed {
        fn new(current: Result<Option<Session>>) -> Arc<Self> {
            let (tx, _) = broadcast::channel(SESSION_FEED_CAPACITY);
            Arc::new(Self {
                current: std::sync::Mutex::new(current),
                resolutions: AtomicUsize::new(0),
                tx,
            })
        }
    }

    #[async_trait]
    impl SessionFeed for MockFeed {
        async fn current_session(&self) -> Result<Option<Session>> {
            self.resolutions.fetch_add(1, Ordering::SeqCst);
            self.current.lock().unwrap().clone()
        }

        fn subscribe(&self) -> SessionSubscription {
            SessionSubscription::new(self.tx.subscribe())
        }

        async fn sign_out(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_publishes_initial_session() {
        let feed = MockFeed::new(Ok(Some(Session::new("alice", "t"))));
        let monitor = SessionMonitor::start(feed).await;
        assert!(monitor.is_authenticated());
        assert_eq!(monitor.current().unwrap().owner().as_str(), "alice");
    }

    #[tokio::test]
    async fn test_resolution_failure_is_no_session() {
        let feed = MockFeed::new(Err(MemoError::remote("offline")));
        let monitor = SessionMonitor::start(feed).await;
        assert!(!monitor.is_authenticated());
    }

    #[tokio::test]
    async fn test_republishes_changes_and_unsubscribes() {
        let feed = MockFeed::new(Ok(None));
        let monitor = SessionMonitor::start(feed.clone()).await;
        let mut rx = monitor.subscribe();
        assert_eq!(feed.tx.receiver_count(), 1);

        feed.tx
            .send(SessionChange::signed_in(Session::new("alice", "t")))
            .unwrap();
        let seen = rx.wait_for(|session| session.is_some()).await.unwrap().clone();
        assert_eq!(seen.unwrap().owner().as_str(), "alice");

        feed.tx.send(SessionChange::signed_out()).unwrap();
        rx.wait_for(|session| session.is_none()).await.unwrap();

        monitor.shutdown();
        for _ in 0..10 {
            if feed.tx.receiver_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(feed.tx.receiver_count(), 0);
        assert!(!monitor.is_authenticated());
    }

    #[tokio::test]
    async fn test_lag_re_resolves_current_session() {
        let feed = MockFeed::new(Ok(None));
        let monitor = SessionMonitor::start(feed.clone()).await;
        let mut rx = monitor.subscribe();

        // Overflow the subscriber; the lag is reported before any retained change
        *feed.current.lock().unwrap() = Ok(Some(Session::new("bob", "t")));
        for _ in 0..(SESSION_FEED_CAPACITY + 4) {
            feed.tx
                .send(SessionChange::signed_in(Session::new("bob", "t")))
                .unwrap();
        }

        let seen = rx.wait_for(|session| session.is_some()).await.unwrap().clone();
        assert_eq!(seen.unwrap().owner().as_str(), "bob");
        assert_eq!(feed.resolutions.load(Ordering::SeqCst), 2);
    }
}
