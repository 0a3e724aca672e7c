//! In-process session feed with programmatic sign-in and sign-out.

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use memo_core::MemoError;
use memo_core::error::Result;
use memo_core::session::{
    SESSION_FEED_CAPACITY, Session, SessionChange, SessionFeed, SessionSubscription,
};

pub struct InMemorySessionFeed {
    current: RwLock<Option<Session>>,
    resolution_error: RwLock<Option<String>>,
    tx: broadcast::Sender<SessionChange>,
}

impl InMemorySessionFeed {
    pub fn new() -> Self {
        Self::starting_with(None)
    }

    /// Starts with `session` already established, as if restored from a token.
    pub fn with_session(session: Session) -> Self {
        Self::starting_with(Some(session))
    }

    fn starting_with(session: Option<Session>) -> Self {
        let (tx, _) = broadcast::channel(SESSION_FEED_CAPACITY);
        Self {
            current: RwLock::new(session),
            resolution_error: RwLock::new(None),
            tx,
        }
    }

    pub async fn sign_in(&self, session: Session) {
        *self.current.write().await = Some(session.clone());
        self.publish(SessionChange::signed_in(session));
    }

    pub async fn refresh(&self, session: Session) {
        *self.current.write().await = Some(session.clone());
        self.publish(SessionChange::token_refreshed(session));
    }

    /// Makes `current_session` fail until cleared with `None`.
    pub async fn set_resolution_error(&self, message: Option<&str>) {
        *self.resolution_error.write().await = message.map(str::to_string);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn publish(&self, change: SessionChange) {
        // No subscribers is fine; the current value is still readable
        let _ = self.tx.send(change);
    }
}

impl Default for InMemorySessionFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionFeed for InMemorySessionFeed {
    async fn current_session(&self) -> Result<Option<Session>> {
        if let Some(message) = self.resolution_error.read().await.as_ref() {
            return Err(MemoError::remote(message.clone()));
        }
        Ok(self.current.read().await.clone())
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.tx.subscribe())
    }

    async fn sign_out(&self) -> Result<()> {
        *self.current.write().await = None;
        self.publish(SessionChange::signed_out());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memo_core::session::{AuthEvent, FeedEvent};

    #[tokio::test]
    async fn test_sign_in_and_out_are_published() {
        let feed = InMemorySessionFeed::new();
        let mut subscription = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        feed.sign_in(Session::new("alice", "t")).await;
        feed.sign_out().await.unwrap();

        match subscription.recv().await {
            Some(FeedEvent::Changed(change)) => assert_eq!(change.event, AuthEvent::SignedIn),
            other => panic!("unexpected event: {other:?}"),
        }
        match subscription.recv().await {
            Some(FeedEvent::Changed(change)) => {
                assert_eq!(change.event, AuthEvent::SignedOut);
                assert!(change.session.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(feed.current_session().await.unwrap().is_none());

        subscription.unsubscribe();
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_resolution_error() {
        let feed = InMemorySessionFeed::with_session(Session::new("alice", "t"));
        feed.set_resolution_error(Some("network down")).await;
        assert!(feed.current_session().await.is_err());
        feed.set_resolution_error(None).await;
        assert!(feed.current_session().await.unwrap().is_some());
    }
}
