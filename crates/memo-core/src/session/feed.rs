//! Session feed trait.
//!
//! The authentication collaborator exposes a one-shot lookup of the current session and
//! a push feed of changes. Subscriptions are broadcast receivers: each subscriber sees
//! every change from the moment it subscribed, and dropping the subscription
//! unsubscribes.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::model::{Session, SessionChange};
use crate::error::Result;

/// Capacity used by feed implementations for their change channel.
pub const SESSION_FEED_CAPACITY: usize = 16;

/// Source of session state and session-change events.
#[async_trait]
pub trait SessionFeed: Send + Sync {
    /// Resolves the current session, if any.
    async fn current_session(&self) -> Result<Option<Session>>;

    /// Subscribes to session changes. The returned handle is the unsubscribe handle.
    fn subscribe(&self) -> SessionSubscription;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<()>;
}

/// What a subscriber observes on the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Changed(SessionChange),
    /// The subscriber fell behind and missed this many changes.
    Lagged(u64),
}

/// Handle to a live subscription on a [`SessionFeed`].
#[derive(Debug)]
pub struct SessionSubscription {
    rx: broadcast::Receiver<SessionChange>,
}

impl SessionSubscription {
    pub fn new(rx: broadcast::Receiver<SessionChange>) -> Self {
        Self { rx }
    }

    /// Waits for the next event. Returns `None` once the feed is gone.
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        match self.rx.recv().await {
            Ok(change) => Some(FeedEvent::Changed(change)),
            Err(RecvError::Lagged(missed)) => Some(FeedEvent::Lagged(missed)),
            Err(RecvError::Closed) => None,
        }
    }

    /// Stops receiving changes.
    pub fn unsubscribe(self) {
        drop(self);
    }
}
