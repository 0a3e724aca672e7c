//! Invalidate-on-write cache of the signed-in user's entries.
//!
//! The cache is written only by fetches. Every fetch is tagged with the generation that
//! was current when it started; `invalidate` bumps the generation and schedules a fetch.
//! At most one fetch is in flight: invalidations that land meanwhile collapse into a
//! single follow-up fetch once the current one completes. A result is applied only if
//! its tag is not older than what is already applied and not older than the last change
//! of owner, so late results never overwrite newer data or leak another user's rows.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use memo_core::MemoError;
use memo_core::entry::{Entry, EntryStore, sort_newest_first};
use memo_core::error::Result;
use memo_core::session::{Session, UserId};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

/// Monotonic cache generation.
pub type Generation = u64;

#[derive(Default)]
struct CacheState {
    entries: Vec<Entry>,
    /// Owner the cached rows belong to; `None` while signed out.
    owner: Option<UserId>,
    /// Latest generation asked for.
    requested: Generation,
    /// Generation of the snapshot in `entries`.
    applied: Generation,
    /// Latest generation a fetch has completed for, successfully or not.
    attempted: Generation,
    /// Results tagged below this generation belong to a previous owner.
    floor: Generation,
    in_flight: bool,
    failed: Option<(Generation, MemoError)>,
}

impl CacheState {
    /// Switches the cache to `owner`, dropping rows of the previous one.
    fn rescope(&mut self, owner: Option<UserId>) -> bool {
        if self.owner == owner {
            return false;
        }
        self.entries.clear();
        self.owner = owner;
        self.requested += 1;
        self.floor = self.requested;
        self.failed = None;
        if self.owner.is_none() {
            // Nothing to fetch while signed out; the empty list is the settled state
            self.applied = self.requested;
            self.attempted = self.requested;
        }
        true
    }

    fn needs_fetch(&self) -> bool {
        !self.in_flight && self.requested > self.attempted
    }
}

struct Inner {
    store: Arc<dyn EntryStore>,
    session: watch::Receiver<Option<Session>>,
    state: Mutex<CacheState>,
    settled: Notify,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct EntryCache {
    inner: Arc<Inner>,
}

impl EntryCache {
    pub fn new(store: Arc<dyn EntryStore>, session: watch::Receiver<Option<Session>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                session,
                state: Mutex::new(CacheState::default()),
                settled: Notify::new(),
            }),
        }
    }

    /// The last applied snapshot, newest first. Empty while signed out.
    pub fn list(&self) -> Vec<Entry> {
        self.inner.state().entries.clone()
    }

    /// Generation of the snapshot returned by [`list`](Self::list).
    pub fn applied_generation(&self) -> Generation {
        self.inner.state().applied
    }

    /// Whether a newer snapshot has been asked for but not yet applied.
    pub fn is_stale(&self) -> bool {
        let state = self.inner.state();
        state.applied < state.requested
    }

    /// Error of the latest fetch, if it failed after the visible snapshot was applied.
    pub fn last_error(&self) -> Option<MemoError> {
        let state = self.inner.state();
        state
            .failed
            .as_ref()
            .filter(|(tag, _)| *tag > state.applied)
            .map(|(_, err)| err.clone())
    }

    /// Marks the cached list stale and schedules a re-fetch in the background.
    pub fn invalidate(&self) -> Generation {
        let generation = {
            let mut state = self.inner.state();
            state.requested += 1;
            state.requested
        };
        tracing::debug!(generation, "Entry cache invalidated");
        self.spawn_fetch();
        generation
    }

    /// Waits until the snapshot reflects the latest invalidation and returns it.
    ///
    /// Fails with the error of the fetch that was supposed to satisfy that invalidation;
    /// the previous snapshot stays visible in that case.
    pub async fn settle(&self) -> Result<Vec<Entry>> {
        let target = self.inner.state().requested;
        loop {
            let notified = self.inner.settled.notified();
            {
                let state = self.inner.state();
                if state.applied >= target {
                    return Ok(state.entries.clone());
                }
                if let Some((tag, err)) = &state.failed {
                    if *tag >= target {
                        return Err(err.clone());
                    }
                }
            }
            // The fetch runs on its own task so dropping this future never strands it
            self.spawn_fetch();
            notified.await;
        }
    }

    /// Invalidates and waits for the resulting snapshot.
    pub async fn refresh(&self) -> Result<Vec<Entry>> {
        self.invalidate();
        self.settle().await
    }

    /// Points the cache at `session`'s owner. A different owner (or signing out) drops
    /// the cached rows; a new owner also schedules the first fetch.
    pub fn reset_for_session(&self, session: Option<&Session>) {
        let owner = session.map(|s| s.owner().clone());
        let fetch = {
            let mut state = self.inner.state();
            if !state.rescope(owner) {
                return;
            }
            state.owner.is_some()
        };
        tracing::debug!(fetch, "Entry cache rescoped");
        self.inner.settled.notify_waiters();
        if fetch {
            self.spawn_fetch();
        }
    }

    /// Follows the session cell, rescoping the cache on every change.
    pub fn follow_session(&self) -> JoinHandle<()> {
        let cache = self.clone();
        let mut rx = self.inner.session.clone();
        tokio::spawn(async move {
            loop {
                let session = rx.borrow_and_update().clone();
                cache.reset_for_session(session.as_ref());
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    fn spawn_fetch(&self) {
        let needs_fetch = self.inner.state().needs_fetch();
        if needs_fetch {
            tokio::spawn(drive(Arc::clone(&self.inner)));
        }
    }
}

/// Fetches until the cache has attempted the latest requested generation.
///
/// Returns immediately when another fetch is already in flight; that fetch loops
/// around and picks up the newer generation itself.
async fn drive(inner: Arc<Inner>) {
    loop {
        let session = inner.session.borrow().clone();
        let next = {
            let mut state = inner.state();
            state.rescope(session.as_ref().map(|s| s.owner().clone()));
            if !state.needs_fetch() {
                None
            } else if let Some(session) = session {
                state.in_flight = true;
                Some((state.requested, session))
            } else {
                let tag = state.requested;
                state.attempted = tag;
                state.failed = Some((tag, MemoError::AuthAbsent));
                None
            }
        };

        let Some((tag, session)) = next else {
            inner.settled.notify_waiters();
            return;
        };

        tracing::debug!(generation = tag, "Fetching entries");
        let result = inner.store.list(&session).await;

        {
            let mut state = inner.state();
            state.in_flight = false;
            state.attempted = state.attempted.max(tag);
            match result {
                Ok(mut entries) if tag >= state.applied && tag >= state.floor => {
                    sort_newest_first(&mut entries);
                    tracing::debug!(generation = tag, count = entries.len(), "Entries applied");
                    state.entries = entries;
                    state.applied = tag;
                }
                Ok(_) => {
                    tracing::debug!(generation = tag, "Discarding stale fetch result");
                }
                Err(e) if tag >= state.floor => {
                    tracing::warn!(generation = tag, "Failed to fetch entries: {}", e);
                    state.failed = Some((tag, e));
                }
                Err(e) => {
                    tracing::debug!(generation = tag, "Discarding failure of a previous owner: {}", e);
                }
            }
        }
        inner.settled.notify_waiters();
    }
}
