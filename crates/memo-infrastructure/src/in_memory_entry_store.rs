//! In-process entry store.
//!
//! Behaves like the remote `notes` table with row-level security: every call only sees
//! the caller's rows, ids are never reused, and blank titles or contents are rejected.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use memo_core::MemoError;
use memo_core::entry::{Entry, EntryId, EntryPatch, EntryStore, NewEntry, sort_newest_first};
use memo_core::error::Result;
use memo_core::session::Session;

/// Number of calls each store operation has received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub list: usize,
    pub insert: usize,
    pub update: usize,
    pub delete: usize,
}

impl StoreCalls {
    pub fn total(&self) -> usize {
        self.list + self.insert + self.update + self.delete
    }
}

#[derive(Default)]
struct Table {
    rows: Vec<Entry>,
    last_created_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct InMemoryEntryStore {
    table: RwLock<Table>,
    failure: RwLock<Option<String>>,
    list_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail with `message` until cleared with `None`.
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.failure.write().await = message.map(str::to_string);
    }

    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            list: self.list_calls.load(Ordering::SeqCst),
            insert: self.insert_calls.load(Ordering::SeqCst),
            update: self.update_calls.load(Ordering::SeqCst),
            delete: self.delete_calls.load(Ordering::SeqCst),
        }
    }

    /// All rows regardless of owner, newest first.
    pub async fn all_rows(&self) -> Vec<Entry> {
        let mut rows = self.table.read().await.rows.clone();
        sort_newest_first(&mut rows);
        rows
    }

    async fn check_failure(&self) -> Result<()> {
        match self.failure.read().await.as_ref() {
            Some(message) => Err(MemoError::remote(message.clone())),
            None => Ok(()),
        }
    }

    fn check_constraint(title: &str, content: &str) -> Result<()> {
        if title.trim().is_empty() || content.trim().is_empty() {
            return Err(MemoError::remote(
                "new row for relation \"notes\" violates check constraint \"notes_not_blank\"",
            ));
        }
        Ok(())
    }

    fn not_found(id: &EntryId) -> MemoError {
        MemoError::remote(format!("Note {id} not found"))
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn list(&self, session: &Session) -> Result<Vec<Entry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure().await?;

        let table = self.table.read().await;
        let mut rows: Vec<Entry> = table
            .rows
            .iter()
            .filter(|row| &row.owner == session.owner())
            .cloned()
            .collect();
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    async fn insert(&self, session: &Session, entry: NewEntry) -> Result<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure().await?;
        Self::check_constraint(&entry.title, &entry.content)?;
        if &entry.owner != session.owner() {
            return Err(MemoError::remote(
                "new row violates row-level security policy for table \"notes\"",
            ));
        }

        let mut table = self.table.write().await;
        // Strictly increasing timestamps keep the newest-first order unambiguous
        let now = Utc::now();
        let created_at = match table.last_created_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        table.last_created_at = Some(created_at);
        table.rows.push(Entry {
            id: EntryId::new(Uuid::new_v4().to_string()),
            title: entry.title,
            content: entry.content,
            owner: entry.owner,
            created_at,
        });
        Ok(())
    }

    async fn update_by_id(
        &self,
        session: &Session,
        id: &EntryId,
        patch: EntryPatch,
    ) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure().await?;
        Self::check_constraint(&patch.title, &patch.content)?;

        let mut table = self.table.write().await;
        let row = table
            .rows
            .iter_mut()
            .find(|row| &row.id == id && &row.owner == session.owner())
            .ok_or_else(|| Self::not_found(id))?;
        row.title = patch.title;
        row.content = patch.content;
        Ok(())
    }

    async fn delete_by_id(&self, session: &Session, id: &EntryId) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure().await?;

        let mut table = self.table.write().await;
        let position = table
            .rows
            .iter()
            .position(|row| &row.id == id && &row.owner == session.owner())
            .ok_or_else(|| Self::not_found(id))?;
        table.rows.remove(position);
        Ok(())
    }
}
