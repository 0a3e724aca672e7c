//! Entry store trait.
//!
//! Defines the interface to the remote persistence collaborator.

use async_trait::async_trait;

use super::model::{Entry, EntryId, EntryPatch, NewEntry};
use crate::error::Result;
use crate::session::Session;

/// An abstract store for entry persistence.
///
/// Every call carries the caller's [`Session`]; the store uses it both to authenticate
/// and to scope rows, so ownership is enforced on the store side rather than by the
/// client. Failures are reported as [`crate::MemoError::Remote`].
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Lists the session owner's entries, newest first.
    async fn list(&self, session: &Session) -> Result<Vec<Entry>>;

    /// Inserts a new entry.
    async fn insert(&self, session: &Session, entry: NewEntry) -> Result<()>;

    /// Updates title and content of an existing entry.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Entry updated
    /// - `Err(Remote)`: The id does not exist, is not visible to the caller, or the store
    ///   rejected the change
    async fn update_by_id(&self, session: &Session, id: &EntryId, patch: EntryPatch)
    -> Result<()>;

    /// Deletes an entry.
    ///
    /// Deleting a missing or foreign id is an error, not a no-op.
    async fn delete_by_id(&self, session: &Session, id: &EntryId) -> Result<()>;
}
