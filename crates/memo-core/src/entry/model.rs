//! Entry domain model.
//!
//! An entry is a single title/content note owned by one user. Rows are shaped the way the
//! remote `notes` table stores them, so the same types serialize straight onto the wire.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::UserId;

/// Opaque entry identifier assigned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A stored note as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub title: String,
    pub content: String,
    /// User that created the entry. Never changed by the client.
    #[serde(rename = "user_id")]
    pub owner: UserId,
    /// Sole sort key, newest first.
    pub created_at: DateTime<Utc>,
}

/// Insert payload. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEntry {
    pub title: String,
    pub content: String,
    #[serde(rename = "user_id")]
    pub owner: UserId,
}

/// Update payload. Only the editable columns are ever sent, so `owner` and
/// `created_at` cannot change through an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPatch {
    pub title: String,
    pub content: String,
}

/// Sorts entries newest first.
///
/// The sort is stable, so entries sharing a timestamp keep the order the store returned.
pub fn sort_newest_first(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, secs: i64) -> Entry {
        Entry {
            id: EntryId::new(id),
            title: format!("title {id}"),
            content: format!("content {id}"),
            owner: UserId::new("user-1"),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_sort_newest_first() {
        let mut entries = vec![entry("a", 10), entry("b", 30), entry("c", 20)];
        sort_newest_first(&mut entries);
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_entry_row_uses_user_id_column() {
        let json = serde_json::json!({
            "id": "5f1c",
            "title": "Groceries",
            "content": "milk",
            "user_id": "user-1",
            "created_at": "2024-03-01T10:00:00+00:00"
        });
        let parsed: Entry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.id, EntryId::new("5f1c"));
        assert_eq!(parsed.owner, UserId::new("user-1"));

        let patch = serde_json::to_value(EntryPatch {
            title: "t".into(),
            content: "c".into(),
        })
        .unwrap();
        assert!(patch.get("user_id").is_none());
        assert!(patch.get("created_at").is_none());
    }
}
