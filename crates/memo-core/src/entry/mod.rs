//! Entry domain module.
//!
//! # Module Structure
//!
//! - `model`: `Entry`, its identifier and the insert/update payloads
//! - `repository`: `EntryStore`, the remote store interface
//!
//! # Usage
//!
//! ```ignore
//! use memo_core::entry::{Entry, EntryId, EntryStore, NewEntry};
//! ```

mod model;
pub mod repository;

// Re-export public API
pub use model::{Entry, EntryId, EntryPatch, NewEntry, sort_newest_first};
pub use repository::EntryStore;
