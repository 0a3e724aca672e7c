//! Application layer for memo.
//!
//! Coordinates the session, the entry cache, mutations and the editor on top of the
//! collaborator traits defined in `memo-core`.

pub mod editor;
pub mod entry;
pub mod notes_screen;
pub mod session_monitor;

pub use editor::{Draft, Editor, EditorMode, Submission};
pub use entry::{EntryCache, Generation, MutationPipeline};
pub use notes_screen::{NotesScreen, Route};
pub use session_monitor::SessionMonitor;
