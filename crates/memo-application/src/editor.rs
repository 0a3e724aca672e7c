//! Editor state machine.
//!
//! The editor is either creating a new entry or editing an existing one, and holds the
//! draft title/content typed so far. At most one submission is pending at a time; while it
//! is, mode transitions and further submissions are refused.
//!
//! ```text
//! Creating --start_edit(e)--> Editing(e)
//! Editing  --cancel_edit----> Creating (empty draft)
//! any      --submit ok------> Creating (empty draft)
//! any      --submit err-----> unchanged (draft kept)
//! ```

use memo_core::MemoError;
use memo_core::entry::{Entry, EntryId};
use memo_core::error::Result;

/// What a submission will do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditorMode {
    #[default]
    Creating,
    Editing(Entry),
}

/// The user's unsent input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: String,
}

/// A validated submission, ready for the mutation pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create {
        title: String,
        content: String,
    },
    Update {
        id: EntryId,
        title: String,
        content: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Editor {
    mode: EditorMode,
    draft: Draft,
    pending: bool,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Id of the entry being edited, if any.
    pub fn editing_id(&self) -> Option<&EntryId> {
        match &self.mode {
            EditorMode::Editing(entry) => Some(&entry.id),
            EditorMode::Creating => None,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.draft.content = content.into();
    }

    /// Switches to editing `entry` and loads its fields into the draft.
    ///
    /// Unsaved input in the current draft is discarded.
    pub fn start_edit(&mut self, entry: Entry) -> Result<()> {
        self.ensure_idle()?;
        self.draft = Draft {
            title: entry.title.clone(),
            content: entry.content.clone(),
        };
        self.mode = EditorMode::Editing(entry);
        Ok(())
    }

    /// Returns to creating with an empty draft.
    pub fn cancel_edit(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.reset();
        Ok(())
    }

    /// Validates the draft and marks a submission pending.
    ///
    /// Fields are checked after trimming whitespace, but the submission carries them as
    /// typed. On error nothing changes and no submission is started.
    pub fn begin_submit(&mut self) -> Result<Submission> {
        self.ensure_idle()?;
        if self.draft.title.trim().is_empty() {
            return Err(MemoError::validation("title"));
        }
        if self.draft.content.trim().is_empty() {
            return Err(MemoError::validation("content"));
        }

        let title = self.draft.title.clone();
        let content = self.draft.content.clone();
        let submission = match &self.mode {
            EditorMode::Creating => Submission::Create { title, content },
            EditorMode::Editing(entry) => Submission::Update {
                id: entry.id.clone(),
                title,
                content,
            },
        };
        self.pending = true;
        Ok(submission)
    }

    /// Records the outcome of the pending submission.
    ///
    /// Success resets the editor to an empty create form. Failure keeps the mode and draft
    /// so the user can retry.
    pub fn finish_submit(&mut self, outcome: &Result<()>) {
        self.pending = false;
        if outcome.is_ok() {
            self.reset();
        }
    }

    /// Drops any draft and returns to creating. Allowed while a submission is pending;
    /// the pending flag is kept and cleared only by [`finish_submit`](Self::finish_submit).
    pub fn reset(&mut self) {
        self.mode = EditorMode::Creating;
        self.draft = Draft::default();
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.pending {
            return Err(MemoError::SubmitPending);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use memo_core::session::UserId;

    fn entry(id: &str) -> Entry {
        Entry {
            id: EntryId::new(id),
            title: "Groceries".to_string(),
            content: "milk".to_string(),
            owner: UserId::new("alice"),
            created_at: Utc::now(),
        }
    }

    fn filled(title: &str, content: &str) -> Editor {
        let mut editor = Editor::new();
        editor.set_title(title);
        editor.set_content(content);
        editor
    }

    #[test]
    fn test_starts_empty_in_creating() {
        let editor = Editor::new();
        assert_eq!(editor.mode(), &EditorMode::Creating);
        assert_eq!(editor.draft(), &Draft::default());
        assert!(!editor.is_pending());
        assert!(editor.editing_id().is_none());
    }

    #[test]
    fn test_blank_title_is_rejected_first() {
        let mut editor = filled("   ", "");
        assert_eq!(editor.begin_submit(), Err(MemoError::validation("title")));
        assert!(!editor.is_pending());

        // Repeating the same invalid submit gives the same answer
        assert_eq!(editor.begin_submit(), Err(MemoError::validation("title")));
    }

    #[test]
    fn test_blank_content_is_rejected() {
        let mut editor = filled("Title", "\n\t ");
        assert_eq!(editor.begin_submit(), Err(MemoError::validation("content")));
        assert_eq!(editor.draft().title, "Title");
    }

    #[test]
    fn test_submission_keeps_fields_as_typed() {
        let mut editor = filled("  A ", " B");
        let submission = editor.begin_submit().unwrap();
        assert_eq!(
            submission,
            Submission::Create {
                title: "  A ".to_string(),
                content: " B".to_string(),
            }
        );
        assert!(editor.is_pending());
    }

    #[test]
    fn test_only_one_submission_in_flight() {
        let mut editor = filled("A", "B");
        editor.begin_submit().unwrap();

        assert_eq!(editor.begin_submit(), Err(MemoError::SubmitPending));
        assert_eq!(editor.start_edit(entry("1")), Err(MemoError::SubmitPending));
        assert_eq!(editor.cancel_edit(), Err(MemoError::SubmitPending));
    }

    #[test]
    fn test_edit_loads_draft_and_targets_entry() {
        let mut editor = Editor::new();
        editor.start_edit(entry("42")).unwrap();
        assert_eq!(editor.editing_id(), Some(&EntryId::new("42")));
        assert_eq!(editor.draft().title, "Groceries");
        assert_eq!(editor.draft().content, "milk");

        editor.set_content("milk, eggs");
        let submission = editor.begin_submit().unwrap();
        assert_eq!(
            submission,
            Submission::Update {
                id: EntryId::new("42"),
                title: "Groceries".to_string(),
                content: "milk, eggs".to_string(),
            }
        );
    }

    #[test]
    fn test_cancel_returns_to_empty_create() {
        let mut editor = Editor::new();
        editor.start_edit(entry("1")).unwrap();
        editor.cancel_edit().unwrap();
        assert_eq!(editor.mode(), &EditorMode::Creating);
        assert_eq!(editor.draft(), &Draft::default());
    }

    #[test]
    fn test_success_resets_failure_keeps_draft() {
        let mut editor = Editor::new();
        editor.start_edit(entry("1")).unwrap();
        editor.set_title("Renamed");

        editor.begin_submit().unwrap();
        editor.finish_submit(&Err(MemoError::remote("Note 1 not found")));
        assert!(!editor.is_pending());
        assert_eq!(editor.editing_id(), Some(&EntryId::new("1")));
        assert_eq!(editor.draft().title, "Renamed");

        editor.begin_submit().unwrap();
        editor.finish_submit(&Ok(()));
        assert!(!editor.is_pending());
        assert_eq!(editor.mode(), &EditorMode::Creating);
        assert_eq!(editor.draft(), &Draft::default());
    }

    #[test]
    fn test_reset_keeps_pending_submission() {
        let mut editor = Editor::new();
        editor.start_edit(entry("1")).unwrap();
        editor.begin_submit().unwrap();

        editor.reset();
        assert_eq!(editor.mode(), &EditorMode::Creating);
        assert_eq!(editor.draft(), &Draft::default());
        assert!(editor.is_pending());
        assert_eq!(editor.begin_submit(), Err(MemoError::SubmitPending));

        editor.finish_submit(&Ok(()));
        assert!(!editor.is_pending());
    }
}
