use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::richtext::structured_document::{DocumentPosition, StructuredDocument};

/// Document state recorded after an edit
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub document: StructuredDocument,
    pub cursor: DocumentPosition,
}

impl Snapshot {
    pub fn new(document: StructuredDocument, cursor: DocumentPosition) -> Self {
        Snapshot { document, cursor }
    }
}

/// How an edit was made; consecutive typing collapses into one undo step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Typing,
    Other,
}

#[derive(Debug)]
pub struct EditHistory {
    entries: Vec<Snapshot>,
    current_index: usize,
    limit: usize,
    last_kind: Option<EditKind>,
}

impl EditHistory {
    /// Start a history whose only entry is `initial`. `limit` is the number
    /// of undo steps kept.
    pub fn new(initial: Snapshot, limit: usize) -> Self {
        EditHistory {
            entries: vec![initial],
            current_index: 0,
            limit,
            last_kind: None,
        }
    }

    /// Forget everything and start over from `initial`
    pub fn reset(&mut self, initial: Snapshot) {
        self.entries.clear();
        self.entries.push(initial);
        self.current_index = 0;
        self.last_kind = None;
    }

    /// Record the state after an edit.
    /// This clears any redo entries and adds the new state.
    pub fn record(&mut self, snapshot: Snapshot, kind: EditKind) {
        self.entries.truncate(self.current_index + 1);

        let coalesce = kind == EditKind::Typing
            && self.last_kind == Some(EditKind::Typing)
            && self.current_index > 0;
        if coalesce {
            self.entries[self.current_index] = snapshot;
        } else {
            self.entries.push(snapshot);
        }
        self.last_kind = Some(kind);

        while self.entries.len() > self.limit + 1 {
            self.entries.remove(0);
        }
        self.current_index = self.entries.len() - 1;
    }

    /// End the current typing run, e.g. after the caret moved
    pub fn break_coalescing(&mut self) {
        self.last_kind = None;
    }

    pub fn can_undo(&self) -> bool {
        self.current_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current_index + 1 < self.entries.len()
    }

    /// Step back one edit.
    /// Returns the state to restore, or None if there is nothing to undo
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.current_index -= 1;
        self.last_kind = None;
        self.entries.get(self.current_index)
    }

    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.current_index += 1;
        self.last_kind = None;
        self.entries.get(self.current_index)
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.current_index)
    }
}

impl Default for EditHistory {
    fn default() -> Self {
        EditHistory::new(
            Snapshot::new(StructuredDocument::new(), DocumentPosition::start()),
            DEFAULT_HISTORY_LIMIT,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(text: &str) -> Snapshot {
        Snapshot::new(
            StructuredDocument::with_paragraph(text),
            DocumentPosition::new(0, text.len()),
        )
    }

    fn current_text(history: &EditHistory) -> String {
        history.current().unwrap().document.to_plain_text()
    }

    #[test]
    fn test_undo_and_redo() {
        let mut history = EditHistory::new(snap(""), 10);
        history.record(snap("a"), EditKind::Other);
        history.record(snap("ab"), EditKind::Other);

        assert!(history.can_undo());
        assert!(!history.can_redo());

        assert_eq!(history.undo().unwrap().document.to_plain_text(), "a");
        assert!(history.can_redo());
        assert_eq!(history.undo().unwrap().cursor, DocumentPosition::new(0, 0));
        assert!(history.undo().is_none());

        assert_eq!(history.redo().unwrap().document.to_plain_text(), "a");
        assert_eq!(current_text(&history), "a");
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = EditHistory::new(snap(""), 10);
        history.record(snap("one"), EditKind::Other);
        history.record(snap("two"), EditKind::Other);
        history.undo();
        history.undo();

        history.record(snap("three"), EditKind::Other);
        assert_eq!(current_text(&history), "three");
        assert!(!history.can_redo());
        assert_eq!(history.undo().unwrap().document.to_plain_text(), "");
    }

    #[test]
    fn test_typing_is_coalesced() {
        let mut history = EditHistory::new(snap(""), 10);
        history.record(snap("h"), EditKind::Typing);
        history.record(snap("hi"), EditKind::Typing);
        history.record(snap("hi!"), EditKind::Typing);

        assert_eq!(history.undo().unwrap().document.to_plain_text(), "");
        assert!(!history.can_undo());
    }

    #[test]
    fn test_break_coalescing_starts_new_step() {
        let mut history = EditHistory::new(snap(""), 10);
        history.record(snap("h"), EditKind::Typing);
        history.break_coalescing();
        history.record(snap("hi"), EditKind::Typing);

        assert_eq!(history.undo().unwrap().document.to_plain_text(), "h");
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = EditHistory::new(snap(""), 3);
        for i in 0..10 {
            history.record(snap(&format!("v{}", i)), EditKind::Other);
        }

        assert_eq!(history.entries.len(), 4);
        let mut steps = 0;
        while history.undo().is_some() {
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(current_text(&history), "v6");
    }

    #[test]
    fn test_zero_limit_disables_undo() {
        let mut history = EditHistory::new(snap(""), 0);
        history.record(snap("x"), EditKind::Other);
        assert!(!history.can_undo());
        assert_eq!(current_text(&history), "x");
    }
}
