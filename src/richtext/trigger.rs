// Trigger Detector
// Watches typed characters for the block-command marker '/' and the mention
// marker '@', and keeps the query typed after the active marker up to date.

use super::structured_document::DocumentPosition;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::trace;

static BLOCK_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([^/\s]*)$").expect("block query pattern is valid"));
static MENTION_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([^@\s]*)$").expect("mention query pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// `/` opens the block command menu
    Block,
    /// `@` opens the mention menu
    Mention,
}

impl TriggerKind {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '/' => Some(TriggerKind::Block),
            '@' => Some(TriggerKind::Mention),
            _ => None,
        }
    }

    pub fn trigger_char(self) -> char {
        match self {
            TriggerKind::Block => '/',
            TriggerKind::Mention => '@',
        }
    }

    fn query_pattern(self) -> &'static Regex {
        match self {
            TriggerKind::Block => &BLOCK_QUERY,
            TriggerKind::Mention => &MENTION_QUERY,
        }
    }
}

/// Where a trigger character may open a menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerBoundary {
    /// At the start of a block or after whitespace
    #[default]
    WordStart,
    /// Anywhere, including mid-word (`foo/bar`)
    Anywhere,
}

impl TriggerBoundary {
    /// Whether a trigger may follow `text_before` (the block text preceding it)
    pub fn accepts(self, text_before: &str) -> bool {
        match self {
            TriggerBoundary::Anywhere => true,
            TriggerBoundary::WordStart => text_before
                .chars()
                .next_back()
                .is_none_or(char::is_whitespace),
        }
    }
}

/// The trigger currently being typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerState {
    pub kind: TriggerKind,
    pub query: String,
    /// Position of the trigger character itself
    pub anchor: DocumentPosition,
}

/// What changed after an input notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerUpdate {
    Opened(TriggerKind),
    QueryChanged(String),
    Closed,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct TriggerDetector {
    boundary: TriggerBoundary,
    block_enabled: bool,
    mention_enabled: bool,
    active: Option<TriggerState>,
}

impl TriggerDetector {
    pub fn new(boundary: TriggerBoundary, block_enabled: bool, mention_enabled: bool) -> Self {
        TriggerDetector {
            boundary,
            block_enabled,
            mention_enabled,
            active: None,
        }
    }

    pub fn active(&self) -> Option<&TriggerState> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn enabled(&self, kind: TriggerKind) -> bool {
        match kind {
            TriggerKind::Block => self.block_enabled,
            TriggerKind::Mention => self.mention_enabled,
        }
    }

    /// Inspect a character that was just inserted at `at`. `text_before` is
    /// the block text preceding it. Opens a trigger when the character is a
    /// marker whose feature is on, no trigger of that kind is active, and
    /// the boundary policy accepts the position.
    pub fn on_char_inserted(
        &mut self,
        ch: char,
        at: DocumentPosition,
        text_before: &str,
    ) -> TriggerUpdate {
        let Some(kind) = TriggerKind::from_char(ch) else {
            return TriggerUpdate::Unchanged;
        };
        if !self.enabled(kind)
            || self.active.as_ref().is_some_and(|t| t.kind == kind)
            || !self.boundary.accepts(text_before)
        {
            return TriggerUpdate::Unchanged;
        }

        if let Some(previous) = self.active.take() {
            trace!(kind = ?previous.kind, "trigger replaced");
        }
        trace!(?kind, block = at.block_index, offset = at.offset, "trigger opened");
        self.active = Some(TriggerState {
            kind,
            query: String::new(),
            anchor: at,
        });
        TriggerUpdate::Opened(kind)
    }

    /// Re-derive the query from the caret's block text after any input or
    /// caret movement while a trigger is active.
    pub fn recompute(&mut self, caret: DocumentPosition, text_before_caret: &str) -> TriggerUpdate {
        let Some(state) = self.active.as_mut() else {
            return TriggerUpdate::Unchanged;
        };

        if caret.block_index != state.anchor.block_index {
            return self.close("caret left the trigger block");
        }

        let Some(captures) = state.kind.query_pattern().captures(text_before_caret) else {
            return self.close("query no longer matches");
        };
        let (Some(whole), Some(query)) = (captures.get(0), captures.get(1)) else {
            return self.close("query no longer matches");
        };

        if whole.start() < state.anchor.offset {
            return self.close("trigger character removed");
        }
        if whole.start() > state.anchor.offset {
            // The marker was typed again; follow the newer one
            if !self.boundary.accepts(&text_before_caret[..whole.start()]) {
                return self.close("newer trigger is mid-word");
            }
            state.anchor.offset = whole.start();
        }

        if state.query == query.as_str() {
            return TriggerUpdate::Unchanged;
        }
        state.query = query.as_str().to_string();
        trace!(query = %state.query, "trigger query changed");
        TriggerUpdate::QueryChanged(state.query.clone())
    }

    /// Destroy the active trigger. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }

    fn close(&mut self, reason: &str) -> TriggerUpdate {
        if let Some(state) = self.active.take() {
            trace!(kind = ?state.kind, reason, "trigger closed");
        }
        TriggerUpdate::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> TriggerDetector {
        TriggerDetector::new(TriggerBoundary::WordStart, true, true)
    }

    #[test]
    fn test_slash_at_block_start_opens() {
        let mut d = detector();
        let update = d.on_char_inserted('/', DocumentPosition::new(0, 0), "");
        assert_eq!(update, TriggerUpdate::Opened(TriggerKind::Block));
        assert_eq!(d.active().map(|t| t.anchor), Some(DocumentPosition::new(0, 0)));
    }

    #[test]
    fn test_disabled_feature_does_not_open() {
        let mut d = TriggerDetector::new(TriggerBoundary::WordStart, false, true);
        assert_eq!(
            d.on_char_inserted('/', DocumentPosition::new(0, 0), ""),
            TriggerUpdate::Unchanged
        );
        assert!(!d.is_active());
    }

    #[test]
    fn test_word_start_boundary() {
        let mut d = detector();
        assert_eq!(
            d.on_char_inserted('/', DocumentPosition::new(0, 3), "foo"),
            TriggerUpdate::Unchanged
        );
        assert_eq!(
            d.on_char_inserted('@', DocumentPosition::new(0, 4), "say "),
            TriggerUpdate::Opened(TriggerKind::Mention)
        );
    }

    #[test]
    fn test_anywhere_boundary_opens_mid_word() {
        let mut d = TriggerDetector::new(TriggerBoundary::Anywhere, true, true);
        assert_eq!(
            d.on_char_inserted('/', DocumentPosition::new(0, 3), "foo"),
            TriggerUpdate::Opened(TriggerKind::Block)
        );
    }

    #[test]
    fn test_query_tracks_typing_and_whitespace_closes() {
        let mut d = detector();
        d.on_char_inserted('@', DocumentPosition::new(0, 3), "hi ");

        assert_eq!(
            d.recompute(DocumentPosition::new(0, 6), "hi @jo"),
            TriggerUpdate::QueryChanged("jo".to_string())
        );
        assert_eq!(
            d.recompute(DocumentPosition::new(0, 6), "hi @jo"),
            TriggerUpdate::Unchanged
        );
        assert_eq!(
            d.recompute(DocumentPosition::new(0, 7), "hi @jo "),
            TriggerUpdate::Closed
        );
        assert!(!d.is_active());
    }

    #[test]
    fn test_deleting_trigger_closes() {
        let mut d = detector();
        d.on_char_inserted('/', DocumentPosition::new(0, 2), "a ");
        assert_eq!(d.recompute(DocumentPosition::new(0, 2), "a "), TriggerUpdate::Closed);
    }

    #[test]
    fn test_caret_leaving_block_closes() {
        let mut d = detector();
        d.on_char_inserted('/', DocumentPosition::new(0, 0), "");
        assert_eq!(d.recompute(DocumentPosition::new(1, 0), ""), TriggerUpdate::Closed);
    }

    #[test]
    fn test_other_kind_replaces_active_trigger() {
        let mut d = detector();
        d.on_char_inserted('/', DocumentPosition::new(0, 0), "");
        assert_eq!(
            d.on_char_inserted('@', DocumentPosition::new(0, 2), "/ "),
            TriggerUpdate::Opened(TriggerKind::Mention)
        );
        assert_eq!(d.active().map(|t| t.kind), Some(TriggerKind::Mention));
    }

    #[test]
    fn test_same_kind_while_active_reanchors() {
        let mut d = TriggerDetector::new(TriggerBoundary::Anywhere, true, true);
        d.on_char_inserted('/', DocumentPosition::new(0, 0), "");
        assert_eq!(
            d.on_char_inserted('/', DocumentPosition::new(0, 2), "/a"),
            TriggerUpdate::Unchanged
        );
        assert_eq!(d.recompute(DocumentPosition::new(0, 3), "/a/"), TriggerUpdate::Unchanged);
        assert_eq!(d.active().map(|t| t.anchor.offset), Some(2));
    }
}
