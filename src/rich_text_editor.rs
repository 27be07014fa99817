// Editor Surface Adapter
// Binds host events (keys, text input, paste, pointer, focus) to the editing
// engine, runs trigger detection and the popup menu, and reports content
// changes to the embedder.

use crate::config::EditorConfig;
use crate::content::{ContentLoader, ContentMode, ContentProvider};
use crate::history::{EditHistory, EditKind, Snapshot};
use crate::richtext::commands::{Command, FormatState};
use crate::richtext::html_converter::html_to_document;
use crate::richtext::insertion;
use crate::richtext::markdown_converter::markdown_to_document;
use crate::richtext::popup_menu::{
    BlockKind, MenuItem, PopupMenu, ScreenPoint, block_catalog, mention_catalog,
};
use crate::richtext::structured_document::{BlockType, DocumentPosition, StructuredDocument};
use crate::richtext::structured_editor::{EditError, EditResult, StructuredEditor};
use crate::richtext::trigger::{TriggerDetector, TriggerKind, TriggerState, TriggerUpdate};
use crate::surface::SurfaceHost;
use crate::toolbar::{ToolbarButton, toolbar_buttons};
use std::borrow::Cow;
use tracing::{debug, trace, warn};

/// Paragraph prefixes that turn into a block when followed by a space
const BLOCK_SHORTCUTS: &[(&str, BlockKind)] = &[
    ("#", BlockKind::Heading1),
    ("##", BlockKind::Heading2),
    ("###", BlockKind::Heading3),
    ("-", BlockKind::BulletList),
    ("*", BlockKind::BulletList),
    ("1.", BlockKind::NumberedList),
    (">", BlockKind::Quote),
    ("[]", BlockKind::Todo),
    ("[ ]", BlockKind::Todo),
];

const CODE_FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Escape,
    Tab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Cmd on macOS
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Modifiers {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn command() -> Self {
        Modifiers {
            ctrl: true,
            ..Self::NONE
        }
    }

    fn has_command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        KeyEvent { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        KeyEvent::new(key, Modifiers::NONE)
    }
}

/// Whether the engine consumed an event; ignored events are left to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Handled,
    Ignored,
}

pub struct RichTextEditor {
    editor: StructuredEditor,
    config: EditorConfig,
    mode: ContentMode,
    surface: Box<dyn SurfaceHost>,
    triggers: TriggerDetector,
    menu: PopupMenu,
    history: EditHistory,
    focused: bool,
    change_cb: Option<Box<dyn FnMut(&str)>>,
}

impl RichTextEditor {
    fn with_document(
        document: StructuredDocument,
        mode: ContentMode,
        config: EditorConfig,
        surface: Box<dyn SurfaceHost>,
    ) -> Self {
        let mut editor = StructuredEditor::with_document(document);
        let end = editor.document().end_position();
        editor.set_cursor(end);

        let history = EditHistory::new(
            Snapshot::new(editor.document().clone(), editor.cursor()),
            config.history_limit,
        );
        let triggers = TriggerDetector::new(
            config.trigger_boundary,
            config.features.slash_commands,
            config.features.mentions,
        );

        RichTextEditor {
            editor,
            config,
            mode,
            surface,
            triggers,
            menu: PopupMenu::new(),
            history,
            focused: false,
            change_cb: None,
        }
    }

    /// Engine-owned content, seeded once from `initial`
    pub fn uncontrolled(
        initial: &str,
        config: EditorConfig,
        surface: Box<dyn SurfaceHost>,
    ) -> Self {
        Self::with_document(
            html_to_document(initial),
            ContentMode::Uncontrolled,
            config,
            surface,
        )
    }

    /// Embedder-owned content; later values arrive through `set_value`
    pub fn controlled(value: &str, config: EditorConfig, surface: Box<dyn SurfaceHost>) -> Self {
        Self::with_document(
            html_to_document(value),
            ContentMode::Controlled,
            config,
            surface,
        )
    }

    /// Called with the serialized content after every committed mutation
    pub fn on_change(&mut self, f: Box<dyn FnMut(&str)>) {
        self.change_cb = Some(f);
    }

    pub fn editor(&self) -> &StructuredEditor {
        &self.editor
    }

    pub fn document(&self) -> &StructuredDocument {
        self.editor.document()
    }

    pub fn cursor(&self) -> DocumentPosition {
        self.editor.cursor()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn mode(&self) -> ContentMode {
        self.mode
    }

    pub fn menu(&self) -> &PopupMenu {
        &self.menu
    }

    pub fn active_trigger(&self) -> Option<&TriggerState> {
        self.triggers.active()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_editable(&self) -> bool {
        self.config.is_editable()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.config.disabled = disabled;
        if disabled {
            self.cancel_trigger();
        }
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.config.read_only = read_only;
        if read_only {
            self.cancel_trigger();
        }
    }

    // Content synchronization

    /// Current content as canonical markup
    pub fn value(&self) -> String {
        self.editor.get_content()
    }

    /// Apply a value supplied by the embedder. Only controlled editors follow
    /// it; nothing is emitted back.
    pub fn set_value(&mut self, value: &str) {
        if self.mode != ContentMode::Controlled {
            debug!("value ignored by uncontrolled editor");
            return;
        }
        if value == self.value() {
            return;
        }

        trace!("reloading from supplied value");
        self.editor.set_content_from_markup(value);
        self.cancel_trigger();
        self.history.reset(Snapshot::new(
            self.editor.document().clone(),
            self.editor.cursor(),
        ));
    }

    /// The initial value only seeds the document at construction
    pub fn set_default_value(&mut self, _value: &str) {
        debug!("default value changed after construction; ignored");
    }

    // Focus

    pub fn handle_focus(&mut self) {
        self.focused = true;
    }

    pub fn handle_blur(&mut self) {
        self.focused = false;
    }

    fn ensure_focus(&mut self) -> bool {
        if !self.focused {
            self.focused = self.surface.request_focus();
        }
        self.focused
    }

    // Caret and selection

    pub fn set_cursor(&mut self, pos: DocumentPosition) {
        self.editor.set_cursor(pos);
        self.history.break_coalescing();
        self.sync_trigger();
    }

    pub fn set_selection(&mut self, anchor: DocumentPosition, focus: DocumentPosition) {
        self.editor.set_selection(anchor, focus);
        self.history.break_coalescing();
        self.sync_trigger();
    }

    // Queries

    /// Number of user-perceived characters; mentions and images count once
    pub fn character_count(&self) -> usize {
        self.editor.document().grapheme_count()
    }

    /// Text to show while the document is blank
    pub fn placeholder(&self) -> Option<&str> {
        (self.value().is_empty() && !self.config.placeholder.is_empty())
            .then_some(self.config.placeholder.as_str())
    }

    /// Ghost text for an empty block, e.g. "Heading 1"
    pub fn block_placeholder(&self, index: usize) -> Option<Cow<'static, str>> {
        self.editor
            .document()
            .block(index)
            .filter(|block| block.is_empty())
            .and_then(|block| block.block_type.placeholder())
    }

    pub fn format_state(&self) -> FormatState {
        FormatState::of(&self.editor)
    }

    /// Visible toolbar buttons, empty when the toolbar is hidden
    pub fn toolbar(&self) -> Vec<ToolbarButton> {
        if !self.config.show_toolbar {
            return Vec::new();
        }
        toolbar_buttons(
            &self.config.toolbar,
            &self.config.features,
            &self.format_state(),
            self.is_editable(),
        )
    }

    // Commands

    /// Run a formatting command on the current selection
    pub fn execute(&mut self, command: Command) -> EditResult {
        if !self.is_editable() {
            debug!(%command, "command ignored: editor is not editable");
            return Err(EditError::ReadOnly);
        }
        let gate = match command {
            Command::CreateLink(_) if !self.config.features.links => Some("links"),
            Command::InsertTable if !self.config.features.tables => Some("tables"),
            _ => None,
        };
        if let Some(feature) = gate {
            debug!(%command, feature, "command ignored: feature disabled");
            return Err(EditError::FeatureDisabled(feature));
        }
        if !self.ensure_focus() {
            debug!(%command, "command ignored: surface refused focus");
            return Err(EditError::FocusUnavailable);
        }

        trace!(%command, "executing");
        let result = match &command {
            Command::Undo => {
                self.undo();
                Ok(())
            }
            Command::Redo => {
                self.redo();
                Ok(())
            }
            Command::InsertTable => insertion::insert_block_at_caret(&mut self.editor, BlockKind::Table),
            other => other.apply(&mut self.editor),
        };
        if let Err(err) = &result {
            debug!(%command, %err, "command failed");
        }

        if command.is_mutation() {
            self.record(EditKind::Other);
        }
        self.sync_trigger();
        self.emit_change();
        result
    }

    /// Run a command given by its classic name, e.g. `formatBlock` + `h2`
    pub fn execute_named(&mut self, name: &str, value: Option<&str>) -> EditResult {
        let command = Command::from_name(name, value).inspect_err(|err| {
            debug!(name, %err, "command ignored");
        })?;
        self.execute(command)
    }

    fn undo(&mut self) {
        if let Some(snapshot) = self.history.undo().cloned() {
            self.restore(snapshot);
        }
    }

    fn redo(&mut self) {
        if let Some(snapshot) = self.history.redo().cloned() {
            self.restore(snapshot);
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.editor.load_document(snapshot.document);
        self.editor.set_cursor(snapshot.cursor);
        self.cancel_trigger();
    }

    // Popup menu

    /// Commit menu item `index` (pointer selection)
    pub fn select_menu_item(&mut self, index: usize) -> EditResult {
        let Some(trigger) = self.triggers.active().cloned() else {
            return Err(EditError::NoActiveTrigger);
        };
        let Some(item) = self.menu.item(index).cloned() else {
            debug!(index, "no menu item at index");
            return Ok(());
        };
        if !self.is_editable() {
            self.cancel_trigger();
            return Err(EditError::ReadOnly);
        }

        let result = match &item {
            MenuItem::Block(block) => insertion::insert_block(&mut self.editor, &trigger, block.kind),
            MenuItem::Mention(user) => insertion::insert_mention(&mut self.editor, &trigger, user),
        };
        self.cancel_trigger();

        match result {
            Ok(()) => {
                self.record(EditKind::Other);
                self.emit_change();
                Ok(())
            }
            Err(err) => {
                warn!(%err, item = item.label(), "insertion aborted");
                Err(err)
            }
        }
    }

    /// Close the menu and forget the trigger; the document is untouched
    pub fn cancel_trigger(&mut self) {
        self.triggers.cancel();
        self.menu.close();
    }

    fn open_menu(&mut self, kind: TriggerKind) {
        let anchor = self
            .triggers
            .active()
            .map_or(self.editor.cursor(), |trigger| trigger.anchor);
        let point = self
            .surface
            .caret_rect(anchor)
            .map(|rect| ScreenPoint {
                top: rect.bottom(),
                left: rect.x,
            })
            .unwrap_or_default();
        let catalog = match kind {
            TriggerKind::Block => block_catalog(self.config.features.tables),
            TriggerKind::Mention => mention_catalog(&self.config.mention_users),
        };
        self.menu.open(kind, point, catalog);
    }

    /// Re-derive the trigger query after input or caret movement
    fn sync_trigger(&mut self) {
        if !self.triggers.is_active() {
            if self.menu.is_open() {
                self.menu.close();
            }
            return;
        }
        let caret = self.editor.cursor();
        let before = self.editor.text_before_cursor();
        match self.triggers.recompute(caret, &before) {
            TriggerUpdate::QueryChanged(query) => self.menu.update_query(&query),
            TriggerUpdate::Closed => self.menu.close(),
            TriggerUpdate::Opened(_) | TriggerUpdate::Unchanged => {}
        }
    }

    // Input events

    /// Text committed by the host (typing or IME)
    pub fn handle_text_input(&mut self, text: &str) -> EventResult {
        if text.is_empty() || !self.is_editable() {
            return EventResult::Ignored;
        }
        if text.contains(['\n', '\r']) {
            return self.paste(text);
        }

        if let Err(err) = self.insert_typed(text) {
            debug!(%err, "text input rejected");
            return EventResult::Ignored;
        }

        if self.config.features.markdown {
            self.apply_markdown_shortcut(text);
        }

        self.sync_trigger();
        self.record(EditKind::Typing);
        self.emit_change();
        EventResult::Handled
    }

    fn insert_typed(&mut self, text: &str) -> EditResult {
        if self.editor.selection_range().is_some() {
            self.editor.delete_selection()?;
        }
        let start = self.editor.cursor();
        self.editor.insert_text(text)?;
        self.detect_triggers(start, text);
        Ok(())
    }

    /// Run each inserted character through the trigger detector
    fn detect_triggers(&mut self, start: DocumentPosition, text: &str) {
        let Some(block) = self.editor.document().block(start.block_index) else {
            return;
        };
        let block_text = block.to_plain_text();
        let mut opened = None;
        for (i, ch) in text.char_indices() {
            let at = start.offset + i;
            let Some(before) = block_text.get(..at) else {
                continue;
            };
            if let TriggerUpdate::Opened(kind) = self.triggers.on_char_inserted(
                ch,
                DocumentPosition::new(start.block_index, at),
                before,
            ) {
                opened = Some(kind);
            }
        }
        if let Some(kind) = opened {
            self.open_menu(kind);
        }
    }

    /// Turn `# `, `- `, `> `, ... at the start of a paragraph into blocks
    fn apply_markdown_shortcut(&mut self, typed: &str) {
        let caret = self.editor.cursor();
        let is_paragraph = self
            .editor
            .document()
            .block(caret.block_index)
            .is_some_and(|block| block.block_type == BlockType::Paragraph);
        if !is_paragraph {
            return;
        }

        let before = self.editor.text_before_cursor();
        let block_type = if typed == " " {
            BLOCK_SHORTCUTS
                .iter()
                .find(|(prefix, _)| before.strip_suffix(' ') == Some(*prefix))
                .map(|(_, kind)| kind.block_type())
        } else if typed == "`" && before == CODE_FENCE {
            Some(BlockType::CodeBlock { language: None })
        } else {
            None
        };
        let Some(block_type) = block_type else {
            return;
        };

        trace!(?block_type, "markdown shortcut");
        self.editor.document_mut().blocks_mut()[caret.block_index]
            .delete_text_range(0, caret.offset);
        self.editor
            .set_cursor(DocumentPosition::new(caret.block_index, 0));
        if let Err(err) = self.editor.set_block_type(block_type) {
            debug!(%err, "markdown shortcut failed");
        }
    }

    /// Paste plain text; lines after the first become paragraphs
    pub fn paste(&mut self, text: &str) -> EventResult {
        if !self.is_editable() {
            return EventResult::Ignored;
        }
        if let Err(err) = self.editor.paste(text) {
            debug!(%err, "paste rejected");
            return EventResult::Ignored;
        }
        self.sync_trigger();
        self.record(EditKind::Other);
        self.emit_change();
        EventResult::Handled
    }

    /// Paste markdown, converted into blocks
    pub fn paste_markdown(&mut self, markdown: &str) -> EditResult {
        if !self.is_editable() {
            return Err(EditError::ReadOnly);
        }
        if !self.config.features.markdown {
            return Err(EditError::FeatureDisabled("markdown"));
        }
        self.editor.insert_fragment(markdown_to_document(markdown))?;
        self.sync_trigger();
        self.record(EditKind::Other);
        self.emit_change();
        Ok(())
    }

    pub fn handle_key(&mut self, event: KeyEvent) -> EventResult {
        if self.config.disabled {
            return EventResult::Ignored;
        }

        if self.menu.is_open() && self.triggers.is_active() {
            match event.key {
                Key::Up => {
                    self.menu.move_highlight(-1);
                    return EventResult::Handled;
                }
                Key::Down => {
                    self.menu.move_highlight(1);
                    return EventResult::Handled;
                }
                Key::Escape => {
                    self.cancel_trigger();
                    return EventResult::Handled;
                }
                Key::Enter | Key::Tab => match self.menu.highlighted() {
                    Some(index) => {
                        // Failures are logged and leave the document as it was
                        let _ = self.select_menu_item(index);
                        return EventResult::Handled;
                    }
                    None => self.cancel_trigger(),
                },
                _ => {}
            }
        }

        let modifiers = event.modifiers;
        if modifiers.has_command()
            && let Key::Char(ch) = event.key
        {
            return self.handle_shortcut(ch.to_ascii_lowercase(), modifiers.shift);
        }

        let extend = modifiers.shift;
        let word = modifiers.alt || modifiers.ctrl;
        match event.key {
            Key::Left => self.move_caret(|e| {
                if word {
                    e.move_word_left(extend)
                } else {
                    e.move_cursor_left(extend)
                }
            }),
            Key::Right => self.move_caret(|e| {
                if word {
                    e.move_word_right(extend)
                } else {
                    e.move_cursor_right(extend)
                }
            }),
            Key::Up => self.move_caret(|e| e.move_cursor_up(extend)),
            Key::Down => self.move_caret(|e| e.move_cursor_down(extend)),
            Key::Home => self.move_caret(|e| e.move_cursor_to_line_start(extend)),
            Key::End => self.move_caret(|e| e.move_cursor_to_line_end(extend)),
            Key::Tab | Key::Escape => EventResult::Ignored,
            Key::Char(ch) => {
                let mut buf = [0u8; 4];
                self.handle_text_input(ch.encode_utf8(&mut buf))
            }
            Key::Enter => self.edit(EditKind::Other, StructuredEditor::insert_newline),
            Key::Backspace if word => self.edit(EditKind::Other, StructuredEditor::delete_word_backward),
            Key::Backspace => self.edit(EditKind::Typing, StructuredEditor::delete_backward),
            Key::Delete if word => self.edit(EditKind::Other, StructuredEditor::delete_word_forward),
            Key::Delete => self.edit(EditKind::Typing, StructuredEditor::delete_forward),
        }
    }

    fn handle_shortcut(&mut self, ch: char, shift: bool) -> EventResult {
        let command = match ch {
            'a' => {
                self.editor.select_all();
                self.sync_trigger();
                return EventResult::Handled;
            }
            'b' => Command::Bold,
            'i' => Command::Italic,
            'u' => Command::Underline,
            '\\' => Command::RemoveFormat,
            'z' if shift => Command::Redo,
            'z' => Command::Undo,
            'y' => Command::Redo,
            _ => return EventResult::Ignored,
        };
        if !self.is_editable() {
            return EventResult::Ignored;
        }
        // Failures are logged by execute
        let _ = self.execute(command);
        EventResult::Handled
    }

    fn move_caret(&mut self, f: impl FnOnce(&mut StructuredEditor)) -> EventResult {
        f(&mut self.editor);
        self.history.break_coalescing();
        self.sync_trigger();
        EventResult::Handled
    }

    fn edit(&mut self, kind: EditKind, f: fn(&mut StructuredEditor) -> EditResult) -> EventResult {
        if !self.is_editable() {
            return EventResult::Ignored;
        }
        if let Err(err) = f(&mut self.editor) {
            debug!(%err, "edit rejected");
            return EventResult::Handled;
        }
        self.sync_trigger();
        self.record(kind);
        self.emit_change();
        EventResult::Handled
    }

    // Change reporting

    fn record(&mut self, kind: EditKind) {
        let unchanged = self
            .history
            .current()
            .is_some_and(|snapshot| snapshot.document == *self.editor.document());
        if !unchanged {
            self.history.record(
                Snapshot::new(self.editor.document().clone(), self.editor.cursor()),
                kind,
            );
        }
    }

    fn emit_change(&mut self) {
        let value = self.value();
        if let Some(cb) = self.change_cb.as_mut() {
            cb(&value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureFlags;
    use crate::richtext::popup_menu::MentionUser;
    use crate::surface::HeadlessSurface;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn editor_with(initial: &str) -> RichTextEditor {
        RichTextEditor::uncontrolled(
            initial,
            EditorConfig::default(),
            Box::new(HeadlessSurface::default()),
        )
    }

    fn type_text(editor: &mut RichTextEditor, text: &str) {
        for ch in text.chars() {
            editor.handle_key(KeyEvent::plain(Key::Char(ch)));
        }
    }

    fn capture(editor: &mut RichTextEditor) -> Rc<RefCell<Vec<String>>> {
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink = values.clone();
        editor.on_change(Box::new(move |value| sink.borrow_mut().push(value.to_string())));
        values
    }

    #[test]
    fn test_seeded_caret_is_at_end() {
        let editor = editor_with("<p>one</p><p>two</p>");
        assert_eq!(editor.cursor(), DocumentPosition::new(1, 3));
        assert_eq!(editor.mode(), ContentMode::Uncontrolled);
    }

    #[test]
    fn test_typing_emits_each_change() {
        let mut editor = editor_with("");
        let values = capture(&mut editor);
        type_text(&mut editor, "hi");
        assert_eq!(*values.borrow(), vec!["<p>h</p>", "<p>hi</p>"]);
    }

    #[test]
    fn test_menu_opens_below_trigger() {
        let mut editor = editor_with("<p>ab</p>");
        type_text(&mut editor, " /");
        assert!(editor.menu().is_open());
        assert_eq!(editor.menu().kind(), Some(TriggerKind::Block));
        // Headless surface: 8px glyphs, 20px lines
        assert_eq!(editor.menu().anchor(), ScreenPoint { top: 20, left: 24 });
    }

    #[test]
    fn test_space_closes_menu_without_other_changes() {
        let mut editor = editor_with("");
        type_text(&mut editor, "/he ");
        assert!(!editor.menu().is_open());
        assert!(editor.active_trigger().is_none());
        assert_eq!(editor.value(), "<p>/he </p>");
    }

    #[test]
    fn test_escape_cancels_menu() {
        let mut editor = editor_with("");
        type_text(&mut editor, "@j");
        assert_eq!(
            editor.handle_key(KeyEvent::plain(Key::Escape)),
            EventResult::Handled
        );
        assert!(!editor.menu().is_open());
        assert_eq!(editor.value(), "<p>@j</p>");
    }

    #[test]
    fn test_keyboard_selects_highlighted_block() {
        let mut editor = editor_with("");
        type_text(&mut editor, "/");
        editor.handle_key(KeyEvent::plain(Key::Down));
        editor.handle_key(KeyEvent::plain(Key::Enter));

        assert_eq!(editor.value(), "<h2></h2>");
        assert_eq!(editor.block_placeholder(0).as_deref(), Some("Heading 2"));
        assert!(!editor.menu().is_open());
    }

    #[test]
    fn test_enter_with_empty_menu_is_normal_enter() {
        let mut editor = editor_with("");
        type_text(&mut editor, "/zzz");
        assert!(editor.menu().items().is_empty());
        editor.handle_key(KeyEvent::plain(Key::Enter));

        assert!(!editor.menu().is_open());
        assert_eq!(editor.document().block_count(), 2);
    }

    #[test]
    fn test_mention_menu_empty_without_directory() {
        let mut editor = editor_with("");
        assert!(editor.config().mention_users.is_empty());
        type_text(&mut editor, "@");

        assert!(editor.menu().is_open());
        assert!(editor.menu().items().is_empty());
        assert_eq!(editor.select_menu_item(0), Ok(()));
        assert_eq!(editor.value(), "<p>@</p>");
    }

    #[test]
    fn test_insertion_failure_keeps_content() {
        let mut editor = editor_with("");
        type_text(&mut editor, "/");
        editor.editor.document_mut().blocks_mut()[0].delete_text_range(0, 1);
        editor.editor.set_cursor(DocumentPosition::new(0, 0));

        let result = editor.select_menu_item(0);
        assert_eq!(result, Err(EditError::AnchorLost { trigger: '/' }));
        assert_eq!(editor.value(), "");
        assert!(!editor.menu().is_open());
        assert!(editor.active_trigger().is_none());
    }

    #[test]
    fn test_mentions_disabled_does_not_open() {
        let mut config = EditorConfig::default();
        config.features = FeatureFlags::none();
        let mut editor =
            RichTextEditor::uncontrolled("", config, Box::new(HeadlessSurface::default()));
        type_text(&mut editor, "@/");
        assert!(!editor.menu().is_open());
    }

    #[test]
    fn test_execute_acquires_focus_once() {
        let mut editor = editor_with("<p>word</p>");
        let values = capture(&mut editor);
        editor.editor.select_all();

        editor.execute(Command::Bold).unwrap();
        assert!(editor.is_focused());
        assert_eq!(*values.borrow(), vec!["<p><b>word</b></p>"]);
    }

    #[test]
    fn test_execute_without_focus_is_noop() {
        let mut editor = RichTextEditor::uncontrolled(
            "<p>word</p>",
            EditorConfig::default(),
            Box::new(HeadlessSurface::default().refusing_focus()),
        );
        let values = capture(&mut editor);
        editor.editor.select_all();

        assert_eq!(editor.execute(Command::Bold), Err(EditError::FocusUnavailable));
        assert_eq!(editor.value(), "<p>word</p>");
        assert!(values.borrow().is_empty());
    }

    #[test]
    fn test_read_only_ignores_commands_and_typing() {
        let mut editor = editor_with("<p>x</p>");
        editor.set_read_only(true);
        assert_eq!(editor.execute(Command::Bold), Err(EditError::ReadOnly));
        assert_eq!(
            editor.handle_key(KeyEvent::plain(Key::Char('y'))),
            EventResult::Ignored
        );
        assert_eq!(
            editor.handle_key(KeyEvent::plain(Key::Left)),
            EventResult::Handled
        );
        assert_eq!(editor.value(), "<p>x</p>");
        assert!(editor.toolbar().iter().all(|b| !b.enabled));
    }

    #[test]
    fn test_feature_gated_commands() {
        let mut config = EditorConfig::default();
        config.features.links = false;
        config.features.tables = false;
        let mut editor =
            RichTextEditor::uncontrolled("<p>a</p>", config, Box::new(HeadlessSurface::default()));

        assert_eq!(
            editor.execute_named("createLink", Some("https://x.dev")),
            Err(EditError::FeatureDisabled("links"))
        );
        assert_eq!(
            editor.execute(Command::InsertTable),
            Err(EditError::FeatureDisabled("tables"))
        );
        assert_eq!(editor.value(), "<p>a</p>");
    }

    #[test]
    fn test_unknown_command_name_is_noop() {
        let mut editor = editor_with("<p>a</p>");
        assert!(matches!(
            editor.execute_named("explode", None),
            Err(EditError::UnknownCommand(_))
        ));
        assert_eq!(editor.value(), "<p>a</p>");
    }

    #[test]
    fn test_toolbar_table_inserts_grid() {
        let mut editor = editor_with("");
        editor.execute(Command::InsertTable).unwrap();
        assert_eq!(
            editor.value(),
            "<table><tr><td></td><td></td></tr><tr><td></td><td></td></tr></table>"
        );
    }

    #[test]
    fn test_shortcuts_toggle_and_undo() {
        let mut editor = editor_with("");
        type_text(&mut editor, "abc");
        editor.handle_key(KeyEvent::new(Key::Char('a'), Modifiers::command()));
        editor.handle_key(KeyEvent::new(Key::Char('b'), Modifiers::command()));
        assert_eq!(editor.value(), "<p><b>abc</b></p>");

        editor.handle_key(KeyEvent::new(Key::Char('z'), Modifiers::command()));
        assert_eq!(editor.value(), "<p>abc</p>");
        editor.handle_key(KeyEvent::new(Key::Char('z'), Modifiers::command()));
        assert_eq!(editor.value(), "");

        let redo = Modifiers {
            shift: true,
            ..Modifiers::command()
        };
        editor.handle_key(KeyEvent::new(Key::Char('Z'), redo));
        assert_eq!(editor.value(), "<p>abc</p>");
    }

    #[test]
    fn test_shift_arrows_extend_selection() {
        let mut editor = editor_with("<p>hello</p>");
        editor.handle_key(KeyEvent::new(Key::Left, Modifiers::shift()));
        editor.handle_key(KeyEvent::new(Key::Left, Modifiers::shift()));
        assert_eq!(editor.editor().get_selection_text(), "lo");

        type_text(&mut editor, "p");
        assert_eq!(editor.value(), "<p>help</p>");
    }

    #[test]
    fn test_markdown_shortcuts() {
        let mut editor = editor_with("");
        type_text(&mut editor, "## Title");
        assert_eq!(editor.value(), "<h2>Title</h2>");

        let mut editor = editor_with("");
        type_text(&mut editor, "[ ] task");
        assert_eq!(
            editor.value(),
            "<div class=\"todo-item\"><input type=\"checkbox\"><span>task</span></div>"
        );

        let mut editor = editor_with("");
        type_text(&mut editor, "```");
        assert_eq!(editor.value(), "<pre><code></code></pre>");
    }

    #[test]
    fn test_markdown_shortcuts_need_feature() {
        let mut config = EditorConfig::default();
        config.features.markdown = false;
        let mut editor =
            RichTextEditor::uncontrolled("", config, Box::new(HeadlessSurface::default()));
        type_text(&mut editor, "- item");
        assert_eq!(editor.value(), "<p>- item</p>");
        assert_eq!(
            editor.paste_markdown("# x"),
            Err(EditError::FeatureDisabled("markdown"))
        );
    }

    #[test]
    fn test_paste_markdown_inserts_blocks() {
        let mut editor = editor_with("");
        editor.paste_markdown("# Notes\n\n- one\n- two").unwrap();
        assert_eq!(editor.value(), "<h1>Notes</h1><ul><li>one</li><li>two</li></ul>");
    }

    #[test]
    fn test_character_count_counts_mentions_once() {
        let mut config = EditorConfig::default();
        config.mention_users = vec![MentionUser::new("u1", "Ann Lee", "")];
        let mut editor =
            RichTextEditor::uncontrolled("", config, Box::new(HeadlessSurface::default()));
        type_text(&mut editor, "hé @a");
        editor.select_menu_item(0).unwrap();
        // "hé " + token + " "
        assert_eq!(editor.character_count(), 5);
    }

    #[test]
    fn test_placeholder_only_when_blank() {
        let mut editor = editor_with("");
        assert_eq!(editor.placeholder(), Some("Start typing..."));
        type_text(&mut editor, "x");
        assert_eq!(editor.placeholder(), None);
    }

    #[test]
    fn test_hidden_toolbar_is_empty() {
        let mut config = EditorConfig::default();
        config.show_toolbar = false;
        let editor = RichTextEditor::uncontrolled("", config, Box::new(HeadlessSurface::default()));
        assert!(editor.toolbar().is_empty());
    }

    #[test]
    fn test_set_value_ignored_when_uncontrolled() {
        let mut editor = editor_with("<p>mine</p>");
        editor.set_value("<p>theirs</p>");
        assert_eq!(editor.value(), "<p>mine</p>");
    }
}
