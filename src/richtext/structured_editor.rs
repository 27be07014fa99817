// Structured Editor
// Provides editing operations on a StructuredDocument
// Completely independent of the markup format

use super::structured_document::*;
use thiserror::Error;

/// Result of an editing operation
pub type EditResult = Result<(), EditError>;

/// Errors that can occur during editing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("position is outside the document")]
    InvalidPosition,
    #[error("block index is out of range")]
    InvalidBlockIndex,
    #[error("document is empty")]
    EmptyDocument,
    #[error("trigger character {trigger:?} no longer precedes the caret")]
    AnchorLost { trigger: char },
    #[error("no trigger is active")]
    NoActiveTrigger,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("command {0:?} requires a value")]
    MissingCommandValue(String),
    #[error("feature {0:?} is disabled")]
    FeatureDisabled(&'static str),
    #[error("editor does not accept edits")]
    ReadOnly,
    #[error("editor surface could not take focus")]
    FocusUnavailable,
}

/// The structured editor with cursor state
#[derive(Debug, Clone)]
pub struct StructuredEditor {
    document: StructuredDocument,
    cursor: DocumentPosition,
    selection: Option<(DocumentPosition, DocumentPosition)>, // (anchor, focus)
    /// Style applied to the next typed text after a toggle on a collapsed caret
    pending_style: Option<TextStyle>,
}

impl StructuredEditor {
    /// Create a new editor with an empty document
    pub fn new() -> Self {
        Self::with_document(StructuredDocument::new())
    }

    /// Create an editor with an existing document. The document always holds
    /// at least one block so the caret has somewhere to live.
    pub fn with_document(mut document: StructuredDocument) -> Self {
        if document.is_empty() {
            document.add_block(Block::paragraph(0));
        }
        StructuredEditor {
            document,
            cursor: DocumentPosition::start(),
            selection: None,
            pending_style: None,
        }
    }

    /// Get the document
    pub fn document(&self) -> &StructuredDocument {
        &self.document
    }

    /// Get mutable document
    pub fn document_mut(&mut self) -> &mut StructuredDocument {
        &mut self.document
    }

    /// Get cursor position
    pub fn cursor(&self) -> DocumentPosition {
        self.cursor
    }

    /// Set cursor position (will be clamped to valid range)
    pub fn set_cursor(&mut self, pos: DocumentPosition) {
        self.cursor = self.document.clamp_position(pos);
        self.selection = None;
        self.pending_style = None;
    }

    /// Get selection as (anchor, focus)
    pub fn selection(&self) -> Option<(DocumentPosition, DocumentPosition)> {
        self.selection
    }

    /// Set selection range; the caret follows the focus end
    pub fn set_selection(&mut self, anchor: DocumentPosition, focus: DocumentPosition) {
        let anchor = self.document.clamp_position(anchor);
        let focus = self.document.clamp_position(focus);
        self.selection = Some((anchor, focus));
        self.cursor = focus;
        self.pending_style = None;
    }

    /// Clear selection
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// The selection in document order, or None when absent or collapsed
    pub fn selection_range(&self) -> Option<(DocumentPosition, DocumentPosition)> {
        let (a, b) = self.selection?;
        if a == b {
            return None;
        }
        Some((a.min(b), a.max(b)))
    }

    /// Selection range, falling back to the caret as an empty range
    fn touched_range(&self) -> (DocumentPosition, DocumentPosition) {
        self.selection_range().unwrap_or((self.cursor, self.cursor))
    }

    /// Select all content in the document
    pub fn select_all(&mut self) {
        let end = self.document.end_position();
        self.selection = Some((DocumentPosition::start(), end));
        self.cursor = end;
    }

    /// Start or extend selection from current cursor position to a new position
    /// This is used for shift+movement and pointer drag selection
    pub fn extend_selection_to(&mut self, end: DocumentPosition) {
        let end = self.document.clamp_position(end);
        let anchor = match self.selection {
            Some((anchor, _)) => anchor,
            None => self.cursor,
        };
        self.selection = Some((anchor, end));
        self.cursor = end;
        self.pending_style = None;
    }

    fn move_or_extend(&mut self, pos: DocumentPosition, extend: bool) {
        if extend {
            if pos != self.cursor {
                self.extend_selection_to(pos);
            }
        } else {
            self.set_cursor(pos);
        }
    }

    /// Text of the caret's block up to the caret
    pub fn text_before_cursor(&self) -> String {
        self.document
            .block(self.cursor.block_index)
            .map(|block| {
                let text = block.to_plain_text();
                text[..self.cursor.offset.min(text.len())].to_string()
            })
            .unwrap_or_default()
    }

    /// Insert text at cursor position
    pub fn insert_text(&mut self, text: &str) -> EditResult {
        if text.is_empty() {
            return Ok(());
        }

        // Delete selection first if there is one
        if self.selection_range().is_some() {
            self.delete_selection()?;
        }
        self.selection = None;

        let block_index = self.cursor.block_index;
        let offset = self.cursor.offset;
        let style = self.pending_style;
        let block = self
            .document
            .blocks_mut()
            .get_mut(block_index)
            .ok_or(EditError::InvalidBlockIndex)?;
        if offset > block.text_len() {
            return Err(EditError::InvalidPosition);
        }

        insert_text_into(&mut block.content, offset, text, style);
        block.normalize_content();

        // Move cursor forward
        self.cursor.offset += text.len();
        Ok(())
    }

    /// Insert a newline at cursor: splits the block, continues lists and
    /// quotes, leaves them when empty. Code blocks and table cells keep the
    /// newline inside the block.
    pub fn insert_newline(&mut self) -> EditResult {
        if self.selection_range().is_some() {
            self.delete_selection()?;
        }
        self.selection = None;

        let block_index = self.cursor.block_index;
        let offset = self.cursor.offset;
        let (block_type, is_empty) = {
            let block = self
                .document
                .block(block_index)
                .ok_or(EditError::InvalidBlockIndex)?;
            (block.block_type.clone(), block.is_empty())
        };

        let next_type = match &block_type {
            BlockType::CodeBlock { .. } => return self.insert_text("\n"),
            BlockType::TableCell { .. } => {
                return self.insert_inline_at_cursor(InlineContent::HardBreak);
            }
            BlockType::ListItem { .. } | BlockType::BlockQuote if is_empty => {
                // Empty list item or quote: leave the structure
                self.document.blocks_mut()[block_index].block_type = BlockType::Paragraph;
                self.cursor.offset = 0;
                return Ok(());
            }
            BlockType::ListItem { ordered, checkbox } => BlockType::ListItem {
                ordered: *ordered,
                checkbox: checkbox.map(|_| false),
            },
            BlockType::BlockQuote => BlockType::BlockQuote,
            BlockType::Heading { .. } if offset == 0 && !is_empty => {
                // Enter at the start of a heading pushes it down
                self.document
                    .insert_block(block_index, Block::paragraph(0));
                self.cursor = DocumentPosition::new(block_index + 1, 0);
                return Ok(());
            }
            BlockType::Paragraph | BlockType::Heading { .. } => BlockType::Paragraph,
        };

        let right_content = self.document.blocks_mut()[block_index].split_content_at(offset);
        let mut new_block = Block::new(0, next_type);
        new_block.content = right_content;
        self.document.insert_block(block_index + 1, new_block);
        self.cursor = DocumentPosition::new(block_index + 1, 0);
        self.pending_style = None;
        Ok(())
    }

    /// Delete grapheme before cursor (backspace)
    pub fn delete_backward(&mut self) -> EditResult {
        if self.document.is_empty() {
            return Err(EditError::EmptyDocument);
        }

        // If there's a selection, delete it
        if self.selection_range().is_some() {
            return self.delete_selection();
        }
        self.selection = None;

        let block_index = self.cursor.block_index;
        let offset = self.cursor.offset;

        if offset == 0 {
            let block_type = self.document.blocks()[block_index].block_type.clone();
            match block_type {
                // Backspace at the start of a styled block first drops the style
                BlockType::Heading { .. } | BlockType::ListItem { .. } | BlockType::BlockQuote => {
                    self.document.blocks_mut()[block_index].block_type = BlockType::Paragraph;
                    return Ok(());
                }
                _ => {}
            }
            if block_index == 0 {
                return Ok(()); // At start of document, nothing to delete
            }

            if !self.document.can_merge(block_index - 1, block_index) {
                // Only the caret moves; an empty block below a table is dropped
                if !block_type.is_table_cell() && self.document.blocks()[block_index].is_empty() {
                    self.document.remove_block(block_index);
                }
                let prev_len = self.document.blocks()[block_index - 1].text_len();
                self.cursor = DocumentPosition::new(block_index - 1, prev_len);
                return Ok(());
            }

            let blocks = self.document.blocks_mut();
            let current_block = blocks.remove(block_index);
            let prev_block = &mut blocks[block_index - 1];
            let prev_len = prev_block.text_len();
            prev_block.content.extend(current_block.content);
            prev_block.normalize_content();

            self.cursor = DocumentPosition::new(block_index - 1, prev_len);
        } else {
            let prev = self.document.previous_grapheme_position(self.cursor);
            self.document.blocks_mut()[block_index].delete_text_range(prev.offset, offset);
            self.cursor = prev;
        }
        Ok(())
    }

    /// Delete grapheme at cursor (delete key)
    pub fn delete_forward(&mut self) -> EditResult {
        if self.document.is_empty() {
            return Err(EditError::EmptyDocument);
        }

        if self.selection_range().is_some() {
            return self.delete_selection();
        }
        self.selection = None;

        let block_index = self.cursor.block_index;
        let offset = self.cursor.offset;
        let block_count = self.document.block_count();
        let can_merge = self.document.can_merge(block_index, block_index + 1);
        let blocks = self.document.blocks_mut();

        if offset >= blocks[block_index].text_len() {
            // At end of block - merge with next block
            if block_index + 1 >= block_count {
                return Ok(());
            }
            if !can_merge {
                // An empty block above a table is dropped; cells stay intact
                if blocks[block_index].is_empty() && !blocks[block_index].block_type.is_table_cell() {
                    blocks.remove(block_index);
                }
                return Ok(());
            }
            let next_block = blocks.remove(block_index + 1);
            blocks[block_index].content.extend(next_block.content);
            blocks[block_index].normalize_content();
        } else {
            let next = self.document.next_grapheme_position(self.cursor);
            self.document.blocks_mut()[block_index].delete_text_range(offset, next.offset);
        }

        Ok(())
    }

    /// Delete word before cursor (Alt/Ctrl+Backspace)
    pub fn delete_word_backward(&mut self) -> EditResult {
        if self.selection_range().is_some() {
            return self.delete_selection();
        }

        let from = self.cursor;
        let to = self.word_left_position(from);
        if to == from {
            return Ok(());
        }
        if to.block_index != from.block_index {
            return self.delete_backward();
        }

        self.document.delete_range(to, from);
        self.cursor = to;
        self.selection = None;
        Ok(())
    }

    /// Delete word at/after cursor (Alt/Ctrl+Delete)
    pub fn delete_word_forward(&mut self) -> EditResult {
        if self.selection_range().is_some() {
            return self.delete_selection();
        }

        let from = self.cursor;
        let to = self.word_right_position(from);
        if to == from {
            return Ok(());
        }
        if to.block_index != from.block_index {
            return self.delete_forward();
        }

        self.document.delete_range(from, to);
        self.selection = None;
        Ok(())
    }

    /// Delete the current selection
    pub fn delete_selection(&mut self) -> EditResult {
        let Some((start, end)) = self.selection_range() else {
            self.selection = None;
            return Ok(());
        };

        self.document.delete_range(start, end);
        self.cursor = self.document.clamp_position(start);
        self.selection = None;
        Ok(())
    }

    /// Move cursor left by one grapheme, crossing into the previous block
    pub fn move_cursor_left(&mut self, extend: bool) {
        if !extend && let Some((start, _)) = self.selection_range() {
            self.set_cursor(start);
            return;
        }
        let pos = if self.cursor.offset > 0 {
            self.document.previous_grapheme_position(self.cursor)
        } else if self.cursor.block_index > 0 {
            let index = self.cursor.block_index - 1;
            DocumentPosition::new(index, self.document.blocks()[index].text_len())
        } else {
            self.cursor
        };
        self.move_or_extend(pos, extend);
    }

    /// Move cursor right by one grapheme, crossing into the next block
    pub fn move_cursor_right(&mut self, extend: bool) {
        if !extend && let Some((_, end)) = self.selection_range() {
            self.set_cursor(end);
            return;
        }
        let Some(block) = self.document.block(self.cursor.block_index) else {
            return;
        };
        let pos = if self.cursor.offset < block.text_len() {
            self.document.next_grapheme_position(self.cursor)
        } else if self.cursor.block_index + 1 < self.document.block_count() {
            DocumentPosition::new(self.cursor.block_index + 1, 0)
        } else {
            self.cursor
        };
        self.move_or_extend(pos, extend);
    }

    /// Move cursor up (to previous block)
    pub fn move_cursor_up(&mut self, extend: bool) {
        if self.cursor.block_index == 0 {
            let pos = DocumentPosition::start();
            self.move_or_extend(pos, extend);
            return;
        }
        let pos = self.document.clamp_position(DocumentPosition::new(
            self.cursor.block_index - 1,
            self.cursor.offset,
        ));
        self.move_or_extend(pos, extend);
    }

    /// Move cursor down (to next block)
    pub fn move_cursor_down(&mut self, extend: bool) {
        if self.cursor.block_index + 1 >= self.document.block_count() {
            let pos = self.document.end_position();
            self.move_or_extend(pos, extend);
            return;
        }
        let pos = self.document.clamp_position(DocumentPosition::new(
            self.cursor.block_index + 1,
            self.cursor.offset,
        ));
        self.move_or_extend(pos, extend);
    }

    /// Move cursor to start of current block
    pub fn move_cursor_to_line_start(&mut self, extend: bool) {
        let pos = DocumentPosition::new(self.cursor.block_index, 0);
        self.move_or_extend(pos, extend);
    }

    /// Move cursor to end of current block
    pub fn move_cursor_to_line_end(&mut self, extend: bool) {
        let len = self
            .document
            .block(self.cursor.block_index)
            .map(|b| b.text_len())
            .unwrap_or(0);
        let pos = DocumentPosition::new(self.cursor.block_index, len);
        self.move_or_extend(pos, extend);
    }

    /// Move cursor right by one word
    pub fn move_word_right(&mut self, extend: bool) {
        let pos = self.word_right_position(self.cursor);
        self.move_or_extend(pos, extend);
    }

    /// Move cursor left by one word
    pub fn move_word_left(&mut self, extend: bool) {
        let pos = self.word_left_position(self.cursor);
        self.move_or_extend(pos, extend);
    }

    /// Compute next word-right position from a given position
    fn word_right_position(&self, pos: DocumentPosition) -> DocumentPosition {
        let blocks = self.document.blocks();
        let Some(block) = blocks.get(pos.block_index) else {
            return pos;
        };
        let text = block.to_plain_text();
        let start = pos.offset.min(text.len());
        if start >= text.len() {
            if pos.block_index + 1 < blocks.len() {
                return DocumentPosition::new(pos.block_index + 1, 0);
            }
            return pos;
        }

        let mut i = start;
        let mut seen_word = false;
        for ch in text[start..].chars() {
            let is_separator = is_word_separator(ch);
            if seen_word && is_separator {
                break;
            }
            seen_word |= !is_separator;
            i += ch.len_utf8();
        }
        DocumentPosition::new(pos.block_index, i)
    }

    /// Compute next word-left position from a given position
    fn word_left_position(&self, pos: DocumentPosition) -> DocumentPosition {
        let blocks = self.document.blocks();
        let Some(block) = blocks.get(pos.block_index) else {
            return pos;
        };
        let text = block.to_plain_text();
        let end = pos.offset.min(text.len());
        if end == 0 {
            if pos.block_index > 0 {
                return DocumentPosition::new(
                    pos.block_index - 1,
                    blocks[pos.block_index - 1].text_len(),
                );
            }
            return pos;
        }

        let mut i = end;
        let mut seen_word = false;
        for ch in text[..end].chars().rev() {
            let is_separator = is_word_separator(ch);
            if seen_word && is_separator {
                break;
            }
            seen_word |= !is_separator;
            i -= ch.len_utf8();
        }
        DocumentPosition::new(pos.block_index, i)
    }

    /// Indices of the blocks touched by the selection or the caret
    fn touched_blocks(&self) -> std::ops::RangeInclusive<usize> {
        let (start, end) = self.touched_range();
        start.block_index..=end.block_index
    }

    /// Set the block type of every block touched by the selection or caret
    pub fn set_block_type(&mut self, block_type: BlockType) -> EditResult {
        let range = self.touched_blocks();
        if *range.end() >= self.document.block_count() {
            return Err(EditError::InvalidBlockIndex);
        }
        for block in &mut self.document.blocks_mut()[range] {
            if let BlockType::CodeBlock { .. } = block_type {
                for item in block.content.iter_mut() {
                    if let InlineContent::Text(run) = item {
                        run.style = TextStyle::default();
                    }
                }
                block.normalize_content();
            }
            block.block_type = block_type.clone();
        }
        Ok(())
    }

    /// Toggle list membership for the touched blocks.
    /// Blocks already in a list of this kind return to paragraphs.
    pub fn toggle_list(&mut self, ordered: bool) -> EditResult {
        let range = self.touched_blocks();
        if *range.end() >= self.document.block_count() {
            return Err(EditError::InvalidBlockIndex);
        }
        let target = BlockType::ListItem {
            ordered,
            checkbox: None,
        };
        let all_in_list = self.document.blocks()[range.clone()]
            .iter()
            .all(|b| b.block_type == target);
        let new_type = if all_in_list {
            BlockType::Paragraph
        } else {
            target
        };
        for block in &mut self.document.blocks_mut()[range] {
            block.block_type = new_type.clone();
        }
        Ok(())
    }

    /// Insert an inline element at the current cursor position
    pub fn insert_inline_at_cursor(&mut self, inline: InlineContent) -> EditResult {
        if self.selection_range().is_some() {
            self.delete_selection()?;
        }
        self.selection = None;

        let block_index = self.cursor.block_index;
        let offset = self.cursor.offset;
        let inserted_len = inline.text_len();
        let block = self
            .document
            .blocks_mut()
            .get_mut(block_index)
            .ok_or(EditError::InvalidBlockIndex)?;
        block.insert_inline_at(offset, inline);

        self.cursor.offset = offset + inserted_len;
        Ok(())
    }

    /// Wrap the selection in a link. Without a selection the destination
    /// itself is inserted as link text.
    pub fn create_link(&mut self, destination: &str) -> EditResult {
        let link = Link {
            destination: destination.to_string(),
            title: None,
        };
        let Some((start, end)) = self.selection_range() else {
            return self.insert_inline_at_cursor(InlineContent::Link {
                link,
                content: vec![InlineContent::Text(TextRun::plain(destination))],
            });
        };

        self.map_selected_content(start, end, |selected| {
            vec![InlineContent::Link {
                link: link.clone(),
                content: unwrap_links(selected),
            }]
        })
    }

    /// Remove links overlapping the selection, or the link under the caret
    pub fn unlink(&mut self) -> EditResult {
        let (start, end) = self.touched_range();
        for index in start.block_index..=end.block_index {
            let Some(block) = self.document.blocks_mut().get_mut(index) else {
                return Err(EditError::InvalidBlockIndex);
            };
            let len = block.text_len();
            let from = if index == start.block_index { start.offset } else { 0 };
            let to = if index == end.block_index { end.offset } else { len };

            let mut pos = 0;
            let mut content = Vec::with_capacity(block.content.len());
            for item in std::mem::take(&mut block.content) {
                let item_len = item.text_len();
                let overlaps = if from == to {
                    pos <= from && from <= pos + item_len
                } else {
                    pos < to && from < pos + item_len
                };
                pos += item_len;
                match item {
                    InlineContent::Link { content: inner, .. } if overlaps => content.extend(inner),
                    other => content.push(other),
                }
            }
            block.content = content;
            block.normalize_content();
        }
        Ok(())
    }

    /// The link containing the caret, if any
    pub fn link_at_cursor(&self) -> Option<&Link> {
        let block = self.document.block(self.cursor.block_index)?;
        let offset = self.cursor.offset;
        let mut pos = 0;
        for item in &block.content {
            let len = item.text_len();
            if let InlineContent::Link { link, .. } = item
                && pos < offset
                && offset <= pos + len
            {
                return Some(link);
            }
            pos += len;
        }
        None
    }

    /// Extract plain text for a document range
    pub fn text_in_range(&self, start: DocumentPosition, end: DocumentPosition) -> String {
        let (a, b) = (start.min(end), start.max(end));
        let mut s = String::new();
        for bi in a.block_index..=b.block_index {
            let Some(block) = self.document.block(bi) else {
                break;
            };
            let text = block.to_plain_text();
            let from = if bi == a.block_index {
                a.offset.min(text.len())
            } else {
                0
            };
            let to = if bi == b.block_index {
                b.offset.min(text.len())
            } else {
                text.len()
            };
            if bi > a.block_index {
                s.push('\n');
            }
            if from < to {
                s.push_str(&text[from..to]);
            }
        }
        s
    }

    /// Toggle bold style on the current selection
    pub fn toggle_bold(&mut self) -> EditResult {
        self.toggle_style_attribute(|style| style.bold = !style.bold)
    }

    /// Toggle italic style on the current selection
    pub fn toggle_italic(&mut self) -> EditResult {
        self.toggle_style_attribute(|style| style.italic = !style.italic)
    }

    pub fn toggle_underline(&mut self) -> EditResult {
        self.toggle_style_attribute(|style| style.underline = !style.underline)
    }

    pub fn toggle_strikethrough(&mut self) -> EditResult {
        self.toggle_style_attribute(|style| style.strikethrough = !style.strikethrough)
    }

    pub fn toggle_code(&mut self) -> EditResult {
        self.toggle_style_attribute(|style| style.code = !style.code)
    }

    pub fn toggle_highlight(&mut self) -> EditResult {
        self.toggle_style_attribute(|style| style.highlight = !style.highlight)
    }

    /// Flip a style attribute on every run of the selection. On a collapsed
    /// caret the flip applies to the text typed next.
    fn toggle_style_attribute<F>(&mut self, mut apply_style: F) -> EditResult
    where
        F: FnMut(&mut TextStyle),
    {
        let Some((start, end)) = self.selection_range() else {
            let mut style = self.pending_style.unwrap_or_else(|| self.style_at_cursor());
            apply_style(&mut style);
            self.pending_style = Some(style);
            return Ok(());
        };

        self.map_selected_content(start, end, |selected| {
            map_style_on_runs(selected, &mut apply_style)
        })
    }

    /// Clear all inline formatting on the current selection
    pub fn clear_formatting(&mut self) -> EditResult {
        let Some((start, end)) = self.selection_range() else {
            self.pending_style = Some(TextStyle::default());
            return Ok(());
        };

        self.map_selected_content(start, end, |selected| {
            map_style_on_runs(selected, &mut |style: &mut TextStyle| {
                *style = TextStyle::default()
            })
        })
    }

    /// Rewrite the selected part of every block in [start, end), leaving
    /// the unselected content untouched, then re-normalize.
    fn map_selected_content<F>(
        &mut self,
        start: DocumentPosition,
        end: DocumentPosition,
        mut map: F,
    ) -> EditResult
    where
        F: FnMut(Vec<InlineContent>) -> Vec<InlineContent>,
    {
        if end.block_index >= self.document.block_count() {
            return Err(EditError::InvalidBlockIndex);
        }

        for index in start.block_index..=end.block_index {
            let block = &mut self.document.blocks_mut()[index];
            let from = if index == start.block_index {
                start.offset
            } else {
                0
            };
            let to = if index == end.block_index {
                end.offset
            } else {
                block.text_len()
            };
            if from >= to {
                continue;
            }

            let (before, selected, after) = split_content_for_style(&block.content, from, to);
            block.content = before
                .into_iter()
                .chain(map(selected))
                .chain(after)
                .collect();
            block.normalize_content();
        }
        Ok(())
    }

    /// Style of the text right before the caret, or the pending style
    pub fn style_at_cursor(&self) -> TextStyle {
        if let Some(style) = self.pending_style {
            return style;
        }
        let Some(block) = self.document.block(self.cursor.block_index) else {
            return TextStyle::default();
        };
        let offset = self.cursor.offset;
        let mut found = None;
        visit_runs(&block.content, 0, &mut |run_start, run| {
            let run_end = run_start + run.len();
            let covers = (run_start < offset && offset <= run_end) || (offset == 0 && run_start == 0);
            if covers && found.is_none() {
                found = Some(run.style);
            }
        });
        found.unwrap_or_default()
    }

    /// Styles shared by every selected run; the caret style without a selection
    pub fn common_style(&self) -> TextStyle {
        let Some((start, end)) = self.selection_range() else {
            return self.style_at_cursor();
        };

        let mut common: Option<TextStyle> = None;
        for index in start.block_index..=end.block_index {
            let Some(block) = self.document.block(index) else {
                break;
            };
            let from = if index == start.block_index { start.offset } else { 0 };
            let to = if index == end.block_index {
                end.offset
            } else {
                block.text_len()
            };
            visit_runs(&block.content, 0, &mut |run_start, run| {
                if run_start < to && from < run_start + run.len() {
                    common = Some(match common {
                        None => run.style,
                        Some(c) => TextStyle {
                            bold: c.bold && run.style.bold,
                            italic: c.italic && run.style.italic,
                            underline: c.underline && run.style.underline,
                            strikethrough: c.strikethrough && run.style.strikethrough,
                            code: c.code && run.style.code,
                            highlight: c.highlight && run.style.highlight,
                        },
                    });
                }
            });
        }
        common.unwrap_or_default()
    }

    /// Get the selected text as plain text
    pub fn get_selection_text(&self) -> String {
        match self.selection_range() {
            Some((start, end)) => self.text_in_range(start, end),
            None => String::new(),
        }
    }

    /// Cut the selected text (copy and delete)
    pub fn cut(&mut self) -> Result<String, EditError> {
        let text = self.get_selection_text();
        if !text.is_empty() {
            self.delete_selection()?;
        }
        Ok(text)
    }

    /// Copy the selected text
    pub fn copy(&self) -> String {
        self.get_selection_text()
    }

    /// Paste text at cursor position (or replace selection). Each line
    /// after the first starts a new paragraph; inside a table cell lines are
    /// joined with hard breaks instead.
    pub fn paste(&mut self, text: &str) -> EditResult {
        let (start, end) = self.touched_range();
        let host_type = self.document.block(start.block_index).map(|b| &b.block_type);
        let in_code = matches!(host_type, Some(BlockType::CodeBlock { .. }));
        let in_cell = host_type.is_some_and(BlockType::is_table_cell);
        if in_cell && text.contains(['\n', '\r']) {
            if self.selection_range().is_some() {
                self.delete_selection()?;
            }
            let normalized = normalize_plain_text(text);
            for (i, line) in normalized.split('\n').enumerate() {
                if i > 0 {
                    self.insert_inline_at_cursor(InlineContent::HardBreak)?;
                }
                self.insert_text(line)?;
            }
            return Ok(());
        }
        if in_code || !text.contains(['\n', '\r']) {
            if self.selection_range().is_some() {
                self.delete_selection()?;
            }
            return self.insert_text(&normalize_plain_text(text));
        }

        self.cursor = self.document.replace_range(start, end, text);
        self.selection = None;
        Ok(())
    }

    /// Insert the blocks of `fragment` at the caret (replacing the selection).
    /// A lone paragraph is inserted inline; otherwise the blocks go between
    /// the text before and after the caret, and an emptied host block is
    /// dropped. The caret ends after the inserted content.
    pub fn insert_fragment(&mut self, fragment: StructuredDocument) -> EditResult {
        if self.selection_range().is_some() {
            self.delete_selection()?;
        }
        self.selection = None;

        let mut blocks: Vec<Block> = fragment.blocks().to_vec();
        if blocks.is_empty() {
            return Ok(());
        }

        let block_index = self.cursor.block_index;
        if self.document.table_end(block_index).is_some() {
            // A cell takes the fragment as one paragraph, one line per block
            let mut merged = Block::paragraph(0);
            for (i, block) in blocks.into_iter().enumerate() {
                if i > 0 {
                    merged.content.push(InlineContent::HardBreak);
                }
                merged.content.extend(block.content);
            }
            blocks = vec![merged];
        }
        let offset = self.cursor.offset;
        let host = self
            .document
            .blocks_mut()
            .get_mut(block_index)
            .ok_or(EditError::InvalidBlockIndex)?;
        let host_type = host.block_type.clone();
        let right = host.split_content_at(offset);

        if blocks.len() == 1 && blocks[0].block_type == BlockType::Paragraph {
            let inserted = blocks.remove(0);
            host.content.extend(inserted.content);
            let caret = host.text_len();
            host.content.extend(right);
            host.normalize_content();
            self.cursor = DocumentPosition::new(block_index, caret);
            return Ok(());
        }

        let mut insert_at = block_index + 1;
        if host.is_empty() {
            self.document.remove_block(block_index);
            insert_at = block_index;
        }
        let count = blocks.len();
        for (i, block) in blocks.into_iter().enumerate() {
            self.document.insert_block(insert_at + i, block);
        }

        let last = insert_at + count - 1;
        if !right.is_empty() {
            let mut tail = Block::new(0, host_type);
            tail.content = right;
            tail.normalize_content();
            self.document.insert_block(last + 1, tail);
        }

        let caret = self.document.block(last).map_or(0, Block::text_len);
        self.cursor = DocumentPosition::new(last, caret);
        self.pending_style = None;
        Ok(())
    }
}

impl Default for StructuredEditor {
    fn default() -> Self {
        Self::new()
    }
}

fn is_word_separator(ch: char) -> bool {
    ch.is_whitespace() || ch.is_ascii_punctuation() || ch == OBJECT_REPLACEMENT
}

/// Insert text at a flattened offset. Text joins the run on its left (so it
/// inherits that style) unless an explicit style differs. At the edges of a
/// link the text goes outside the link; strictly inside, it stays in it.
fn insert_text_into(
    content: &mut Vec<InlineContent>,
    offset: usize,
    text: &str,
    style: Option<TextStyle>,
) {
    let mut pos = 0;
    let mut insert_at = content.len();

    for idx in 0..content.len() {
        let len = content[idx].text_len();
        let end = pos + len;

        match &mut content[idx] {
            InlineContent::Text(run) if pos <= offset && offset <= end && (offset > pos || idx == 0) => {
                let local = offset - pos;
                match style {
                    Some(style) if style != run.style => {
                        let (left, right) = run.split_at(local);
                        let new_run = InlineContent::Text(TextRun::new(text, style));
                        content.splice(
                            idx..=idx,
                            [InlineContent::Text(left), new_run, InlineContent::Text(right)],
                        );
                    }
                    _ => run.insert_text(local, text),
                }
                return;
            }
            InlineContent::Link { content: inner, .. } if pos < offset && offset < end => {
                insert_text_into(inner, offset - pos, text, style);
                return;
            }
            _ => {}
        }

        if pos >= offset {
            insert_at = idx;
            break;
        }
        pos = end;
    }

    content.insert(
        insert_at,
        InlineContent::Text(TextRun::new(text, style.unwrap_or_default())),
    );
}

/// Call `f` with the absolute start offset of every text run, links included
fn visit_runs<F>(content: &[InlineContent], base: usize, f: &mut F)
where
    F: FnMut(usize, &TextRun),
{
    let mut pos = base;
    for item in content {
        match item {
            InlineContent::Text(run) => f(pos, run),
            InlineContent::Link { content, .. } => visit_runs(content, pos, f),
            _ => {}
        }
        pos += item.text_len();
    }
}

/// Split content into three parts: before selection, within selection, after selection
fn split_content_for_style(
    content: &[InlineContent],
    start_offset: usize,
    end_offset: usize,
) -> (Vec<InlineContent>, Vec<InlineContent>, Vec<InlineContent>) {
    let (before, rest) = split_inline_vec(content, start_offset);
    let (selected, after) = split_inline_vec(&rest, end_offset.saturating_sub(start_offset));
    (before, selected, after)
}

/// Recursively apply a style-mapping function to all text runs
fn map_style_on_runs<F>(items: Vec<InlineContent>, apply: &mut F) -> Vec<InlineContent>
where
    F: FnMut(&mut TextStyle),
{
    items
        .into_iter()
        .map(|item| match item {
            InlineContent::Text(mut run) => {
                apply(&mut run.style);
                InlineContent::Text(run)
            }
            InlineContent::Link { link, content } => InlineContent::Link {
                link,
                content: map_style_on_runs(content, apply),
            },
            other => other,
        })
        .collect()
}

/// Replace links by their content (links never nest)
fn unwrap_links(items: Vec<InlineContent>) -> Vec<InlineContent> {
    items
        .into_iter()
        .flat_map(|item| match item {
            InlineContent::Link { content, .. } => content,
            other => vec![other],
        })
        .collect()
}
