// Structured Document Model
// The editable document as a flat sequence of blocks holding inline content.
// Markup is only used as the exchange format with the embedder.

use std::borrow::Cow;
use std::cmp::min;
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

/// Unique identifier for document elements
pub type ElementId = usize;

/// Character standing in for atomic inline content (mentions, images) in the
/// flattened block text.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

const ATOM_LEN: usize = OBJECT_REPLACEMENT.len_utf8();

/// Text styling (semantic, not syntactic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub highlight: bool,
}

impl TextStyle {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn bold() -> Self {
        TextStyle {
            bold: true,
            ..Default::default()
        }
    }

    pub fn italic() -> Self {
        TextStyle {
            italic: true,
            ..Default::default()
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// A run of styled text (a contiguous piece of text with uniform styling)
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub style: TextStyle,
}

impl TextRun {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        TextRun {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, TextStyle::plain())
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Byte offset split; both halves keep the style
    pub fn split_at(&self, offset: usize) -> (TextRun, TextRun) {
        let (left, right) = self.text.split_at(offset);
        (
            TextRun::new(left, self.style),
            TextRun::new(right, self.style),
        )
    }

    pub fn insert_text(&mut self, offset: usize, text: &str) {
        self.text.insert_str(offset, text);
    }
}

/// Link destination
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub destination: String,
    pub title: Option<String>,
}

/// A reference to a user, rendered as a non-editable `@name` token
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    pub user_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub src: String,
    pub alt: String,
}

/// Inline content (can appear within a block)
#[derive(Debug, Clone, PartialEq)]
pub enum InlineContent {
    Text(TextRun),
    Link {
        link: Link,
        content: Vec<InlineContent>,
    },
    Mention(Mention),
    Image(Image),
    HardBreak,
}

impl InlineContent {
    /// Length of this item in the flattened block text
    pub fn text_len(&self) -> usize {
        match self {
            InlineContent::Text(run) => run.len(),
            InlineContent::Link { content, .. } => content.iter().map(|c| c.text_len()).sum(),
            InlineContent::Mention(_) | InlineContent::Image(_) => ATOM_LEN,
            InlineContent::HardBreak => 1,
        }
    }

    /// Flatten to the text used for offsets; atomic items become U+FFFC
    pub fn to_plain_text(&self) -> String {
        match self {
            InlineContent::Text(run) => run.text.clone(),
            InlineContent::Link { content, .. } => {
                content.iter().map(|c| c.to_plain_text()).collect()
            }
            InlineContent::Mention(_) | InlineContent::Image(_) => OBJECT_REPLACEMENT.to_string(),
            InlineContent::HardBreak => "\n".to_string(),
        }
    }

    /// Flatten to the text a reader would see
    pub fn to_display_text(&self) -> String {
        match self {
            InlineContent::Text(run) => run.text.clone(),
            InlineContent::Link { content, .. } => {
                content.iter().map(|c| c.to_display_text()).collect()
            }
            InlineContent::Mention(mention) => format!("@{}", mention.display_name),
            InlineContent::Image(image) => image.alt.clone(),
            InlineContent::HardBreak => "\n".to_string(),
        }
    }

    /// Mentions and images cannot be entered by the caret
    pub fn is_atomic(&self) -> bool {
        matches!(self, InlineContent::Mention(_) | InlineContent::Image(_))
    }
}

/// Block-level content types
#[derive(Debug, Clone, PartialEq)]
pub enum BlockType {
    Paragraph,
    Heading {
        level: u8,
    }, // 1-6
    CodeBlock {
        language: Option<String>,
    },
    BlockQuote,
    ListItem {
        ordered: bool,
        checkbox: Option<bool>,
    },
    TableCell {
        row: usize,
        column: usize,
        header: bool,
    },
}

impl BlockType {
    pub fn is_table_cell(&self) -> bool {
        matches!(self, BlockType::TableCell { .. })
    }

    /// Ghost text shown by a host while a block of this type is empty
    pub fn placeholder(&self) -> Option<Cow<'static, str>> {
        match self {
            BlockType::Paragraph => None,
            BlockType::Heading { level } => Some(Cow::Owned(format!("Heading {}", level))),
            BlockType::CodeBlock { .. } => Some(Cow::Borrowed("// Code block")),
            BlockType::BlockQuote => Some(Cow::Borrowed("Quote")),
            BlockType::ListItem {
                checkbox: Some(_), ..
            } => Some(Cow::Borrowed("To-do item")),
            BlockType::ListItem { .. } => Some(Cow::Borrowed("List item")),
            BlockType::TableCell { row, column, .. } => {
                Some(Cow::Owned(format!("Cell {}", row * 2 + column + 1)))
            }
        }
    }
}

/// A block of content
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: ElementId,
    pub block_type: BlockType,
    pub content: Vec<InlineContent>,
}

impl Block {
    pub fn new(id: ElementId, block_type: BlockType) -> Self {
        Block {
            id,
            block_type,
            content: Vec::new(),
        }
    }

    pub fn paragraph(id: ElementId) -> Self {
        Self::new(id, BlockType::Paragraph)
    }

    pub fn heading(id: ElementId, level: u8) -> Self {
        Self::new(
            id,
            BlockType::Heading {
                level: level.clamp(1, 6),
            },
        )
    }

    pub fn with_text(mut self, text: impl Into<String>, style: TextStyle) -> Self {
        self.content
            .push(InlineContent::Text(TextRun::new(text, style)));
        self
    }

    pub fn with_plain_text(mut self, text: impl Into<String>) -> Self {
        self.content.push(InlineContent::Text(TextRun::plain(text)));
        self
    }

    pub fn text_len(&self) -> usize {
        self.content.iter().map(|c| c.text_len()).sum()
    }

    /// Get the flattened text used for offsets
    pub fn to_plain_text(&self) -> String {
        self.content.iter().map(|c| c.to_plain_text()).collect()
    }

    pub fn to_display_text(&self) -> String {
        self.content.iter().map(|c| c.to_display_text()).collect()
    }

    /// True when the block holds no content at all
    pub fn is_empty(&self) -> bool {
        self.text_len() == 0
    }

    /// Delete text in [start..end) within this block's flattened content.
    /// Atomic items touched by the range are removed whole.
    pub fn delete_text_range(&mut self, start: usize, end: usize) {
        fn delete_in_vec(content: Vec<InlineContent>, start: usize, end: usize) -> Vec<InlineContent> {
            let mut kept = Vec::with_capacity(content.len());
            let mut pos = 0usize;

            for item in content {
                let len = item.text_len();
                let item_start = pos;
                let item_end = pos + len;
                pos = item_end;

                if item_end <= start || item_start >= end {
                    kept.push(item);
                    continue;
                }

                match item {
                    InlineContent::Text(run) => {
                        let local_start = start.saturating_sub(item_start);
                        let local_end = min(len, end - item_start);
                        let mut text = run.text;
                        text.replace_range(local_start..local_end, "");
                        if !text.is_empty() {
                            kept.push(InlineContent::Text(TextRun::new(text, run.style)));
                        }
                    }
                    InlineContent::Link { link, content } => {
                        let local_start = start.saturating_sub(item_start);
                        let local_end = min(len, end - item_start);
                        let inner = delete_in_vec(content, local_start, local_end);
                        if inner.iter().map(|c| c.text_len()).sum::<usize>() > 0 {
                            kept.push(InlineContent::Link {
                                link,
                                content: inner,
                            });
                        }
                    }
                    // Overlapped atomic items and breaks are dropped
                    _ => {}
                }
            }

            kept
        }

        if start >= end {
            return;
        }
        let len = self.text_len();
        let start = min(start, len);
        let end = min(end, len);
        let content = std::mem::take(&mut self.content);
        self.content = Self::normalize_inline_vec(delete_in_vec(content, start, end));
    }

    /// Split this block's content at a flattened text offset, returning the right part.
    /// The left part remains in self.
    pub fn split_content_at(&mut self, offset: usize) -> Vec<InlineContent> {
        let offset = min(offset, self.text_len());
        let (left, right) = split_inline_vec(&self.content, offset);
        self.content = left;
        right
    }

    /// Insert an inline item at a flattened text offset
    pub fn insert_inline_at(&mut self, offset: usize, inline: InlineContent) {
        let right = self.split_content_at(offset);
        self.content.push(inline);
        self.content.extend(right);
        self.normalize_content();
    }

    /// Merge adjacent runs with identical style and drop empty runs and links
    fn normalize_inline_vec(content: Vec<InlineContent>) -> Vec<InlineContent> {
        let mut normalized: Vec<InlineContent> = Vec::with_capacity(content.len());
        for item in content {
            match item {
                InlineContent::Text(run) => {
                    if run.is_empty() {
                        continue;
                    }
                    if let Some(InlineContent::Text(prev)) = normalized.last_mut()
                        && prev.style == run.style
                    {
                        prev.text.push_str(&run.text);
                        continue;
                    }
                    normalized.push(InlineContent::Text(run));
                }
                InlineContent::Link { link, content } => {
                    let content = Self::normalize_inline_vec(content);
                    if content.is_empty() {
                        continue;
                    }
                    if let Some(InlineContent::Link {
                        link: prev_link,
                        content: prev_content,
                    }) = normalized.last_mut()
                        && *prev_link == link
                    {
                        prev_content.extend(content);
                        let merged = std::mem::take(prev_content);
                        *prev_content = Self::normalize_inline_vec(merged);
                        continue;
                    }
                    normalized.push(InlineContent::Link { link, content });
                }
                other => normalized.push(other),
            }
        }
        normalized
    }

    pub fn normalize_content(&mut self) {
        let content = std::mem::take(&mut self.content);
        self.content = Self::normalize_inline_vec(content);
    }

    /// A normalized copy of the inline content, used by serializers
    pub fn normalized_content(&self) -> Vec<InlineContent> {
        Self::normalize_inline_vec(self.content.clone())
    }

    /// Insert plain text at a flattened text offset
    pub fn insert_plain_text(&mut self, offset: usize, text: &str) {
        let right = self.split_content_at(offset);
        if !text.is_empty() {
            self.content.push(InlineContent::Text(TextRun::plain(text)));
        }
        self.content.extend(right);
        self.normalize_content();
    }
}

/// Split inline content at a flattened offset into (left, right)
pub(crate) fn split_inline_vec(
    content: &[InlineContent],
    offset: usize,
) -> (Vec<InlineContent>, Vec<InlineContent>) {
    let mut left: Vec<InlineContent> = Vec::new();
    let mut right: Vec<InlineContent> = Vec::new();
    let mut pos = 0usize;

    for item in content {
        let len = item.text_len();
        if pos + len <= offset {
            left.push(item.clone());
        } else if pos >= offset {
            right.push(item.clone());
        } else {
            // offset falls strictly within this item
            let local = offset - pos;
            match item {
                InlineContent::Text(run) => {
                    let (l, r) = run.split_at(local);
                    left.push(InlineContent::Text(l));
                    right.push(InlineContent::Text(r));
                }
                InlineContent::Link {
                    link,
                    content: inner,
                } => {
                    let (l_inner, r_inner) = split_inline_vec(inner, local);
                    if !l_inner.is_empty() {
                        left.push(InlineContent::Link {
                            link: link.clone(),
                            content: l_inner,
                        });
                    }
                    if !r_inner.is_empty() {
                        right.push(InlineContent::Link {
                            link: link.clone(),
                            content: r_inner,
                        });
                    }
                }
                // Atomic items are never split
                _ => left.push(item.clone()),
            }
        }
        pos += len;
    }

    (left, right)
}

/// Caret position: a block and a byte offset into its flattened text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DocumentPosition {
    pub block_index: usize,
    pub offset: usize,
}

impl DocumentPosition {
    pub fn new(block_index: usize, offset: usize) -> Self {
        DocumentPosition {
            block_index,
            offset,
        }
    }

    pub fn start() -> Self {
        DocumentPosition::new(0, 0)
    }
}

/// The structured document
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredDocument {
    blocks: Vec<Block>,
    next_id: ElementId,
}

impl StructuredDocument {
    pub fn new() -> Self {
        StructuredDocument {
            blocks: Vec::new(),
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> ElementId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Append `block`, assigning an id when it has none
    pub fn add_block(&mut self, mut block: Block) {
        if block.id == 0 {
            block.id = self.next_id();
        }
        self.blocks.push(block);
    }

    /// Insert `block` before `index` (clamped to the end)
    pub fn insert_block(&mut self, index: usize, mut block: Block) {
        if block.id == 0 {
            block.id = self.next_id();
        }
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, block);
    }

    pub fn remove_block(&mut self, index: usize) -> Option<Block> {
        (index < self.blocks.len()).then(|| self.blocks.remove(index))
    }

    /// Index of the last cell of the table holding block `index`, or `None`
    /// when that block is not a table cell. A cell at (0, 0) opens a new table.
    pub fn table_end(&self, index: usize) -> Option<usize> {
        if !self.blocks.get(index)?.block_type.is_table_cell() {
            return None;
        }
        let mut end = index;
        while let Some(next) = self.blocks.get(end + 1)
            && let BlockType::TableCell { row, column, .. } = next.block_type
            && (row, column) != (0, 0)
        {
            end += 1;
        }
        Some(end)
    }

    /// Whether blocks `a` and `b` may be joined into one. Table cells never
    /// merge with their neighbours.
    pub fn can_merge(&self, a: usize, b: usize) -> bool {
        let is_cell = |i: usize| self.blocks.get(i).is_some_and(|blk| blk.block_type.is_table_cell());
        !is_cell(a) && !is_cell(b)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Find block index by ID
    pub fn find_block_index(&self, id: ElementId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Position after the last character of the document
    pub fn end_position(&self) -> DocumentPosition {
        match self.blocks.last() {
            Some(block) => DocumentPosition::new(self.blocks.len() - 1, block.text_len()),
            None => DocumentPosition::start(),
        }
    }

    /// Validate and clamp a position to document bounds and grapheme boundaries
    pub fn clamp_position(&self, pos: DocumentPosition) -> DocumentPosition {
        if self.blocks.is_empty() {
            return DocumentPosition::start();
        }

        let block_index = pos.block_index.min(self.blocks.len() - 1);
        let text = self.blocks[block_index].to_plain_text();
        DocumentPosition::new(block_index, grapheme_offset_at_or_before(&text, pos.offset))
    }

    /// Get the previous grapheme position within the same block.
    pub fn previous_grapheme_position(&self, pos: DocumentPosition) -> DocumentPosition {
        let offset = self
            .blocks
            .get(pos.block_index)
            .map(|block| grapheme_offset_before(&block.to_plain_text(), pos.offset))
            .unwrap_or(0);
        DocumentPosition::new(pos.block_index, offset)
    }

    /// Get the next grapheme position within the same block.
    pub fn next_grapheme_position(&self, pos: DocumentPosition) -> DocumentPosition {
        let offset = self
            .blocks
            .get(pos.block_index)
            .map(|block| grapheme_offset_after(&block.to_plain_text(), pos.offset))
            .unwrap_or(0);
        DocumentPosition::new(pos.block_index, offset)
    }

    /// Flattened text, blocks separated by blank lines
    pub fn to_plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.to_plain_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Number of user-perceived characters; atomic items count as one
    pub fn grapheme_count(&self) -> usize {
        self.blocks
            .iter()
            .map(|b| b.to_plain_text().graphemes(true).count())
            .sum()
    }

    /// No blocks at all; editors always keep at least one
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn with_paragraph(text: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.add_block(Block::paragraph(0).with_plain_text(text));
        doc
    }

    /// Delete `[start, end)`. A range spanning blocks joins what is left of
    /// the first and last block and drops the blocks in between.
    pub fn delete_range(&mut self, start: DocumentPosition, end: DocumentPosition) {
        if self.blocks.is_empty() {
            return;
        }
        let a = self.clamp_position(start.min(end));
        let b = self.clamp_position(start.max(end));
        if a.block_index == b.block_index {
            self.blocks[a.block_index].delete_text_range(a.offset, b.offset);
            return;
        }

        let tail = self.blocks[b.block_index].split_content_at(b.offset);
        self.blocks.drain(a.block_index + 1..=b.block_index);
        let first = &mut self.blocks[a.block_index];
        first.delete_text_range(a.offset, usize::MAX);
        first.content.extend(tail);
        first.normalize_content();
    }

    /// Replace `[start, end)` with plain text. Every line after the first
    /// becomes a new paragraph and the text after `end` follows the last line.
    /// Returns the position just past the inserted text.
    pub fn replace_range(
        &mut self,
        start: DocumentPosition,
        end: DocumentPosition,
        text: &str,
    ) -> DocumentPosition {
        if self.blocks.is_empty() {
            let id = self.next_id();
            self.blocks.push(Block::paragraph(id));
        }
        let from = self.clamp_position(start.min(end));
        self.delete_range(start, end);
        let at = DocumentPosition::new(
            from.block_index,
            from.offset.min(self.blocks[from.block_index].text_len()),
        );

        let normalized = normalize_plain_text(text);
        if normalized.is_empty() {
            return at;
        }

        let tail = self.blocks[at.block_index].split_content_at(at.offset);
        let mut lines = normalized.split('\n');
        let first = lines.next().unwrap_or_default();
        self.blocks[at.block_index]
            .content
            .push(InlineContent::Text(TextRun::plain(first)));
        self.blocks[at.block_index].normalize_content();

        let mut caret = DocumentPosition::new(at.block_index, at.offset + first.len());
        for line in lines {
            caret = DocumentPosition::new(caret.block_index + 1, line.len());
            let mut block = Block::paragraph(0).with_plain_text(line);
            block.normalize_content();
            self.insert_block(caret.block_index, block);
        }

        let last = &mut self.blocks[caret.block_index];
        last.content.extend(tail);
        last.normalize_content();
        caret
    }
}

impl Default for StructuredDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Paragraph => f.write_str("Paragraph"),
            BlockType::Heading { level } => write!(f, "Heading(h{level})"),
            BlockType::CodeBlock { language } => write!(f, "CodeBlock({language:?})"),
            BlockType::BlockQuote => f.write_str("BlockQuote"),
            BlockType::ListItem { ordered, checkbox } => {
                f.write_str(if *ordered { "ListItem(ordered" } else { "ListItem(unordered" })?;
                match checkbox {
                    Some(true) => f.write_str(", checked")?,
                    Some(false) => f.write_str(", unchecked")?,
                    None => {}
                }
                f.write_str(")")
            }
            BlockType::TableCell {
                row,
                column,
                header,
            } => {
                write!(f, "TableCell({row},{column}")?;
                if *header {
                    f.write_str(", header")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Debug listing, one line per block
impl fmt::Display for StructuredDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "StructuredDocument ({} blocks):", self.blocks.len())?;
        self.blocks.iter().enumerate().try_for_each(|(i, block)| {
            writeln!(f, "  [{i}] {}: {:?}", block.block_type, block.to_display_text())
        })
    }
}

fn grapheme_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries: Vec<usize> = text.grapheme_indices(true).map(|(idx, _)| idx).collect();
    if boundaries.first() != Some(&0) {
        boundaries.insert(0, 0);
    }
    if boundaries.last() != Some(&text.len()) {
        boundaries.push(text.len());
    }
    boundaries
}

pub(crate) fn grapheme_offset_at_or_before(text: &str, offset: usize) -> usize {
    let max_offset = offset.min(text.len());
    grapheme_boundaries(text)
        .into_iter()
        .take_while(|boundary| *boundary <= max_offset)
        .last()
        .unwrap_or(0)
}

fn grapheme_offset_before(text: &str, offset: usize) -> usize {
    let max_offset = offset.min(text.len());
    grapheme_boundaries(text)
        .into_iter()
        .take_while(|boundary| *boundary < max_offset)
        .last()
        .unwrap_or(0)
}

fn grapheme_offset_after(text: &str, offset: usize) -> usize {
    let max_offset = offset.min(text.len());
    grapheme_boundaries(text)
        .into_iter()
        .find(|boundary| *boundary > max_offset)
        .unwrap_or(text.len())
}

/// CRLF and lone CR line endings become `\n`
pub(crate) fn normalize_plain_text(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(name: &str) -> InlineContent {
        InlineContent::Mention(Mention {
            user_id: format!("id-{}", name),
            display_name: name.to_string(),
        })
    }

    #[test]
    fn test_text_run() {
        let run = TextRun::plain("hello world");
        assert_eq!(run.len(), 11);

        let (left, right) = run.split_at(5);
        assert_eq!(left.text, "hello");
        assert_eq!(right.text, " world");
    }

    #[test]
    fn test_block_text_len() {
        let block = Block::paragraph(1)
            .with_plain_text("hello")
            .with_text(" world", TextStyle::bold());

        assert_eq!(block.text_len(), 11);
        assert_eq!(block.to_plain_text(), "hello world");
    }

    #[test]
    fn test_mention_is_one_object_character() {
        let mut block = Block::paragraph(1).with_plain_text("hi ");
        block.content.push(mention("Jane"));

        assert_eq!(block.to_plain_text(), "hi \u{FFFC}");
        assert_eq!(block.to_display_text(), "hi @Jane");
        assert_eq!(block.text_len(), 3 + OBJECT_REPLACEMENT.len_utf8());
    }

    #[test]
    fn test_delete_range_removes_atomic_item_whole() {
        let mut block = Block::paragraph(1).with_plain_text("a");
        block.content.push(mention("Jane"));
        block.content.push(InlineContent::Text(TextRun::plain("b")));

        // Deleting a single byte inside the token takes the whole token
        block.delete_text_range(2, 3);
        assert_eq!(block.to_plain_text(), "ab");
        assert_eq!(block.content.len(), 1);
    }

    #[test]
    fn test_split_never_cuts_atomic_item() {
        let mut block = Block::paragraph(1).with_plain_text("a");
        block.content.push(mention("Jane"));
        let right = block.split_content_at(2);
        assert_eq!(block.to_plain_text(), "a\u{FFFC}");
        assert!(right.is_empty());
    }

    #[test]
    fn test_normalize_merges_equal_runs() {
        let mut block = Block::paragraph(1)
            .with_plain_text("ab")
            .with_plain_text("")
            .with_plain_text("cd")
            .with_text("ef", TextStyle::bold());
        block.normalize_content();
        assert_eq!(block.content.len(), 2);
        assert_eq!(block.content[0], InlineContent::Text(TextRun::plain("abcd")));
    }

    #[test]
    fn test_position_clamping() {
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::paragraph(0).with_plain_text("hello"));

        let pos = DocumentPosition::new(0, 100);
        let clamped = doc.clamp_position(pos);
        assert_eq!(clamped.offset, 5); // Length of "hello"
    }

    #[test]
    fn test_position_clamping_respects_graphemes() {
        let doc = StructuredDocument::with_paragraph("e\u{301}x");
        // Offset 1 falls between the base letter and its combining accent
        assert_eq!(doc.clamp_position(DocumentPosition::new(0, 1)).offset, 0);
        assert_eq!(
            doc.next_grapheme_position(DocumentPosition::new(0, 0)).offset,
            3
        );
        assert_eq!(
            doc.previous_grapheme_position(DocumentPosition::new(0, 3)).offset,
            0
        );
    }

    #[test]
    fn test_delete_range_within_block() {
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::paragraph(0).with_plain_text("Hello world"));
        let start = DocumentPosition::new(0, 5);
        let end = DocumentPosition::new(0, 11);
        doc.delete_range(start, end);
        assert_eq!(doc.blocks()[0].to_plain_text(), "Hello");
    }

    #[test]
    fn test_delete_range_across_blocks_merges() {
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::paragraph(0).with_plain_text("First para"));
        doc.add_block(Block::paragraph(0).with_plain_text("Second"));
        doc.add_block(Block::paragraph(0).with_plain_text("Third para"));

        let start = DocumentPosition::new(0, 3); // "Fir|st para"
        let end = DocumentPosition::new(2, 2); // "Th|ird para"
        doc.delete_range(start, end);

        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.blocks()[0].to_plain_text(), "Firird para");
    }

    #[test]
    fn test_replace_range_across_blocks_with_lines() {
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::paragraph(0).with_plain_text("Hello one"));
        doc.add_block(Block::paragraph(0).with_plain_text("Hello two"));
        doc.add_block(Block::paragraph(0).with_plain_text("Hello three"));

        let start = DocumentPosition::new(0, 6); // at "Hello |one"
        let end = DocumentPosition::new(2, 5); // at "Hello |three"
        let after = doc.replace_range(start, end, "X\nY");

        assert_eq!(doc.blocks()[0].to_plain_text(), "Hello X");
        assert_eq!(doc.blocks()[1].to_plain_text(), "Y three");
        assert_eq!(after, DocumentPosition::new(1, 1));
    }

    #[test]
    fn test_replace_range_normalizes_crlf() {
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::paragraph(0).with_plain_text("Base"));

        let start = DocumentPosition::new(0, 0);
        doc.replace_range(start, start, "Line 1\r\nLine 2\r\nLine 3");

        assert_eq!(doc.block_count(), 3);
        assert_eq!(doc.blocks()[0].to_plain_text(), "Line 1");
        assert_eq!(doc.blocks()[1].to_plain_text(), "Line 2");
        assert_eq!(doc.blocks()[2].to_plain_text(), "Line 3Base");
    }

    #[test]
    fn test_display_lists_blocks() {
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::heading(0, 2).with_plain_text("Title"));
        doc.add_block(Block::new(
            0,
            BlockType::ListItem {
                ordered: false,
                checkbox: Some(true),
            },
        ));
        let rendered = doc.to_string();
        assert!(rendered.contains("[0] Heading(h2): \"Title\""));
        assert!(rendered.contains("[1] ListItem(unordered, checked)"));
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            BlockType::Heading { level: 1 }.placeholder().as_deref(),
            Some("Heading 1")
        );
        assert_eq!(BlockType::Paragraph.placeholder(), None);
    }

    #[test]
    fn test_table_end_stops_at_next_table() {
        let cell = |row, column| {
            Block::new(
                0,
                BlockType::TableCell {
                    row,
                    column,
                    header: false,
                },
            )
        };
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::paragraph(0).with_plain_text("before"));
        doc.add_block(cell(0, 0));
        doc.add_block(cell(0, 1));
        doc.add_block(cell(1, 0));
        doc.add_block(cell(0, 0));
        doc.add_block(Block::paragraph(0));

        assert_eq!(doc.table_end(0), None);
        assert_eq!(doc.table_end(1), Some(3));
        assert_eq!(doc.table_end(3), Some(3));
        assert_eq!(doc.table_end(4), Some(4));
        assert!(!doc.can_merge(3, 4));
        assert!(!doc.can_merge(4, 5));
        assert!(doc.can_merge(0, 5));
    }
}
