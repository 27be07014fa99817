// Formatting commands
// Typed commands applied to the editor's current selection, the classic
// command-name mapping, and the formatting state the toolbar reflects.

use super::structured_document::*;
use super::structured_editor::{EditError, EditResult, StructuredEditor};
use std::fmt;

/// Block formats reachable through `formatBlock`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFormat {
    Paragraph,
    Heading(u8),
    BlockQuote,
    CodeBlock,
}

impl BlockFormat {
    /// Parse a `formatBlock` value such as `h2`, `<p>` or `blockquote`
    pub fn from_tag(value: &str) -> Option<Self> {
        let tag = value
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .to_ascii_lowercase();
        match tag.as_str() {
            "p" | "div" => Some(BlockFormat::Paragraph),
            "blockquote" => Some(BlockFormat::BlockQuote),
            "pre" => Some(BlockFormat::CodeBlock),
            _ => {
                let level = tag.strip_prefix('h')?.parse::<u8>().ok()?;
                (1..=6).contains(&level).then_some(BlockFormat::Heading(level))
            }
        }
    }

    pub fn tag(self) -> String {
        match self {
            BlockFormat::Paragraph => "p".to_string(),
            BlockFormat::Heading(level) => format!("h{}", level),
            BlockFormat::BlockQuote => "blockquote".to_string(),
            BlockFormat::CodeBlock => "pre".to_string(),
        }
    }

    pub fn block_type(self) -> BlockType {
        match self {
            BlockFormat::Paragraph => BlockType::Paragraph,
            BlockFormat::Heading(level) => BlockType::Heading { level },
            BlockFormat::BlockQuote => BlockType::BlockQuote,
            BlockFormat::CodeBlock => BlockType::CodeBlock { language: None },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Highlight,
    FormatBlock(BlockFormat),
    InsertUnorderedList,
    InsertOrderedList,
    CreateLink(String),
    Unlink,
    InsertImage(String),
    InsertTable,
    RemoveFormat,
    Undo,
    Redo,
}

impl Command {
    /// Map a classic command name (and its value, where one is needed).
    /// Names are matched case-insensitively.
    pub fn from_name(name: &str, value: Option<&str>) -> Result<Command, EditError> {
        let required = |name: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim().to_string())
                .ok_or_else(|| EditError::MissingCommandValue(name.to_string()))
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "bold" => Command::Bold,
            "italic" => Command::Italic,
            "underline" => Command::Underline,
            "strikethrough" => Command::Strikethrough,
            "code" => Command::Code,
            "hilitecolor" | "highlight" => Command::Highlight,
            "formatblock" => {
                let value = required(name)?;
                let format = BlockFormat::from_tag(&value)
                    .ok_or_else(|| EditError::UnknownCommand(format!("{} {}", name, value)))?;
                Command::FormatBlock(format)
            }
            "insertunorderedlist" => Command::InsertUnorderedList,
            "insertorderedlist" => Command::InsertOrderedList,
            "createlink" => Command::CreateLink(required(name)?),
            "unlink" => Command::Unlink,
            "insertimage" => Command::InsertImage(required(name)?),
            "inserttable" => Command::InsertTable,
            "removeformat" => Command::RemoveFormat,
            "undo" => Command::Undo,
            "redo" => Command::Redo,
            _ => return Err(EditError::UnknownCommand(name.to_string())),
        };
        Ok(command)
    }

    /// Classic name of this command
    pub fn name(&self) -> &'static str {
        match self {
            Command::Bold => "bold",
            Command::Italic => "italic",
            Command::Underline => "underline",
            Command::Strikethrough => "strikeThrough",
            Command::Code => "code",
            Command::Highlight => "hiliteColor",
            Command::FormatBlock(_) => "formatBlock",
            Command::InsertUnorderedList => "insertUnorderedList",
            Command::InsertOrderedList => "insertOrderedList",
            Command::CreateLink(_) => "createLink",
            Command::Unlink => "unlink",
            Command::InsertImage(_) => "insertImage",
            Command::InsertTable => "insertTable",
            Command::RemoveFormat => "removeFormat",
            Command::Undo => "undo",
            Command::Redo => "redo",
        }
    }

    /// Whether the command changes the document
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Command::Undo | Command::Redo)
    }

    /// Apply an editing command to the editor's selection or caret.
    /// History and table commands are carried out by the editor surface.
    pub fn apply(&self, editor: &mut StructuredEditor) -> EditResult {
        match self {
            Command::Bold => editor.toggle_bold(),
            Command::Italic => editor.toggle_italic(),
            Command::Underline => editor.toggle_underline(),
            Command::Strikethrough => editor.toggle_strikethrough(),
            Command::Code => editor.toggle_code(),
            Command::Highlight => editor.toggle_highlight(),
            Command::FormatBlock(format) => editor.set_block_type(format.block_type()),
            Command::InsertUnorderedList => editor.toggle_list(false),
            Command::InsertOrderedList => editor.toggle_list(true),
            Command::CreateLink(url) => editor.create_link(url),
            Command::Unlink => editor.unlink(),
            Command::InsertImage(src) => editor.insert_inline_at_cursor(InlineContent::Image(Image {
                src: src.clone(),
                alt: String::new(),
            })),
            Command::RemoveFormat => editor.clear_formatting(),
            Command::InsertTable | Command::Undo | Command::Redo => Ok(()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::FormatBlock(format) => write!(f, "{} {}", self.name(), format.tag()),
            Command::CreateLink(value) | Command::InsertImage(value) => {
                write!(f, "{} {}", self.name(), value)
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Formatting at the caret (or common to the selection), for toolbar state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatState {
    pub style: TextStyle,
    pub block_type: Option<BlockType>,
    pub in_link: bool,
}

impl FormatState {
    pub fn of(editor: &StructuredEditor) -> Self {
        FormatState {
            style: editor.common_style(),
            block_type: editor
                .document()
                .block(editor.cursor().block_index)
                .map(|b| b.block_type.clone()),
            in_link: editor.link_at_cursor().is_some(),
        }
    }

    /// Whether a toolbar button for `command` should show as pressed
    pub fn is_active(&self, command: &Command) -> bool {
        match command {
            Command::Bold => self.style.bold,
            Command::Italic => self.style.italic,
            Command::Underline => self.style.underline,
            Command::Strikethrough => self.style.strikethrough,
            Command::Code => self.style.code,
            Command::Highlight => self.style.highlight,
            Command::FormatBlock(format) => self.block_type.as_ref() == Some(&format.block_type()),
            Command::InsertUnorderedList => matches!(
                self.block_type,
                Some(BlockType::ListItem {
                    ordered: false,
                    checkbox: None
                })
            ),
            Command::InsertOrderedList => matches!(
                self.block_type,
                Some(BlockType::ListItem { ordered: true, .. })
            ),
            Command::CreateLink(_) | Command::Unlink => self.in_link,
            _ => false,
        }
    }
}
