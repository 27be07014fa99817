// HTML Converter
// Converts between StructuredDocument and the markup exchanged with the embedder.
// The writer produces one canonical form; the reader accepts common variants
// and normalizes them, so write -> read -> write is stable.

use super::html_parser::{HtmlToken, escape_attr, escape_text, parse_html};
use super::structured_document::*;

/// Convert a StructuredDocument to markup
pub fn document_to_html(doc: &StructuredDocument) -> String {
    let blocks = doc.blocks();

    // A lone empty paragraph is the blank document
    if blocks.len() == 1 && blocks[0].block_type == BlockType::Paragraph && blocks[0].is_empty() {
        return String::new();
    }

    let mut output = String::new();
    let mut open_list: Option<bool> = None;
    let mut table_row: Option<usize> = None;

    for block in blocks {
        // Close containers the block does not continue
        let list_kind = match &block.block_type {
            BlockType::ListItem {
                ordered,
                checkbox: None,
            } => Some(*ordered),
            _ => None,
        };
        if open_list.is_some() && open_list != list_kind {
            output.push_str(if open_list == Some(true) { "</ol>" } else { "</ul>" });
            open_list = None;
        }
        let starts_new_table = match &block.block_type {
            BlockType::TableCell { row, column, .. } => {
                table_row.is_none() || (*row == 0 && *column == 0)
            }
            _ => true,
        };
        if starts_new_table && table_row.is_some() {
            output.push_str("</tr></table>");
            table_row = None;
        }

        let content = block.normalized_content();
        match &block.block_type {
            BlockType::Paragraph => {
                output.push_str("<p>");
                write_inline(&mut output, &content);
                output.push_str("</p>");
            }
            BlockType::Heading { level } => {
                output.push_str(&format!("<h{}>", level));
                write_inline(&mut output, &content);
                output.push_str(&format!("</h{}>", level));
            }
            BlockType::CodeBlock { language } => {
                match language {
                    Some(lang) => {
                        output.push_str(&format!("<pre><code class=\"language-{}\">", escape_attr(lang)))
                    }
                    None => output.push_str("<pre><code>"),
                }
                write_code(&mut output, &content);
                output.push_str("</code></pre>");
            }
            BlockType::BlockQuote => {
                output.push_str("<blockquote>");
                write_inline(&mut output, &content);
                output.push_str("</blockquote>");
            }
            BlockType::ListItem {
                checkbox: Some(checked),
                ..
            } => {
                output.push_str("<div class=\"todo-item\"><input type=\"checkbox\"");
                if *checked {
                    output.push_str(" checked");
                }
                output.push_str("><span>");
                write_inline(&mut output, &content);
                output.push_str("</span></div>");
            }
            BlockType::ListItem { ordered, .. } => {
                if open_list.is_none() {
                    output.push_str(if *ordered { "<ol>" } else { "<ul>" });
                    open_list = Some(*ordered);
                }
                output.push_str("<li>");
                write_inline(&mut output, &content);
                output.push_str("</li>");
            }
            BlockType::TableCell { row, header, .. } => {
                match table_row {
                    None => output.push_str("<table><tr>"),
                    Some(current) if current != *row => output.push_str("</tr><tr>"),
                    Some(_) => {}
                }
                table_row = Some(*row);
                let tag = if *header { "th" } else { "td" };
                output.push_str(&format!("<{}>", tag));
                write_inline(&mut output, &content);
                output.push_str(&format!("</{}>", tag));
            }
        }
    }

    if let Some(ordered) = open_list {
        output.push_str(if ordered { "</ol>" } else { "</ul>" });
    }
    if table_row.is_some() {
        output.push_str("</tr></table>");
    }

    output
}

/// Write inline content; styles nest as b > i > u > s > mark > code
fn write_inline(output: &mut String, content: &[InlineContent]) {
    for item in content {
        match item {
            InlineContent::Text(run) => {
                let tags: Vec<&str> = [
                    (run.style.bold, "b"),
                    (run.style.italic, "i"),
                    (run.style.underline, "u"),
                    (run.style.strikethrough, "s"),
                    (run.style.highlight, "mark"),
                    (run.style.code, "code"),
                ]
                .into_iter()
                .filter_map(|(on, tag)| on.then_some(tag))
                .collect();

                for tag in &tags {
                    output.push_str(&format!("<{}>", tag));
                }
                output.push_str(&escape_text(&run.text));
                for tag in tags.iter().rev() {
                    output.push_str(&format!("</{}>", tag));
                }
            }
            InlineContent::Link { link, content } => {
                output.push_str(&format!("<a href=\"{}\"", escape_attr(&link.destination)));
                if let Some(title) = &link.title {
                    output.push_str(&format!(" title=\"{}\"", escape_attr(title)));
                }
                output.push('>');
                write_inline(output, content);
                output.push_str("</a>");
            }
            InlineContent::Mention(mention) => {
                output.push_str(&format!(
                    "<span class=\"mention\" contenteditable=\"false\" data-user-id=\"{}\">@{}</span>",
                    escape_attr(&mention.user_id),
                    escape_text(&mention.display_name)
                ));
            }
            InlineContent::Image(image) => {
                output.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\">",
                    escape_attr(&image.src),
                    escape_attr(&image.alt)
                ));
            }
            InlineContent::HardBreak => output.push_str("<br>"),
        }
    }
}

/// Code blocks keep their text verbatim; inline styles are not written
fn write_code(output: &mut String, content: &[InlineContent]) {
    for item in content {
        match item {
            InlineContent::Text(run) => output.push_str(&escape_text(&run.text)),
            InlineContent::Link { content, .. } => write_code(output, content),
            InlineContent::HardBreak => output.push('\n'),
            other => write_inline(output, std::slice::from_ref(other)),
        }
    }
}

/// Convert markup to a StructuredDocument
pub fn html_to_document(html: &str) -> StructuredDocument {
    let mut builder = DocumentBuilder::default();
    for token in parse_html(html) {
        builder.token(token);
    }
    builder.finish()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum InlineTag {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Highlight,
    Code,
}

impl InlineTag {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "b" | "strong" => Some(InlineTag::Bold),
            "i" | "em" => Some(InlineTag::Italic),
            "u" | "ins" => Some(InlineTag::Underline),
            "s" | "strike" | "del" => Some(InlineTag::Strikethrough),
            "mark" => Some(InlineTag::Highlight),
            "code" => Some(InlineTag::Code),
            _ => None,
        }
    }
}

/// Containers whose nested paragraphs belong to the container's own block
#[derive(Debug, Clone, Copy, PartialEq)]
enum Container {
    ListItem,
    Quote,
    Cell,
    Todo,
    /// A plain `<div>`; remembers whether it opened a paragraph
    Div(bool),
}

#[derive(Default)]
struct DocumentBuilder {
    doc: StructuredDocument,
    current: Option<Block>,
    inline_tags: Vec<InlineTag>,
    link: Option<(Link, Vec<InlineContent>)>,
    lists: Vec<bool>,
    containers: Vec<Container>,
    mention: Option<(String, String)>,
    span_depth: Vec<bool>,
    in_pre: bool,
    table: Option<(Option<usize>, usize)>, // (row, next column)
}

impl DocumentBuilder {
    fn token(&mut self, token: HtmlToken) {
        match token {
            HtmlToken::Text(text) => self.text(text),
            HtmlToken::EndTag { name } => self.end_tag(&name),
            HtmlToken::StartTag {
                ref name,
                self_closing,
                ..
            } => {
                let name = name.clone();
                self.start_tag(&name, &token);
                if self_closing && !is_void(&name) {
                    self.end_tag(&name);
                }
            }
        }
    }

    fn in_container(&self) -> bool {
        self.containers
            .iter()
            .any(|c| !matches!(c, Container::Div(_)))
    }

    fn start_tag(&mut self, name: &str, token: &HtmlToken) {
        if let Some(tag) = InlineTag::from_name(name) {
            if tag == InlineTag::Code && self.in_pre {
                if let Some(lang) = token
                    .attr("class")
                    .and_then(|c| c.split_whitespace().find_map(|c| c.strip_prefix("language-")))
                    && let Some(block) = self.current.as_mut()
                {
                    block.block_type = BlockType::CodeBlock {
                        language: Some(lang.to_string()),
                    };
                }
                return;
            }
            self.inline_tags.push(tag);
            return;
        }

        match name {
            "p" => {
                if !self.in_container() {
                    self.start_block(BlockType::Paragraph);
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<u8>().unwrap_or(1);
                self.start_block(BlockType::Heading { level });
            }
            "pre" => {
                self.start_block(BlockType::CodeBlock { language: None });
                self.in_pre = true;
            }
            "blockquote" => {
                self.start_block(BlockType::BlockQuote);
                self.containers.push(Container::Quote);
            }
            "ul" | "ol" => {
                self.finish_block();
                self.lists.push(name == "ol");
            }
            "li" => {
                let ordered = self.lists.last().copied().unwrap_or(false);
                self.start_block(BlockType::ListItem {
                    ordered,
                    checkbox: None,
                });
                self.containers.push(Container::ListItem);
            }
            "div" => {
                if token.has_class("todo-item") {
                    self.start_block(BlockType::ListItem {
                        ordered: false,
                        checkbox: Some(false),
                    });
                    self.containers.push(Container::Todo);
                } else if self.in_container() {
                    self.containers.push(Container::Div(false));
                } else {
                    self.start_block(BlockType::Paragraph);
                    self.containers.push(Container::Div(true));
                }
            }
            "input" => {
                if token.attr("type") == Some("checkbox")
                    && let Some(block) = self.current.as_mut()
                    && let BlockType::ListItem { checkbox, .. } = &mut block.block_type
                {
                    *checkbox = Some(token.attr("checked").is_some());
                }
            }
            "table" => {
                self.finish_block();
                self.table = Some((None, 0));
            }
            "tr" => {
                self.finish_block();
                if let Some((row, column)) = self.table.as_mut() {
                    *row = Some(row.map_or(0, |r| r + 1));
                    *column = 0;
                }
            }
            "td" | "th" => {
                let (row, column) = match self.table.as_mut() {
                    Some((row, column)) => {
                        let row = *row.get_or_insert(0);
                        let cell = (row, *column);
                        *column += 1;
                        cell
                    }
                    None => (0, 0),
                };
                self.start_block(BlockType::TableCell {
                    row,
                    column,
                    header: name == "th",
                });
                self.containers.push(Container::Cell);
            }
            "br" => self.push_inline(InlineContent::HardBreak),
            "img" => self.push_inline(InlineContent::Image(Image {
                src: token.attr("src").unwrap_or_default().to_string(),
                alt: token.attr("alt").unwrap_or_default().to_string(),
            })),
            "a" => {
                self.close_link();
                self.link = Some((
                    Link {
                        destination: token.attr("href").unwrap_or_default().to_string(),
                        title: token.attr("title").map(str::to_string),
                    },
                    Vec::new(),
                ));
            }
            "span" => {
                let is_mention = token.has_class("mention") && self.mention.is_none();
                if is_mention {
                    let user_id = token.attr("data-user-id").unwrap_or_default().to_string();
                    self.mention = Some((user_id, String::new()));
                }
                self.span_depth.push(is_mention);
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, name: &str) {
        if let Some(tag) = InlineTag::from_name(name) {
            if tag == InlineTag::Code && self.in_pre {
                return;
            }
            if let Some(pos) = self.inline_tags.iter().rposition(|t| *t == tag) {
                self.inline_tags.remove(pos);
            }
            return;
        }

        match name {
            "p" => {
                if !self.in_container() {
                    self.finish_block();
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.finish_block(),
            "pre" => {
                self.finish_block();
                self.in_pre = false;
            }
            "blockquote" => self.close_container(Container::Quote),
            "li" => self.close_container(Container::ListItem),
            "td" | "th" => self.close_container(Container::Cell),
            "ul" | "ol" => {
                self.finish_block();
                self.lists.pop();
            }
            "div" => match self.containers.last().copied() {
                Some(Container::Todo) => self.close_container(Container::Todo),
                Some(Container::Div(opened)) => {
                    if opened {
                        self.finish_block();
                    }
                    self.containers.pop();
                }
                _ => {}
            },
            "table" => {
                self.finish_block();
                self.table = None;
            }
            "a" => self.close_link(),
            "span" => {
                if self.span_depth.pop() == Some(true)
                    && let Some((user_id, text)) = self.mention.take()
                {
                    let display_name = text.strip_prefix('@').unwrap_or(&text).to_string();
                    self.push_inline(InlineContent::Mention(Mention {
                        user_id,
                        display_name,
                    }));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: String) {
        if let Some((_, captured)) = self.mention.as_mut() {
            captured.push_str(&text);
            return;
        }

        if self.in_pre {
            self.push_inline(InlineContent::Text(TextRun::plain(normalize_plain_text(&text))));
            return;
        }

        // Formatting whitespace between block tags
        if self.current.is_none() && self.link.is_none() && text.trim().is_empty() {
            return;
        }

        let text = text.replace("\r\n", " ").replace(['\n', '\r'], " ");
        let mut style = TextStyle::default();
        for tag in &self.inline_tags {
            match tag {
                InlineTag::Bold => style.bold = true,
                InlineTag::Italic => style.italic = true,
                InlineTag::Underline => style.underline = true,
                InlineTag::Strikethrough => style.strikethrough = true,
                InlineTag::Highlight => style.highlight = true,
                InlineTag::Code => style.code = true,
            }
        }
        self.push_inline(InlineContent::Text(TextRun::new(text, style)));
    }

    fn push_inline(&mut self, item: InlineContent) {
        if let Some((_, content)) = self.link.as_mut() {
            content.push(item);
            return;
        }
        self.current
            .get_or_insert_with(|| Block::paragraph(0))
            .content
            .push(item);
    }

    fn close_link(&mut self) {
        if let Some((link, content)) = self.link.take()
            && !content.is_empty()
        {
            self.push_inline(InlineContent::Link { link, content });
        }
    }

    fn start_block(&mut self, block_type: BlockType) {
        self.finish_block();
        self.current = Some(Block::new(0, block_type));
    }

    fn finish_block(&mut self) {
        self.close_link();
        if let Some(mut block) = self.current.take() {
            block.normalize_content();
            self.doc.add_block(block);
        }
    }

    fn close_container(&mut self, container: Container) {
        self.finish_block();
        if let Some(pos) = self.containers.iter().rposition(|c| *c == container) {
            self.containers.truncate(pos);
        }
    }

    fn finish(mut self) -> StructuredDocument {
        self.finish_block();
        self.doc
    }
}

fn is_void(name: &str) -> bool {
    matches!(name, "br" | "img" | "input" | "hr" | "meta" | "link")
}
