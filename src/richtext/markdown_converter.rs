// Markdown Converter
// Converts pasted Markdown text into StructuredDocument blocks.
// Markdown is only an input format here; the document is never written back as Markdown.

use super::structured_document::*;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Convert markdown text to a StructuredDocument
pub fn markdown_to_document(markdown: &str) -> StructuredDocument {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = MarkdownBuilder::default();
    for event in Parser::new_ext(markdown, options) {
        builder.event(event);
    }
    builder.finish_block();
    builder.doc
}

#[derive(Default)]
struct MarkdownBuilder {
    doc: StructuredDocument,
    current: Option<Block>,
    style_stack: Vec<TextStyle>,
    /// Block type new paragraphs take inside list items and quotes
    containers: Vec<BlockType>,
    lists: Vec<bool>,
    link: Option<(Link, Vec<InlineContent>)>,
    image: Option<Image>,
    in_code: bool,
    table_row: usize,
    table_column: usize,
    table_head: bool,
}

impl MarkdownBuilder {
    fn style(&self) -> TextStyle {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, apply: impl FnOnce(&mut TextStyle)) {
        let mut style = self.style();
        apply(&mut style);
        self.style_stack.push(style);
    }

    fn event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag_end) => self.end(tag_end),
            Event::Text(text) => {
                if let Some(image) = self.image.as_mut() {
                    image.alt.push_str(&text);
                } else if self.in_code {
                    self.push_inline(InlineContent::Text(TextRun::plain(text.to_string())));
                } else {
                    let style = self.style();
                    self.push_inline(InlineContent::Text(TextRun::new(text.to_string(), style)));
                }
            }
            Event::Code(code) => {
                let mut style = self.style();
                style.code = true;
                self.push_inline(InlineContent::Text(TextRun::new(code.to_string(), style)));
            }
            Event::SoftBreak => {
                let style = self.style();
                self.push_inline(InlineContent::Text(TextRun::new(" ", style)));
            }
            Event::HardBreak => self.push_inline(InlineContent::HardBreak),
            Event::TaskListMarker(checked) => {
                if let Some(block) = self.current.as_mut()
                    && let BlockType::ListItem { checkbox, .. } = &mut block.block_type
                {
                    *checkbox = Some(checked);
                }
            }
            // Raw HTML, rules, footnotes and math are not carried over
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => {
                if self.current.is_none() {
                    let block_type = self
                        .containers
                        .last()
                        .cloned()
                        .unwrap_or(BlockType::Paragraph);
                    self.start_block(block_type);
                }
            }
            Tag::Heading { level, .. } => self.start_block(BlockType::Heading {
                level: level as u8,
            }),
            Tag::BlockQuote(_) => {
                self.finish_block();
                self.containers.push(BlockType::BlockQuote);
            }
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Indented => None,
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(String::from),
                };
                self.start_block(BlockType::CodeBlock { language });
                self.in_code = true;
            }
            Tag::List(start_number) => {
                self.finish_block();
                self.lists.push(start_number.is_some());
            }
            Tag::Item => {
                let item = BlockType::ListItem {
                    ordered: self.lists.last().copied().unwrap_or(false),
                    checkbox: None,
                };
                self.start_block(item.clone());
                self.containers.push(item);
            }
            Tag::Table(_) => {
                self.finish_block();
                self.table_row = 0;
            }
            Tag::TableHead => {
                self.table_head = true;
                self.table_column = 0;
            }
            Tag::TableRow => self.table_column = 0,
            Tag::TableCell => {
                self.start_block(BlockType::TableCell {
                    row: self.table_row,
                    column: self.table_column,
                    header: self.table_head,
                });
                self.table_column += 1;
            }
            Tag::Emphasis => self.push_style(|s| s.italic = true),
            Tag::Strong => self.push_style(|s| s.bold = true),
            Tag::Strikethrough => self.push_style(|s| s.strikethrough = true),
            Tag::Link {
                dest_url, title, ..
            } => {
                self.link = Some((
                    Link {
                        destination: dest_url.to_string(),
                        title: if title.is_empty() {
                            None
                        } else {
                            Some(title.to_string())
                        },
                    },
                    Vec::new(),
                ));
            }
            Tag::Image { dest_url, .. } => {
                self.image = Some(Image {
                    src: dest_url.to_string(),
                    alt: String::new(),
                });
            }
            _ => {}
        }
    }

    fn end(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::TableCell => self.finish_block(),
            TagEnd::CodeBlock => {
                // Fenced code ends with a newline that is not part of the content
                if let Some(block) = self.current.as_mut()
                    && let Some(InlineContent::Text(run)) = block.content.last_mut()
                    && run.text.ends_with('\n')
                {
                    run.text.pop();
                }
                self.in_code = false;
                self.finish_block();
            }
            TagEnd::BlockQuote(_) | TagEnd::Item => {
                self.finish_block();
                self.containers.pop();
            }
            TagEnd::List(_) => {
                self.finish_block();
                self.lists.pop();
            }
            TagEnd::TableHead => {
                self.table_head = false;
                self.table_row += 1;
            }
            TagEnd::TableRow => self.table_row += 1,
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.style_stack.pop();
            }
            TagEnd::Link => {
                if let Some((link, content)) = self.link.take()
                    && !content.is_empty()
                {
                    self.push_inline(InlineContent::Link { link, content });
                }
            }
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    self.push_inline(InlineContent::Image(image));
                }
            }
            _ => {}
        }
    }

    fn push_inline(&mut self, item: InlineContent) {
        if let Some((_, content)) = self.link.as_mut() {
            content.push(item);
            return;
        }
        let block_type = self
            .containers
            .last()
            .cloned()
            .unwrap_or(BlockType::Paragraph);
        self.current
            .get_or_insert_with(|| Block::new(0, block_type))
            .content
            .push(item);
    }

    fn start_block(&mut self, block_type: BlockType) {
        self.finish_block();
        self.current = Some(Block::new(0, block_type));
    }

    fn finish_block(&mut self) {
        if let Some(mut block) = self.current.take() {
            block.normalize_content();
            self.doc.add_block(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(doc: &StructuredDocument) -> Vec<BlockType> {
        doc.blocks().iter().map(|b| b.block_type.clone()).collect()
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let doc = markdown_to_document("# Title\n\nSome *soft*\nwrapped **text**");
        assert_eq!(
            types(&doc),
            vec![BlockType::Heading { level: 1 }, BlockType::Paragraph]
        );
        let para = &doc.blocks()[1];
        assert_eq!(para.to_plain_text(), "Some soft wrapped text");
        assert_eq!(
            para.content[1],
            InlineContent::Text(TextRun::new("soft", TextStyle::italic()))
        );
    }

    #[test]
    fn test_lists_and_tasks() {
        let doc = markdown_to_document("- a\n- b\n\n1. one\n\n- [x] done\n- [ ] open");
        assert_eq!(
            types(&doc),
            vec![
                BlockType::ListItem { ordered: false, checkbox: None },
                BlockType::ListItem { ordered: false, checkbox: None },
                BlockType::ListItem { ordered: true, checkbox: None },
                BlockType::ListItem { ordered: false, checkbox: Some(true) },
                BlockType::ListItem { ordered: false, checkbox: Some(false) },
            ]
        );
        assert_eq!(doc.blocks()[4].to_plain_text(), "open");
    }

    #[test]
    fn test_code_block_and_quote() {
        let doc = markdown_to_document("```rust\nlet x = 1;\n```\n\n> quoted");
        assert_eq!(
            types(&doc),
            vec![
                BlockType::CodeBlock {
                    language: Some("rust".to_string())
                },
                BlockType::BlockQuote
            ]
        );
        assert_eq!(doc.blocks()[0].to_plain_text(), "let x = 1;");
        assert_eq!(doc.blocks()[1].to_plain_text(), "quoted");
    }

    #[test]
    fn test_links_code_and_images() {
        let doc = markdown_to_document("See [docs](https://docs.rs) and `cargo` ![logo](l.png)");
        let block = &doc.blocks()[0];
        assert!(matches!(
            &block.content[1],
            InlineContent::Link { link, .. } if link.destination == "https://docs.rs"
        ));
        assert!(block.content.iter().any(|c| matches!(
            c,
            InlineContent::Text(run) if run.style.code && run.text == "cargo"
        )));
        assert_eq!(
            block.content.last(),
            Some(&InlineContent::Image(Image {
                src: "l.png".to_string(),
                alt: "logo".to_string()
            }))
        );
    }

    #[test]
    fn test_table() {
        let doc = markdown_to_document("| A | B |\n|---|---|\n| 1 | 2 |");
        assert_eq!(doc.block_count(), 4);
        assert_eq!(
            doc.blocks()[0].block_type,
            BlockType::TableCell {
                row: 0,
                column: 0,
                header: true
            }
        );
        assert_eq!(
            doc.blocks()[3].block_type,
            BlockType::TableCell {
                row: 1,
                column: 1,
                header: false
            }
        );
        assert_eq!(doc.blocks()[3].to_plain_text(), "2");
    }
}
