// Common content access traits so the engine and its editors can be driven
// interchangeably by embedders that only deal in markup strings.

use crate::richtext::html_converter::{document_to_html, html_to_document};
use crate::richtext::markdown_converter::markdown_to_document;
use crate::richtext::structured_document::StructuredDocument;
use crate::richtext::structured_editor::StructuredEditor;

/// Who owns the authoritative copy of the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentMode {
    /// The embedder supplies the value; the engine mirrors it
    Controlled,
    /// The engine owns the content, seeded once at construction
    #[default]
    Uncontrolled,
}

/// Provides read access to the current content as markup.
///
/// Implementations return the canonical serialization, so equal documents
/// always produce equal strings.
pub trait ContentProvider {
    fn get_content(&self) -> String;
}

impl ContentProvider for StructuredDocument {
    fn get_content(&self) -> String {
        document_to_html(self)
    }
}

impl ContentProvider for StructuredEditor {
    fn get_content(&self) -> String {
        self.document().get_content()
    }
}

/// Replaces the whole content of an editor
pub trait ContentLoader {
    fn load_document(&mut self, document: StructuredDocument);

    fn set_content_from_markup(&mut self, markup: &str) {
        self.load_document(html_to_document(markup));
    }

    fn set_content_from_markdown(&mut self, markdown: &str) {
        self.load_document(markdown_to_document(markdown));
    }
}

impl ContentLoader for StructuredEditor {
    /// Swap in `document`, keeping the caret where it was if it still fits
    fn load_document(&mut self, document: StructuredDocument) {
        let caret = self.cursor();
        *self = StructuredEditor::with_document(document);
        self.set_cursor(caret);
    }
}
