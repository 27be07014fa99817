// Insertion Engine
// Replaces a typed trigger and its query with the element picked from the
// popup menu: a structural block or a mention token.

use super::popup_menu::{BlockKind, MentionUser};
use super::structured_document::*;
use super::structured_editor::{EditError, EditResult, StructuredEditor};
use super::trigger::TriggerState;

/// Delete the trigger character and query before the caret, then insert the
/// block for `kind` in their place. The caret ends at the start of the new
/// block (the first cell for tables).
pub fn insert_block(
    editor: &mut StructuredEditor,
    trigger: &TriggerState,
    kind: BlockKind,
) -> EditResult {
    let (block_index, start) = remove_trigger_text(editor, trigger)?;
    place_block(editor, block_index, start, kind);
    Ok(())
}

/// Delete the trigger character and query, insert a mention token for
/// `user` followed by a space, and put the caret after the space.
pub fn insert_mention(
    editor: &mut StructuredEditor,
    trigger: &TriggerState,
    user: &MentionUser,
) -> EditResult {
    let (block_index, start) = remove_trigger_text(editor, trigger)?;
    editor.set_cursor(DocumentPosition::new(block_index, start));
    editor.insert_inline_at_cursor(InlineContent::Mention(Mention {
        user_id: user.id.clone(),
        display_name: user.display_name.clone(),
    }))?;
    editor.insert_text(" ")
}

/// Insert the block for `kind` at the caret without a trigger
pub fn insert_block_at_caret(editor: &mut StructuredEditor, kind: BlockKind) -> EditResult {
    if editor.selection_range().is_some() {
        editor.delete_selection()?;
    }
    let caret = editor.cursor();
    if caret.block_index >= editor.document().block_count() {
        return Err(EditError::InvalidBlockIndex);
    }
    place_block(editor, caret.block_index, caret.offset, kind);
    Ok(())
}

/// Find the last trigger character between the start of the caret's block
/// and the caret, and delete it together with the query typed after it.
/// Returns the block index and the offset where the trigger stood.
fn remove_trigger_text(
    editor: &mut StructuredEditor,
    trigger: &TriggerState,
) -> Result<(usize, usize), EditError> {
    let lost = EditError::AnchorLost {
        trigger: trigger.kind.trigger_char(),
    };
    let caret = editor.cursor();
    if caret.block_index != trigger.anchor.block_index {
        return Err(lost);
    }
    let Some(block) = editor.document().block(caret.block_index) else {
        return Err(lost);
    };

    let text = block.to_plain_text();
    let before = &text[..caret.offset.min(text.len())];
    let Some(start) = before.rfind(trigger.kind.trigger_char()) else {
        return Err(lost);
    };

    editor.document_mut().blocks_mut()[caret.block_index].delete_text_range(start, caret.offset);
    editor.set_cursor(DocumentPosition::new(caret.block_index, start));
    Ok((caret.block_index, start))
}

/// Blocks making up the element for `kind`
fn blocks_for(kind: BlockKind) -> Vec<Block> {
    match kind {
        BlockKind::Table => (0..2)
            .flat_map(|row| {
                (0..2).map(move |column| {
                    Block::new(
                        0,
                        BlockType::TableCell {
                            row,
                            column,
                            header: false,
                        },
                    )
                })
            })
            .collect(),
        other => vec![Block::new(0, other.block_type())],
    }
}

/// Put the element for `kind` at `offset` of block `block_index`. An empty
/// host block is replaced; otherwise the host keeps the text before the
/// offset and the text after it moves into a paragraph below the element.
/// Table cells are never split: the element goes below the whole table.
fn place_block(editor: &mut StructuredEditor, block_index: usize, offset: usize, kind: BlockKind) {
    let doc = editor.document_mut();
    if let Some(table_end) = doc.table_end(block_index) {
        let insert_at = table_end + 1;
        for (i, block) in blocks_for(kind).into_iter().enumerate() {
            doc.insert_block(insert_at + i, block);
        }
        editor.set_cursor(DocumentPosition::new(insert_at, 0));
        return;
    }

    let (left_empty, right) = {
        let host = &mut doc.blocks_mut()[block_index];
        let right = host.split_content_at(offset);
        (host.is_empty(), right)
    };

    let insert_at = if left_empty {
        doc.remove_block(block_index);
        block_index
    } else {
        block_index + 1
    };

    let new_blocks = blocks_for(kind);
    let count = new_blocks.len();
    for (i, block) in new_blocks.into_iter().enumerate() {
        doc.insert_block(insert_at + i, block);
    }

    if !right.is_empty() {
        let mut tail = Block::paragraph(0);
        tail.content = right;
        tail.normalize_content();
        doc.insert_block(insert_at + count, tail);
    }

    editor.set_cursor(DocumentPosition::new(insert_at, 0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::html_converter::{document_to_html, html_to_document};
    use crate::richtext::trigger::TriggerKind;

    fn editor_at_end(text: &str) -> StructuredEditor {
        let mut editor = StructuredEditor::with_document(StructuredDocument::with_paragraph(text));
        editor.set_cursor(DocumentPosition::new(0, text.len()));
        editor
    }

    fn trigger(kind: TriggerKind, offset: usize, query: &str) -> TriggerState {
        TriggerState {
            kind,
            query: query.to_string(),
            anchor: DocumentPosition::new(0, offset),
        }
    }

    #[test]
    fn test_block_replaces_empty_host() {
        let mut editor = editor_at_end("/head");
        insert_block(
            &mut editor,
            &trigger(TriggerKind::Block, 0, "head"),
            BlockKind::Heading1,
        )
        .unwrap();

        let blocks = editor.document().blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block_type, BlockType::Heading { level: 1 });
        assert!(blocks[0].is_empty());
        assert_eq!(editor.cursor(), DocumentPosition::new(0, 0));
    }

    #[test]
    fn test_block_after_text_moves_remainder() {
        let mut editor = editor_at_end("intro /quo tail");
        editor.set_cursor(DocumentPosition::new(0, 10));
        insert_block(
            &mut editor,
            &trigger(TriggerKind::Block, 6, "quo"),
            BlockKind::Quote,
        )
        .unwrap();

        let blocks = editor.document().blocks();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].to_plain_text(), "intro ");
        assert_eq!(blocks[1].block_type, BlockType::BlockQuote);
        assert_eq!(blocks[2].block_type, BlockType::Paragraph);
        assert_eq!(blocks[2].to_plain_text(), " tail");
        assert_eq!(editor.cursor(), DocumentPosition::new(1, 0));
    }

    #[test]
    fn test_every_block_kind_inserts_one_element() {
        for kind in BlockKind::ALL {
            let mut editor = editor_at_end("/");
            insert_block(&mut editor, &trigger(TriggerKind::Block, 0, ""), kind).unwrap();

            let blocks = editor.document().blocks();
            let expected = if kind == BlockKind::Table { 4 } else { 1 };
            assert_eq!(blocks.len(), expected, "{:?}", kind);
            assert!(blocks.iter().all(|b| b.is_empty()));
            assert_eq!(blocks[0].block_type, kind.block_type());
            assert_eq!(editor.cursor(), DocumentPosition::new(0, 0));
        }
    }

    #[test]
    fn test_mention_inserts_token_and_space() {
        let mut editor = editor_at_end("hi @jo");
        let user = MentionUser::new("user1", "John Doe", "");
        insert_mention(&mut editor, &trigger(TriggerKind::Mention, 3, "jo"), &user).unwrap();

        let block = &editor.document().blocks()[0];
        assert_eq!(block.to_display_text(), "hi @John Doe ");
        assert_eq!(block.to_plain_text(), "hi \u{FFFC} ");
        assert_eq!(editor.cursor().offset, block.text_len());
    }

    #[test]
    fn test_missing_trigger_aborts_without_change() {
        let mut editor = editor_at_end("no marker");
        let before = editor.document().clone();
        let result = insert_block(
            &mut editor,
            &trigger(TriggerKind::Block, 0, ""),
            BlockKind::Code,
        );

        assert_eq!(result, Err(EditError::AnchorLost { trigger: '/' }));
        assert_eq!(editor.document(), &before);
    }

    #[test]
    fn test_caret_in_other_block_aborts() {
        let mut doc = StructuredDocument::with_paragraph("/x");
        doc.add_block(Block::paragraph(0).with_plain_text("other"));
        let mut editor = StructuredEditor::with_document(doc);
        editor.set_cursor(DocumentPosition::new(1, 2));

        let result = insert_block(
            &mut editor,
            &trigger(TriggerKind::Block, 0, "x"),
            BlockKind::Quote,
        );
        assert!(matches!(result, Err(EditError::AnchorLost { .. })));
    }

    #[test]
    fn test_toolbar_table_at_caret() {
        let mut editor = editor_at_end("text");
        insert_block_at_caret(&mut editor, BlockKind::Table).unwrap();

        let blocks = editor.document().blocks();
        assert_eq!(blocks.len(), 5);
        assert_eq!(
            blocks[4].block_type,
            BlockType::TableCell {
                row: 1,
                column: 1,
                header: false
            }
        );
        assert_eq!(editor.cursor(), DocumentPosition::new(1, 0));
    }

    fn editor_in_cell() -> StructuredEditor {
        let doc = html_to_document(
            "<table><tr><td>a</td><td>/</td></tr><tr><td>c</td><td>d</td></tr></table>",
        );
        let mut editor = StructuredEditor::with_document(doc);
        editor.set_cursor(DocumentPosition::new(1, 1));
        editor
    }

    fn cell_trigger() -> TriggerState {
        TriggerState {
            kind: TriggerKind::Block,
            query: String::new(),
            anchor: DocumentPosition::new(1, 0),
        }
    }

    #[test]
    fn test_block_from_cell_goes_below_table() {
        let mut editor = editor_in_cell();
        insert_block(&mut editor, &cell_trigger(), BlockKind::Heading1).unwrap();

        assert_eq!(
            document_to_html(editor.document()),
            "<table><tr><td>a</td><td></td></tr><tr><td>c</td><td>d</td></tr></table><h1></h1>"
        );
        assert_eq!(editor.cursor(), DocumentPosition::new(4, 0));
    }

    #[test]
    fn test_table_from_cell_starts_new_table() {
        let mut editor = editor_in_cell();
        insert_block(&mut editor, &cell_trigger(), BlockKind::Table).unwrap();

        assert_eq!(
            document_to_html(editor.document()),
            "<table><tr><td>a</td><td></td></tr><tr><td>c</td><td>d</td></tr></table>\
             <table><tr><td></td><td></td></tr><tr><td></td><td></td></tr></table>"
        );
        assert_eq!(editor.document().block_count(), 8);
        assert_eq!(editor.cursor(), DocumentPosition::new(4, 0));
    }
}
