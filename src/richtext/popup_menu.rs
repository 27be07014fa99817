// Popup Menu Controller
// State of the contextual menu opened by a trigger: which catalog is shown,
// the filtered items, the keyboard highlight and where the host should draw it.

use super::structured_document::BlockType;
use super::trigger::TriggerKind;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Structural elements offered by the block command menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Heading1,
    Heading2,
    Heading3,
    BulletList,
    NumberedList,
    Todo,
    Table,
    Code,
    Quote,
    Paragraph,
}

impl BlockKind {
    pub const ALL: [BlockKind; 10] = [
        BlockKind::Heading1,
        BlockKind::Heading2,
        BlockKind::Heading3,
        BlockKind::BulletList,
        BlockKind::NumberedList,
        BlockKind::Todo,
        BlockKind::Table,
        BlockKind::Code,
        BlockKind::Quote,
        BlockKind::Paragraph,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BlockKind::Heading1 => "Heading 1",
            BlockKind::Heading2 => "Heading 2",
            BlockKind::Heading3 => "Heading 3",
            BlockKind::BulletList => "Bullet List",
            BlockKind::NumberedList => "Numbered List",
            BlockKind::Todo => "To-do List",
            BlockKind::Table => "Table",
            BlockKind::Code => "Code Block",
            BlockKind::Quote => "Quote",
            BlockKind::Paragraph => "Paragraph",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            BlockKind::Heading1 => "H1",
            BlockKind::Heading2 => "H2",
            BlockKind::Heading3 => "H3",
            BlockKind::BulletList => "•",
            BlockKind::NumberedList => "1.",
            BlockKind::Todo => "☐",
            BlockKind::Table => "⊞",
            BlockKind::Code => "</>",
            BlockKind::Quote => "\"",
            BlockKind::Paragraph => "¶",
        }
    }

    /// Stable identifier, e.g. `heading1` or `bulletList`
    pub fn id(self) -> &'static str {
        match self {
            BlockKind::Heading1 => "heading1",
            BlockKind::Heading2 => "heading2",
            BlockKind::Heading3 => "heading3",
            BlockKind::BulletList => "bulletList",
            BlockKind::NumberedList => "numberedList",
            BlockKind::Todo => "todo",
            BlockKind::Table => "table",
            BlockKind::Code => "code",
            BlockKind::Quote => "quote",
            BlockKind::Paragraph => "paragraph",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Block type of the element this kind inserts. Tables insert a grid of
    /// cells; this is the type of its first cell.
    pub fn block_type(self) -> BlockType {
        match self {
            BlockKind::Heading1 => BlockType::Heading { level: 1 },
            BlockKind::Heading2 => BlockType::Heading { level: 2 },
            BlockKind::Heading3 => BlockType::Heading { level: 3 },
            BlockKind::BulletList => BlockType::ListItem {
                ordered: false,
                checkbox: None,
            },
            BlockKind::NumberedList => BlockType::ListItem {
                ordered: true,
                checkbox: None,
            },
            BlockKind::Todo => BlockType::ListItem {
                ordered: false,
                checkbox: Some(false),
            },
            BlockKind::Table => BlockType::TableCell {
                row: 0,
                column: 0,
                header: false,
            },
            BlockKind::Code => BlockType::CodeBlock { language: None },
            BlockKind::Quote => BlockType::BlockQuote,
            BlockKind::Paragraph => BlockType::Paragraph,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockItem {
    pub kind: BlockKind,
    pub label: &'static str,
    pub icon: &'static str,
}

impl From<BlockKind> for BlockItem {
    fn from(kind: BlockKind) -> Self {
        BlockItem {
            kind,
            label: kind.label(),
            icon: kind.icon(),
        }
    }
}

/// An entry of the mention directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionUser {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar: String,
}

impl MentionUser {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, avatar: impl Into<String>) -> Self {
        MentionUser {
            id: id.into(),
            display_name: display_name.into(),
            avatar: avatar.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    Block(BlockItem),
    Mention(MentionUser),
}

impl MenuItem {
    /// Text the query is matched against
    pub fn label(&self) -> &str {
        match self {
            MenuItem::Block(item) => item.label,
            MenuItem::Mention(user) => &user.display_name,
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            MenuItem::Block(item) => item.icon,
            MenuItem::Mention(user) => &user.avatar,
        }
    }
}

/// The block command catalog, in menu order
pub fn block_catalog(include_tables: bool) -> Vec<MenuItem> {
    BlockKind::ALL
        .into_iter()
        .filter(|kind| include_tables || *kind != BlockKind::Table)
        .map(|kind| MenuItem::Block(kind.into()))
        .collect()
}

pub fn mention_catalog(users: &[MentionUser]) -> Vec<MenuItem> {
    users.iter().cloned().map(MenuItem::Mention).collect()
}

/// Items whose label contains `query`, ignoring case. An empty query keeps everything.
pub fn filter_items(items: &[MenuItem], query: &str) -> Vec<MenuItem> {
    let needle = query.to_lowercase();
    items
        .iter()
        .filter(|item| item.label().to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Where the host should place the menu, in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenPoint {
    pub top: i32,
    pub left: i32,
}

/// Single controller shared by both triggers, so only one menu can be open
#[derive(Debug, Clone, Default)]
pub struct PopupMenu {
    kind: Option<TriggerKind>,
    anchor: ScreenPoint,
    catalog: Vec<MenuItem>,
    items: Vec<MenuItem>,
    highlighted: Option<usize>,
}

impl PopupMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the full catalog for `kind` at `anchor`, highlighting the first item
    pub fn open(&mut self, kind: TriggerKind, anchor: ScreenPoint, catalog: Vec<MenuItem>) {
        if self.kind.is_some_and(|open| open != kind) {
            self.close();
        }
        trace!(?kind, items = catalog.len(), "menu opened");
        self.kind = Some(kind);
        self.anchor = anchor;
        self.items = catalog.clone();
        self.catalog = catalog;
        self.highlighted = if self.items.is_empty() { None } else { Some(0) };
    }

    pub fn update_query(&mut self, query: &str) {
        if self.kind.is_none() {
            return;
        }
        self.items = filter_items(&self.catalog, query);
        self.highlighted = match (self.highlighted, self.items.len()) {
            (_, 0) => None,
            (Some(index), len) => Some(index.min(len - 1)),
            (None, _) => Some(0),
        };
    }

    /// Hide the menu and drop its items. Never touches the document.
    pub fn close(&mut self) {
        if let Some(kind) = self.kind.take() {
            trace!(?kind, "menu closed");
        }
        self.catalog.clear();
        self.items.clear();
        self.highlighted = None;
    }

    pub fn is_open(&self) -> bool {
        self.kind.is_some()
    }

    pub fn kind(&self) -> Option<TriggerKind> {
        self.kind
    }

    pub fn anchor(&self) -> ScreenPoint {
        self.anchor
    }

    /// Currently visible (filtered) items
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&MenuItem> {
        self.items.get(index)
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn highlighted_item(&self) -> Option<&MenuItem> {
        self.highlighted.and_then(|index| self.items.get(index))
    }

    /// Move the highlight by `delta`, wrapping around either end
    pub fn move_highlight(&mut self, delta: isize) {
        let len = self.items.len();
        if len == 0 {
            self.highlighted = None;
            return;
        }
        let current = self.highlighted.unwrap_or(0) as isize;
        self.highlighted = Some((current + delta).rem_euclid(len as isize) as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Vec<MentionUser> {
        vec![
            MentionUser::new("user1", "John Doe", "👨"),
            MentionUser::new("user2", "Jane Smith", "👩"),
            MentionUser::new("user3", "Alex Johnson", "🧑"),
        ]
    }

    fn labels(items: &[MenuItem]) -> Vec<&str> {
        items.iter().map(|i| i.label()).collect()
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let catalog = mention_catalog(&users());
        assert_eq!(
            labels(&filter_items(&catalog, "jo")),
            vec!["John Doe", "Alex Johnson"]
        );
        assert_eq!(filter_items(&catalog, "").len(), 3);
        assert!(filter_items(&catalog, "zz").is_empty());
    }

    #[test]
    fn test_block_catalog_filters_headings() {
        let catalog = block_catalog(true);
        assert_eq!(catalog.len(), 10);
        assert_eq!(
            labels(&filter_items(&catalog, "head")),
            vec!["Heading 1", "Heading 2", "Heading 3"]
        );
        assert!(
            !block_catalog(false)
                .iter()
                .any(|i| matches!(i, MenuItem::Block(b) if b.kind == BlockKind::Table))
        );
    }

    #[test]
    fn test_open_highlights_first_and_wraps() {
        let mut menu = PopupMenu::new();
        menu.open(
            TriggerKind::Mention,
            ScreenPoint { top: 20, left: 4 },
            mention_catalog(&users()),
        );
        assert!(menu.is_open());
        assert_eq!(menu.highlighted(), Some(0));
        assert_eq!(menu.anchor(), ScreenPoint { top: 20, left: 4 });

        menu.move_highlight(-1);
        assert_eq!(menu.highlighted(), Some(2));
        menu.move_highlight(1);
        assert_eq!(menu.highlighted(), Some(0));
    }

    #[test]
    fn test_update_query_clamps_highlight() {
        let mut menu = PopupMenu::new();
        menu.open(
            TriggerKind::Mention,
            ScreenPoint::default(),
            mention_catalog(&users()),
        );
        menu.move_highlight(2);
        menu.update_query("jane");
        assert_eq!(menu.highlighted(), Some(0));
        assert_eq!(menu.highlighted_item().map(|i| i.label()), Some("Jane Smith"));

        menu.update_query("nobody");
        assert_eq!(menu.highlighted(), None);
        menu.update_query("");
        assert_eq!(menu.items().len(), 3);
    }

    #[test]
    fn test_opening_other_kind_replaces_menu() {
        let mut menu = PopupMenu::new();
        menu.open(TriggerKind::Block, ScreenPoint::default(), block_catalog(true));
        menu.open(
            TriggerKind::Mention,
            ScreenPoint::default(),
            mention_catalog(&users()),
        );
        assert_eq!(menu.kind(), Some(TriggerKind::Mention));
        assert_eq!(menu.items().len(), 3);

        menu.close();
        assert!(!menu.is_open());
        assert!(menu.items().is_empty());
        assert_eq!(menu.highlighted(), None);
    }

    #[test]
    fn test_block_kind_ids() {
        assert_eq!(BlockKind::from_id("bulletList"), Some(BlockKind::BulletList));
        assert_eq!(BlockKind::from_id("nope"), None);
    }
}
