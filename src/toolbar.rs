// Toolbar model: which buttons are shown and how they look right now.
// Rendering is up to the host; clicking a button maps to
// `RichTextEditor::execute_named(button.command, value)`.

use crate::config::{FeatureFlags, ToolbarOptions};
use crate::richtext::commands::{Command, FormatState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarGroup {
    Basic,
    Formatting,
    Lists,
    Links,
    Media,
    Tables,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarButton {
    pub group: ToolbarGroup,
    /// Classic command name passed to `execute_named`
    pub command: &'static str,
    /// Fixed command value, e.g. `h1` for the heading buttons
    pub value: Option<&'static str>,
    pub title: &'static str,
    /// The host must ask the user for a value (a URL) before executing
    pub needs_input: bool,
    pub active: bool,
    pub enabled: bool,
}

struct ButtonDef {
    group: ToolbarGroup,
    command: &'static str,
    value: Option<&'static str>,
    title: &'static str,
    needs_input: bool,
}

const fn def(
    group: ToolbarGroup,
    command: &'static str,
    value: Option<&'static str>,
    title: &'static str,
) -> ButtonDef {
    ButtonDef {
        group,
        command,
        value,
        title,
        needs_input: false,
    }
}

const BUTTONS: &[ButtonDef] = &[
    def(ToolbarGroup::Basic, "bold", None, "Bold"),
    def(ToolbarGroup::Basic, "italic", None, "Italic"),
    def(ToolbarGroup::Basic, "underline", None, "Underline"),
    def(ToolbarGroup::Formatting, "formatBlock", Some("h1"), "Heading 1"),
    def(ToolbarGroup::Formatting, "formatBlock", Some("h2"), "Heading 2"),
    def(ToolbarGroup::Formatting, "formatBlock", Some("h3"), "Heading 3"),
    def(ToolbarGroup::Lists, "insertUnorderedList", None, "Bullet List"),
    def(ToolbarGroup::Lists, "insertOrderedList", None, "Numbered List"),
    ButtonDef {
        needs_input: true,
        ..def(ToolbarGroup::Links, "createLink", None, "Insert Link")
    },
    ButtonDef {
        needs_input: true,
        ..def(ToolbarGroup::Media, "insertImage", None, "Insert Image")
    },
    def(ToolbarGroup::Tables, "insertTable", None, "Insert Table"),
    def(ToolbarGroup::Clear, "removeFormat", None, "Clear Formatting"),
];

fn group_visible(group: ToolbarGroup, options: &ToolbarOptions, features: &FeatureFlags) -> bool {
    match group {
        ToolbarGroup::Basic => options.basic,
        ToolbarGroup::Formatting => options.formatting,
        ToolbarGroup::Lists => options.lists,
        ToolbarGroup::Links => options.links,
        ToolbarGroup::Media => options.media,
        ToolbarGroup::Tables => options.tables && features.tables,
        ToolbarGroup::Clear => true,
    }
}

fn is_active(def: &ButtonDef, state: &FormatState) -> bool {
    if def.command == "createLink" {
        return state.in_link;
    }
    Command::from_name(def.command, def.value).is_ok_and(|command| state.is_active(&command))
}

/// Visible buttons in display order, with their state for the caret
pub fn toolbar_buttons(
    options: &ToolbarOptions,
    features: &FeatureFlags,
    state: &FormatState,
    editable: bool,
) -> Vec<ToolbarButton> {
    BUTTONS
        .iter()
        .filter(|def| group_visible(def.group, options, features))
        .map(|def| ToolbarButton {
            group: def.group,
            command: def.command,
            value: def.value,
            title: def.title,
            needs_input: def.needs_input,
            active: is_active(def, state),
            enabled: editable && (def.group != ToolbarGroup::Links || features.links),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::structured_document::{BlockType, TextStyle};

    fn titles(buttons: &[ToolbarButton]) -> Vec<&str> {
        buttons.iter().map(|b| b.title).collect()
    }

    #[test]
    fn test_default_toolbar_shows_everything() {
        let buttons = toolbar_buttons(
            &ToolbarOptions::default(),
            &FeatureFlags::default(),
            &FormatState::default(),
            true,
        );
        assert_eq!(buttons.len(), 12);
        assert_eq!(buttons.last().map(|b| b.title), Some("Clear Formatting"));
        assert!(buttons.iter().all(|b| b.enabled && !b.active));
    }

    #[test]
    fn test_table_button_needs_feature_and_option() {
        let mut features = FeatureFlags::default();
        features.tables = false;
        let buttons = toolbar_buttons(
            &ToolbarOptions::default(),
            &features,
            &FormatState::default(),
            true,
        );
        assert!(!titles(&buttons).contains(&"Insert Table"));
    }

    #[test]
    fn test_hidden_groups() {
        let options = ToolbarOptions {
            basic: false,
            formatting: false,
            lists: false,
            links: false,
            media: false,
            tables: false,
        };
        let buttons = toolbar_buttons(
            &options,
            &FeatureFlags::default(),
            &FormatState::default(),
            true,
        );
        assert_eq!(titles(&buttons), vec!["Clear Formatting"]);
    }

    #[test]
    fn test_active_and_enabled_state() {
        let state = FormatState {
            style: TextStyle::bold(),
            block_type: Some(BlockType::Heading { level: 2 }),
            in_link: true,
        };
        let mut features = FeatureFlags::default();
        features.links = false;
        let buttons = toolbar_buttons(&ToolbarOptions::default(), &features, &state, true);

        let active: Vec<&str> = buttons.iter().filter(|b| b.active).map(|b| b.title).collect();
        assert_eq!(active, vec!["Bold", "Heading 2", "Insert Link"]);

        let link = buttons.iter().find(|b| b.command == "createLink").unwrap();
        assert!(link.needs_input);
        assert!(!link.enabled);

        let readonly = toolbar_buttons(&ToolbarOptions::default(), &features, &state, false);
        assert!(readonly.iter().all(|b| !b.enabled));
    }
}
