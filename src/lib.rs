// Library exports for richedit

pub mod config;
pub mod content;
pub mod history;
pub mod rich_text_editor;
pub mod richtext;
pub mod surface;
pub mod toolbar;

pub use config::{ConfigError, EditorConfig, FeatureFlags, ToolbarOptions};
pub use content::{ContentLoader, ContentMode, ContentProvider};
pub use rich_text_editor::{EventResult, Key, KeyEvent, Modifiers, RichTextEditor};
pub use richtext::commands::{Command, FormatState};
pub use richtext::popup_menu::{BlockKind, MentionUser, MenuItem};
pub use richtext::structured_editor::{EditError, EditResult};
pub use surface::{CaretRect, HeadlessSurface, SurfaceHost};
