// Editor configuration: feature flags, toolbar options, trigger policy and
// the mention directory. Fixed for the lifetime of an editor.

use crate::richtext::popup_menu::MentionUser;
use crate::richtext::trigger::TriggerBoundary;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PLACEHOLDER: &str = "Start typing...";
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Capabilities the editor offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub blocks: bool,
    pub slash_commands: bool,
    pub links: bool,
    pub unfurls: bool,
    pub file_attachments: bool,
    pub mentions: bool,
    pub markdown: bool,
    pub tables: bool,
    pub embeds: bool,
    pub collaboration: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        FeatureFlags {
            blocks: true,
            slash_commands: true,
            links: true,
            unfurls: true,
            file_attachments: true,
            mentions: true,
            markdown: true,
            tables: true,
            embeds: true,
            collaboration: false,
        }
    }
}

impl FeatureFlags {
    /// Everything off; useful as a base for enabling single features
    pub fn none() -> Self {
        FeatureFlags {
            blocks: false,
            slash_commands: false,
            links: false,
            unfurls: false,
            file_attachments: false,
            mentions: false,
            markdown: false,
            tables: false,
            embeds: false,
            collaboration: false,
        }
    }
}

/// Which toolbar button groups are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarOptions {
    pub basic: bool,
    pub formatting: bool,
    pub lists: bool,
    pub links: bool,
    pub media: bool,
    pub tables: bool,
}

impl Default for ToolbarOptions {
    fn default() -> Self {
        ToolbarOptions {
            basic: true,
            formatting: true,
            lists: true,
            links: true,
            media: true,
            tables: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub show_toolbar: bool,
    pub placeholder: String,
    pub disabled: bool,
    pub read_only: bool,
    pub trigger_boundary: TriggerBoundary,
    pub history_limit: usize,
    pub features: FeatureFlags,
    pub toolbar: ToolbarOptions,
    /// Users offered after `@`. Empty unless the embedder supplies a
    /// directory; with no users the mention menu opens with no items.
    pub mention_users: Vec<MentionUser>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            show_toolbar: true,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            disabled: false,
            read_only: false,
            trigger_boundary: TriggerBoundary::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            features: FeatureFlags::default(),
            toolbar: ToolbarOptions::default(),
            mention_users: Vec::new(),
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Whether the editor accepts edits at all
    pub fn is_editable(&self) -> bool {
        !self.disabled && !self.read_only
    }
}
