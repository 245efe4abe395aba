//! View configuration.
//!
//! [`ListViewConfig`] gathers the settings of an [`ItemListView`] that are
//! usually fixed per list: field names, hide-selected behavior and search
//! expansion. It can be loaded from JSON or TOML:
//!
//! ```
//! use horizon_itemlist::ListViewConfig;
//!
//! let config = ListViewConfig::from_toml_str(r#"
//!     children_field = "nodes"
//!     value_field = "id"
//!     hide_selected = true
//! "#).unwrap();
//!
//! assert_eq!(config.children_field, "nodes");
//! assert!(config.expand_tree_on_search);
//! ```
//!
//! [`ItemListView`]: crate::ItemListView

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ItemListError, Result};
use crate::model::accessor::DEFAULT_CHILDREN_FIELD;
use crate::model::grouping::GroupInfo;

/// Settings applied to a view with `ItemListView::with_config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListViewConfig {
    /// Field holding children. Defaults to `"items"`.
    pub children_field: String,
    /// Dotted path of the comparison value.
    pub value_field: Option<String>,
    /// Dotted path of the display text. Defaults to `displayName`.
    pub text_field: Option<String>,
    /// Dotted path searched by queries. Defaults to the text field.
    pub search_field: Option<String>,
    /// Remove selected items from the visible list.
    pub hide_selected: bool,
    /// Expand collapsed parents of search matches when the query changes.
    pub expand_tree_on_search: bool,
    /// Initial grouping levels.
    pub group_infos: Vec<GroupInfo>,
}

impl Default for ListViewConfig {
    fn default() -> Self {
        Self {
            children_field: DEFAULT_CHILDREN_FIELD.to_string(),
            value_field: None,
            text_field: None,
            search_field: None,
            hide_selected: false,
            expand_tree_on_search: true,
            group_infos: Vec::new(),
        }
    }
}

impl ListViewConfig {
    /// Parses a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| ItemListError::Config(e.to_string()))
    }

    /// Parses a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ItemListError::Config(e.to_string()))
    }

    /// Loads a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&read_config(path.as_ref())?)
    }

    /// Loads a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&read_config(path.as_ref())?)
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ItemListError::Config(e.to_string()))
    }

    /// Serializes to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ItemListError::Config(e.to_string()))
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| ItemListError::Config(format!("{}: {e}", path.display())))
}
