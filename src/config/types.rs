//! Raw config types as written in YAML/JSON config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendConfig {
    #[default]
    Postgres,
    Other,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
}

fn default_true() -> bool {
    true
}

fn default_schema() -> String {
    "public".into()
}

fn default_primary_key() -> String {
    "id".into()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionConfig {
    ToOne,
    ToMany,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssociationConfig {
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    pub direction: DirectionConfig,
    pub our_key: String,
    pub their_key: String,
    /// Empty means "introspect from the database".
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

/// Label renderer: a named template, a named label function, or column values joined by a separator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelConfig {
    Template { template: String },
    Function { function: String },
    Columns {
        columns: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
    },
}

fn default_separator() -> String {
    " ".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceSettings {
    /// Controller path, e.g. "users" or "admin/users". Registry key and URL prefix.
    pub controller: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Empty means "introspect from the database".
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub search_on: Vec<String>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub joins: Vec<String>,
    #[serde(default)]
    pub left_joins: Vec<String>,
    #[serde(default)]
    pub user_includes: Vec<String>,
    #[serde(default)]
    pub select: Option<Vec<String>>,
    #[serde(default)]
    pub group_by: Option<Vec<String>>,
    #[serde(default)]
    pub label: Option<LabelConfig>,
    #[serde(default)]
    pub full_text_search: bool,
    /// Name of a notify hook in the hook table.
    #[serde(default)]
    pub notify: Option<String>,
    /// Name of a conditions hook in the hook table.
    #[serde(default)]
    pub conditions: Option<String>,
    #[serde(default)]
    pub associations: Vec<AssociationConfig>,
}

/// Whole config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PickerConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    /// Named Handlebars templates for labels.
    #[serde(default)]
    pub templates: HashMap<String, String>,
    #[serde(default)]
    pub resources: Vec<ResourceSettings>,
}
