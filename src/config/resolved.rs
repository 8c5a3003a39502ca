//! Resolved picker model: config validated and flattened for runtime use.

use crate::error::AppError;
use crate::sql::{quoted, Condition};
use handlebars::Handlebars;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Column type classes that drive coercion and matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Text,
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    Timestamp,
    TimestampTz,
    Uuid,
    Json,
    /// Anything else (enums, intervals, custom types); bound as text and cast in SQL.
    Other,
}

impl ColumnType {
    /// Classify a PostgreSQL type name as written in config or reported by `format_type`.
    /// Type modifiers are ignored; arrays are `Other`.
    pub fn from_pg_type(name: &str) -> Self {
        let lower = name.trim().to_lowercase();
        if lower.ends_with("[]") || lower.starts_with('_') {
            return ColumnType::Other;
        }
        match without_modifiers(&lower).as_str() {
            "character varying" | "varchar" | "character" | "char" | "bpchar" | "citext" | "name" => {
                ColumnType::String
            }
            "text" => ColumnType::Text,
            "smallint" | "integer" | "int" | "int2" | "int4" | "int8" | "bigint" | "serial" | "bigserial"
            | "smallserial" => ColumnType::Integer,
            "real" | "double precision" | "float4" | "float8" | "float" => ColumnType::Float,
            "numeric" | "decimal" | "money" => ColumnType::Decimal,
            "boolean" | "bool" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "timestamp" | "timestamp without time zone" => ColumnType::Timestamp,
            "timestamptz" | "timestamp with time zone" => ColumnType::TimestampTz,
            "uuid" => ColumnType::Uuid,
            "json" | "jsonb" => ColumnType::Json,
            _ => ColumnType::Other,
        }
    }

    /// Character and text columns match case-insensitively.
    pub fn is_string_like(&self) -> bool {
        matches!(self, ColumnType::String | ColumnType::Text)
    }
}

/// `timestamp(3) with time zone` -> `timestamp with time zone`.
fn without_modifiers(name: &str) -> String {
    let mut depth = 0u32;
    let kept: String = name
        .chars()
        .filter(|c| match c {
            '(' => {
                depth += 1;
                false
            }
            ')' => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => depth == 0,
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Clone, Debug)]
pub struct ColumnMeta {
    pub name: String,
    /// PostgreSQL type name as declared (e.g. "integer", "timestamptz", "sample.order_status").
    pub pg_type: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, pg_type: impl Into<String>, nullable: bool) -> Self {
        let pg_type = pg_type.into();
        ColumnMeta {
            name: name.into(),
            column_type: ColumnType::from_pg_type(&pg_type),
            pg_type,
            nullable,
        }
    }
}

/// Direction of an association: to_one (we hold the key to them) or to_many (they hold the key to us).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncludeDirection {
    ToOne,
    ToMany,
}

#[derive(Clone, Debug)]
pub struct Association {
    /// Name used in include/joins lists and as the SQL alias.
    pub name: String,
    pub schema_name: String,
    pub table_name: String,
    pub direction: IncludeDirection,
    /// Our column used in the join.
    pub our_key: String,
    /// Their column used in the join.
    pub their_key: String,
    pub columns: Vec<ColumnMeta>,
}

impl Association {
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }
}

pub type LabelFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;
pub type NotifyFn = Arc<dyn Fn(&Value) -> Result<(), AppError> + Send + Sync>;
pub type ConditionsFn = Arc<dyn Fn() -> Vec<Condition> + Send + Sync>;

/// How a record turns into its label.
#[derive(Clone)]
pub enum LabelRenderer {
    /// Named Handlebars template; the label is the text of its `<label>` element.
    Template(String),
    Function(LabelFn),
}

impl fmt::Debug for LabelRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelRenderer::Template(name) => f.debug_tuple("Template").field(name).finish(),
            LabelRenderer::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Called with the selected record after its id has been confirmed.
#[derive(Clone)]
pub enum NotifyHook {
    Function(NotifyFn),
    Named { name: String, hook: NotifyFn },
}

impl NotifyHook {
    pub fn call(&self, record: &Value) -> Result<(), AppError> {
        match self {
            NotifyHook::Function(f) => f(record),
            NotifyHook::Named { name, hook } => {
                tracing::debug!(hook = %name, "notify");
                hook(record)
            }
        }
    }
}

impl fmt::Debug for NotifyHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyHook::Function(_) => f.write_str("Function(..)"),
            NotifyHook::Named { name, .. } => f.debug_struct("Named").field("name", name).finish(),
        }
    }
}

/// Storage backend; decides the case-insensitive LIKE operator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    Postgres,
    Other,
}

impl Backend {
    pub fn like_operator(self) -> &'static str {
        match self {
            Backend::Postgres => "ILIKE",
            Backend::Other => "LIKE",
        }
    }
}

/// Per-resource picker settings. Immutable once resolved.
#[derive(Clone)]
pub struct ResourceConfig {
    pub(crate) controller: String,
    pub(crate) schema_name: String,
    pub(crate) table_name: String,
    pub(crate) primary_key: String,
    pub(crate) columns: Vec<ColumnMeta>,
    pub(crate) search_on: Vec<String>,
    pub(crate) per_page: Option<u32>,
    pub(crate) order_by: Option<String>,
    pub(crate) include: Vec<String>,
    pub(crate) joins: Vec<String>,
    pub(crate) left_joins: Vec<String>,
    pub(crate) user_includes: Vec<String>,
    pub(crate) select: Option<Vec<String>>,
    pub(crate) group_by: Option<Vec<String>>,
    pub(crate) label: Option<LabelRenderer>,
    pub(crate) full_text_search: bool,
    pub(crate) notify: Option<NotifyHook>,
    pub(crate) conditions: Option<ConditionsFn>,
    pub(crate) associations: Vec<Association>,
    pub(crate) backend: Backend,
}

impl ResourceConfig {
    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// SQL alias of the main table (its table name, so `users.name` style expressions work).
    pub fn alias(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn primary_key_column(&self) -> Option<&ColumnMeta> {
        self.column(&self.primary_key)
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// `"table"."column"` for a main-table column.
    pub fn qualified_column(&self, name: &str) -> String {
        format!("{}.{}", quoted(self.alias()), quoted(name))
    }

    pub fn search_on(&self) -> &[String] {
        &self.search_on
    }

    pub fn per_page(&self) -> Option<u32> {
        self.per_page
    }

    pub fn pagination(&self) -> bool {
        self.per_page.is_some()
    }

    /// Configured ordering, or the primary key ascending.
    pub fn order_by(&self) -> String {
        self.order_by
            .clone()
            .unwrap_or_else(|| format!("{} ASC", self.qualified_column(&self.primary_key)))
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn joins(&self) -> &[String] {
        &self.joins
    }

    pub fn left_joins(&self) -> &[String] {
        &self.left_joins
    }

    pub fn user_includes(&self) -> &[String] {
        &self.user_includes
    }

    pub fn select(&self) -> Option<&[String]> {
        self.select.as_deref()
    }

    pub fn group_by(&self) -> Option<&[String]> {
        self.group_by.as_deref()
    }

    pub fn label(&self) -> Option<&LabelRenderer> {
        self.label.as_ref()
    }

    pub fn full_text_search(&self) -> bool {
        self.full_text_search
    }

    pub fn notify(&self) -> Option<&NotifyHook> {
        self.notify.as_ref()
    }

    /// Controller-supplied restrictions, evaluated on every call.
    pub fn controller_conditions(&self) -> Vec<Condition> {
        self.conditions.as_ref().map(|f| f()).unwrap_or_default()
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.name == name)
    }

    pub fn like_operator(&self) -> &'static str {
        self.backend.like_operator()
    }

    /// Attach a notify function, replacing any configured hook.
    pub fn with_notify(mut self, f: NotifyFn) -> Self {
        self.notify = Some(NotifyHook::Function(f));
        self
    }

    /// Attach a label function, replacing any configured renderer.
    pub fn with_label(mut self, f: LabelFn) -> Self {
        self.label = Some(LabelRenderer::Function(f));
        self
    }

    /// Attach a controller conditions hook, replacing any configured one.
    pub fn with_conditions(mut self, f: ConditionsFn) -> Self {
        self.conditions = Some(f);
        self
    }
}

impl fmt::Debug for ResourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceConfig")
            .field("controller", &self.controller)
            .field("table", &format!("{}.{}", self.schema_name, self.table_name))
            .field("primary_key", &self.primary_key)
            .field("search_on", &self.search_on)
            .field("per_page", &self.per_page)
            .field("order_by", &self.order_by)
            .field("label", &self.label)
            .field("full_text_search", &self.full_text_search)
            .field("notify", &self.notify)
            .field("conditions", &self.conditions.is_some())
            .finish()
    }
}

/// Named code hooks that raw config refers to by name.
#[derive(Clone, Default)]
pub struct HookTable {
    pub notify: HashMap<String, NotifyFn>,
    pub conditions: HashMap<String, ConditionsFn>,
    pub labels: HashMap<String, LabelFn>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notify<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), AppError> + Send + Sync + 'static,
    {
        self.notify.insert(name.into(), Arc::new(f));
        self
    }

    pub fn with_conditions<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Vec<Condition> + Send + Sync + 'static,
    {
        self.conditions.insert(name.into(), Arc::new(f));
        self
    }

    pub fn with_label<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.labels.insert(name.into(), Arc::new(f));
        self
    }
}

/// All resources by controller path, plus the named label templates.
pub struct Registry {
    pub(crate) resources: HashMap<String, ResourceConfig>,
    pub(crate) templates: Handlebars<'static>,
}

impl Registry {
    pub fn resource(&self, controller: &str) -> Option<&ResourceConfig> {
        self.resources.get(controller)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn templates(&self) -> &Handlebars<'static> {
        &self.templates
    }

    /// Replace a resource, e.g. to attach code hooks after loading from a file.
    pub fn insert(&mut self, resource: ResourceConfig) {
        self.resources.insert(resource.controller.clone(), resource);
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("resources", &self.resources.values().collect::<Vec<_>>())
            .finish()
    }
}
