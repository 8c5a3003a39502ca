//! Load picker config from YAML/JSON files, fill columns from the database, resolve against code hooks.

use crate::config::resolved::{
    Association, Backend, ColumnMeta, HookTable, IncludeDirection, LabelRenderer, NotifyHook, Registry,
    ResourceConfig,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use handlebars::Handlebars;
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Build the registry from config (validates first). Named hooks must exist in `hooks`.
pub fn resolve(config: &PickerConfig, hooks: &HookTable) -> Result<Registry, ConfigError> {
    validate(config)?;
    let backend = match config.backend {
        BackendConfig::Postgres => Backend::Postgres,
        BackendConfig::Other => Backend::Other,
    };

    let mut templates = Handlebars::new();
    for (name, source) in &config.templates {
        templates
            .register_template_string(name, source)
            .map_err(|e| ConfigError::Validation(format!("template {}: {}", name, e)))?;
    }

    let mut resources = HashMap::new();
    for r in &config.resources {
        let resource = resolve_resource(r, hooks, backend)?;
        tracing::debug!(controller = %r.controller, table = %r.table, "resolved picker resource");
        resources.insert(r.controller.clone(), resource);
    }

    Ok(Registry { resources, templates })
}

fn resolve_resource(r: &ResourceSettings, hooks: &HookTable, backend: Backend) -> Result<ResourceConfig, ConfigError> {
    if r.columns.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{}: no columns (declare them or call introspect_columns)",
            r.controller
        )));
    }
    let columns: Vec<ColumnMeta> = r.columns.iter().map(column_meta).collect();

    let label = match &r.label {
        None => None,
        Some(LabelConfig::Template { template }) => Some(LabelRenderer::Template(template.clone())),
        Some(LabelConfig::Function { function }) => {
            let f = hooks.labels.get(function).ok_or_else(|| ConfigError::MissingReference {
                kind: "label function",
                id: function.clone(),
            })?;
            Some(LabelRenderer::Function(f.clone()))
        }
        Some(LabelConfig::Columns { columns, separator }) => {
            Some(LabelRenderer::Function(columns_label(columns.clone(), separator.clone())))
        }
    };

    let notify = match &r.notify {
        None => None,
        Some(name) => {
            let hook = hooks.notify.get(name).ok_or_else(|| ConfigError::MissingReference {
                kind: "notify hook",
                id: name.clone(),
            })?;
            Some(NotifyHook::Named {
                name: name.clone(),
                hook: hook.clone(),
            })
        }
    };

    let conditions = match &r.conditions {
        None => None,
        Some(name) => Some(
            hooks
                .conditions
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::MissingReference {
                    kind: "conditions hook",
                    id: name.clone(),
                })?,
        ),
    };

    let associations = r
        .associations
        .iter()
        .map(|a| Association {
            name: a.name.clone(),
            schema_name: a.schema.clone(),
            table_name: a.table.clone(),
            direction: match a.direction {
                DirectionConfig::ToOne => IncludeDirection::ToOne,
                DirectionConfig::ToMany => IncludeDirection::ToMany,
            },
            our_key: a.our_key.clone(),
            their_key: a.their_key.clone(),
            columns: a.columns.iter().map(column_meta).collect(),
        })
        .collect();

    Ok(ResourceConfig {
        controller: r.controller.clone(),
        schema_name: r.schema.clone(),
        table_name: r.table.clone(),
        primary_key: r.primary_key.clone(),
        columns,
        search_on: r.search_on.clone(),
        per_page: r.per_page,
        order_by: r.order_by.clone().filter(|s| !s.trim().is_empty()),
        include: r.include.clone(),
        joins: r.joins.clone(),
        left_joins: r.left_joins.clone(),
        user_includes: r.user_includes.clone(),
        select: r.select.clone(),
        group_by: r.group_by.clone(),
        label,
        full_text_search: r.full_text_search,
        notify,
        conditions,
        associations,
        backend,
    })
}

fn column_meta(c: &ColumnConfig) -> ColumnMeta {
    ColumnMeta::new(c.name.clone(), c.type_.clone(), c.nullable)
}

/// Label from column values joined by `separator`; missing or null columns are skipped.
fn columns_label(columns: Vec<String>, separator: String) -> crate::config::LabelFn {
    Arc::new(move |record: &Value| {
        columns
            .iter()
            .filter_map(|c| match record.get(c) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            })
            .collect::<Vec<_>>()
            .join(&separator)
    })
}

/// Read a config file; `.yaml`/`.yml` as YAML, anything else as JSON.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<PickerConfig, ConfigError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let config = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?
    } else {
        serde_json::from_str(&content).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?
    };
    tracing::info!(path = %path.display(), "loaded picker config");
    Ok(config)
}

/// Fill empty column lists (resources and associations) from the PostgreSQL catalog.
pub async fn introspect_columns(pool: &PgPool, config: &mut PickerConfig) -> Result<(), ConfigError> {
    for r in &mut config.resources {
        if r.columns.is_empty() {
            r.columns = load_table_columns(pool, &r.schema, &r.table).await?;
            tracing::debug!(controller = %r.controller, count = r.columns.len(), "introspected columns");
        }
        for a in &mut r.associations {
            if a.columns.is_empty() {
                a.columns = load_table_columns(pool, &a.schema, &a.table).await?;
            }
        }
    }
    Ok(())
}

async fn load_table_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<ColumnConfig>, ConfigError> {
    // format_type: declared type with modifiers and array suffix, usable as a cast target.
    let sql = "SELECT a.attname::text, format_type(a.atttypid, a.atttypmod), NOT a.attnotnull \
               FROM pg_catalog.pg_attribute a \
               JOIN pg_catalog.pg_class c ON c.oid = a.attrelid \
               JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
               WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped \
               ORDER BY a.attnum";
    tracing::debug!(sql = %sql, schema = %schema, table = %table, "query");
    let rows = sqlx::query_as::<_, (String, String, bool)>(sql)
        .bind(schema)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(|e| ConfigError::Load(e.to_string()))?;
    if rows.is_empty() {
        return Err(ConfigError::MissingReference {
            kind: "table",
            id: format!("{}.{}", schema, table),
        });
    }
    Ok(rows
        .into_iter()
        .map(|(name, type_, nullable)| ColumnConfig { name, type_, nullable })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn users_config() -> PickerConfig {
        serde_json::from_value(json!({
            "templates": { "user": "<li><label>{{first_name}}</label></li>" },
            "resources": [{
                "controller": "admin/users",
                "table": "users",
                "columns": [
                    { "name": "id", "type": "integer", "nullable": false },
                    { "name": "first_name", "type": "character varying" }
                ],
                "search_on": ["users.first_name"],
                "per_page": 10,
                "label": { "template": "user" },
                "notify": "remember"
            }]
        }))
        .unwrap()
    }

    #[test]
    fn resolves_named_hooks() {
        let hooks = HookTable::new().with_notify("remember", |_| Ok(()));
        let registry = resolve(&users_config(), &hooks).unwrap();
        let users = registry.resource("admin/users").unwrap();
        assert!(matches!(users.notify(), Some(NotifyHook::Named { name, .. }) if name == "remember"));
        assert!(matches!(users.label(), Some(LabelRenderer::Template(t)) if t == "user"));
        assert_eq!(users.order_by(), "\"users\".\"id\" ASC");
        assert!(registry.templates().has_template("user"));
    }

    #[test]
    fn missing_named_hook_fails_at_resolve() {
        let err = resolve(&users_config(), &HookTable::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingReference { kind: "notify hook", .. }));
    }

    #[test]
    fn resource_without_columns_needs_introspection() {
        let config: PickerConfig = serde_json::from_value(json!({
            "resources": [{ "controller": "users", "table": "users" }]
        }))
        .unwrap();
        assert!(matches!(resolve(&config, &HookTable::new()), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn columns_label_skips_nulls() {
        let f = columns_label(vec!["first_name".into(), "middle".into(), "last_name".into()], " ".into());
        let label = f(&json!({ "first_name": "Jo", "middle": null, "last_name": "Smith" }));
        assert_eq!(label, "Jo Smith");
    }

    #[tokio::test]
    async fn loads_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "resources:\n  - controller: users\n    table: users\n    per_page: 5\n    full_text_search: true\n    columns:\n      - {{ name: id, type: integer, nullable: false }}\n"
        )
        .unwrap();
        let config = load_from_path(file.path()).await.unwrap();
        assert_eq!(config.resources.len(), 1);
        assert_eq!(config.resources[0].per_page, Some(5));
        assert!(config.resources[0].full_text_search);
        assert!(!config.resources[0].columns[0].nullable);
    }
}
