//! Builds the parameterized browse (count + page) and select-by-id queries from a resolved resource.

use crate::config::{Association, ColumnMeta, ColumnType, IncludeDirection, ResourceConfig};
use crate::error::AppError;
use crate::sql::condition::{where_clause, Condition};
use crate::sql::params::BindValue;

/// Quote identifier for PostgreSQL (safe: only from config).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Clone, Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    pub fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    pub fn push_param(&mut self, v: BindValue) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// LIMIT/OFFSET of a page query. Already rendered into the SQL; exposed for stores and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub limit: u64,
    pub offset: u64,
}

impl Window {
    /// Window for a 1-based page number.
    pub fn for_page(page: u32, per_page: u32) -> Self {
        let page = u64::from(page.max(1));
        Window {
            limit: u64::from(per_page),
            offset: (page - 1) * u64::from(per_page),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BrowseQuery {
    /// Present only when pagination is enabled.
    pub count: Option<QueryBuf>,
    pub page: QueryBuf,
    pub window: Option<Window>,
}

/// Column expressions for the select list. Decimal and custom types come back as text so the row
/// decoder never meets a type it cannot map.
fn select_column_list(alias: &str, columns: &[ColumnMeta]) -> String {
    columns
        .iter()
        .map(|c| {
            let q = format!("{}.{}", alias, quoted(&c.name));
            match c.column_type {
                ColumnType::Decimal | ColumnType::Other => format!("{}::text AS {}", q, quoted(&c.name)),
                _ => q,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_clause(main_alias: &str, assoc: &Association, kind: &str) -> String {
    format!(
        " {} JOIN {} {} ON {}.{} = {}.{}",
        kind,
        qualified_table(&assoc.schema_name, &assoc.table_name),
        quoted(&assoc.name),
        quoted(&assoc.name),
        quoted(&assoc.their_key),
        quoted(main_alias),
        quoted(&assoc.our_key)
    )
}

/// Inner joins first, then left joins and user includes; each association joined once.
fn joins_sql(config: &ResourceConfig) -> Result<String, AppError> {
    let alias = config.alias();
    let mut seen: Vec<&str> = Vec::new();
    let mut out = String::new();
    for (names, kind) in [
        (config.joins(), "INNER"),
        (config.left_joins(), "LEFT"),
        (config.user_includes(), "LEFT"),
    ] {
        for name in names {
            if seen.contains(&name.as_str()) {
                continue;
            }
            seen.push(name);
            out.push_str(&join_clause(alias, association(config, name)?, kind));
        }
    }
    Ok(out)
}

fn association<'a>(config: &'a ResourceConfig, name: &str) -> Result<&'a Association, AppError> {
    config.association(name).ok_or_else(|| {
        AppError::Validation(format!("{}: unknown association {}", config.controller(), name))
    })
}

/// Eager-loaded association as a scalar subquery: row_to_json for to_one, json_agg for to_many.
fn include_subquery(main_alias: &str, assoc: &Association) -> String {
    const INCLUDED: &str = "included";
    let cols = if assoc.columns.is_empty() {
        format!("{}.*", INCLUDED)
    } else {
        select_column_list(INCLUDED, &assoc.columns)
    };
    let inner = format!(
        "SELECT {} FROM {} {} WHERE {}.{} = {}.{}",
        cols,
        qualified_table(&assoc.schema_name, &assoc.table_name),
        INCLUDED,
        INCLUDED,
        quoted(&assoc.their_key),
        quoted(main_alias),
        quoted(&assoc.our_key)
    );
    let expr = match assoc.direction {
        IncludeDirection::ToOne => format!("(SELECT row_to_json(sub) FROM ({}) sub)", inner),
        IncludeDirection::ToMany => format!(
            "(SELECT COALESCE(json_agg(row_to_json(sub)), '[]'::json) FROM ({}) sub)",
            inner
        ),
    };
    format!("{} AS {}", expr, quoted(&assoc.name))
}

fn projection(config: &ResourceConfig) -> Result<String, AppError> {
    let mut parts = vec![match config.select() {
        Some(exprs) => exprs.join(", "),
        None => select_column_list(&quoted(config.alias()), config.columns()),
    }];
    let mut seen: Vec<&str> = Vec::new();
    for name in config.include().iter().chain(config.user_includes()) {
        if seen.contains(&name.as_str()) {
            continue;
        }
        seen.push(name);
        parts.push(include_subquery(config.alias(), association(config, name)?));
    }
    Ok(parts.join(", "))
}

fn from_clause(config: &ResourceConfig) -> String {
    format!(
        "{} {}",
        qualified_table(config.schema_name(), config.table_name()),
        quoted(config.alias())
    )
}

fn order_clause(config: &ResourceConfig) -> String {
    let mut order = format!(" ORDER BY {}", config.order_by());
    // Primary key tiebreaker keeps pages stable when the configured ordering has duplicates.
    if config.group_by().is_none() && config.order_by.is_some() {
        order.push_str(&format!(", {}", config.qualified_column(config.primary_key())));
    }
    order
}

/// Count query (when paginating) and page query for `page` (1-based).
/// With joins, filtering runs in a primary-key subquery so one-to-many joins never duplicate rows.
pub fn build_browse_query(config: &ResourceConfig, conditions: &[Condition], page: u32) -> Result<BrowseQuery, AppError> {
    let alias = config.alias();
    let from = from_clause(config);
    let joins = joins_sql(config)?;
    let pk = config.qualified_column(config.primary_key());
    let group = config
        .group_by()
        .map(|g| format!(" GROUP BY {}", g.join(", ")))
        .unwrap_or_default();

    let count = if config.pagination() {
        let mut q = QueryBuf::new();
        let where_sql = where_clause(conditions, alias, &mut q)?;
        q.sql = if !group.is_empty() {
            format!("SELECT COUNT(*) FROM (SELECT 1 FROM {}{}{}{}) grouped", from, joins, where_sql, group)
        } else if !joins.is_empty() {
            format!("SELECT COUNT(DISTINCT {}) FROM {}{}{}", pk, from, joins, where_sql)
        } else {
            format!("SELECT COUNT(*) FROM {}{}", from, where_sql)
        };
        Some(q)
    } else {
        None
    };

    let window = config.per_page().map(|per_page| Window::for_page(page, per_page));
    let mut q = QueryBuf::new();
    let where_sql = where_clause(conditions, alias, &mut q)?;
    let filter = if joins.is_empty() {
        where_sql
    } else {
        format!(" WHERE {} IN (SELECT {} FROM {}{}{})", pk, pk, from, joins, where_sql)
    };
    let window_sql = window
        .map(|w| format!(" LIMIT {} OFFSET {}", w.limit, w.offset))
        .unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        projection(config)?,
        from,
        filter,
        group,
        order_clause(config),
        window_sql
    );

    Ok(BrowseQuery { count, page: q, window })
}

/// SELECT by primary key; `id` is the sole param.
pub fn select_by_id(config: &ResourceConfig, id: BindValue) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}",
        select_column_list(&quoted(config.alias()), config.columns()),
        from_clause(config),
        config.qualified_column(config.primary_key()),
        n
    );
    q
}
