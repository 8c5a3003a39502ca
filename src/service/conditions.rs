//! Composes the filter conditions for a browse request: search, column params, controller conditions.

use crate::config::{ColumnMeta, ResourceConfig};
use crate::error::AppError;
use crate::service::coerce::{condition_for_column, escape_like};
use crate::service::context::{ParamValue, RequestContext, RESERVED_KEYS};
use crate::sql::{quoted, BindValue, Condition};

/// A request parameter that names a known column, either on the main table or on a user-included
/// association (`assoc.column`).
#[derive(Debug)]
pub struct ColumnParam<'a> {
    pub table_alias: &'a str,
    pub column: &'a ColumnMeta,
    pub value: &'a ParamValue,
}

/// Search condition over `search_on`, or None when the search is blank or there is nothing to search.
pub fn search_condition(config: &ResourceConfig, search: &str) -> Option<Condition> {
    let search = search.trim();
    if search.is_empty() || config.search_on().is_empty() {
        return None;
    }
    let tokens: Vec<&str> = if config.full_text_search() {
        search.split_whitespace().collect()
    } else {
        vec![search]
    };

    let op = config.like_operator();
    let columns: Vec<String> = config
        .search_on()
        .iter()
        .map(|expr| match config.column(expr) {
            Some(c) => config.qualified_column(&c.name),
            None => expr.clone(),
        })
        .collect();
    let per_token = format!(
        "({})",
        columns
            .iter()
            .map(|c| format!("{} {} ?", c, op))
            .collect::<Vec<_>>()
            .join(" OR ")
    );

    let mut binds = Vec::with_capacity(tokens.len() * columns.len());
    for token in &tokens {
        let escaped = escape_like(token);
        let pattern = if config.full_text_search() {
            format!("%{}%", escaped)
        } else {
            format!("{}%", escaped)
        };
        binds.extend(std::iter::repeat(BindValue::Text(pattern)).take(columns.len()));
    }
    let sql = vec![per_token; tokens.len()].join(" AND ");
    Some(Condition::fragment(sql, binds))
}

/// Keep the request params that name known columns, in request order. Reserved keys and unknown
/// names are dropped.
pub fn filter_params<'a>(
    config: &'a ResourceConfig,
    ctx: &'a RequestContext,
    user_includes: &[String],
) -> Vec<ColumnParam<'a>> {
    let mut out = Vec::new();
    for (key, value) in &ctx.params {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if let Some(column) = config.column(key) {
            out.push(ColumnParam {
                table_alias: config.alias(),
                column,
                value,
            });
            continue;
        }
        let included = key.split_once('.').and_then(|(assoc, col)| {
            if !user_includes.iter().any(|u| u == assoc) {
                return None;
            }
            let a = config.association(assoc)?;
            a.column(col).map(|c| (a.name.as_str(), c))
        });
        match included {
            Some((table_alias, column)) => out.push(ColumnParam {
                table_alias,
                column,
                value,
            }),
            None => tracing::debug!(controller = %config.controller(), param = %key, "ignoring unknown parameter"),
        }
    }
    out
}

/// All conditions for one browse call: `[search?, ...column params, ...controller conditions]`.
pub fn compose_conditions(
    config: &ResourceConfig,
    ctx: &RequestContext,
    controller_conditions: &[Condition],
    user_includes: &[String],
) -> Result<Vec<Condition>, AppError> {
    let mut conditions = Vec::new();
    if let Some(search) = ctx.search.as_deref().and_then(|s| search_condition(config, s)) {
        conditions.push(search);
    }
    for p in filter_params(config, ctx, user_includes) {
        conditions.push(condition_for_column(p.table_alias, p.column, p.value)?);
    }
    conditions.extend(controller_conditions.iter().cloned());
    Ok(conditions)
}

/// Readable form of a composed condition list, for logs.
pub fn describe(conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(|c| match c {
            Condition::Match { column, .. } => quoted(&column.name),
            Condition::Fragment { sql, .. } => sql.clone(),
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}
