//! Filter predicates with bound values. Identifiers come from config; values are always parameters.

use super::builder::{quoted, QueryBuf};
use super::params::BindValue;
use crate::error::AppError;

/// Column reference. `table: None` resolves to the main table's alias at render time.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        ColumnRef {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        ColumnRef {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// `"table"."column"`, using `main_alias` when no table was given.
    pub fn to_sql(&self, main_alias: &str) -> String {
        let table = self.table.as_deref().unwrap_or(main_alias);
        format!("{}.{}", quoted(table), quoted(&self.name))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MatchValue {
    Null,
    Eq(BindValue),
    In(Vec<BindValue>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Column equality, IN list, or IS NULL. `cast` is the column's SQL type, applied to text and numeric binds.
    Match {
        column: ColumnRef,
        value: MatchValue,
        cast: Option<String>,
    },
    /// Raw SQL with one `?` per bind.
    Fragment { sql: String, binds: Vec<BindValue> },
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: BindValue) -> Self {
        Condition::Match {
            column: ColumnRef::new(column),
            value: MatchValue::Eq(value),
            cast: None,
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Condition::Match {
            column: ColumnRef::new(column),
            value: MatchValue::Null,
            cast: None,
        }
    }

    pub fn in_list(column: impl Into<String>, values: Vec<BindValue>) -> Self {
        Condition::Match {
            column: ColumnRef::new(column),
            value: MatchValue::In(values),
            cast: None,
        }
    }

    pub fn fragment(sql: impl Into<String>, binds: Vec<BindValue>) -> Self {
        Condition::Fragment {
            sql: sql.into(),
            binds,
        }
    }

    /// Binds in the order they will be numbered.
    pub fn binds(&self) -> Vec<&BindValue> {
        match self {
            Condition::Match { value, .. } => match value {
                MatchValue::Null => Vec::new(),
                MatchValue::Eq(v) => vec![v],
                MatchValue::In(vs) => vs.iter().collect(),
            },
            Condition::Fragment { binds, .. } => binds.iter().collect(),
        }
    }

    /// Append this condition's SQL to `q`, numbering its binds after those already present.
    pub fn render(&self, main_alias: &str, q: &mut QueryBuf) -> Result<String, AppError> {
        match self {
            Condition::Match { column, value, cast } => {
                let col = column.to_sql(main_alias);
                Ok(match value {
                    MatchValue::Null => format!("{} IS NULL", col),
                    MatchValue::Eq(v) => format!("{} = {}", col, placeholder(q, v, cast.as_deref())),
                    MatchValue::In(vs) if vs.is_empty() => "1 = 0".to_string(),
                    MatchValue::In(vs) => {
                        let phs: Vec<String> = vs.iter().map(|v| placeholder(q, v, cast.as_deref())).collect();
                        format!("{} IN ({})", col, phs.join(", "))
                    }
                })
            }
            Condition::Fragment { sql, binds } => render_fragment(sql, binds, q),
        }
    }
}

fn placeholder(q: &mut QueryBuf, v: &BindValue, cast: Option<&str>) -> String {
    let n = q.push_param(v.clone());
    match (v, cast) {
        (BindValue::Text(_) | BindValue::Numeric(_), Some(t)) => format!("${}::{}", n, t),
        _ => format!("${}{}", n, v.cast_suffix().unwrap_or("")),
    }
}

/// Replace each `?` outside single-quoted literals with the next `$n`.
fn render_fragment(sql: &str, binds: &[BindValue], q: &mut QueryBuf) -> Result<String, AppError> {
    let mut out = String::with_capacity(sql.len() + binds.len() * 2);
    let mut in_literal = false;
    let mut next = binds.iter();
    for c in sql.chars() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                out.push(c);
            }
            '?' if !in_literal => {
                let v = next.next().ok_or_else(|| {
                    AppError::Validation(format!("condition has more placeholders than values: {}", sql))
                })?;
                let n = q.push_param(v.clone());
                out.push_str(&format!("${}{}", n, v.cast_suffix().unwrap_or("")));
            }
            _ => out.push(c),
        }
    }
    if next.next().is_some() {
        return Err(AppError::Validation(format!(
            "condition has more values than placeholders: {}",
            sql
        )));
    }
    Ok(format!("({})", out))
}

/// `WHERE a AND b ...`, or an empty string when there are no conditions.
pub fn where_clause(conditions: &[Condition], main_alias: &str, q: &mut QueryBuf) -> Result<String, AppError> {
    let mut parts = Vec::with_capacity(conditions.len());
    for c in conditions {
        parts.push(c.render(main_alias, q)?);
    }
    if parts.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", parts.join(" AND ")))
    }
}
