//! Raw request strings to typed bind values, and the per-column filter condition.

use crate::config::{ColumnMeta, ColumnType};
use crate::error::AppError;
use crate::service::context::ParamValue;
use crate::sql::{BindValue, ColumnRef, Condition, MatchValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const TRUE_VALUES: &[&str] = &["1", "t", "true", "on", "yes", "y"];
const FALSE_VALUES: &[&str] = &["0", "f", "false", "off", "no", "n"];

fn coercion_error(column: &ColumnMeta, raw: &str) -> AppError {
    AppError::TypeCoercion {
        column: column.name.clone(),
        value: raw.to_string(),
        expected: column.pg_type.clone(),
    }
}

/// Cast `raw` to the column's native type. Unknown types pass through as text (cast in SQL).
pub fn coerce(raw: &str, column: &ColumnMeta) -> Result<BindValue, AppError> {
    let s = raw.trim();
    let err = || coercion_error(column, raw);
    Ok(match column.column_type {
        ColumnType::String | ColumnType::Text | ColumnType::Other => BindValue::Text(raw.to_string()),
        ColumnType::Integer => BindValue::I64(s.parse().map_err(|_| err())?),
        ColumnType::Float => BindValue::F64(s.parse().map_err(|_| err())?),
        ColumnType::Decimal => {
            s.parse::<f64>().map_err(|_| err())?;
            BindValue::Numeric(s.to_string())
        }
        ColumnType::Boolean => {
            let lower = s.to_lowercase();
            if TRUE_VALUES.contains(&lower.as_str()) {
                BindValue::Bool(true)
            } else if FALSE_VALUES.contains(&lower.as_str()) {
                BindValue::Bool(false)
            } else {
                return Err(err());
            }
        }
        ColumnType::Date => BindValue::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| err())?),
        ColumnType::Timestamp => BindValue::Timestamp(parse_naive_datetime(s).ok_or_else(err)?),
        ColumnType::TimestampTz => {
            let parsed = DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .ok()
                .or_else(|| parse_naive_datetime(s).map(|d| d.and_utc()));
            BindValue::TimestampTz(parsed.ok_or_else(err)?)
        }
        ColumnType::Uuid => BindValue::Uuid(uuid::Uuid::parse_str(s).map_err(|_| err())?),
        ColumnType::Json => BindValue::Json(serde_json::from_str(s).map_err(|_| err())?),
    })
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Escape LIKE metacharacters so the value matches literally.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Filter condition for a request value on a known column of `table_alias`:
/// list → IN, blank on a nullable column → IS NULL, string-like → case-insensitive exact match,
/// anything else → equality on the coerced value.
pub fn condition_for_column(table_alias: &str, column: &ColumnMeta, raw: &ParamValue) -> Result<Condition, AppError> {
    let column_ref = ColumnRef::qualified(table_alias, column.name.clone());
    let cast = if column.column_type.is_string_like() {
        None
    } else {
        Some(column.pg_type.clone())
    };
    let value = match raw {
        ParamValue::List(items) => return Ok(Condition::Match {
            column: column_ref,
            value: MatchValue::In(items.iter().map(|s| BindValue::Text(s.clone())).collect()),
            cast,
        }),
        ParamValue::Single(s) => s,
    };

    if value.trim().is_empty() && column.nullable {
        return Ok(Condition::Match {
            column: column_ref,
            value: MatchValue::Null,
            cast: None,
        });
    }
    if column.column_type.is_string_like() {
        return Ok(Condition::fragment(
            format!("LOWER({}) LIKE ?", column_ref.to_sql(table_alias)),
            vec![BindValue::Text(escape_like(&value.to_lowercase()))],
        ));
    }
    Ok(Condition::Match {
        column: column_ref,
        value: MatchValue::Eq(coerce(value, column)?),
        cast,
    })
}
