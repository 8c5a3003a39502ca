//! Typed values that sqlx can bind to a PostgreSQL query.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value bound as a query parameter. Each variant encodes with its native PostgreSQL type,
/// except `Numeric`, which travels as text and is cast in SQL (see [`BindValue::cast_suffix`]).
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Numeric(String),
    Text(String),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(Value),
}

impl BindValue {
    pub fn text(s: impl Into<String>) -> Self {
        BindValue::Text(s.into())
    }

    /// SQL cast appended to the placeholder so text-encoded values compare against the right type.
    pub fn cast_suffix(&self) -> Option<&'static str> {
        match self {
            BindValue::Numeric(_) => Some("::numeric"),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            BindValue::Text(s) | BindValue::Numeric(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// JSON rendering, used for debug logs and in-memory stores.
    pub fn to_json(&self) -> Value {
        match self {
            BindValue::Null => Value::Null,
            BindValue::Bool(b) => Value::Bool(*b),
            BindValue::I64(n) => Value::Number((*n).into()),
            BindValue::F64(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            BindValue::Numeric(s) | BindValue::Text(s) => Value::String(s.clone()),
            BindValue::Uuid(u) => Value::String(u.to_string()),
            BindValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            BindValue::Timestamp(d) => Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            BindValue::TimestampTz(d) => Value::String(d.to_rfc3339()),
            BindValue::Json(v) => v.clone(),
        }
    }
}

impl<'q> Encode<'q, Postgres> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        match self {
            BindValue::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf),
            BindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf),
            BindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf),
            BindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf),
            BindValue::Numeric(s) | BindValue::Text(s) => {
                <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf)
            }
            BindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf),
            BindValue::Date(d) => <NaiveDate as Encode<Postgres>>::encode_by_ref(d, buf),
            BindValue::Timestamp(d) => <NaiveDateTime as Encode<Postgres>>::encode_by_ref(d, buf),
            BindValue::TimestampTz(d) => <DateTime<Utc> as Encode<Postgres>>::encode_by_ref(d, buf),
            BindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            BindValue::Null | BindValue::Numeric(_) | BindValue::Text(_) => <String as Type<Postgres>>::type_info(),
            BindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            BindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            BindValue::F64(_) => <f64 as Type<Postgres>>::type_info(),
            BindValue::Uuid(_) => <uuid::Uuid as Type<Postgres>>::type_info(),
            BindValue::Date(_) => <NaiveDate as Type<Postgres>>::type_info(),
            BindValue::Timestamp(_) => <NaiveDateTime as Type<Postgres>>::type_info(),
            BindValue::TimestampTz(_) => <DateTime<Utc> as Type<Postgres>>::type_info(),
            BindValue::Json(_) => <Value as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for BindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}
