//! Record storage seam. Services build queries; a store runs them and hands back JSON rows.

use crate::error::AppError;
use crate::sql::{QueryBuf, Window};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Run a `SELECT COUNT(...)` query.
    async fn count(&self, q: &QueryBuf) -> Result<u64, AppError>;

    /// Run a page query. `window` is already rendered into the SQL; stores that do not speak SQL
    /// slice by it instead.
    async fn fetch_page(&self, q: &QueryBuf, window: Option<Window>) -> Result<Vec<Value>, AppError>;

    async fn fetch_one(&self, q: &QueryBuf) -> Result<Option<Value>, AppError>;

    /// Readiness check.
    async fn ping(&self) -> Result<(), AppError>;
}

/// PostgreSQL store over a shared pool owned by the host application.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        PgRecordStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn query(q: &QueryBuf) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        query
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn count(&self, q: &QueryBuf) -> Result<u64, AppError> {
        use sqlx::Row;
        let row = Self::query(q).fetch_one(&self.pool).await?;
        let n: i64 = row.try_get(0)?;
        Ok(n.max(0) as u64)
    }

    async fn fetch_page(&self, q: &QueryBuf, _window: Option<Window>) -> Result<Vec<Value>, AppError> {
        let rows = Self::query(q).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_one(&self, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        let row = Self::query(q).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::{Column, Row};
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

/// Decode one cell by trying the types the builder can produce. Numeric and custom types
/// arrive as text (cast in the select list), included associations as json.
fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(f64::from(n)) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

/// In-memory store for tests and prototypes. Ignores the SQL: counts every record, slices pages by
/// the window and looks records up by primary key (the first bound parameter).
#[derive(Default)]
pub struct MemoryStore {
    records: Vec<Value>,
    primary_key: String,
    executed: std::sync::Mutex<Vec<QueryBuf>>,
}

impl MemoryStore {
    pub fn new(primary_key: impl Into<String>, records: Vec<Value>) -> Self {
        MemoryStore {
            records,
            primary_key: primary_key.into(),
            executed: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Queries seen so far, in execution order.
    pub fn executed(&self) -> Vec<QueryBuf> {
        self.executed.lock().map(|q| q.clone()).unwrap_or_default()
    }

    fn record(&self, q: &QueryBuf) {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(q.clone());
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn count(&self, q: &QueryBuf) -> Result<u64, AppError> {
        self.record(q);
        Ok(self.records.len() as u64)
    }

    async fn fetch_page(&self, q: &QueryBuf, window: Option<Window>) -> Result<Vec<Value>, AppError> {
        self.record(q);
        Ok(match window {
            Some(w) => self
                .records
                .iter()
                .skip(w.offset as usize)
                .take(w.limit as usize)
                .cloned()
                .collect(),
            None => self.records.clone(),
        })
    }

    async fn fetch_one(&self, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        self.record(q);
        let id = match q.params.first() {
            Some(id) => id.to_json(),
            None => return Ok(None),
        };
        Ok(self
            .records
            .iter()
            .find(|r| r.get(&self.primary_key) == Some(&id))
            .cloned())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
