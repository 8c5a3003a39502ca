//! Select: confirm the chosen record exists and hand it to the notify hook.

use crate::config::ResourceConfig;
use crate::error::AppError;
use crate::service::coerce::coerce;
use crate::sql::{select_by_id, BindValue};
use crate::store::RecordStore;
use serde_json::Value;

/// Look up `raw_id` and call the notify hook once with the record. An id that does not fit the
/// primary key type is reported as not found; the hook is never called for a missing record.
pub async fn select(store: &dyn RecordStore, config: &ResourceConfig, raw_id: &str) -> Result<Value, AppError> {
    let not_found = || AppError::NotFound(format!("{} {}", config.controller(), raw_id));
    let id = match config.primary_key_column() {
        Some(column) => coerce(raw_id, column).map_err(|_| not_found())?,
        None => BindValue::text(raw_id),
    };

    let q = select_by_id(config, id);
    let record = store.fetch_one(&q).await?.ok_or_else(not_found)?;

    match config.notify() {
        Some(hook) => {
            hook.call(&record)?;
            tracing::info!(controller = %config.controller(), id = %raw_id, "record selected");
        }
        None => tracing::debug!(controller = %config.controller(), id = %raw_id, "record selected, no notify hook"),
    }
    Ok(record)
}
