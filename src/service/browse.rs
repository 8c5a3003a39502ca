//! Browse: filtered, ordered, optionally paginated record listing.

use crate::config::ResourceConfig;
use crate::error::AppError;
use crate::service::conditions::{compose_conditions, describe};
use crate::service::context::RequestContext;
use crate::sql::build_browse_query;
use crate::store::RecordStore;
use serde::Serialize;
use serde_json::Value;

/// One page of records. `total` and `per_page` are None when pagination is off.
#[derive(Clone, Debug, Serialize)]
pub struct Page {
    pub records: Vec<Value>,
    pub page: u32,
    pub per_page: Option<u32>,
    pub total: Option<u64>,
}

impl Page {
    pub fn total_pages(&self) -> Option<u64> {
        match (self.total, self.per_page) {
            (Some(total), Some(per_page)) if per_page > 0 => Some(total.div_ceil(u64::from(per_page))),
            _ => None,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.per_page.is_some() && self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.total_pages().is_some_and(|pages| u64::from(self.page) < pages)
    }
}

/// Run the browse action for `config`. Count and page are two separate reads; a write between them
/// can leave the page out of step with the total.
pub async fn browse(store: &dyn RecordStore, config: &ResourceConfig, ctx: &RequestContext) -> Result<Page, AppError> {
    let controller_conditions = config.controller_conditions();
    let conditions = compose_conditions(config, ctx, &controller_conditions, config.user_includes())?;
    tracing::debug!(
        controller = %config.controller(),
        page = ctx.page,
        conditions = %describe(&conditions),
        "browse"
    );

    let query = build_browse_query(config, &conditions, ctx.page)?;
    let total = match &query.count {
        Some(count) => Some(store.count(count).await?),
        None => None,
    };
    let records = store.fetch_page(&query.page, query.window).await?;

    Ok(Page {
        records,
        page: ctx.page,
        per_page: config.per_page(),
        total,
    })
}
