//! Picker actions: browse and select, plus the condition composer they share.

mod browse;
pub mod coerce;
pub mod conditions;
pub mod context;
mod select;

pub use browse::{browse, Page};
pub use coerce::{coerce, condition_for_column, escape_like};
pub use conditions::{compose_conditions, filter_params, search_condition, ColumnParam};
pub use context::{parse_page, ParamValue, RequestContext, RESERVED_KEYS};
pub use select::select;
