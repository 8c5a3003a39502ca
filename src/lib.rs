//! Record select: a searchable, paginated record picker served over HTTP, with the markup
//! helpers that wire picker widgets into forms.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;
pub mod view;
pub mod widget;

pub use config::{introspect_columns, load_from_path, resolve, HookTable, PickerConfig, Registry, ResourceConfig};
pub use error::{AppError, ConfigError};
pub use routes::{common_routes, picker_routes};
pub use service::{browse, compose_conditions, select, Page, RequestContext};
pub use sql::{BindValue, Condition};
pub use state::AppState;
pub use store::{MemoryStore, PgRecordStore, RecordStore};
pub use widget::{RenderMode, WidgetDescriptor, WidgetKind, Widgets};
