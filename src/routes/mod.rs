//! Router builders.

mod common;
mod picker;

pub use common::common_routes;
pub use picker::picker_routes;
