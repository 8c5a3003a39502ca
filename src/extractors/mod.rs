//! Request extractors for the picker routes.

pub mod format;
pub mod params;

pub use format::ResponseFormat;
pub use params::{query_pairs, wants_js, BrowseParams, REQUESTED_WITH_HEADER};
