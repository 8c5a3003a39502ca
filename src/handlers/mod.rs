//! HTTP handlers for the picker actions.

pub mod picker;
pub use picker::*;
