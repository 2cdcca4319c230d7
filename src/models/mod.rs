//! Core data models for usage statistics.

mod detail;
mod document;
mod nature;
mod stats;

pub use detail::*;
pub use document::*;
pub use nature::*;
pub use stats::*;
