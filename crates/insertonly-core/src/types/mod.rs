//! Core types for insertonly.

mod association;
mod record;

pub use association::*;
pub use record::*;
