//! Core traits for insertonly storage providers.

mod backend;

pub use backend::*;
