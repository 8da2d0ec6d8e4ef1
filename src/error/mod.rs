//! Error types

pub mod types;

pub use types::{DaoError, ErrorFault};
