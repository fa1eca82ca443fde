//! Shared types

pub mod error;

pub use error::{ReporterError, Result};
