//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `sqlite`: SQLite for local storage
//! - `pdf`: printpdf for report export
//! - `sanitize`: PII filtering for logs

pub mod pdf;
pub mod sanitize;
pub mod sqlite;

// Re-export adapter errors for lib.rs
pub use pdf::RenderError;
pub use sqlite::StorageError;
