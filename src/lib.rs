//! # Irisdesk
//!
//! Local-first front-office system for a small eye clinic.
//!
//! This crate provides:
//! - A patient roster persisted in a single local SQLite file
//! - A per-user session workflow (sign-in, patient selection, edits)
//! - PDF export of the specialist's medical report
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (Patient, Session, report naming)
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (SQLite, printpdf, log sanitizing)
//! - `application`: Use cases orchestrating domain and ports

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub use application::{verify_access, FrontOffice};
pub use domain::{Patient, PatientId, PatientRecord, Session, SessionState};

/// Result type for Irisdesk operations
pub type Result<T> = std::result::Result<T, IrisdeskError>;

/// Main error type for Irisdesk
#[derive(Debug, thiserror::Error)]
pub enum IrisdeskError {
    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Report rendering failed: {0}")]
    Render(#[from] adapters::RenderError),

    #[error("Invalid patient data: {0}")]
    Validation(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("No staff member is signed in")]
    NotSignedIn,

    #[error("No patient is selected")]
    NoSelection,

    #[error("Patient {0} not found")]
    PatientNotFound(domain::PatientId),
}
