//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no external dependencies.
//! Image attachments stay opaque byte blobs here; only the PDF adapter
//! ever decodes them.

mod patient;
mod report;
mod session;

pub use patient::{Patient, PatientId, PatientRecord, PatientSummary};
pub use report::{report_filename, ReportDocument};
pub use session::{Session, SessionState, StaffRole};
