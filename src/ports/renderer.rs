//! Renderer port: Trait for report document generation.
//!
//! This trait abstracts the document backend (printpdf) from the
//! application logic.

use crate::domain::Patient;

/// Trait for rendering a patient's report into a downloadable document.
///
/// Implementations are pure transformations: no store access, no mutation
/// of the input, and a failed render produces no partial document.
pub trait ReportRenderer: Send + Sync {
    /// Error type for render operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Render the full report document for `patient`.
    ///
    /// `report_text` is the medical report body, passed separately so the
    /// caller can render text that has not been saved yet.
    ///
    /// # Errors
    /// Returns error if an attached photograph cannot be decoded or the
    /// document cannot be assembled.
    fn render(&self, patient: &Patient, report_text: &str) -> Result<Vec<u8>, Self::Error>;
}
