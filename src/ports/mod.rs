//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (storage, PDF rendering).

mod renderer;
mod repository;

pub use renderer::ReportRenderer;
pub use repository::PatientRepository;
