//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod access;
mod front_office;

pub use access::verify_access;
pub use front_office::FrontOffice;
