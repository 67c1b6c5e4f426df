//! Repository port: Trait for patient roster persistence.
//!
//! This trait abstracts the storage backend (SQLite) from the application logic.

use crate::domain::{Patient, PatientId, PatientRecord};

/// Trait for patient roster persistence.
///
/// Every call is its own atomic unit and is durable once it returns; no
/// transaction ever spans multiple calls. All data is stored locally and
/// never transmitted.
pub trait PatientRepository: Send + Sync {
    /// Error type for repository operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert a new row and return the assigned identity.
    ///
    /// Identities ascend in insertion order and are never reused, even
    /// after deletions.
    ///
    /// # Errors
    /// Returns error if the insert fails.
    fn create(&self, record: &PatientRecord) -> Result<PatientId, Self::Error>;

    /// Replace every caller-supplied column of the row identified by `id`.
    ///
    /// Store-assigned columns (identity, creation time) are untouched.
    ///
    /// # Errors
    /// Fails with the implementation's not-found error when `id` does not
    /// exist; nothing is written in that case.
    fn update(&self, id: PatientId, record: &PatientRecord) -> Result<(), Self::Error>;

    /// Remove the row identified by `id`.
    ///
    /// Idempotent: deleting a missing id succeeds silently.
    ///
    /// # Errors
    /// Returns error if the delete fails.
    fn delete(&self, id: PatientId) -> Result<(), Self::Error>;

    /// Point lookup.
    ///
    /// # Returns
    /// `None` when the id does not exist.
    ///
    /// # Errors
    /// Returns error if the lookup fails.
    fn get(&self, id: PatientId) -> Result<Option<Patient>, Self::Error>;

    /// Every row, in insertion order (ascending identity). The order is
    /// stable across calls with no intervening writes.
    ///
    /// # Errors
    /// Returns error if the scan fails.
    fn list_all(&self) -> Result<Vec<Patient>, Self::Error>;

    /// Total number of rows.
    ///
    /// # Errors
    /// Returns error if the count fails.
    fn count(&self) -> Result<usize, Self::Error>;
}
