//! Session state for one interactive front-desk login.
//!
//! One `Session` per active user, created logged-out and mutated by the
//! workflow layer. It is never a process-wide global, so two concurrent
//! users cannot observe each other's sign-in or selection.
//!
//! The selected patient is a snapshot copied at selection time. It can go
//! stale if the backing row changes; the workflow layer re-validates it
//! against the store before reads that matter.

use crate::domain::{Patient, PatientId};

/// Staff classes in the fixed credential table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffRole {
    /// Front-desk personnel
    General,
    /// Eye specialist
    Specialist,
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Specialist => write!(f, "specialist"),
        }
    }
}

/// Discrete workflow states, derived from the session contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nobody signed in
    LoggedOut,
    /// Signed in, browsing the roster
    NoSelection,
    /// Signed in with a patient open
    PatientSelected(PatientId),
}

/// Per-login state: who is signed in and which patient is open.
///
/// Invariant: a selection only exists while signed in. The mutators keep
/// this true (`begin` and `end` both drop the selection), so `state()` can
/// never report a selection for a logged-out session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    username: Option<String>,
    role: Option<StaffRole>,
    selection: Option<Patient>,
}

impl Session {
    /// Create a fresh logged-out session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a staff member is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    /// Signed-in username, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Signed-in staff class, if any.
    #[must_use]
    pub fn role(&self) -> Option<StaffRole> {
        self.role
    }

    /// Snapshot of the selected patient, if any.
    #[must_use]
    pub fn selection(&self) -> Option<&Patient> {
        self.selection.as_ref()
    }

    /// Current discrete workflow state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        match (&self.username, &self.selection) {
            (None, _) => SessionState::LoggedOut,
            (Some(_), None) => SessionState::NoSelection,
            (Some(_), Some(patient)) => SessionState::PatientSelected(patient.id),
        }
    }

    /// Mark the session signed in. Any previous selection is dropped.
    pub(crate) fn begin(&mut self, username: String, role: StaffRole) {
        self.username = Some(username);
        self.role = Some(role);
        self.selection = None;
    }

    /// Replace the selection snapshot.
    pub(crate) fn select(&mut self, patient: Patient) {
        self.selection = Some(patient);
    }

    /// Drop the selection, returning to roster browsing.
    pub(crate) fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Sign out, dropping username, role and selection together.
    pub(crate) fn end(&mut self) {
        self.username = None;
        self.role = None;
        self.selection = None;
    }
}
