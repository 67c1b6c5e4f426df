//! Front-office service: the session workflow over the patient roster.
//!
//! This service orchestrates:
//! - Staff sign-in and sign-out
//! - Roster browsing and patient selection
//! - History, report and review-mark edits
//! - Report export
//!
//! Every operation takes the explicit `Session` of the active user, so
//! concurrent users each drive their own workflow. Field-group semantics
//! (history vs. report vs. review mark) are composed here out of the
//! repository's whole-row replacement: each save re-reads the fresh row,
//! changes its own field group and writes the row back.

use std::sync::Arc;

use crate::adapters::{RenderError, StorageError};
use crate::application::access;
use crate::domain::{
    report_filename, Patient, PatientId, PatientRecord, PatientSummary, ReportDocument, Session,
};
use crate::ports::{PatientRepository, ReportRenderer};
use crate::IrisdeskError;

/// Service for the front-desk workflow.
pub struct FrontOffice<R, P>
where
    R: PatientRepository,
    P: ReportRenderer,
{
    repo: Arc<R>,
    renderer: Arc<P>,
}

impl<R, P> FrontOffice<R, P>
where
    R: PatientRepository,
    P: ReportRenderer,
    R::Error: Into<StorageError>,
    P::Error: Into<RenderError>,
{
    /// Create a new front-office service.
    pub fn new(repo: Arc<R>, renderer: Arc<P>) -> Self {
        Self { repo, renderer }
    }

    /// Sign a staff member in.
    ///
    /// On success the session moves to the no-selection state. On a failed
    /// check the session is left untouched.
    ///
    /// # Errors
    /// Returns `InvalidCredentials` when the pair is not in the staff table.
    pub fn login(
        &self,
        session: &mut Session,
        username: &str,
        password: &str,
    ) -> Result<(), IrisdeskError> {
        match access::lookup(username, password) {
            Some(role) => {
                session.begin(username.to_string(), role);
                tracing::info!("{} signed in as {} staff", username, role);
                Ok(())
            }
            None => {
                tracing::warn!("Rejected sign-in attempt for '{}'", username);
                Err(IrisdeskError::InvalidCredentials)
            }
        }
    }

    /// Sign out, dropping the username and any selection together.
    pub fn logout(&self, session: &mut Session) {
        session.end();
        tracing::info!("Session closed");
    }

    /// Browse the full roster in insertion order.
    ///
    /// # Errors
    /// Returns error when not signed in or the store fails.
    pub fn list_patients(&self, session: &Session) -> Result<Vec<Patient>, IrisdeskError> {
        self.require_login(session)?;
        self.repo
            .list_all()
            .map_err(|e| IrisdeskError::Storage(e.into()))
    }

    /// Roster lines (identity, name, flags) for browsing screens.
    ///
    /// # Errors
    /// Returns error when not signed in or the store fails.
    pub fn roster(&self, session: &Session) -> Result<Vec<PatientSummary>, IrisdeskError> {
        Ok(self
            .list_patients(session)?
            .iter()
            .map(PatientSummary::from)
            .collect())
    }

    /// Register a new patient after validating the mandatory fields.
    ///
    /// # Errors
    /// Returns `Validation` listing every missing field; nothing is written
    /// in that case.
    pub fn register_patient(
        &self,
        session: &Session,
        record: &PatientRecord,
    ) -> Result<PatientId, IrisdeskError> {
        self.require_login(session)?;
        record
            .validate()
            .map_err(|errors| IrisdeskError::Validation(errors.join("; ")))?;

        let id = self
            .repo
            .create(record)
            .map_err(|e| IrisdeskError::Storage(e.into()))?;
        tracing::info!("Registered patient {}", id);
        Ok(id)
    }

    /// Open a patient, replacing any previous selection.
    ///
    /// # Errors
    /// Returns `PatientNotFound` when the id is not in the roster; any
    /// previous selection is dropped in that case.
    pub fn select_patient(
        &self,
        session: &mut Session,
        id: PatientId,
    ) -> Result<(), IrisdeskError> {
        self.require_login(session)?;
        match self
            .repo
            .get(id)
            .map_err(|e| IrisdeskError::Storage(e.into()))?
        {
            Some(patient) => {
                session.select(patient);
                tracing::debug!("Selected patient {}", id);
                Ok(())
            }
            None => {
                session.clear_selection();
                Err(IrisdeskError::PatientNotFound(id))
            }
        }
    }

    /// Close the open patient and return to roster browsing.
    ///
    /// # Errors
    /// Returns error when not signed in.
    pub fn deselect_patient(&self, session: &mut Session) -> Result<(), IrisdeskError> {
        self.require_login(session)?;
        session.clear_selection();
        Ok(())
    }

    /// Replace the open patient's history: demographics, prior symptoms and
    /// photographs.
    ///
    /// The stored report text is preserved unless `record` carries one, and
    /// the review mark is always preserved; both belong to other screens.
    ///
    /// # Errors
    /// Returns `NoSelection` without an open patient, `Validation` for
    /// missing mandatory fields, and `PatientNotFound` (clearing the
    /// selection) when the row vanished underneath the session.
    pub fn save_history(
        &self,
        session: &mut Session,
        record: &PatientRecord,
    ) -> Result<(), IrisdeskError> {
        self.require_login(session)?;
        let current = self.fetch_selected(session)?;

        record
            .validate()
            .map_err(|errors| IrisdeskError::Validation(errors.join("; ")))?;

        let mut merged = record.clone();
        if merged.report_text.is_none() {
            merged.report_text = current.record.report_text;
        }
        merged.reviewed = current.record.reviewed;

        self.apply_update(session, current.id, &merged)?;
        tracing::info!("Saved history for patient {}", current.id);
        Ok(())
    }

    /// Write the medical report for the open patient.
    ///
    /// # Errors
    /// Returns `NoSelection` without an open patient and `PatientNotFound`
    /// (clearing the selection) when the row vanished underneath.
    pub fn save_report(&self, session: &mut Session, text: &str) -> Result<(), IrisdeskError> {
        self.require_login(session)?;
        let current = self.fetch_selected(session)?;

        let mut merged = current.record;
        merged.report_text = Some(text.to_string());

        self.apply_update(session, current.id, &merged)?;
        tracing::info!("Saved report for patient {}", current.id);
        Ok(())
    }

    /// Mark or unmark a roster entry as already reviewed.
    ///
    /// Works on any roster entry, selected or not.
    ///
    /// # Errors
    /// Returns `PatientNotFound` when the id is not in the roster.
    pub fn set_reviewed(
        &self,
        session: &mut Session,
        id: PatientId,
        reviewed: bool,
    ) -> Result<(), IrisdeskError> {
        self.require_login(session)?;
        let patient = match self
            .repo
            .get(id)
            .map_err(|e| IrisdeskError::Storage(e.into()))?
        {
            Some(patient) => patient,
            None => {
                if session.selection().map(|p| p.id) == Some(id) {
                    session.clear_selection();
                }
                return Err(IrisdeskError::PatientNotFound(id));
            }
        };

        let mut merged = patient.record;
        merged.reviewed = reviewed;
        self.apply_update(session, id, &merged)
    }

    /// Delete a roster entry. Idempotent, like the store itself.
    ///
    /// If the session's selection points at the deleted row, the session
    /// moves back to the no-selection state.
    ///
    /// # Errors
    /// Returns error when not signed in or the store fails.
    pub fn delete_patient(
        &self,
        session: &mut Session,
        id: PatientId,
    ) -> Result<(), IrisdeskError> {
        self.require_login(session)?;
        self.repo
            .delete(id)
            .map_err(|e| IrisdeskError::Storage(e.into()))?;

        if session.selection().map(|p| p.id) == Some(id) {
            session.clear_selection();
            tracing::info!("Deleted selected patient {}; selection cleared", id);
        } else {
            tracing::info!("Deleted patient {}", id);
        }
        Ok(())
    }

    /// Export the open patient's report as a named PDF document.
    ///
    /// The selection is re-validated against the store first, so the
    /// document always reflects the stored row. An unwritten report renders
    /// as an empty report section.
    ///
    /// # Errors
    /// Returns `NoSelection` without an open patient, `PatientNotFound`
    /// (clearing the selection) when the row vanished, and `Render` when a
    /// photograph cannot be decoded.
    pub fn export_report(&self, session: &mut Session) -> Result<ReportDocument, IrisdeskError> {
        self.require_login(session)?;
        let patient = self.fetch_selected(session)?;

        let text = patient.record.report_text.clone().unwrap_or_default();
        let bytes = self
            .renderer
            .render(&patient, &text)
            .map_err(|e| IrisdeskError::Render(e.into()))?;
        let filename = report_filename(&patient.record.name);

        tracing::info!(
            "Exported report for patient {} ({} bytes)",
            patient.id,
            bytes.len()
        );
        Ok(ReportDocument { filename, bytes })
    }

    fn require_login(&self, session: &Session) -> Result<(), IrisdeskError> {
        if session.is_authenticated() {
            Ok(())
        } else {
            Err(IrisdeskError::NotSignedIn)
        }
    }

    /// Re-read the selected patient from the store.
    ///
    /// A selection whose row vanished is cleared before the error surfaces.
    fn fetch_selected(&self, session: &mut Session) -> Result<Patient, IrisdeskError> {
        let id = match session.selection() {
            Some(patient) => patient.id,
            None => return Err(IrisdeskError::NoSelection),
        };

        match self
            .repo
            .get(id)
            .map_err(|e| IrisdeskError::Storage(e.into()))?
        {
            Some(patient) => Ok(patient),
            None => {
                session.clear_selection();
                tracing::warn!("Selected patient {} vanished; selection cleared", id);
                Err(IrisdeskError::PatientNotFound(id))
            }
        }
    }

    /// Write a merged record back and refresh the selection snapshot.
    fn apply_update(
        &self,
        session: &mut Session,
        id: PatientId,
        record: &PatientRecord,
    ) -> Result<(), IrisdeskError> {
        match self.repo.update(id, record) {
            Ok(()) => {
                if session.selection().map(|p| p.id) == Some(id) {
                    match self
                        .repo
                        .get(id)
                        .map_err(|e| IrisdeskError::Storage(e.into()))?
                    {
                        Some(fresh) => session.select(fresh),
                        None => session.clear_selection(),
                    }
                }
                Ok(())
            }
            Err(e) => {
                let storage: StorageError = e.into();
                if let StorageError::NotFound(missing) = storage {
                    if session.selection().map(|p| p.id) == Some(missing) {
                        session.clear_selection();
                    }
                    tracing::warn!("Update hit missing patient {}", missing);
                    return Err(IrisdeskError::PatientNotFound(missing));
                }
                Err(IrisdeskError::Storage(storage))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::pdf::PdfReportRenderer;
    use crate::adapters::sqlite::SqlitePatientStore;
    use crate::domain::SessionState;

    fn create_test_office() -> FrontOffice<SqlitePatientStore, PdfReportRenderer> {
        let repo = Arc::new(SqlitePatientStore::in_memory().expect("Should create db"));
        FrontOffice::new(repo, Arc::new(PdfReportRenderer::new()))
    }

    fn signed_in_session(
        office: &FrontOffice<SqlitePatientStore, PdfReportRenderer>,
    ) -> Session {
        let mut session = Session::new();
        office
            .login(&mut session, "personal1", "personalcontra")
            .expect("Should sign in");
        session
    }

    fn ana_ruiz() -> PatientRecord {
        PatientRecord {
            name: "Ana Ruiz".to_string(),
            age: "64".to_string(),
            sex: "F".to_string(),
            address: "Calle Mayor 12".to_string(),
            national_id: "12345678Z".to_string(),
            phone: "600111222".to_string(),
            prior_symptoms: "Dry eyes in the morning".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_login_success_and_failure() {
        let office = create_test_office();
        let mut session = Session::new();

        let err = office
            .login(&mut session, "personal1", "wrongpass")
            .expect_err("Should reject");
        assert!(matches!(err, IrisdeskError::InvalidCredentials));
        assert_eq!(session.state(), SessionState::LoggedOut);

        office
            .login(&mut session, "personal1", "personalcontra")
            .expect("Should sign in");
        assert_eq!(session.state(), SessionState::NoSelection);
        assert_eq!(session.username(), Some("personal1"));
    }

    #[test]
    fn test_operations_require_login() {
        let office = create_test_office();
        let mut session = Session::new();

        assert!(matches!(
            office.list_patients(&session),
            Err(IrisdeskError::NotSignedIn)
        ));
        assert!(matches!(
            office.register_patient(&session, &ana_ruiz()),
            Err(IrisdeskError::NotSignedIn)
        ));
        assert!(matches!(
            office.select_patient(&mut session, 1),
            Err(IrisdeskError::NotSignedIn)
        ));
        assert!(matches!(
            office.export_report(&mut session),
            Err(IrisdeskError::NotSignedIn)
        ));
    }

    #[test]
    fn test_register_validates_mandatory_fields() {
        let office = create_test_office();
        let session = signed_in_session(&office);

        let incomplete = PatientRecord {
            name: "Ana Ruiz".to_string(),
            ..Default::default()
        };
        let err = office
            .register_patient(&session, &incomplete)
            .expect_err("Should reject");
        assert!(matches!(err, IrisdeskError::Validation(_)));

        // Nothing was written
        assert!(office.list_patients(&session).expect("Should list").is_empty());
    }

    #[test]
    fn test_register_and_roster() {
        let office = create_test_office();
        let session = signed_in_session(&office);

        let id = office
            .register_patient(&session, &ana_ruiz())
            .expect("Should register");
        assert_eq!(id, 1);

        let roster = office.roster(&session).expect("Should list");
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].name, "Ana Ruiz");
        assert!(!roster[0].has_report);
    }

    #[test]
    fn test_select_and_deselect() {
        let office = create_test_office();
        let mut session = signed_in_session(&office);

        let id = office
            .register_patient(&session, &ana_ruiz())
            .expect("Should register");

        office
            .select_patient(&mut session, id)
            .expect("Should select");
        assert_eq!(session.state(), SessionState::PatientSelected(id));
        assert_eq!(
            session.selection().map(|p| p.record.name.as_str()),
            Some("Ana Ruiz")
        );

        office
            .deselect_patient(&mut session)
            .expect("Should deselect");
        assert_eq!(session.state(), SessionState::NoSelection);
    }

    #[test]
    fn test_select_missing_patient_clears_selection() {
        let office = create_test_office();
        let mut session = signed_in_session(&office);

        let id = office
            .register_patient(&session, &ana_ruiz())
            .expect("Should register");
        office
            .select_patient(&mut session, id)
            .expect("Should select");

        let err = office
            .select_patient(&mut session, 999)
            .expect_err("Should fail");
        assert!(matches!(err, IrisdeskError::PatientNotFound(999)));
        assert_eq!(session.state(), SessionState::NoSelection);
    }

    #[test]
    fn test_save_history_preserves_report_and_review_mark() {
        let office = create_test_office();
        let mut session = signed_in_session(&office);

        let id = office
            .register_patient(&session, &ana_ruiz())
            .expect("Should register");
        office
            .select_patient(&mut session, id)
            .expect("Should select");
        office
            .save_report(&mut session, "Visión normal")
            .expect("Should save report");
        office
            .set_reviewed(&mut session, id, true)
            .expect("Should mark");

        let mut history = ana_ruiz();
        history.phone = "699000111".to_string();
        office
            .save_history(&mut session, &history)
            .expect("Should save history");

        let fresh = session.selection().expect("Should stay selected");
        assert_eq!(fresh.record.phone, "699000111");
        assert_eq!(fresh.record.report_text.as_deref(), Some("Visión normal"));
        assert!(fresh.record.reviewed);
    }

    #[test]
    fn test_save_history_validates() {
        let office = create_test_office();
        let mut session = signed_in_session(&office);

        let id = office
            .register_patient(&session, &ana_ruiz())
            .expect("Should register");
        office
            .select_patient(&mut session, id)
            .expect("Should select");

        let incomplete = PatientRecord {
            name: "Ana Ruiz".to_string(),
            ..Default::default()
        };
        let err = office
            .save_history(&mut session, &incomplete)
            .expect_err("Should reject");
        assert!(matches!(err, IrisdeskError::Validation(_)));

        // Stored row is untouched
        let stored = &session.selection().expect("Should stay selected").record;
        assert_eq!(stored.age, "64");
    }

    #[test]
    fn test_save_report_requires_selection() {
        let office = create_test_office();
        let mut session = signed_in_session(&office);

        let err = office
            .save_report(&mut session, "Visión normal")
            .expect_err("Should fail");
        assert!(matches!(err, IrisdeskError::NoSelection));
    }

    #[test]
    fn test_delete_selected_patient_invalidates_selection() {
        let office = create_test_office();
        let mut session = signed_in_session(&office);

        let id = office
            .register_patient(&session, &ana_ruiz())
            .expect("Should register");
        office
            .select_patient(&mut session, id)
            .expect("Should select");

        office
            .delete_patient(&mut session, id)
            .expect("Should delete");
        assert_eq!(session.state(), SessionState::NoSelection);

        // Follow-up reads on the gone patient fail cleanly
        let err = office
            .export_report(&mut session)
            .expect_err("Should fail");
        assert!(matches!(err, IrisdeskError::NoSelection));
    }

    #[test]
    fn test_delete_other_patient_keeps_selection() {
        let office = create_test_office();
        let mut session = signed_in_session(&office);

        let ana = office
            .register_patient(&session, &ana_ruiz())
            .expect("Should register");
        let mut other = ana_ruiz();
        other.name = "Bruno Pérez".to_string();
        let bruno = office
            .register_patient(&session, &other)
            .expect("Should register");

        office
            .select_patient(&mut session, ana)
            .expect("Should select");
        office
            .delete_patient(&mut session, bruno)
            .expect("Should delete");

        assert_eq!(session.state(), SessionState::PatientSelected(ana));
    }

    #[test]
    fn test_edit_after_external_delete_clears_selection() {
        let office = create_test_office();
        let mut session = signed_in_session(&office);

        let id = office
            .register_patient(&session, &ana_ruiz())
            .expect("Should register");
        office
            .select_patient(&mut session, id)
            .expect("Should select");

        // Another session removes the row underneath this one
        let mut other = signed_in_session(&office);
        office
            .delete_patient(&mut other, id)
            .expect("Should delete");

        let err = office
            .save_report(&mut session, "Visión normal")
            .expect_err("Should fail");
        assert!(matches!(err, IrisdeskError::PatientNotFound(_)));
        assert_eq!(session.state(), SessionState::NoSelection);
    }

    #[test]
    fn test_sessions_are_independent() {
        let office = create_test_office();
        let mut desk = signed_in_session(&office);
        let specialist = Session::new();

        let id = office
            .register_patient(&desk, &ana_ruiz())
            .expect("Should register");
        office.select_patient(&mut desk, id).expect("Should select");

        // The other session is still logged out and unselected
        assert_eq!(specialist.state(), SessionState::LoggedOut);
        assert_eq!(desk.state(), SessionState::PatientSelected(id));
    }

    #[test]
    fn test_set_reviewed_roundtrip() {
        let office = create_test_office();
        let mut session = signed_in_session(&office);

        let id = office
            .register_patient(&session, &ana_ruiz())
            .expect("Should register");

        office
            .set_reviewed(&mut session, id, true)
            .expect("Should mark");
        assert!(office.roster(&session).expect("Should list")[0].reviewed);

        office
            .set_reviewed(&mut session, id, false)
            .expect("Should unmark");
        assert!(!office.roster(&session).expect("Should list")[0].reviewed);
    }

    #[test]
    fn test_logout_resets_state() {
        let office = create_test_office();
        let mut session = signed_in_session(&office);

        let id = office
            .register_patient(&session, &ana_ruiz())
            .expect("Should register");
        office
            .select_patient(&mut session, id)
            .expect("Should select");

        office.logout(&mut session);
        assert_eq!(session.state(), SessionState::LoggedOut);
        assert!(matches!(
            office.list_patients(&session),
            Err(IrisdeskError::NotSignedIn)
        ));
    }

    #[test]
    fn test_full_visit_flow_exports_named_report() {
        let office = create_test_office();
        let mut session = Session::new();

        office
            .login(&mut session, "personal1", "personalcontra")
            .expect("Should sign in");
        let id = office
            .register_patient(&session, &ana_ruiz())
            .expect("Should register");
        assert_eq!(id, 1);

        office
            .select_patient(&mut session, id)
            .expect("Should select");
        office
            .save_report(&mut session, "Visión normal")
            .expect("Should save report");

        let document = office.export_report(&mut session).expect("Should export");
        assert_eq!(document.filename, "Reporte_Ana_Ruiz.pdf");
        assert!(!document.bytes.is_empty());
        assert_eq!(&document.bytes[0..4], b"%PDF");

        // The stored row carries the report the document was rendered from
        let stored = session.selection().expect("Should stay selected").clone();
        assert_eq!(stored.record.report_text.as_deref(), Some("Visión normal"));

        // The document layout carries the demographics and the report body
        let blocks = crate::adapters::pdf::layout_report(&stored, "Visión normal");
        assert!(blocks.iter().any(|b| matches!(
            b,
            crate::adapters::pdf::ReportBlock::Field { label: "Name", value } if value == "Ana Ruiz"
        )));
        assert!(blocks.iter().any(|b| matches!(
            b,
            crate::adapters::pdf::ReportBlock::BoxedText { heading: "Medical Report", lines }
                if lines.iter().any(|l| l.contains("Visión normal"))
        )));
    }

    #[test]
    fn test_export_without_report_renders_empty_section() {
        let office = create_test_office();
        let mut session = signed_in_session(&office);

        let id = office
            .register_patient(&session, &ana_ruiz())
            .expect("Should register");
        office
            .select_patient(&mut session, id)
            .expect("Should select");

        let document = office.export_report(&mut session).expect("Should export");
        assert_eq!(&document.bytes[0..4], b"%PDF");
    }
}
