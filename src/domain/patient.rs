//! Patient roster types for the clinic front office.
//!
//! A roster row carries the demographic history captured at the front desk,
//! the optional eye photographs, and the specialist's report text.

use serde::{Deserialize, Serialize};

/// Store-assigned patient identity. Unique, ascending, never reused.
pub type PatientId = i64;

/// The full caller-supplied field set of a patient row.
///
/// Updates replace every field at once; there is no partial patch.
/// `None` in an optional slot is distinct from an empty value: a missing
/// photograph is not an empty photograph.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Full name
    pub name: String,

    /// Age as entered at the desk (free text, e.g. "64")
    pub age: String,

    /// Sex as entered at the desk
    pub sex: String,

    /// Postal address
    pub address: String,

    /// Government identity document number
    pub national_id: String,

    /// Contact phone number
    pub phone: String,

    /// Free-text prior symptoms; may be empty
    pub prior_symptoms: String,

    /// Raw PNG/JPEG bytes of the right-eye photograph
    pub right_eye_image: Option<Vec<u8>>,

    /// Raw PNG/JPEG bytes of the left-eye photograph
    pub left_eye_image: Option<Vec<u8>>,

    /// Specialist's medical report, written independently of the history
    pub report_text: Option<String>,

    /// "Already reviewed" mark from the roster screen
    pub reviewed: bool,
}

impl PatientRecord {
    /// Validate that the mandatory demographic fields are present.
    ///
    /// Mandatory: name, age, sex, address, national id, phone. Prior
    /// symptoms, photographs and the report are optional.
    ///
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (label, value) in [
            ("name", &self.name),
            ("age", &self.age),
            ("sex", &self.sex),
            ("address", &self.address),
            ("national id", &self.national_id),
            ("phone", &self.phone),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("Field '{label}' is required"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// Manual Debug: photographs are dumped as lengths, not bytes, so a stray
// `{:?}` in a log line cannot spill megabytes of image data.
impl std::fmt::Debug for PatientRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatientRecord")
            .field("name", &self.name)
            .field("age", &self.age)
            .field("sex", &self.sex)
            .field("address", &self.address)
            .field("national_id", &self.national_id)
            .field("phone", &self.phone)
            .field("prior_symptoms_len", &self.prior_symptoms.len())
            .field("right_eye_image", &self.right_eye_image.as_ref().map(Vec::len))
            .field("left_eye_image", &self.left_eye_image.as_ref().map(Vec::len))
            .field("report_text_len", &self.report_text.as_ref().map(String::len))
            .field("reviewed", &self.reviewed)
            .finish()
    }
}

/// A persisted patient row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Store-assigned identity
    pub id: PatientId,

    /// Caller-supplied field set
    pub record: PatientRecord,

    /// When the row was first inserted (store-assigned)
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// When the row was last replaced (store-assigned)
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Roster line for browsing screens and the `roster` utility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: PatientId,
    pub name: String,
    pub age: String,
    pub sex: String,
    pub phone: String,
    pub reviewed: bool,
    pub has_images: bool,
    pub has_report: bool,
}

impl From<&Patient> for PatientSummary {
    fn from(patient: &Patient) -> Self {
        let record = &patient.record;
        Self {
            id: patient.id,
            name: record.name.clone(),
            age: record.age.clone(),
            sex: record.sex.clone(),
            phone: record.phone.clone(),
            reviewed: record.reviewed,
            has_images: record.right_eye_image.is_some() || record.left_eye_image.is_some(),
            has_report: record.report_text.is_some(),
        }
    }
}
