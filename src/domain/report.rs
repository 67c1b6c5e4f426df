//! Report document naming.

/// A rendered report ready to hand to the caller.
///
/// The bytes are produced fresh on every export and are not retained
/// anywhere in the system.
#[derive(Clone)]
pub struct ReportDocument {
    /// Deterministic download name, `Reporte_<name>.pdf`
    pub filename: String,
    /// The finished PDF
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ReportDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportDocument")
            .field("filename", &self.filename)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// Derive the deterministic export file name from a patient name.
///
/// Whitespace runs collapse to a single `_`; alphanumeric characters
/// (including accented letters), `-` and `_` pass through; everything else
/// is dropped so the name stays filesystem-safe. An unusable name falls
/// back to `paciente`.
#[must_use]
pub fn report_filename(patient_name: &str) -> String {
    let mut cleaned = String::with_capacity(patient_name.len());
    let mut pending_gap = false;

    for c in patient_name.trim().chars() {
        if c.is_whitespace() {
            pending_gap = !cleaned.is_empty();
        } else if c.is_alphanumeric() || c == '-' || c == '_' {
            if pending_gap {
                cleaned.push('_');
                pending_gap = false;
            }
            cleaned.push(c);
        }
    }

    if cleaned.is_empty() {
        cleaned.push_str("paciente");
    }

    format!("Reporte_{cleaned}.pdf")
}
