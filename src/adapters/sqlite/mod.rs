//! SQLite adapter: Implementation of PatientRepository.
//!
//! Provides local persistence for the patient roster in a single database
//! file. Autocommit mode makes every call its own durable transaction.
//!
//! # Mutex Behavior
//!
//! Database connection is protected by `Mutex`. A poisoned mutex (from panic
//! in another thread) will cause panic. This fail-fast behavior is intentional
//! for data integrity in healthcare applications.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::domain::{Patient, PatientId, PatientRecord};
use crate::ports::PatientRepository;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Patient {0} not found")]
    NotFound(PatientId),
}

/// SQLite storage adapter for the patient roster.
pub struct SqlitePatientStore {
    conn: Mutex<Connection>,
}

impl SqlitePatientStore {
    /// Open (or create) the database at the given path.
    ///
    /// # Errors
    /// Returns `StorageError::Unavailable` if the database cannot be opened
    /// or its schema cannot be initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store
            .init_schema()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(store)
    }

    /// Create an in-memory database (for testing).
    ///
    /// # Errors
    /// Returns `StorageError::Unavailable` if the database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store
            .init_schema()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(store)
    }

    /// Initialize the database schema.
    ///
    /// AUTOINCREMENT keeps deleted identities retired forever instead of
    /// letting SQLite recycle the highest rowid.
    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS patients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                age TEXT NOT NULL,
                sex TEXT NOT NULL,
                address TEXT NOT NULL,
                national_id TEXT NOT NULL,
                phone TEXT NOT NULL,
                prior_symptoms TEXT NOT NULL,
                right_eye_image BLOB,
                left_eye_image BLOB,
                report_text TEXT,
                reviewed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    /// Map one `patients` row (full column order) to a domain value.
    fn patient_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Patient> {
        let reviewed: i64 = row.get(11)?;
        let created_at_str: String = row.get(12)?;
        let updated_at_str: String = row.get(13)?;

        Ok(Patient {
            id: row.get(0)?,
            record: PatientRecord {
                name: row.get(1)?,
                age: row.get(2)?,
                sex: row.get(3)?,
                address: row.get(4)?,
                national_id: row.get(5)?,
                phone: row.get(6)?,
                prior_symptoms: row.get(7)?,
                right_eye_image: row.get(8)?,
                left_eye_image: row.get(9)?,
                report_text: row.get(10)?,
                reviewed: reviewed != 0,
            },
            created_at: Self::parse_timestamp(&created_at_str),
            updated_at: Self::parse_timestamp(&updated_at_str),
        })
    }

    /// Parse a stored RFC 3339 timestamp, falling back to now on damage.
    fn parse_timestamp(s: &str) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now())
    }
}

impl PatientRepository for SqlitePatientStore {
    type Error = StorageError;

    fn create(&self, record: &PatientRecord) -> Result<PatientId, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            r"
            INSERT INTO patients (
                name, age, sex, address, national_id, phone, prior_symptoms,
                right_eye_image, left_eye_image, report_text, reviewed,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ",
            params![
                record.name,
                record.age,
                record.sex,
                record.address,
                record.national_id,
                record.phone,
                record.prior_symptoms,
                record.right_eye_image,
                record.left_eye_image,
                record.report_text,
                record.reviewed as i64,
                now,
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Inserted patient {} into roster", id);
        Ok(id)
    }

    fn update(&self, id: PatientId, record: &PatientRecord) -> Result<(), Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        let now = chrono::Utc::now().to_rfc3339();

        let changed = conn.execute(
            r"
            UPDATE patients SET
                name = ?1, age = ?2, sex = ?3, address = ?4, national_id = ?5,
                phone = ?6, prior_symptoms = ?7, right_eye_image = ?8,
                left_eye_image = ?9, report_text = ?10, reviewed = ?11,
                updated_at = ?12
            WHERE id = ?13
            ",
            params![
                record.name,
                record.age,
                record.sex,
                record.address,
                record.national_id,
                record.phone,
                record.prior_symptoms,
                record.right_eye_image,
                record.left_eye_image,
                record.report_text,
                record.reviewed as i64,
                now,
                id,
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::NotFound(id));
        }

        tracing::debug!("Replaced patient {} in roster", id);
        Ok(())
    }

    fn delete(&self, id: PatientId) -> Result<(), Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        let removed = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;

        // Deleting a missing row is not an error
        if removed > 0 {
            tracing::debug!("Deleted patient {} from roster", id);
        }
        Ok(())
    }

    fn get(&self, id: PatientId) -> Result<Option<Patient>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let mut stmt = conn.prepare(
            r"
            SELECT id, name, age, sex, address, national_id, phone, prior_symptoms,
                   right_eye_image, left_eye_image, report_text, reviewed,
                   created_at, updated_at
            FROM patients
            WHERE id = ?1
            ",
        )?;

        match stmt.query_row(params![id], Self::patient_from_row) {
            Ok(patient) => Ok(Some(patient)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_all(&self) -> Result<Vec<Patient>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let mut stmt = conn.prepare(
            r"
            SELECT id, name, age, sex, address, national_id, phone, prior_symptoms,
                   right_eye_image, left_eye_image, report_text, reviewed,
                   created_at, updated_at
            FROM patients
            ORDER BY id ASC
            ",
        )?;

        let patients = stmt
            .query_map([], Self::patient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patients)
    }

    fn count(&self) -> Result<usize, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;

        Ok(count as usize)
    }
}
