//! Access control: fixed staff credential verification.
//!
//! The clinic runs on a fixed allow-list of two staff accounts; there is no
//! user management, lockout or rate limiting. Verification is an exact,
//! case-sensitive match. The table stores SHA-256 digests so the binary
//! carries no plaintext passwords, but the observable behavior is identical
//! to a direct comparison.

use sha2::{Digest, Sha256};

use crate::domain::StaffRole;

/// Fixed staff allow-list: username, SHA-256 password digest (hex), class.
const STAFF_CREDENTIALS: [(&str, &str, StaffRole); 2] = [
    (
        "personal1",
        "1f4b4f0b469f05ea44f4f93dd711805e1e085f9fe5bf68e139b9eac3e2a4aa98",
        StaffRole::General,
    ),
    (
        "especialista1",
        "2b5d56cb98a5459e89af8995cb92686c134f89faaa5d70ebb997c503951c6b8f",
        StaffRole::Specialist,
    ),
];

/// Check a username/password pair against the fixed staff table.
///
/// Returns `true` only for an exact, case-sensitive match of both values.
/// No side effects: failed attempts are not counted anywhere.
#[must_use]
pub fn verify_access(username: &str, password: &str) -> bool {
    lookup(username, password).is_some()
}

/// Verify a pair and return the staff class on success.
pub(crate) fn lookup(username: &str, password: &str) -> Option<StaffRole> {
    let digest = password_digest(password);
    STAFF_CREDENTIALS
        .iter()
        .find_map(|(user, stored, role)| {
            (*user == username && *stored == digest.as_str()).then_some(*role)
        })
}

/// Hex SHA-256 of a password, matching the stored table entries.
fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_accounts_verify() {
        assert!(verify_access("personal1", "personalcontra"));
        assert!(verify_access("especialista1", "especialistacontra"));
    }

    #[test]
    fn test_wrong_password_rejected() {
        assert!(!verify_access("personal1", "wrongpass"));
        assert!(!verify_access("especialista1", "personalcontra"));
    }

    #[test]
    fn test_unknown_username_rejected() {
        assert!(!verify_access("admin", "personalcontra"));
        assert!(!verify_access("", ""));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        assert!(!verify_access("Personal1", "personalcontra"));
        assert!(!verify_access("personal1", "Personalcontra"));
    }

    #[test]
    fn test_near_miss_rejected() {
        assert!(!verify_access("personal1", "personalcontra "));
        assert!(!verify_access("personal1", "personalcontr"));
    }

    #[test]
    fn test_roles_follow_account() {
        assert_eq!(
            lookup("personal1", "personalcontra"),
            Some(StaffRole::General)
        );
        assert_eq!(
            lookup("especialista1", "especialistacontra"),
            Some(StaffRole::Specialist)
        );
        assert_eq!(lookup("personal1", "especialistacontra"), None);
    }

    #[test]
    fn test_digest_matches_table_format() {
        let digest = password_digest("personalcontra");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, STAFF_CREDENTIALS[0].1);
    }
}
