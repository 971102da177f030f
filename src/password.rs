//! Salted password hashing for dashboard credentials

use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};

/// Well-formed hash at [`DEFAULT_COST`] that no password is expected to match
///
/// Checked against when the account does not exist, so the response takes as long as for a
/// wrong password.
pub const DUMMY_HASH: &str = "$2a$12$R9h/cIPz0gi.URNNX3kh2OPST9/PgBkqquzi.Ss7KIUgO2t0jWMUW";

/// Hash a password with a freshly generated salt
pub fn hash_password(password: &str) -> Result<String, BcryptError> {
    hash(password, DEFAULT_COST)
}

/// Check a plaintext password against a stored bcrypt hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, BcryptError> {
    verify(password, password_hash)
}
