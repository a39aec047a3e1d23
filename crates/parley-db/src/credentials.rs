use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::Database;
use crate::models::UserRow;

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("password hashing failed: {}", e))
}

/// Verify a password against a stored hash. Unparseable hashes verify false.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

impl Database {
    /// Look up a user and check the password in one step. `None` covers both
    /// an unknown username and a wrong password; callers that need to tell
    /// the two apart query the user first.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<UserRow>> {
        let Some(user) = self.get_user_by_username(username)? else {
            return Ok(None);
        };
        if verify_password(password, &user.password) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn verify_credentials_covers_unknown_user_and_bad_password() {
        let db = Database::open_in_memory().unwrap();
        let hash = hash_password("secret99").unwrap();
        db.create_user("u1", "alice", &hash, "Alice").unwrap();

        assert!(db.verify_credentials("alice", "secret99").unwrap().is_some());
        assert!(db.verify_credentials("alice", "nope").unwrap().is_none());
        assert!(db.verify_credentials("bob", "secret99").unwrap().is_none());
    }
}
