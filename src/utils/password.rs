// Account password hashing
// Accounts created here get Argon2id; accounts imported from the old user store
// keep their bcrypt hash until the next successful login replaces it.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    Hashing(String),

    #[error("Failed to verify password: {0}")]
    Verification(String),

    #[error("Invalid password hash format")]
    UnknownFormat,
}

/// Which algorithm produced a stored hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    Argon2id,
    Bcrypt,
}

impl HashScheme {
    pub fn detect(stored: &str) -> Option<Self> {
        match stored.get(..4) {
            Some("$2a$" | "$2b$" | "$2y$") => Some(HashScheme::Bcrypt),
            _ if stored.starts_with("$argon2") => Some(HashScheme::Argon2id),
            _ => None,
        }
    }
}

/// Argon2id cost settings
pub struct PasswordConfig {
    /// KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        // OWASP minimum for Argon2id
        Self {
            memory_cost: 19_456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl PasswordConfig {
    fn argon2(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, Some(32))
            .map_err(|e| PasswordError::Hashing(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    PasswordConfig::default().hash(password)
}

/// Check a login attempt against whatever scheme the stored hash uses.
/// Argon2 parameters are read from the PHC string itself.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    match HashScheme::detect(stored).ok_or(PasswordError::UnknownFormat)? {
        HashScheme::Bcrypt => bcrypt::verify(password, stored)
            .map_err(|e| PasswordError::Verification(e.to_string())),
        HashScheme::Argon2id => {
            let parsed = PasswordHash::new(stored).map_err(|_| PasswordError::UnknownFormat)?;
            match Argon2::default().verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(PasswordError::Verification(e.to_string())),
            }
        },
    }
}

pub fn needs_rehash(stored: &str) -> bool {
    HashScheme::detect(stored) == Some(HashScheme::Bcrypt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordConfig {
        PasswordConfig {
            memory_cost: 4096,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_argon2_roundtrip() {
        let hash = cheap().hash("Passw0rd123").unwrap();

        assert_eq!(HashScheme::detect(&hash), Some(HashScheme::Argon2id));
        assert!(verify_password("Passw0rd123", &hash).unwrap());
        assert!(!verify_password("Passw0rd124", &hash).unwrap());
        assert!(!needs_rehash(&hash));
    }

    #[test]
    fn test_each_hash_gets_its_own_salt() {
        assert_ne!(cheap().hash("same").unwrap(), cheap().hash("same").unwrap());
    }

    #[test]
    fn test_imported_bcrypt_hash() {
        let imported = bcrypt::hash("counsellor-pass", 4).unwrap();

        assert_eq!(HashScheme::detect(&imported), Some(HashScheme::Bcrypt));
        assert!(needs_rehash(&imported));
        assert!(verify_password("counsellor-pass", &imported).unwrap());
        assert!(!verify_password("nope", &imported).unwrap());
    }

    #[test]
    fn test_unrecognised_hash() {
        assert!(matches!(
            verify_password("password", "plain-text-password"),
            Err(PasswordError::UnknownFormat)
        ));
    }
}
