// Email verification tokens and one-time code checks

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::app_config::AppConfig;

#[derive(Error, Debug, PartialEq)]
pub enum VerificationError {
    #[error("Invalid OTP")]
    InvalidCode,

    #[error("Invalid or expired verification token")]
    InvalidToken,

    #[error("Email already verified")]
    AlreadyVerified,
}

/// A freshly issued email verification token. Only the digest is stored;
/// the raw token goes to the user.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Verification service for email tokens and OTP codes
#[derive(Clone)]
pub struct VerificationService {
    static_otp_code: String,
    token_ttl: Duration,
}

impl VerificationService {
    pub fn new(static_otp_code: String, token_ttl_hours: i64) -> Self {
        Self {
            static_otp_code,
            token_ttl: Duration::hours(token_ttl_hours.max(1)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.security.static_otp_code.clone(),
            config.security.email_verification_ttl_hours,
        )
    }

    /// SHA-256 hex digest used to look tokens up
    pub fn hash_token(token: &str) -> String {
        format!("{:x}", Sha256::digest(token.as_bytes()))
    }

    pub fn issue_email_token(&self, now: DateTime<Utc>) -> IssuedToken {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        IssuedToken {
            token_hash: Self::hash_token(&token),
            token,
            expires_at: now + self.token_ttl,
        }
    }

    /// Compare a submitted OTP with the configured code in constant time
    pub fn check_otp(&self, provided: &str) -> Result<(), VerificationError> {
        let provided = provided.trim().as_bytes();
        let expected = self.static_otp_code.as_bytes();
        if provided.len() == expected.len() && bool::from(provided.ct_eq(expected)) {
            Ok(())
        } else {
            Err(VerificationError::InvalidCode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_check() {
        let service = VerificationService::new("123456".to_string(), 24);
        assert!(service.check_otp("123456").is_ok());
        assert!(service.check_otp(" 123456 ").is_ok());
        assert_eq!(service.check_otp("654321"), Err(VerificationError::InvalidCode));
        assert_eq!(service.check_otp("12345"), Err(VerificationError::InvalidCode));
        assert_eq!(service.check_otp(""), Err(VerificationError::InvalidCode));
    }

    #[test]
    fn test_issued_token_is_hashed() {
        let service = VerificationService::new("123456".to_string(), 24);
        let now = Utc::now();
        let issued = service.issue_email_token(now);

        assert_eq!(issued.token.len(), 64);
        assert_eq!(issued.token_hash.len(), 64);
        assert_ne!(issued.token, issued.token_hash);
        assert_eq!(VerificationService::hash_token(&issued.token), issued.token_hash);
        assert_eq!(issued.expires_at, now + Duration::hours(24));
    }

    #[test]
    fn test_tokens_are_unique() {
        let service = VerificationService::new("123456".to_string(), 1);
        let a = service.issue_email_token(Utc::now());
        let b = service.issue_email_token(Utc::now());
        assert_ne!(a.token, b.token);
    }
}
