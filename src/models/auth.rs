// Token claims carried by every bearer token

use serde::{Deserialize, Serialize};

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// User ID (subject)
    pub sub: String,

    /// Unique token id
    pub jti: String,

    pub email: String,

    /// admin, manager, counsellor or user
    pub role: String,

    pub aud: String,
    pub iss: String,

    /// Issued at (Unix epoch seconds)
    pub iat: u64,

    /// Expires at (Unix epoch seconds)
    pub exp: u64,
}

impl AccessTokenClaims {
    pub fn is_expired(&self, now: u64) -> bool {
        self.exp <= now
    }
}
