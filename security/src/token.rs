// security/src/token.rs

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use models::medical::{EntityId, Staff, StaffRole};
use serde::{Deserialize, Serialize};

use crate::CredentialError;

/// Claims for a staff session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Staff id
    pub org_id: EntityId,
    pub employee_id: String,
    pub role: StaffRole,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    pub fn staff_id(&self) -> Option<EntityId> {
        self.sub.parse().ok()
    }
}

/// Issues and verifies HS256 session tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl_hours: u64) -> Self {
        TokenIssuer {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs: ttl_hours.saturating_mul(60 * 60),
        }
    }

    pub fn issue(&self, staff: &Staff) -> Result<String, CredentialError> {
        let now = unix_now()?;
        let claims = Claims {
            sub: staff.id.to_string(),
            org_id: staff.organization_id,
            employee_id: staff.employee_id.clone(),
            role: staff.role,
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| CredentialError::Jwt(format!("Failed to encode JWT: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, CredentialError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| CredentialError::Jwt(format!("Failed to decode or validate JWT: {}", e)))
    }
}

fn unix_now() -> Result<u64, CredentialError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| CredentialError::Clock(e.to_string()))
}
