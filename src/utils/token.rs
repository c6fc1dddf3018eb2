use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorMessage, HttpError};
use crate::models::UserRole;

/// Self-contained session claims: a validated token is the whole session,
/// there is no server-side state and no revocation list.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(
    user_id: i32,
    username: &str,
    role: UserRole,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if username.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let claims = TokenClaims {
        sub: username.to_string(),
        user_id,
        role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::seconds(expires_in_seconds)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Validate signature and expiry, pinned to HS256.
///
/// Every failure mode (bad signature, wrong algorithm, expired, garbage
/// input) collapses into the same unauthorized error so callers cannot tell
/// WHY a token was rejected.
pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<TokenClaims, HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    );

    match decoded {
        Ok(token) => Ok(token.claims),
        Err(_) => Err(HttpError::unauthorized(
            ErrorMessage::InvalidToken.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn issued_token_decodes_to_the_same_identity() {
        let token = create_token(42, "arena_fan", UserRole::Member, SECRET, 60).unwrap();
        let claims = decode_token(token, SECRET).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.sub, "arena_fan");
        assert_eq!(claims.role, UserRole::Member);
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_token(1, "arena_fan", UserRole::User, SECRET, -120).unwrap();
        assert!(decode_token(token, SECRET).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected_identically_to_expiry() {
        let token = create_token(1, "arena_fan", UserRole::User, SECRET, 60).unwrap();
        let wrong = decode_token(token.clone(), b"other-secret").unwrap_err();
        let expired = decode_token(
            create_token(1, "arena_fan", UserRole::User, SECRET, -120).unwrap(),
            SECRET,
        )
        .unwrap_err();
        // Callers must not be able to distinguish the rejection reasons.
        assert_eq!(wrong.message, expired.message);
        assert_eq!(wrong.status, expired.status);
    }

    #[test]
    fn empty_subject_is_refused_at_issuance() {
        assert!(create_token(1, "", UserRole::User, SECRET, 60).is_err());
    }
}
