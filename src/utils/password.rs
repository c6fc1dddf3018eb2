use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::ErrorMessage;

/// Upper bound on the credential length. The client submits a fixed-width
/// hex digest rather than a raw password, but argon2 is intentionally slow,
/// so unbounded input would be an easy DoS vector regardless.
const MAX_PASSWORD_LENGTH: usize = 64;

/// Hash the client-submitted credential with salted Argon2id.
///
/// The input is already a one-way digest computed client-side; this second,
/// independent slow hash means the stored value never equals what travelled
/// over the wire, and two users with identical credentials get different
/// rows (fresh random salt per call).
pub fn hash(password: impl Into<String>) -> Result<String, ErrorMessage> {
    let password = password.into();

    if password.is_empty() {
        return Err(ErrorMessage::EmptyPassword);
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH));
    }

    let salt = SaltString::generate(&mut OsRng);

    let hashed_password = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| ErrorMessage::HashingError)?
        .to_string();

    Ok(hashed_password)
}

/// Verify a credential against a stored PHC-format hash.
///
/// The salt and cost parameters are parsed back out of the stored string;
/// comparison happens in constant time inside the argon2 crate.
pub fn compare(password: &str, hashed_password: &str) -> Result<bool, ErrorMessage> {
    if password.is_empty() {
        return Err(ErrorMessage::EmptyPassword);
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH));
    }

    let parsed_hash =
        PasswordHash::new(hashed_password).map_err(|_| ErrorMessage::InvalidHashFormat)?;

    let password_matched = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_or(false, |_| true);

    Ok(password_matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_hash_never_equals_the_credential() {
        let credential = "5f4dcc3b5aa765d61d8327deb882cf99";
        let hashed = hash(credential).unwrap();
        assert_ne!(hashed, credential);
        assert!(compare(credential, &hashed).unwrap());
    }

    #[test]
    fn same_credential_hashes_differently_each_time() {
        let credential = "5f4dcc3b5aa765d61d8327deb882cf99";
        let first = hash(credential).unwrap();
        let second = hash(credential).unwrap();
        assert_ne!(first, second);
        assert!(compare(credential, &first).unwrap());
        assert!(compare(credential, &second).unwrap());
    }

    #[test]
    fn wrong_credential_fails_verification() {
        let hashed = hash("right-digest").unwrap();
        assert!(!compare("wrong-digest", &hashed).unwrap());
    }

    #[test]
    fn empty_and_oversized_credentials_are_rejected() {
        assert_eq!(hash("").unwrap_err(), ErrorMessage::EmptyPassword);
        let too_long = "a".repeat(MAX_PASSWORD_LENGTH + 1);
        assert_eq!(
            hash(too_long).unwrap_err(),
            ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH)
        );
    }
}
