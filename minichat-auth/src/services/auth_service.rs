use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use minichat_shared::errors::{AppError, ErrorCode};

pub const MAX_NAME_LEN: usize = 100;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one number"));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one letter"));
    }
    Ok(())
}

/// Trimmed display name, rejected when blank or too long.
pub fn normalize_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            format!("name must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(name.to_string())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("hunter42x").unwrap();
        assert_ne!(hash, "hunter42x");
        assert!(verify_password("hunter42x", &hash).unwrap());
        assert!(!verify_password("hunter43x", &hash).unwrap());
    }

    #[test]
    fn corrupt_stored_hash_is_an_opaque_internal_error() {
        let err = verify_password("hunter42x", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.kind(), minichat_shared::errors::ErrorKind::Unexpected);
    }

    #[test]
    fn weak_passwords_are_rejected() {
        for weak in ["short1", "onlyletters", "12345678"] {
            let err = validate_password(weak).unwrap_err();
            assert_eq!(err.code(), Some(ErrorCode::PasswordTooWeak));
        }
        assert!(validate_password("letters4nddigits").is_ok());
    }

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(normalize_name("  Ada Lovelace ").unwrap(), "Ada Lovelace");
        assert!(normalize_name("   ").is_err());
        assert!(normalize_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn emails_are_lowercased() {
        assert_eq!(normalize_email(" Ada@Example.COM "), "ada@example.com");
    }
}
