use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{Duration, Utc};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use super::{AuthUser, Session, SignUp};
use crate::{
    errors::PlatformError,
    id::generate_token,
    validators::{is_valid_email, is_valid_username},
};

/// Sessions stay valid for a week.
pub(crate) const SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const MIN_PASSWORD_LENGTH: usize = 6;

/// Argon2id password hashing for platform accounts.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl CredentialHasher {
    /// Minimal-cost parameters for in-process platforms.
    pub fn fast() -> Self {
        let params = Params::new(256, 1, 1, None).unwrap_or_default();
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hash a plain password with argon2id.
    pub fn hash(&self, password: &str) -> Result<String, PlatformError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(PlatformError::serialization)
    }

    /// Verify a password against an argon2id hash.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self.argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The username asked for at sign-up, lowercased. Blank counts as absent.
pub(crate) fn requested_username(request: &SignUp) -> Option<String> {
    request
        .username
        .as_deref()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
}

pub(crate) fn validate_sign_up(request: &SignUp) -> Result<(), PlatformError> {
    if !is_valid_email(request.email.trim()) {
        return Err(PlatformError::InvalidRequest {
            message: "email address is invalid".to_string(),
        });
    }
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PlatformError::InvalidRequest {
            message: format!("password must be at least {MIN_PASSWORD_LENGTH} characters"),
        });
    }
    if requested_username(request).is_some_and(|name| !is_valid_username(&name)) {
        return Err(PlatformError::InvalidRequest {
            message: "username must be 3 to 30 characters of a-z, 0-9, '_' or '.'".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn issue_session(user: AuthUser) -> Session {
    Session {
        access_token: generate_token(),
        user,
        expires_at: Utc::now() + Duration::seconds(SESSION_TTL_SECONDS),
    }
}
