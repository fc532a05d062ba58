//! User records and the password hashing applied before they are stored.

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use rand::TryRngCore;
use serde::Serialize;
use utoipa::ToSchema;

use super::record::{Entity, RecordId};

const SALT_LENGTH: usize = 16;

/// A persisted user account.
///
/// The password hash is kept on the record for the store but is never
/// serialized into responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Store-assigned identity.
    pub id: RecordId,
    /// Given name.
    pub first_name: String,
    /// Family name, if provided.
    pub last_name: Option<String>,
    /// Login email, unique across users.
    pub email: String,
    /// Argon2 PHC string.
    #[serde(skip)]
    pub password_hash: String,
}

/// Creation payload for a [`User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Given name.
    pub first_name: String,
    /// Family name, if provided.
    pub last_name: Option<String>,
    /// Login email.
    pub email: String,
    /// Argon2 PHC string, see [`hash_password`].
    pub password_hash: String,
}

impl Entity for User {
    type Draft = NewUser;

    const TABLE: &'static str = "users";

    fn create(id: RecordId, draft: NewUser) -> Self {
        Self {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            password_hash: draft.password_hash,
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.email)
    }
}

/// Error raised while hashing a password.
#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(String);

/// Hashes a plaintext password with Argon2 and a random salt.
///
/// # Errors
///
/// Returns [`PasswordHashError`] if the OS random source or the hasher fails.
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let mut salt_bytes = [0u8; SALT_LENGTH];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .map_err(|e| PasswordHashError(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordHashError(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordHashError(e.to_string()))?;
    Ok(hash.to_string())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted_phc_string() {
        let Ok(first) = hash_password("Secret@123") else {
            panic!("hashing failed");
        };
        let Ok(second) = hash_password("Secret@123") else {
            panic!("hashing failed");
        };
        assert!(first.starts_with("$argon2"));
        assert_ne!(first, second);
    }

    #[test]
    fn serialization_hides_password_hash() {
        let user = User::create(
            RecordId::new(1),
            NewUser {
                first_name: "Ada".to_string(),
                last_name: None,
                email: "ada@example.com".to_string(),
                password_hash: "$argon2id$secret".to_string(),
            },
        );
        let json = serde_json::to_value(&user).unwrap_or_default();
        assert_eq!(json.get("firstName").and_then(|v| v.as_str()), Some("Ada"));
        assert_eq!(json.get("id").and_then(serde_json::Value::as_i64), Some(1));
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn email_is_the_unique_key() {
        let user = User::create(
            RecordId::new(3),
            NewUser {
                first_name: "Ada".to_string(),
                last_name: Some("Lovelace".to_string()),
                email: "ada@example.com".to_string(),
                password_hash: String::new(),
            },
        );
        assert_eq!(user.unique_key(), Some("ada@example.com"));
        assert_eq!(user.id(), RecordId::new(3));
    }
}
