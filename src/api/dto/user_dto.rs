//! User DTOs for the bulk create endpoint.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::{NewUser, hash_password};
use crate::error::GatewayError;

const NAME_MIN: usize = 3;
const FIELD_MAX: usize = 96;
const PASSWORD_MIN: usize = 8;
const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// One user in a `POST /users/create-many` body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Given name, 3 to 96 characters.
    pub first_name: String,
    /// Optional family name, 3 to 96 characters.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Email address, at most 96 characters.
    pub email: String,
    /// Plaintext password: 8 to 96 characters with a lowercase letter, an
    /// uppercase letter, a digit and one of `@$!%*?&`.
    pub password: String,
}

/// Request body for `POST /users/create-many`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateManyUsersRequest {
    /// Users to create, in order. Must not be empty.
    pub users: Vec<CreateUserRequest>,
}

fn check_len(field: &str, value: &str, min: usize) -> Result<(), GatewayError> {
    let len = value.chars().count();
    if len < min || len > FIELD_MAX {
        return Err(GatewayError::InvalidRequest(format!(
            "{field} must be between {min} and {FIELD_MAX} characters"
        )));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), GatewayError> {
    check_len("email", email, 1)?;
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain
                .split_once('.')
                .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
    });
    if valid {
        Ok(())
    } else {
        Err(GatewayError::InvalidRequest(format!(
            "email is not a valid address: {email}"
        )))
    }
}

fn check_password(password: &str) -> Result<(), GatewayError> {
    check_len("password", password, PASSWORD_MIN)?;
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
    let strong = password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if allowed && strong {
        Ok(())
    } else {
        Err(GatewayError::InvalidRequest(
            "password needs a lowercase letter, an uppercase letter, a digit and one of @$!%*?&"
                .to_string(),
        ))
    }
}

impl CreateUserRequest {
    /// Checks field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), GatewayError> {
        check_len("firstName", &self.first_name, NAME_MIN)?;
        if let Some(last_name) = &self.last_name {
            check_len("lastName", last_name, NAME_MIN)?;
        }
        check_email(&self.email)?;
        check_password(&self.password)
    }

    /// Validates the request and hashes the password into a [`NewUser`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] on a constraint violation or
    /// [`GatewayError::Internal`] if hashing fails.
    pub fn into_draft(self) -> Result<NewUser, GatewayError> {
        self.validate()?;
        let password_hash =
            hash_password(&self.password).map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(NewUser {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password_hash,
        })
    }
}

impl CreateManyUsersRequest {
    /// Validates every user and converts them into drafts, keeping order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the list is empty or any
    /// user fails validation.
    pub fn into_drafts(self) -> Result<Vec<NewUser>, GatewayError> {
        if self.users.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "users must not be empty".to_string(),
            ));
        }
        self.users
            .iter()
            .enumerate()
            .try_for_each(|(index, user)| {
                user.validate().map_err(|e| match e {
                    GatewayError::InvalidRequest(msg) => {
                        GatewayError::InvalidRequest(format!("users[{index}]: {msg}"))
                    }
                    other => other,
                })
            })?;
        self.users
            .into_iter()
            .map(CreateUserRequest::into_draft)
            .collect()
    }
}
