use serde::{Deserialize, Serialize};

/// User record held by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // Argon2 hash, None for accounts without a password
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>, // the single live refresh token
}

/// Fields supplied at registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

/// Partial update; `None` leaves a field untouched.
///
/// `refresh_token` is `Some(None)` to clear the stored token.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub refresh_token: Option<Option<String>>,
}

impl UserUpdate {
    pub fn set_refresh_token(token: impl Into<String>) -> Self {
        Self {
            refresh_token: Some(Some(token.into())),
            ..Self::default()
        }
    }

    pub fn clear_refresh_token() -> Self {
        Self {
            refresh_token: Some(None),
            ..Self::default()
        }
    }
}
