use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::auth::repo_types::{NewUser, User, UserUpdate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Email is already in use")]
    EmailTaken,
    #[error("Username is already in use")]
    UsernameTaken,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Storage seam for user records.
///
/// `create` must enforce email and username uniqueness atomically, and
/// `swap_refresh_token` must compare and replace in one step.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: u64) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_email_or_username(&self, identifier: &str)
        -> Result<Option<User>, StoreError>;
    async fn find_by_refresh_token(&self, token: &str) -> Result<Option<User>, StoreError>;
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;
    async fn update(&self, id: u64, update: UserUpdate) -> Result<Option<User>, StoreError>;
    /// Replaces the stored refresh token only while it still equals `current`.
    /// `None` means the user is gone or the token was already rotated.
    async fn swap_refresh_token(
        &self,
        id: u64,
        current: &str,
        next: &str,
    ) -> Result<Option<User>, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
}

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    async fn find_first(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        self.users.read().await.iter().find(|u| pred(u)).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: u64) -> Result<Option<User>, StoreError> {
        Ok(self.find_first(|u| u.id == id).await)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.find_first(|u| u.email == email).await)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.find_first(|u| u.username == username).await)
    }

    async fn find_by_email_or_username(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .find_first(|u| u.email == identifier || u.username == identifier)
            .await)
    }

    async fn find_by_refresh_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .find_first(|u| u.refresh_token.as_deref() == Some(token))
            .await)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::EmailTaken);
        }
        if users.iter().any(|u| u.username == new_user.username) {
            return Err(StoreError::UsernameTaken);
        }

        let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let user = User {
            id,
            email: new_user.email,
            username: new_user.username,
            password_hash: Some(new_user.password_hash),
            refresh_token: None,
        };
        users.push(user.clone());
        debug!(user_id = id, "user inserted");
        Ok(user)
    }

    async fn update(&self, id: u64, update: UserUpdate) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(hash) = update.password_hash {
            user.password_hash = Some(hash);
        }
        if let Some(token) = update.refresh_token {
            user.refresh_token = token;
        }
        Ok(Some(user.clone()))
    }

    async fn swap_refresh_token(
        &self,
        id: u64,
        current: &str,
        next: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users
            .iter_mut()
            .find(|u| u.id == id && u.refresh_token.as_deref() == Some(current))
        else {
            return Ok(None);
        };
        user.refresh_token = Some(next.to_string());
        Ok(Some(user.clone()))
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.read().await.clone())
    }
}
