//! In-memory credential store - used by tests and `AppState::fake`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::StoreError,
    users::{
        repo::UserStore,
        repo_types::{ProfileUpdate, User, DEFAULT_IMAGE},
    },
};

/// Uniqueness checks and the write happen under one write lock, so
/// concurrent writers race on the lock instead of on a stale read.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn taken<F>(users: &HashMap<Uuid, User>, except: Option<Uuid>, wanted: Option<&str>, field: F) -> bool
where
    F: Fn(&User) -> &str,
{
    wanted.is_some_and(|w| {
        users
            .values()
            .any(|u| Some(u.id) != except && field(u) == w)
    })
}

/// Username is checked across every other user before email, so the
/// reported field does not depend on map order.
fn conflict(
    users: &HashMap<Uuid, User>,
    except: Option<Uuid>,
    username: Option<&str>,
    email: Option<&str>,
) -> Option<&'static str> {
    if taken(users, except, username, |u| u.username.as_str()) {
        Some("username")
    } else if taken(users, except, email, |u| u.email.as_str()) {
        Some("email")
    } else {
        None
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if let Some(field) = conflict(&users, None, Some(username), Some(email)) {
            return Err(StoreError::DuplicateKey { field });
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            image_file: DEFAULT_IMAGE.to_string(),
            password_hash: password_hash.to_string(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if let Some(field) = conflict(
            &users,
            Some(id),
            update.username.as_deref(),
            update.email.as_deref(),
        ) {
            return Err(StoreError::DuplicateKey { field });
        }
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(image_file) = update.image_file {
            user.image_file = image_file;
        }
        Ok(user.clone())
    }
}
