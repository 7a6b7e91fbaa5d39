//! User repository.
//!
//! Users are appended in registration order and never deleted. Email
//! uniqueness is case-insensitive and enforced here.

use recraft_core::{Email, UserId};

use super::{RepositoryError, Snapshot, commit};
use crate::kv::{Batch, JsonStore, keys};
use crate::models::User;

/// Repository for registered users.
pub struct UserRepository<'a> {
    store: &'a JsonStore,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a JsonStore) -> Self {
        Self { store }
    }

    /// All registered users.
    pub async fn all(&self) -> Vec<User> {
        self.store.load(keys::USERS).await
    }

    /// Get a user by their email address.
    pub async fn get_by_email(&self, email: &Email) -> Option<User> {
        self.all()
            .await
            .into_iter()
            .find(|u| u.email.matches(email.as_str()))
    }

    /// Get a user by their ID.
    pub async fn get_by_id(&self, id: &UserId) -> Option<User> {
        self.all().await.into_iter().find(|u| &u.id == id)
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn insert(&self, user: User) -> Result<(), RepositoryError> {
        let mut batch = self.store.write().await;
        self.stage_insert(&mut batch, user).await?;
        commit(batch).await
    }

    /// Stage a registration into `batch`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    pub async fn stage_insert(
        &self,
        batch: &mut Batch<'_>,
        user: User,
    ) -> Result<(), RepositoryError> {
        let mut snapshot = Snapshot::<User>::read(self.store, keys::USERS).await;
        if snapshot
            .items
            .iter()
            .any(|u| u.email.matches(user.email.as_str()))
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        snapshot.items.push(user);
        snapshot.stage(batch)
    }

    /// Stage a replacement of the user with the same id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has that id.
    pub async fn stage_replace(
        &self,
        batch: &mut Batch<'_>,
        user: User,
    ) -> Result<(), RepositoryError> {
        let mut snapshot = Snapshot::<User>::read(self.store, keys::USERS).await;
        let slot = snapshot
            .items
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| RepositoryError::NotFound(user.id.to_string()))?;
        *slot = user;
        snapshot.stage(batch)
    }
}
