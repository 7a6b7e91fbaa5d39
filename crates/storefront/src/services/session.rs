//! The signed-in session.
//!
//! [`SessionContext`] owns the `rc_user` / `rc_auth` keys. Components that
//! need the current user take a `&SessionContext` rather than reading the keys
//! themselves, and views that must react to sign-in or sign-out call
//! [`SessionContext::subscribe`].

use crate::kv::{Batch, JsonStore, StoreError, Subscription, keys};
use crate::models::{PublicUser, User};

/// Explicit handle to the signed-in user of one data directory.
#[derive(Debug, Clone)]
pub struct SessionContext {
    store: JsonStore,
}

impl SessionContext {
    /// Create a session context over `store`.
    #[must_use]
    pub const fn new(store: JsonStore) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &JsonStore {
        &self.store
    }

    /// The signed-in user, if any.
    pub async fn current_user(&self) -> Option<PublicUser> {
        if !self.is_authenticated().await {
            return None;
        }
        self.store.load_value(keys::CURRENT_USER).await
    }

    /// Whether someone is signed in.
    pub async fn is_authenticated(&self) -> bool {
        self.store
            .load_value::<bool>(keys::AUTH)
            .await
            .unwrap_or(false)
    }

    /// Stage signing `user` in.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialize` if the user cannot be serialized.
    pub fn stage_sign_in(batch: &mut Batch<'_>, user: &User) -> Result<(), StoreError> {
        batch
            .put_value(keys::CURRENT_USER, &PublicUser::from(user))?
            .put_value(keys::AUTH, &true)?;
        Ok(())
    }

    /// Stage signing out.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in keys; the signature matches the other
    /// staging helpers.
    pub fn stage_sign_out(batch: &mut Batch<'_>) -> Result<(), StoreError> {
        batch.remove(keys::CURRENT_USER)?.remove(keys::AUTH)?;
        Ok(())
    }

    /// Changes to the signed-in state.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.store.subscribe_keys(&[keys::CURRENT_USER, keys::AUTH])
    }
}
