//! Authentication service.
//!
//! Password accounts held in the local user list. Every operation that
//! changes who is signed in writes the user list and the session keys in one
//! batch, so session subscribers only ever see a consistent pair.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use recraft_core::{Email, UserId};

use super::session::SessionContext;
use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::{PublicUser, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Registration form.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub location: Option<String>,
}

/// Editable profile fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    session: &'a SessionContext,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(session: &'a SessionContext) -> Self {
        Self {
            users: UserRepository::new(session.store()),
            session,
        }
    }

    /// Register a new user and sign them in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[tracing::instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: Registration) -> Result<PublicUser, AuthError> {
        let email = Email::parse(&input.email)?;
        let name = input.name.trim().to_owned();
        if name.is_empty() {
            return Err(AuthError::MissingField("Name is required"));
        }
        validate_password(&input.password)?;
        let password_hash = hash_password(&input.password)?;

        let mut batch = self.session.store().write().await;
        if self.users.get_by_email(&email).await.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let user = User {
            id: UserId::generate(),
            name,
            email,
            password_hash,
            location: trimmed(input.location),
            avatar_url: None,
        };

        self.users
            .stage_insert(&mut batch, user.clone())
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;
        SessionContext::stage_sign_in(&mut batch, &user)?;
        batch.commit().await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(PublicUser::from(&user))
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let user = self
            .users
            .get_by_email(&email)
            .await
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        let mut batch = self.session.store().batch();
        SessionContext::stage_sign_in(&mut batch, &user)?;
        batch.commit().await?;

        tracing::info!(user_id = %user.id, "user signed in");
        Ok(PublicUser::from(&user))
    }

    /// Sign out. Signing out when nobody is signed in is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the session keys cannot be cleared.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let mut batch = self.session.store().batch();
        SessionContext::stage_sign_out(&mut batch)?;
        batch.commit().await?;
        tracing::info!("user signed out");
        Ok(())
    }

    /// Update the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotLoggedIn` if nobody is signed in, or
    /// `AuthError::UserNotFound` if the session points at a missing user.
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<PublicUser, AuthError> {
        let mut user = self.current_stored_user().await?;

        if let Some(name) = patch.name {
            let name = name.trim().to_owned();
            if name.is_empty() {
                return Err(AuthError::MissingField("Name is required"));
            }
            user.name = name;
        }
        if patch.location.is_some() {
            user.location = trimmed(patch.location);
        }
        if patch.avatar_url.is_some() {
            user.avatar_url = trimmed(patch.avatar_url);
        }

        self.save_and_sign_in(&user).await?;
        tracing::info!(user_id = %user.id, "profile updated");
        Ok(PublicUser::from(&user))
    }

    /// Change the signed-in user's password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotLoggedIn`, `AuthError::UserNotFound`,
    /// `AuthError::IncorrectPassword` if `current` is wrong, or
    /// `AuthError::WeakPassword` if `new` fails the policy or equals `current`.
    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), AuthError> {
        let mut user = self.current_stored_user().await?;

        verify_password(current, &user.password_hash).map_err(|_| AuthError::IncorrectPassword)?;
        validate_password(new)?;
        if new == current {
            return Err(AuthError::WeakPassword(
                "New password must be different from the current password".to_owned(),
            ));
        }

        user.password_hash = hash_password(new)?;
        self.save_and_sign_in(&user).await?;
        tracing::info!(user_id = %user.id, "password changed");
        Ok(())
    }

    async fn current_stored_user(&self) -> Result<User, AuthError> {
        let current = self
            .session
            .current_user()
            .await
            .ok_or(AuthError::NotLoggedIn)?;
        self.users
            .get_by_id(&current.id)
            .await
            .ok_or(AuthError::UserNotFound)
    }

    async fn save_and_sign_in(&self, user: &User) -> Result<(), AuthError> {
        let mut batch = self.session.store().write().await;
        self.users
            .stage_replace(&mut batch, user.clone())
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;
        SessionContext::stage_sign_in(&mut batch, user)?;
        batch.commit().await?;
        Ok(())
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::kv::{JsonStore, keys};

    fn alice() -> Registration {
        Registration {
            name: " Alice ".to_owned(),
            email: "alice@example.com".to_owned(),
            password: "secret1".to_owned(),
            location: Some("Pune".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_register_then_login_case_insensitive() {
        let session = SessionContext::new(JsonStore::memory());
        let auth = AuthService::new(&session);

        let registered = auth.register(alice()).await.unwrap();
        assert_eq!(registered.name, "Alice");
        assert!(session.is_authenticated().await);

        auth.logout().await.unwrap();
        assert!(session.current_user().await.is_none());

        let user = auth.login("ALICE@example.com", "secret1").await.unwrap();
        assert_eq!(user.id, registered.id);
        assert_eq!(session.current_user().await.unwrap().id, registered.id);
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let session = SessionContext::new(JsonStore::memory());
        let auth = AuthService::new(&session);
        auth.register(alice()).await.unwrap();
        auth.logout().await.unwrap();

        let err = auth.login("alice@example.com", "nope123").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        let err = auth.login("bob@example.com", "secret1").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let session = SessionContext::new(JsonStore::memory());
        let auth = AuthService::new(&session);
        auth.register(alice()).await.unwrap();

        let mut again = alice();
        again.email = "Alice@Example.COM".to_owned();
        let err = auth.register(again).await.unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[tokio::test]
    async fn test_short_password_is_rejected() {
        let session = SessionContext::new(JsonStore::memory());
        let auth = AuthService::new(&session);
        let mut input = alice();
        input.password = "12345".to_owned();
        assert!(matches!(
            auth.register(input).await,
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_password_is_stored_hashed() {
        let session = SessionContext::new(JsonStore::memory());
        let auth = AuthService::new(&session);
        auth.register(alice()).await.unwrap();
        let users: Vec<User> = session.store().load(keys::USERS).await;
        assert!(users[0].password_hash.starts_with("$argon2"));
        assert!(!users[0].password_hash.contains("secret1"));
    }

    #[tokio::test]
    async fn test_change_password_flow() {
        let session = SessionContext::new(JsonStore::memory());
        let auth = AuthService::new(&session);

        assert_eq!(
            auth.change_password("secret1", "secret2")
                .await
                .unwrap_err()
                .to_string(),
            "Not logged in"
        );

        auth.register(alice()).await.unwrap();
        assert_eq!(
            auth.change_password("wrong", "secret2")
                .await
                .unwrap_err()
                .to_string(),
            "Current password is incorrect"
        );
        assert!(matches!(
            auth.change_password("secret1", "secret1").await,
            Err(AuthError::WeakPassword(_))
        ));

        auth.change_password("secret1", "secret2").await.unwrap();
        auth.logout().await.unwrap();
        assert!(auth.login("alice@example.com", "secret1").await.is_err());
        assert!(auth.login("alice@example.com", "secret2").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_profile_and_missing_user() {
        let session = SessionContext::new(JsonStore::memory());
        let auth = AuthService::new(&session);
        auth.register(alice()).await.unwrap();

        let updated = auth
            .update_profile(ProfilePatch {
                location: Some("Mysuru".to_owned()),
                ..ProfilePatch::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.location.as_deref(), Some("Mysuru"));
        assert_eq!(session.current_user().await.unwrap().location.as_deref(), Some("Mysuru"));

        // Session pointing at a user that has vanished from the list.
        session.store().save::<User>(keys::USERS, &[]).await.unwrap();
        let err = auth.update_profile(ProfilePatch::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "User not found");
    }

    #[tokio::test]
    async fn test_sign_in_notifies_subscribers() {
        let session = SessionContext::new(JsonStore::memory());
        let mut sub = session.subscribe();
        let auth = AuthService::new(&session);
        auth.register(alice()).await.unwrap();

        let first = sub.recv().await.unwrap();
        let second = sub.recv().await.unwrap();
        assert_eq!(first.key, keys::CURRENT_USER);
        assert_eq!(second.key, keys::AUTH);
    }
}
