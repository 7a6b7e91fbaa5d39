//! Authentication error types.
//!
//! Display strings are shown to users as-is.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::kv::StoreError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("Enter a valid email address")]
    InvalidEmail(#[from] recraft_core::EmailError),

    /// Unknown email or wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The email is already taken.
    #[error("Email already registered")]
    UserAlreadyExists,

    /// Nobody is signed in.
    #[error("Not logged in")]
    NotLoggedIn,

    /// The signed-in user no longer exists in the user list.
    #[error("User not found")]
    UserNotFound,

    /// Wrong current password on a password change.
    #[error("Current password is incorrect")]
    IncorrectPassword,

    /// Password does not meet the policy.
    #[error("{0}")]
    WeakPassword(String),

    /// A required profile field is empty.
    #[error("{0}")]
    MissingField(&'static str),

    /// Repository error.
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Repository(RepositoryError::Storage(err))
    }
}
