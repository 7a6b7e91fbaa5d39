//! Account commands.
//!
//! The data directory holds at most one signed-in user; `register` and
//! `login` replace it, `logout` clears it.

use clap::Subcommand;
use tracing::info;

use recraft_storefront::models::PublicUser;
use recraft_storefront::services::{AuthError, AuthService, ProfilePatch, Registration};

use super::Context;

/// `recraft account` subcommands.
#[derive(Subcommand)]
pub enum AccountAction {
    /// Create an account and sign it in
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long)]
        location: Option<String>,
    },
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Change profile fields
    Update {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        location: Option<String>,
        #[arg(short, long)]
        avatar_url: Option<String>,
    },
    /// Change the password
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
}

fn report(action: &str, user: &PublicUser) {
    info!(
        id = %user.id,
        name = %user.name,
        email = %user.email,
        location = user.location.as_deref().unwrap_or("-"),
        "{action}"
    );
}

/// Run an account command.
///
/// # Errors
///
/// Returns the `AuthError` of the failed operation.
pub async fn run(ctx: &Context, action: AccountAction) -> Result<(), AuthError> {
    let auth = AuthService::new(&ctx.session);

    match action {
        AccountAction::Register {
            name,
            email,
            password,
            location,
        } => {
            let user = auth
                .register(Registration {
                    name,
                    email,
                    password,
                    location,
                })
                .await?;
            report("Registered and signed in", &user);
        }
        AccountAction::Login { email, password } => {
            let user = auth.login(&email, &password).await?;
            report("Signed in", &user);
        }
        AccountAction::Logout => {
            auth.logout().await?;
            info!("Signed out");
        }
        AccountAction::Whoami => match ctx.session.current_user().await {
            Some(user) => report("Signed in as", &user),
            None => info!("Not signed in"),
        },
        AccountAction::Update {
            name,
            location,
            avatar_url,
        } => {
            let user = auth
                .update_profile(ProfilePatch {
                    name,
                    location,
                    avatar_url,
                })
                .await?;
            report("Profile updated", &user);
        }
        AccountAction::Password { current, new } => {
            auth.change_password(&current, &new).await?;
            info!("Password changed");
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use recraft_storefront::config::StorefrontConfig;

    use super::*;

    #[tokio::test]
    async fn test_register_then_login_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::open(&StorefrontConfig::local(dir.path())).await.unwrap();

        run(
            &ctx,
            AccountAction::Register {
                name: "Alice".to_owned(),
                email: "alice@example.com".to_owned(),
                password: "secret1".to_owned(),
                location: None,
            },
        )
        .await
        .unwrap();
        run(&ctx, AccountAction::Logout).await.unwrap();
        assert!(ctx.session.current_user().await.is_none());

        run(
            &ctx,
            AccountAction::Login {
                email: "ALICE@example.com".to_owned(),
                password: "secret1".to_owned(),
            },
        )
        .await
        .unwrap();
        assert_eq!(ctx.session.current_user().await.unwrap().name, "Alice");

        let err = run(
            &ctx,
            AccountAction::Login {
                email: "alice@example.com".to_owned(),
                password: "wrong-pass".to_owned(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
    }
}
