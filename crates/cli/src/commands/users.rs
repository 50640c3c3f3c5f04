//! User account commands.
//!
//! # Usage
//!
//! ```bash
//! shy-cli create-user -e admin@example.com -p 'long-password' --staff --superuser
//! ```

use shanghuyun_marketplace::db::users::NewUserFlags;
use shanghuyun_marketplace::services::auth::AuthService;

use super::connect;

/// Create a user with a password and an empty profile.
///
/// The password goes through the same rules as web signup.
///
/// # Errors
///
/// Returns an error for an invalid email, a weak password, an email that
/// is already registered, or a database failure.
pub async fn create(
    email: &str,
    password: &str,
    staff: bool,
    superuser: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;

    let flags = NewUserFlags {
        is_staff: staff || superuser,
        is_superuser: superuser,
    };
    let user = AuthService::new(&pool)
        .register_with_password(email, password, flags)
        .await?;

    tracing::info!(
        user_id = %user.id,
        email = %user.email,
        staff = flags.is_staff,
        superuser = flags.is_superuser,
        "User created"
    );
    Ok(())
}
