//! Database seeding utilities.

use super::{create_user_repository, DbPool};
use crate::auth::{password::hash_password, Role, User};
use rand::Rng;
use tracing::{info, warn};

/// Ensures a default admin user exists in the database.
///
/// If no users exist, creates an admin with username `admin`, email
/// `admin@localhost`, and a password taken from `FD_ADMIN_PASSWORD` or
/// randomly generated.
///
/// Returns `Ok(Some(password))` when a new admin was created, `Ok(None)`
/// when users already exist.
pub async fn ensure_admin_user(
    pool: &DbPool,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let user_repo = create_user_repository(pool);

    if user_repo.any_exist().await? {
        info!("Users already exist, skipping admin seed");
        return Ok(None);
    }

    let password = std::env::var("FD_ADMIN_PASSWORD").ok().unwrap_or_else(|| {
        let generated = generate_secure_password();
        warn!("No FD_ADMIN_PASSWORD set, generated random password");
        generated
    });

    let password_hash = hash_password(&password)?;

    let admin = User::new("admin@localhost", "admin", password_hash, Role::Admin);

    user_repo.create(&admin).await?;

    info!("Created default admin user: admin");

    Ok(Some(password))
}

/// Generates a 16-character password over a mixed alphabet.
fn generate_secure_password() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#%^&*";
    let mut rng = rand::thread_rng();

    (0..16)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_password_length() {
        let password = generate_secure_password();
        assert_eq!(password.len(), 16);
    }

    #[test]
    fn test_generated_passwords_differ() {
        assert_ne!(generate_secure_password(), generate_secure_password());
    }
}
