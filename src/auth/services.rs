use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{error::ApiError, users::repo::User};

use super::password::{self, StoredPassword};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Argon2 is deliberately expensive, so hashing runs on the blocking pool
/// instead of stalling the async executor.
pub(crate) async fn hash_password_blocking(plain: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(ApiError::Internal)
}

pub(crate) async fn verify_password_blocking(
    plain: String,
    stored: StoredPassword,
) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || password::verify_password(&plain, &stored))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(ApiError::Internal)
}

/// Register a new user. Email uniqueness is checked before username; the
/// check-then-insert window is racy but the UNIQUE constraints backstop it.
pub async fn register_user(
    db: &PgPool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    if User::find_by_email(db, email).await?.is_some() {
        warn!(email = %email, "registration with taken email");
        return Err(ApiError::Conflict(
            "User with this email already exists".into(),
        ));
    }

    if User::find_by_username(db, username).await?.is_some() {
        warn!(username = %username, "registration with taken username");
        return Err(ApiError::Conflict("Username is already taken".into()));
    }

    let hash = hash_password_blocking(password.to_string()).await?;
    let user = User::create(db, username, email, &hash).await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Log a user in. Unknown email and wrong password produce the identical
/// error so the response leaks nothing about which one failed.
pub async fn login_user(db: &PgPool, email: &str, password: &str) -> Result<User, ApiError> {
    let invalid = || ApiError::Authentication("Invalid email or password".into());

    let user = match User::find_by_email(db, email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login with unknown email");
            return Err(invalid());
        }
    };

    let stored = StoredPassword::parse(&user.password_hash);
    let ok = verify_password_blocking(password.to_string(), stored).await?;
    if !ok {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(invalid());
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("alice@x.com"));
        assert!(is_valid_email("a.b+tag@sub.example.org"));
    }

    #[test]
    fn email_regex_rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("alice@nodot"));
        assert!(!is_valid_email("@x.com"));
    }

    #[tokio::test]
    async fn blocking_hash_and_verify_roundtrip() {
        let hash = hash_password_blocking("tinsel-and-snow".into()).await.unwrap();
        let stored = StoredPassword::parse(&hash);
        assert!(verify_password_blocking("tinsel-and-snow".into(), stored.clone())
            .await
            .unwrap());
        assert!(!verify_password_blocking("wrong".into(), stored).await.unwrap());
    }
}
