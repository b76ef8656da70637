use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

/// Marker every argon2 PHC string starts with. Anything else in the
/// password_hash column is a legacy un-migrated value.
const ARGON2_PREFIX: &str = "$argon2";

/// Stored password value, tagged so the legacy comparison path is explicit
/// instead of hidden behind prefix sniffing at each call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredPassword {
    Hashed(String),
    LegacyPlain(String),
}

impl StoredPassword {
    pub fn parse(stored: &str) -> Self {
        if stored.starts_with(ARGON2_PREFIX) {
            StoredPassword::Hashed(stored.to_string())
        } else {
            StoredPassword::LegacyPlain(stored.to_string())
        }
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Verifies a plaintext password against the stored value. The legacy branch
/// compares plain text directly; it exists only for records created before
/// hashing was enforced and is logged as a security smell every time it runs.
pub fn verify_password(plain: &str, stored: &StoredPassword) -> anyhow::Result<bool> {
    match stored {
        StoredPassword::Hashed(hash) => {
            let parsed = PasswordHash::new(hash).map_err(|e| {
                error!(error = %e, "argon2 parse hash error");
                anyhow::anyhow!(e.to_string())
            })?;
            Ok(Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok())
        }
        StoredPassword::LegacyPlain(value) => {
            warn!("verifying against a legacy plain-text password record");
            Ok(plain == value)
        }
    }
}
