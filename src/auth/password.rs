use std::sync::Arc;

use anyhow::Context;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tokio::sync::Semaphore;
use tracing::error;

const TIME_COST: u32 = 2;
const MEMORY_COST_KIB: u32 = 19 * 1024;
const PARALLELISM: u32 = 1;

lazy_static! {
    // Verified against when the username does not exist, so unknown users
    // cost the same as wrong passwords.
    static ref DUMMY_HASH: Option<String> = hash_password("storefront-dummy-password").ok();
}

fn argon2() -> anyhow::Result<Argon2<'static>> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
        .map_err(|e| anyhow::anyhow!("argon2 params: {e}"))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2()?
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// True only when `plain` matches. A stored hash that cannot be parsed is
/// logged against `username` and treated as a mismatch.
pub fn verify_password(plain: &str, hash: &str, username: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, %username, "stored password hash is malformed");
            return false;
        }
    };
    // Cost parameters come from the PHC string, not from this instance.
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Runs hashing on the blocking pool, at most `workers` jobs at a time.
#[derive(Clone)]
pub struct PasswordPool {
    permits: Arc<Semaphore>,
}

impl PasswordPool {
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub async fn hash(&self, plain: String) -> anyhow::Result<String> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .context("password pool closed")?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            hash_password(&plain)
        })
        .await
        .context("hash task failed")?
    }

    pub async fn verify(&self, username: &str, plain: String, hash: String) -> bool {
        let Ok(permit) = self.permits.clone().acquire_owned().await else {
            return false;
        };
        let username = username.to_string();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            verify_password(&plain, &hash, &username)
        })
        .await
        .unwrap_or(false)
    }

    /// Spends one verification's worth of work and always reports a mismatch.
    /// The dummy hash is built and checked on the blocking pool.
    pub async fn verify_dummy(&self, plain: String) -> bool {
        let Ok(permit) = self.permits.clone().acquire_owned().await else {
            return false;
        };
        let _ = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            if let Some(hash) = DUMMY_HASH.as_ref() {
                verify_password(&plain, hash, "");
            }
        })
        .await;
        false
    }

    /// Builds the dummy hash ahead of the first login.
    pub async fn warm_up(&self) -> anyhow::Result<()> {
        let ready = tokio::task::spawn_blocking(|| DUMMY_HASH.is_some())
            .await
            .context("warm-up task failed")?;
        anyhow::ensure!(ready, "could not build dummy password hash");
        Ok(())
    }
}
