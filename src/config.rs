use anyhow::Context;
use serde::Deserialize;

/// Token TTL used when `JWT_TOKEN_EXPIRATION` is unset: 72 hours.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 72 * 60 * 60;

/// Longest accepted token TTL: one year.
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub name: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub hash_workers: usize,
    pub host: String,
    pub port: u16,
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Reads the process environment. Fails when the database URL or the
    /// signing secret is missing; the server must not start without them.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;
        let secret = lookup("JWT_SECRET").context("JWT_SECRET is not set")?;
        anyhow::ensure!(!secret.trim().is_empty(), "JWT_SECRET is empty");

        let database = DatabaseConfig {
            url,
            name: lookup("DATABASE_NAME").filter(|v| !v.is_empty()),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
        };

        let ttl_seconds = parse_or(&lookup, "JWT_TOKEN_EXPIRATION", DEFAULT_TOKEN_TTL_SECS)?;
        anyhow::ensure!(
            (1..=MAX_TOKEN_TTL_SECS).contains(&ttl_seconds),
            "JWT_TOKEN_EXPIRATION must be between 1 and {MAX_TOKEN_TTL_SECS} seconds"
        );

        let default_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let hash_workers = parse_or(&lookup, "HASH_WORKERS", default_workers)?.max(1);

        Ok(Self {
            database,
            jwt: JwtConfig {
                secret,
                ttl_seconds,
            },
            hash_workers,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "APP_PORT", 8000)?,
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", false)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}")),
        None => Ok(default),
    }
}
