use anyhow::{Context, Result, bail};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    /// Without one the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl: u64,
    pub storage_timeout: Duration,
    pub db_max_connections: u32,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_clock_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,
}

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Defaults for everything but the signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            server_addr: "127.0.0.1:5000".to_string(),
            database_url: None,
            jwt_secret: jwt_secret.into(),
            token_ttl: 604_800, // 7 days
            storage_timeout: Duration::from_millis(5_000),
            db_max_connections: 10,
            rate_login_per_min: 60,
            rate_clock_per_min: 120,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let defaults = Self::new(jwt_secret);
        Ok(Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or(defaults.server_addr),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            token_ttl: var_or("TOKEN_TTL", defaults.token_ttl)?,
            storage_timeout: Duration::from_millis(var_or("STORAGE_TIMEOUT_MS", 5_000u64)?),
            db_max_connections: var_or("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", defaults.rate_login_per_min)?,
            rate_clock_per_min: var_or("RATE_CLOCK_PER_MIN", defaults.rate_clock_per_min)?,
            rate_protected_per_min: var_or(
                "RATE_PROTECTED_PER_MIN",
                defaults.rate_protected_per_min,
            )?,
            api_prefix: env::var("API_PREFIX").unwrap_or(defaults.api_prefix),
            log_dir: env::var("LOG_DIR").unwrap_or(defaults.log_dir),
            ..defaults
        })
    }
}
