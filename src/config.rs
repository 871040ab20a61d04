use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};

/// Which persistence backend the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MySql,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(StoreBackend::MySql),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("unknown STORE_BACKEND {:?} (expected mysql or memory)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Navigation guard targets
    pub login_path: String,
    pub default_authenticated_path: String,

    pub log_dir: String,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{} must be set", key));

        let store_backend = parse_or(&lookup, "STORE_BACKEND", StoreBackend::MySql)?;
        let database_url = lookup("DATABASE_URL");
        if store_backend == StoreBackend::MySql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND is mysql");
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            store_backend,
            database_url,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or(&lookup, "ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parse_or(&lookup, "REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parse_or(&lookup, "RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: parse_or(&lookup, "RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api/v1".to_string()),

            login_path: lookup("LOGIN_PATH").unwrap_or_else(|| "/login".to_string()),
            default_authenticated_path: lookup("DEFAULT_AUTHENTICATED_PATH")
                .unwrap_or_else(|| "/dashboard".to_string()),

            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_fill_optional_values() {
        let cfg = config(&[
            ("SERVER_ADDR", "127.0.0.1:8080"),
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "dev"),
        ])
        .unwrap();

        assert_eq!(cfg.store_backend, StoreBackend::Memory);
        assert_eq!(cfg.access_token_ttl, 900);
        assert_eq!(cfg.refresh_token_ttl, 604_800);
        assert_eq!(cfg.api_prefix, "/api/v1");
        assert_eq!(cfg.login_path, "/login");
        assert_eq!(cfg.default_authenticated_path, "/dashboard");
    }

    #[test]
    fn mysql_needs_a_database_url() {
        let err = config(&[("SERVER_ADDR", "127.0.0.1:8080"), ("JWT_SECRET", "dev")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn bad_numbers_are_reported_by_key() {
        let err = config(&[
            ("SERVER_ADDR", "127.0.0.1:8080"),
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "dev"),
            ("ACCESS_TOKEN_TTL", "soon"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("ACCESS_TOKEN_TTL"));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = config(&[("SERVER_ADDR", "127.0.0.1:8080"), ("STORE_BACKEND", "memory")])
            .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }
}
