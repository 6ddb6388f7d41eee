use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_list_limit: i64,
    pub log_format: LogFormat,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: "0.0.0.0:8080".to_string(),
            database_url: None,
            db_max_connections: 10,
            db_acquire_timeout_secs: 30,
            request_timeout_secs: 30,
            max_list_limit: 100,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(Error::Config(format!("Invalid value for LOG_FORMAT: {}", other)))
            }
        };

        let config = Self {
            server_address: get_env_or(&var, "SERVER_ADDRESS", defaults.server_address),
            database_url: database_url_from_env(&var),
            db_max_connections: get_env_parse_or(
                &var,
                "DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,
            db_acquire_timeout_secs: get_env_parse_or(
                &var,
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.db_acquire_timeout_secs,
            )?,
            request_timeout_secs: get_env_parse_or(
                &var,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            max_list_limit: get_env_parse_or(&var, "MAX_LIST_LIMIT", defaults.max_list_limit)?,
            log_format,
        };

        if config.max_list_limit < 1 {
            return Err(Error::Config("MAX_LIST_LIMIT must be at least 1".to_string()));
        }

        Ok(config)
    }
}

/// `DATABASE_URL` wins; otherwise the URL is assembled from the `DB_*` parts
/// when `DB_HOST` is present.
fn database_url_from_env<F>(var: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = var("DATABASE_URL").filter(|v| !v.is_empty()) {
        return Some(url);
    }

    let host = var("DB_HOST").filter(|v| !v.is_empty())?;
    let port = get_env_or(var, "DB_PORT", "5432".to_string());
    let user = get_env_or(var, "DB_USER", "postgres".to_string());
    let password = var("DB_PASSWORD").unwrap_or_default();
    let name = get_env_or(var, "DB_NAME", "postgres".to_string());
    let sslmode = get_env_or(var, "DB_SSLMODE", "disable".to_string());

    let credentials = if password.is_empty() {
        user
    } else {
        format!("{}:{}", user, password)
    };

    Some(format!(
        "postgres://{}@{}:{}/{}?sslmode={}",
        credentials, host, port, name, sslmode
    ))
}

fn get_env_or<F>(var: &F, name: &str, default: String) -> String
where
    F: Fn(&str) -> Option<String>,
{
    var(name).filter(|v| !v.is_empty()).unwrap_or(default)
}

fn get_env_parse_or<F, T>(var: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
