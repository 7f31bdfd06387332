// src/config.rs

use std::{env, fmt};

use dotenvy::dotenv;

/// Error raised when the process environment cannot produce a `Config`.
#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, value) => write!(f, "{} has an invalid value: {}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,
    pub app_port: u16,
    pub app_env: String,
    pub database_url: String,
    pub secret_key: String,
    pub rust_log: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let app_port = match env::var("APP_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid("APP_PORT", raw))?,
            Err(_) => 3000,
        };

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => database_url_from_parts()?,
        };

        let secret_key = env::var("SECRET_KEY").map_err(|_| ConfigError::Missing("SECRET_KEY"))?;

        Ok(Self {
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "exam-backend".to_string()),
            app_version: env::var("APP_VER")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            app_port,
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            database_url,
            secret_key,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

/// Builds a Postgres URL from the discrete `DB_*` variables.
fn database_url_from_parts() -> Result<String, ConfigError> {
    let host = env::var("DB_HOST").map_err(|_| ConfigError::Missing("DATABASE_URL or DB_HOST"))?;
    let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
    let user = env::var("DB_USER").map_err(|_| ConfigError::Missing("DB_USER"))?;
    let pass = env::var("DB_PASS").unwrap_or_default();
    let name = env::var("DB_NAME").map_err(|_| ConfigError::Missing("DB_NAME"))?;

    if port.parse::<u16>().is_err() {
        return Err(ConfigError::Invalid("DB_PORT", port));
    }

    Ok(format!("postgres://{}:{}@{}:{}/{}", user, pass, host, port, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages_name_the_key() {
        assert_eq!(ConfigError::Missing("SECRET_KEY").to_string(), "SECRET_KEY must be set");
        assert_eq!(
            ConfigError::Invalid("APP_PORT", "abc".to_string()).to_string(),
            "APP_PORT has an invalid value: abc"
        );
    }
}
