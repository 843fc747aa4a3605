// src/config.rs

use dotenvy::dotenv;
use std::{env, fmt};

/// Default token lifetime: 24 hours.
pub const DEFAULT_JWT_EXPIRATION_SECS: u64 = 24 * 60 * 60;

/// Upper bound for `JWT_EXPIRATION`: one year.
pub const MAX_JWT_EXPIRATION_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Lifetime of issued session tokens, in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(name) => write!(f, "{} must be set", name),
            ConfigError::Invalid { name, value } => {
                write!(f, "{} has an invalid value '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

/// Token lifetime in seconds; absent means the 24h default. Zero, garbage and
/// values above [`MAX_JWT_EXPIRATION_SECS`] are rejected.
pub fn parse_jwt_expiration(raw: Option<&str>) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_JWT_EXPIRATION_SECS);
    };

    match raw.trim().parse::<u64>() {
        Ok(secs) if (1..=MAX_JWT_EXPIRATION_SECS).contains(&secs) => Ok(secs),
        _ => Err(ConfigError::Invalid {
            name: "JWT_EXPIRATION",
            value: raw.to_string(),
        }),
    }
}

fn parse_port(raw: Option<&str>) -> Result<u16, ConfigError> {
    match raw {
        None => Ok(8080),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name: "PORT",
            value: raw.to_string(),
        }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;

        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = parse_jwt_expiration(env::var("JWT_EXPIRATION").ok().as_deref())?;

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = parse_port(env::var("PORT").ok().as_deref())?;

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
        })
    }
}
