use dotenvy::dotenv;
use std::{env, net::SocketAddr, path::PathBuf};
use thiserror::Error;

use crate::upload::{DEFAULT_MAX_TOTAL_SIZE, UploadPolicy};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("Invalid host or port: {0}")]
    Address(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub policy: UploadPolicy,
    pub log_level: tracing::Level,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let allowed_mime_types = lookup("ALLOWED_MIME_TYPES")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let policy = UploadPolicy {
            max_total_size: parse_or("MAX_TOTAL_SIZE", &lookup, DEFAULT_MAX_TOTAL_SIZE)?,
            allowed_mime_types,
            rename_on_store: parse_or("RENAME_ON_STORE", &lookup, true)?,
            harden_extensions: parse_or("HARDEN_EXTENSIONS", &lookup, false)?,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", &lookup, 8080)?,
            upload_dir: PathBuf::from(
                lookup("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()),
            ),
            policy,
            log_level: parse_or("LOG_LEVEL", &lookup, tracing::Level::INFO)?,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::Address(addr))
    }
}

fn parse_or<T, F>(name: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
