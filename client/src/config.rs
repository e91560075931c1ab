//! Configuration management for the client.

use basket_engine::{models, ListOptions};
use std::env;

/// Backend address used when `POCKETBASE_URL` is not set.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8090";

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the PocketBase instance
    pub backend_url: String,
    /// Auth token sent with every request
    pub auth_token: Option<String>,
    /// Collection to synchronize
    pub collection: String,
    /// Sort, filter and expand for the collection
    pub options: ListOptions,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup("POCKETBASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        reqwest::Url::parse(&backend_url)
            .map_err(|e| ConfigError::InvalidBackendUrl(format!("{}: {}", backend_url, e)))?;

        let auth_token = lookup("POCKETBASE_TOKEN").filter(|v| !v.is_empty());

        let collection = lookup("BASKET_COLLECTION")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| models::PRODUCTS.to_string());

        if collection.contains('/') {
            return Err(ConfigError::InvalidCollection(collection));
        }

        let options = ListOptions {
            sort: lookup("BASKET_SORT"),
            filter: lookup("BASKET_FILTER"),
            expand: lookup("BASKET_EXPAND"),
        };

        Ok(Self {
            backend_url,
            auth_token,
            collection,
            options,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid POCKETBASE_URL: {0}")]
    InvalidBackendUrl(String),

    #[error("invalid BASKET_COLLECTION: {0}")]
    InvalidCollection(String),
}
