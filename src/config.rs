// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Missing store credentials are not an error: the server starts in a
//! degraded "no backend" mode where reads come back empty and writes are
//! refused.

use std::env;
use std::time::Duration;

/// Default timeout raced against every profile read.
pub const DEFAULT_PROFILE_FETCH_TIMEOUT_MS: u64 = 2000;

/// Which store implementation backs the row collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Cloud Firestore (production).
    Firestore,
    /// Process-local in-memory collections (local dev, tests).
    Memory,
}

impl StoreBackend {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND", raw.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Server ---
    /// Frontend URL for CORS and OAuth redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    // --- Store ---
    pub store_backend: StoreBackend,
    /// GCP project ID; `None` means the store is not configured
    pub gcp_project_id: Option<String>,

    // --- Auth provider ---
    /// Base URL of the hosted auth provider (e.g. `https://xyz.supabase.co`)
    pub auth_url: Option<String>,
    /// Public (anon) API key sent with every auth request
    pub auth_anon_key: String,
    /// HS256 key the auth provider signs session tokens with (raw bytes)
    pub jwt_signing_key: Vec<u8>,

    // --- Blob storage ---
    /// Base URL of the blob storage service; `None` keeps uploads in memory
    pub storage_url: Option<String>,
    pub storage_bucket: String,

    // --- Generative text ---
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,

    // --- Pipeline tuning ---
    pub profile_fetch_timeout: Duration,
    /// Run side effects through the retrying outbox instead of inline
    pub outbox_enabled: bool,
    pub outbox_max_attempts: u32,
    /// Interval of the counter/leaderboard reconciliation pass (0 disables)
    pub reconcile_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(raw) => StoreBackend::parse(&raw)?,
            Err(_) => StoreBackend::Firestore,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            store_backend,
            gcp_project_id: non_empty_var("GCP_PROJECT_ID"),

            auth_url: non_empty_var("AUTH_URL").map(|v| v.trim_end_matches('/').to_string()),
            auth_anon_key: env::var("AUTH_ANON_KEY").unwrap_or_default(),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),

            storage_url: non_empty_var("STORAGE_URL")
                .map(|v| v.trim_end_matches('/').to_string()),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "roast-audio".to_string()),

            // Either name is accepted for the key.
            gemini_api_key: non_empty_var("GEMINI_API_KEY").or_else(|| non_empty_var("API_KEY")),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),

            profile_fetch_timeout: Duration::from_millis(parse_var(
                "PROFILE_FETCH_TIMEOUT_MS",
                DEFAULT_PROFILE_FETCH_TIMEOUT_MS,
            )?),
            outbox_enabled: parse_var("OUTBOX_ENABLED", false)?,
            outbox_max_attempts: parse_var("OUTBOX_MAX_ATTEMPTS", 5)?,
            reconcile_interval_secs: parse_var("RECONCILE_INTERVAL_SECS", 300)?,
        })
    }

    /// Config for tests: in-memory store, no external collaborators.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            gcp_project_id: None,
            auth_url: None,
            auth_anon_key: String::new(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            storage_url: None,
            storage_bucket: "roast-audio".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            profile_fetch_timeout: Duration::from_millis(DEFAULT_PROFILE_FETCH_TIMEOUT_MS),
            outbox_enabled: false,
            outbox_max_attempts: 5,
            reconcile_interval_secs: 0,
        }
    }

    /// True when store credentials are present for the selected backend.
    pub fn store_configured(&self) -> bool {
        match self.store_backend {
            StoreBackend::Memory => true,
            StoreBackend::Firestore => self.gcp_project_id.is_some(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("STORE_BACKEND", "memory");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.store_configured());
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage_bucket, "roast-audio");
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!(
            StoreBackend::parse("Firestore").unwrap(),
            StoreBackend::Firestore
        );
        assert_eq!(StoreBackend::parse(" memory ").unwrap(), StoreBackend::Memory);
        assert!(StoreBackend::parse("postgres").is_err());
    }

    #[test]
    fn test_firestore_without_project_is_unconfigured() {
        let config = Config {
            store_backend: StoreBackend::Firestore,
            gcp_project_id: None,
            ..Config::test_default()
        };
        assert!(!config.store_configured());
    }
}
