use std::env;

use anyhow::{Context, Result, anyhow};

const DEFAULT_STORAGE_ROOT: &str = "storage/resources";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080/files";
// Platform-wide upload cap.
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Process-level settings resolved once at startup from the environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub storage_root: String,
    pub public_base_url: String,
    pub notify_endpoint: Option<String>,
    pub max_upload_bytes: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL env var is missing")?;

        let storage_root =
            env::var("STORAGE_ROOT").unwrap_or_else(|_| DEFAULT_STORAGE_ROOT.to_string());
        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.to_string());
        let notify_endpoint = env::var("NOTIFY_ENDPOINT")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|_| anyhow!("MAX_UPLOAD_BYTES must be a byte count, got `{value}`"))?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            database_url,
            storage_root,
            public_base_url,
            notify_endpoint,
            max_upload_bytes,
        })
    }
}
