use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

/// Where uploaded event images end up.
#[derive(Debug, Clone, Deserialize)]
pub enum StorageConfig {
    Local {
        dir: PathBuf,
    },
    S3 {
        endpoint: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        region: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub max_upload_bytes: usize,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            ttl_minutes: lookup("JWT_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|m| *m > 0)
                .unwrap_or(60),
        };

        let storage = match lookup("STORAGE_BACKEND").as_deref().unwrap_or("local") {
            "local" => StorageConfig::Local {
                dir: lookup("UPLOAD_DIR")
                    .unwrap_or_else(|| "public/images".into())
                    .into(),
            },
            "s3" => StorageConfig::S3 {
                endpoint: required("MINIO_ENDPOINT")?,
                bucket: required("MINIO_BUCKET")?,
                access_key: required("MINIO_ACCESS_KEY")?,
                secret_key: required("MINIO_SECRET_KEY")?,
                region: lookup("MINIO_REGION").unwrap_or_else(|| "us-east-1".into()),
            },
            other => anyhow::bail!("unknown STORAGE_BACKEND {other:?}, expected \"local\" or \"s3\""),
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parsed_or(lookup("DATABASE_MAX_CONNECTIONS"), 10u32),
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed_or(lookup("APP_PORT"), 3000u16),
            jwt,
            storage,
            max_upload_bytes: parsed_or(lookup("MAX_UPLOAD_BYTES"), 10 * 1024 * 1024usize),
            request_timeout_secs: parsed_or(lookup("REQUEST_TIMEOUT_SECS"), 30u64),
        })
    }
}

/// Unparseable or out-of-range values fall back to `default`.
fn parsed_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
