//! Configuration loader for the `norun-trafficflow` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::models::SamplingConfig;

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Root directory holding per-session upload/report directories.
    pub upload_root: PathBuf,

    /// HTTP listen port.
    pub server_port: u16,

    /// Maximum accepted multipart body size, in megabytes.
    pub max_upload_mb: u32,

    /// Sampling interval used when neither the request nor the template
    /// supplies one, in minutes.
    pub default_interval_minutes: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `UPLOAD_ROOT` – session root directory (default: `uploads`)
/// - `SERVER_PORT` – HTTP listen port (default: 8080)
/// - `MAX_UPLOAD_MB` – multipart body cap in MB (default: 16)
/// - `DEFAULT_INTERVAL_MINUTES` – sampling fallback, 1–60 (default: 60)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let upload_root = PathBuf::from(env_or!("UPLOAD_ROOT", "uploads"));
    let server_port = u16::try_from(parse_env_u32!("SERVER_PORT", 8080))
        .map_err(|_| anyhow!("Invalid SERVER_PORT: out of range"))?;
    let max_upload_mb = parse_env_u32!("MAX_UPLOAD_MB", 16);
    let default_interval_minutes = parse_env_u32!(
        "DEFAULT_INTERVAL_MINUTES",
        SamplingConfig::DEFAULT_INTERVAL_MINUTES
    );

    if SamplingConfig::new(default_interval_minutes).is_none() {
        return Err(anyhow!(
            "Invalid DEFAULT_INTERVAL_MINUTES: must be between 1 and 60"
        ));
    }
    if max_upload_mb == 0 {
        return Err(anyhow!("Invalid MAX_UPLOAD_MB: must be at least 1"));
    }

    Ok(Config {
        upload_root,
        server_port,
        max_upload_mb,
        default_interval_minutes,
    })
}

impl Config {
    /// Multipart body cap in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb as usize * 1024 * 1024
    }

    /// Sampling fallback as a validated [`SamplingConfig`].
    pub fn fallback_interval(&self) -> SamplingConfig {
        // Range-checked in load_from_env
        SamplingConfig::new(self.default_interval_minutes).unwrap_or_default()
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  UPLOAD_ROOT              : {}", self.upload_root.display());
        tracing::info!("  SERVER_PORT              : {}", self.server_port);
        tracing::info!("  MAX_UPLOAD_MB            : {}", self.max_upload_mb);
        tracing::info!("  DEFAULT_INTERVAL_MINUTES : {}", self.default_interval_minutes);
    }
}
