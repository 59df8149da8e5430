use std::path::PathBuf;

use crate::app_config::AppConfig;

/// Errors raised while loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a set variable holds an unparseable value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for
/// testing or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a set variable holds an unparseable value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup — no
/// `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let log_level = or_default("REVSCOUT_LOG_LEVEL", "info");
    let request_timeout_secs = parse_u64("REVSCOUT_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = lookup("REVSCOUT_USER_AGENT").ok().filter(|s| !s.is_empty());
    let max_retries = parse_u32("REVSCOUT_MAX_RETRIES", "3")?;
    let retry_backoff_base_secs = parse_u64("REVSCOUT_RETRY_BACKOFF_BASE_SECS", "2")?;
    let delay_min_ms = parse_u64("REVSCOUT_DELAY_MIN_MS", "2000")?;
    let delay_max_ms = parse_u64("REVSCOUT_DELAY_MAX_MS", "7000")?;
    let output_dir = PathBuf::from(or_default("REVSCOUT_OUTPUT_DIR", "./output"));

    if delay_min_ms > delay_max_ms {
        return Err(ConfigError::InvalidEnvVar {
            var: "REVSCOUT_DELAY_MIN_MS".to_string(),
            reason: format!("minimum delay {delay_min_ms}ms exceeds maximum {delay_max_ms}ms"),
        });
    }

    Ok(AppConfig {
        log_level,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
        delay_min_ms,
        delay_max_ms,
        output_dir,
    })
}
