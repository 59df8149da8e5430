use std::path::PathBuf;

/// Application configuration, loaded from `REVSCOUT_`-prefixed environment
/// variables (see [`crate::config::load_app_config`]).
///
/// Everything here is a policy knob with a working default; no variable is
/// required for the scraper to run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Per-request timeout for page fetches.
    pub request_timeout_secs: u64,
    /// Fixed `User-Agent` override. When `None`, one is picked from the
    /// built-in browser pool per session.
    pub user_agent: Option<String>,
    /// Retry attempts after the first failure for transient fetch errors.
    pub max_retries: u32,
    /// Base delay for exponential retry backoff.
    pub retry_backoff_base_secs: u64,
    /// Lower bound of the jittered inter-page delay.
    pub delay_min_ms: u64,
    /// Upper bound of the jittered inter-page delay.
    pub delay_max_ms: u64,
    /// Directory for output documents when no explicit path is given.
    pub output_dir: PathBuf,
}
