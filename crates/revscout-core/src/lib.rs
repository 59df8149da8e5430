pub mod app_config;
pub mod config;
pub mod dates;
pub mod reviews;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env, ConfigError};
pub use dates::{normalize_date, within_range};
pub use reviews::{PageResult, Review, ReviewSource};
