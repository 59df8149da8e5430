pub mod error;
pub mod extract;
pub mod fetcher;
pub mod pacing;
pub mod page;
pub mod profiles;
pub mod resolver;
mod retry;
pub mod walker;

pub use error::ScraperError;
pub use fetcher::{HttpFetcher, PageFetcher};
pub use pacing::DelayPolicy;
pub use profiles::{SelectorChain, SiteProfile};
pub use walker::{CancelToken, Outcome, ScrapeReport, ScrapeSession, SessionParams};
