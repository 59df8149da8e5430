use thiserror::Error;

/// Failures that can abort a page fetch or a whole session.
///
/// Extraction-level problems are deliberately absent from this taxonomy: an
/// unparseable review card or an unreadable date degrades to a skipped
/// record or an absent field inside the extractors, and never surfaces as an
/// error. `SessionInit` is the one session-fatal variant — callers must be
/// able to tell "the HTTP session never came up" apart from "zero reviews
/// found".
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited at {url} (retry after {retry_after_secs}s)")]
    RateLimited { url: String, retry_after_secs: u64 },

    #[error("blocked by anti-bot protection at {url} (HTTP {status})")]
    Blocked { url: String, status: u16 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("failed to initialize HTTP session: {reason}")]
    SessionInit { reason: String },
}
