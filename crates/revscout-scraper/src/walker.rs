//! Pagination walker: drives one scrape session page by page.
//!
//! Pages are fetched strictly sequentially — review sites rate-limit and
//! fingerprint bursty access, so nothing in a session is parallelized. A
//! single page failing to fetch or parse is absorbed into the empty-page
//! streak; only the streak limit, the hard page cap, or the listing itself
//! running out ends the walk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use revscout_core::Review;

use crate::fetcher::PageFetcher;
use crate::pacing::DelayPolicy;
use crate::page::extract_page;
use crate::profiles::SiteProfile;
use crate::resolver::resolve_listing_url;

/// Hard cap on pages walked per session, regardless of what the site's
/// pagination claims.
pub const MAX_PAGES: u32 = 100;

/// Consecutive pages yielding nothing (fetch failure or zero reviews)
/// before the walk gives up.
pub const EMPTY_PAGE_STREAK_LIMIT: u32 = 3;

/// Cooperative cancellation for an in-flight session.
///
/// Cloned handles share one flag. The walker checks it between pages, so
/// cancellation takes effect after the current page completes and the
/// partial accumulation is returned rather than dropped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// How a completed session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The walk ran to a terminal condition (or cancellation) normally.
    Completed,
    /// No listing URL could be resolved for the company. The report carries
    /// zero reviews; this is a defined empty result, not an error.
    ListingNotFound,
}

/// Accumulated result of one scrape session.
#[derive(Debug)]
pub struct ScrapeReport {
    /// All in-window reviews, in listing order.
    pub reviews: Vec<Review>,
    pub outcome: Outcome,
    pub pages_visited: u32,
    /// Reviews found but excluded by the date filter.
    pub excluded_out_of_range: usize,
    /// The session was cancelled mid-walk; `reviews` holds the partial
    /// accumulation up to the last completed page.
    pub cancelled: bool,
}

impl ScrapeReport {
    fn not_found() -> Self {
        Self {
            reviews: Vec::new(),
            outcome: Outcome::ListingNotFound,
            pages_visited: 0,
            excluded_out_of_range: 0,
            cancelled: false,
        }
    }
}

/// Inputs for one scrape session.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub company: String,
    /// Start of the date window, inclusive.
    pub start: NaiveDate,
    /// End of the date window, inclusive.
    pub end: NaiveDate,
    /// Reference date for resolving relative expressions like "2 weeks ago".
    /// Supplied by the caller so extraction is reproducible.
    pub today: NaiveDate,
    pub pacing: DelayPolicy,
    pub max_pages: u32,
    pub empty_page_streak_limit: u32,
}

impl SessionParams {
    /// Parameters with the standard caps and no pacing. Callers wanting
    /// human pacing set `pacing` explicitly.
    #[must_use]
    pub fn new(company: &str, start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Self {
        Self {
            company: company.to_owned(),
            start,
            end,
            today,
            pacing: DelayPolicy::none(),
            max_pages: MAX_PAGES,
            empty_page_streak_limit: EMPTY_PAGE_STREAK_LIMIT,
        }
    }
}

/// One scrape session: resolves the listing, then walks its pages until a
/// terminal condition.
///
/// The session exclusively owns its accumulator; collaborators receive only
/// the inputs they need (a page's HTML, the date window) and return values.
pub struct ScrapeSession<'a> {
    profile: &'a SiteProfile,
    params: SessionParams,
    cancel: CancelToken,
}

impl<'a> ScrapeSession<'a> {
    #[must_use]
    pub fn new(profile: &'a SiteProfile, params: SessionParams) -> Self {
        Self {
            profile,
            params,
            cancel: CancelToken::new(),
        }
    }

    /// Returns a handle that cancels this session from another task. The
    /// walk stops after the in-flight page completes and returns partial
    /// results — accumulated reviews are never dropped.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs the session to completion and returns the accumulated reviews.
    ///
    /// Per-page fetch failures are absorbed into the empty-page streak; a
    /// failed resolution short-circuits to an empty
    /// [`Outcome::ListingNotFound`] report before any page is walked.
    pub async fn run<F: PageFetcher>(&self, fetcher: &F) -> ScrapeReport {
        let Some(listing_url) =
            resolve_listing_url(fetcher, self.profile, &self.params.company).await
        else {
            tracing::warn!(
                company = %self.params.company,
                source = %self.profile.source,
                "no listing url resolved; returning empty result"
            );
            return ScrapeReport::not_found();
        };

        tracing::info!(
            company = %self.params.company,
            source = %self.profile.source,
            url = %listing_url,
            "starting review walk"
        );

        let mut reviews: Vec<Review> = Vec::new();
        let mut excluded = 0usize;
        let mut empty_streak = 0u32;
        let mut pages_visited = 0u32;
        let mut cancelled = false;
        let mut page_no = 1u32;

        loop {
            if page_no > self.params.max_pages {
                tracing::info!(max_pages = self.params.max_pages, "page cap reached");
                break;
            }
            if self.cancel.is_cancelled() {
                tracing::info!(page = page_no, "cancelled; returning partial results");
                cancelled = true;
                break;
            }
            if page_no > 1 {
                self.params.pacing.wait().await;
            }

            let url = page_url(&listing_url, page_no);
            let html = match fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(page = page_no, error = %e, "page fetch failed; skipping");
                    pages_visited += 1;
                    empty_streak += 1;
                    if empty_streak >= self.params.empty_page_streak_limit {
                        tracing::info!(streak = empty_streak, "empty-page streak limit reached");
                        break;
                    }
                    page_no += 1;
                    continue;
                }
            };

            pages_visited += 1;
            let result = extract_page(
                &html,
                self.profile,
                self.params.start,
                self.params.end,
                self.params.today,
            );
            excluded += result.excluded_out_of_range;

            if result.reviews.is_empty() {
                empty_streak += 1;
            } else {
                empty_streak = 0;
                reviews.extend(result.reviews);
            }

            // On a newest-first listing, any review older than the window
            // means every later page is older still. The flag is declared
            // per profile, never inferred from the page.
            let page_predates_window = self.profile.recency_sorted
                && result
                    .oldest_dated
                    .is_some_and(|oldest| oldest < self.params.start);
            if page_predates_window {
                tracing::info!(
                    page = page_no,
                    "reached reviews older than the window; stopping early"
                );
                break;
            }

            if !result.has_more {
                tracing::debug!(page = page_no, "no further pages advertised");
                break;
            }
            if empty_streak >= self.params.empty_page_streak_limit {
                tracing::info!(streak = empty_streak, "empty-page streak limit reached");
                break;
            }
            page_no += 1;
        }

        tracing::info!(
            company = %self.params.company,
            total = reviews.len(),
            pages_visited,
            excluded,
            cancelled,
            "review walk finished"
        );

        ScrapeReport {
            reviews,
            outcome: Outcome::Completed,
            pages_visited,
            excluded_out_of_range: excluded,
            cancelled,
        }
    }
}

/// Page 1 is the listing URL exactly as resolved; later pages append
/// `page=N` with whichever separator the URL still needs.
fn page_url(listing_url: &str, page_no: u32) -> String {
    if page_no == 1 {
        return listing_url.to_owned();
    }
    let separator = if listing_url.contains('?') { '&' } else { '?' };
    format!("{listing_url}{separator}page={page_no}")
}
