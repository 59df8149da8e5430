//! Per-site extraction strategy tables.
//!
//! All site-specific knowledge lives here as data: ordered selector lists
//! per field, URL templates, and pagination traits. The pipeline itself
//! (extract, page, resolver, walker) is site-agnostic and walks these tables
//! in order, first hit wins. Adding a site means adding a profile, not a
//! code branch.

use revscout_core::ReviewSource;
use scraper::Selector;

/// An ordered list of compiled CSS selectors, most specific first.
///
/// Chains are iterated front to back by the extractors; the first selector
/// producing a plausible value wins and later entries are never consulted.
#[derive(Debug, Clone)]
pub struct SelectorChain {
    selectors: Vec<Selector>,
}

impl SelectorChain {
    /// Compiles `patterns` in order. A pattern that fails to compile is
    /// dropped with a warning instead of aborting profile construction —
    /// the remaining strategies still work.
    #[must_use]
    pub fn new(patterns: &[&str]) -> Self {
        let selectors = patterns
            .iter()
            .filter_map(|pattern| match Selector::parse(pattern) {
                Ok(selector) => Some(selector),
                Err(e) => {
                    tracing::warn!(pattern, error = ?e, "dropping unparseable selector");
                    None
                }
            })
            .collect();
        Self { selectors }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.selectors.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selectors.len()
    }
}

/// Rating encoded as a numeric suffix on a CSS class name.
///
/// G2 renders stars as `stars-8`, counting half-stars, so the suffix divides
/// by 2 to land on the 0–5 scale.
#[derive(Debug, Clone, Copy)]
pub struct ClassRatingPattern {
    pub prefix: &'static str,
    pub divisor: f64,
}

/// Extraction strategy table for one review site.
///
/// Selector chains are ordered most specific to most generic; URL templates
/// use `{query}` (percent-encoded company name) and `{slug}` (normalized
/// company slug) placeholders.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub source: ReviewSource,
    pub base_url: String,
    /// Search endpoints tried in order by the resolver.
    pub search_url_templates: Vec<String>,
    /// Substrings identifying a product-page href among search results.
    pub product_path_markers: Vec<String>,
    /// Direct listing-URL templates tried in order when search fails.
    pub listing_url_templates: Vec<String>,
    /// The listing is served newest-first, enabling the early-stop rule.
    /// This is an explicit declaration — the walker never infers ordering.
    pub recency_sorted: bool,
    pub cards: SelectorChain,
    pub title: SelectorChain,
    pub body: SelectorChain,
    pub date: SelectorChain,
    pub rating: SelectorChain,
    pub reviewer_name: SelectorChain,
    pub reviewer_company: SelectorChain,
    pub verified: SelectorChain,
    pub helpful_votes: SelectorChain,
    pub next_page: SelectorChain,
    pub class_rating: Option<ClassRatingPattern>,
}

impl SiteProfile {
    #[must_use]
    pub fn for_source(source: ReviewSource) -> Self {
        match source {
            ReviewSource::G2 => Self::g2(),
            ReviewSource::Capterra => Self::capterra(),
        }
    }

    /// G2 serves structured `itemprop` markup and sorts its listing
    /// newest-first; generic fallbacks trail the structured selectors for
    /// the days the markup shifts.
    #[must_use]
    pub fn g2() -> Self {
        Self {
            source: ReviewSource::G2,
            base_url: "https://www.g2.com".to_owned(),
            search_url_templates: vec!["https://www.g2.com/search?query={query}".to_owned()],
            product_path_markers: vec!["/products/".to_owned()],
            listing_url_templates: vec![
                "https://www.g2.com/products/{slug}/reviews".to_owned(),
            ],
            recency_sorted: true,
            cards: SelectorChain::new(&[
                "div.paper__bd",
                "[itemprop='review']",
                "article[class*='review']",
                "div[class*='review-card']",
            ]),
            title: SelectorChain::new(&[
                "div[itemprop='name']",
                ".review-title",
                "h3",
            ]),
            body: SelectorChain::new(&[
                "div[itemprop='reviewBody'] p.formatted-text",
                "div[itemprop='reviewBody']",
                ".review-text",
                "p",
            ]),
            date: SelectorChain::new(&[
                "meta[itemprop='datePublished']",
                "time",
                ".review-date",
                "[class*='date']",
            ]),
            rating: SelectorChain::new(&[
                "div.stars",
                "[itemprop='ratingValue']",
                "[class*='stars']",
                "[class*='rating']",
            ]),
            reviewer_name: SelectorChain::new(&[
                "[itemprop='author']",
                ".consumer-name",
                "[class*='reviewer']",
            ]),
            reviewer_company: SelectorChain::new(&[
                "[class*='company-segment']",
                "[class*='company']",
            ]),
            verified: SelectorChain::new(&["[class*='verified']"]),
            helpful_votes: SelectorChain::new(&["[class*='helpful']", "[class*='vote']"]),
            next_page: SelectorChain::new(&[
                ".pagination__item--next a",
                "a[rel='next']",
                "li.next a",
            ]),
            class_rating: Some(ClassRatingPattern {
                prefix: "stars-",
                divisor: 2.0,
            }),
        }
    }

    /// Capterra's markup is unstable and test-id driven; the chains here run
    /// from data-testid hooks through class-substring matches down to bare
    /// headings and paragraphs.
    #[must_use]
    pub fn capterra() -> Self {
        Self {
            source: ReviewSource::Capterra,
            base_url: "https://www.capterra.com".to_owned(),
            search_url_templates: vec![
                "https://www.capterra.com/search?query={query}".to_owned(),
                "https://www.capterra.com/directory/search?query={query}".to_owned(),
                "https://www.capterra.com/categories?query={query}".to_owned(),
            ],
            product_path_markers: vec!["/p/".to_owned(), "/directory/".to_owned()],
            listing_url_templates: vec![
                "https://www.capterra.com/directory/31/{slug}".to_owned(),
                "https://www.capterra.com/p/{slug}".to_owned(),
                "https://www.capterra.com/directory/{slug}".to_owned(),
            ],
            recency_sorted: false,
            cards: SelectorChain::new(&[
                "[data-testid*='review']",
                ".review-item",
                ".review-card",
                ".user-review",
                ".review-container",
                ".review-wrapper",
                "[class*='ReviewCard']",
                "[class*='review-']",
                "article[class*='review']",
                ".testimonial",
                "[data-cy*='review']",
            ]),
            title: SelectorChain::new(&[
                "[data-testid*='title'], [data-testid*='heading']",
                ".review-title, .review-header, .review-heading",
                "h1, h2, h3, h4, h5, h6",
                "[class*='title'], [class*='heading']",
                "strong, b",
            ]),
            body: SelectorChain::new(&[
                "[data-testid*='content'], [data-testid*='text']",
                ".review-text, .review-content, .review-description",
                ".user-review-text, .review-body",
                "[class*='content'], [class*='text'], [class*='description']",
                "p",
            ]),
            date: SelectorChain::new(&[
                "[data-testid*='date']",
                ".review-date, .date, .posted-date",
                "time, [datetime]",
                "[class*='date']",
            ]),
            rating: SelectorChain::new(&[
                "[data-testid*='rating'], [data-testid*='star']",
                ".rating, .stars, .star-rating",
                "[class*='rating'], [class*='star']",
                "[aria-label*='star'], [title*='star']",
            ]),
            reviewer_name: SelectorChain::new(&[
                "[data-testid*='reviewer'], [data-testid*='author']",
                ".reviewer-name, .author-name, .user-name",
                "[class*='reviewer'], [class*='author'], [class*='user']",
            ]),
            reviewer_company: SelectorChain::new(&[
                ".company, .job-title, .position",
                "[class*='company'], [class*='position']",
            ]),
            verified: SelectorChain::new(&[
                ".verified, [class*='verified']",
                "[data-verified='true']",
            ]),
            helpful_votes: SelectorChain::new(&[
                ".helpful-count, .votes",
                "[class*='helpful'], [class*='vote']",
            ]),
            next_page: SelectorChain::new(&[
                "a[aria-label*='Next']",
                "a[title*='Next']",
                ".next-page",
                ".pagination-next",
                "a[rel='next']",
                ".page-numbers a:last-child",
            ]),
            class_rating: Some(ClassRatingPattern {
                prefix: "rating-",
                divisor: 1.0,
            }),
        }
    }
}
