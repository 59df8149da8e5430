//! Company-to-listing-URL resolution.
//!
//! Two strategies, first validated hit wins: site search endpoints scanned
//! for a product link naming the company, then direct URL construction from
//! a normalized slug, validated by probing for review markers. Exhausting
//! both yields `None` — the caller reports a defined "listing not found"
//! result, never an error.

use std::sync::OnceLock;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use scraper::{Html, Selector};

use crate::extract::element_text;
use crate::fetcher::PageFetcher;
use crate::profiles::SiteProfile;

/// Resolves `company` to a reviews-listing URL on the profile's site.
pub async fn resolve_listing_url<F: PageFetcher>(
    fetcher: &F,
    profile: &SiteProfile,
    company: &str,
) -> Option<String> {
    if let Some(url) = resolve_via_search(fetcher, profile, company).await {
        return Some(url);
    }
    resolve_via_slug(fetcher, profile, company).await
}

/// Normalizes a company name into a URL slug: lowercased, everything but
/// alphanumerics stripped, separator runs collapsed to a single `-`.
#[must_use]
pub fn company_slug(company: &str) -> String {
    let lower = company.to_lowercase();
    let cleaned: String = lower
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    cleaned
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

async fn resolve_via_search<F: PageFetcher>(
    fetcher: &F,
    profile: &SiteProfile,
    company: &str,
) -> Option<String> {
    let query = utf8_percent_encode(company, NON_ALPHANUMERIC).to_string();
    for template in &profile.search_url_templates {
        let search_url = template.replace("{query}", &query);
        let html = match fetcher.fetch(&search_url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!(url = %search_url, error = %e, "search endpoint failed");
                continue;
            }
        };
        let Some(product_url) = find_product_link(&html, profile, company) else {
            continue;
        };
        tracing::debug!(company, product_url, "found product page via search");
        if let Some(listing_url) = reviews_url_for(fetcher, profile, &product_url).await {
            return Some(listing_url);
        }
    }
    None
}

async fn resolve_via_slug<F: PageFetcher>(
    fetcher: &F,
    profile: &SiteProfile,
    company: &str,
) -> Option<String> {
    let slug = company_slug(company);
    for template in &profile.listing_url_templates {
        let url = template.replace("{slug}", &slug);
        let html = match fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "slug-template probe failed");
                continue;
            }
        };
        if !has_review_markers(&html) {
            tracing::debug!(url = %url, "page reachable but carries no review markers");
            continue;
        }
        tracing::debug!(company, url = %url, "validated listing url from slug template");
        if url.contains("/reviews") {
            return Some(url);
        }
        // The template landed on a product page; follow its reviews link if
        // one exists, else construct the conventional suffix.
        return Some(
            reviews_link_in(&html, profile)
                .unwrap_or_else(|| format!("{}/reviews", url.trim_end_matches('/'))),
        );
    }
    None
}

/// Scans search results for an anchor whose visible text names the company
/// (case-insensitive) and whose href looks like a product page.
fn find_product_link(html: &str, profile: &SiteProfile, company: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let needle = company.to_lowercase();
    for anchor in doc.select(anchor_selector()) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !element_text(anchor).to_lowercase().contains(&needle) {
            continue;
        }
        if profile
            .product_path_markers
            .iter()
            .any(|marker| href.contains(marker.as_str()))
        {
            return Some(absolutize(&profile.base_url, href));
        }
    }
    None
}

/// Fetches a product page and locates its reviews listing.
async fn reviews_url_for<F: PageFetcher>(
    fetcher: &F,
    profile: &SiteProfile,
    product_url: &str,
) -> Option<String> {
    if product_url.contains("/reviews") {
        return Some(product_url.to_owned());
    }
    let html = fetcher.fetch(product_url).await.ok()?;
    Some(
        reviews_link_in(&html, profile)
            .unwrap_or_else(|| format!("{}/reviews", product_url.trim_end_matches('/'))),
    )
}

/// First anchor whose href mentions reviews, absolutized against the site.
fn reviews_link_in(html: &str, profile: &SiteProfile) -> Option<String> {
    let doc = Html::parse_document(html);
    for anchor in doc.select(anchor_selector()) {
        if let Some(href) = anchor.value().attr("href") {
            if href.to_lowercase().contains("review") {
                return Some(absolutize(&profile.base_url, href));
            }
        }
    }
    None
}

/// True when the page shows any sign of carrying reviews: review-classed
/// markup, a reviews-labelled link, or the word itself in the document.
fn has_review_markers(html: &str) -> bool {
    let doc = Html::parse_document(html);
    if doc.select(review_marker_selector()).next().is_some() {
        return true;
    }
    review_word_regex().is_match(html)
}

fn anchor_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("a[href]").expect("valid anchor selector"))
}

fn review_marker_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Selector::parse(".reviews, .review, [class*='review'], a[href*='review']")
            .expect("valid review-marker selector")
    })
}

fn review_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\breviews?\b").expect("valid review-word regex"))
}

fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_owned()
    } else if href.starts_with('/') {
        format!("{}{href}", base_url.trim_end_matches('/'))
    } else {
        format!("{}/{href}", base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubFetcher;

    // -----------------------------------------------------------------------
    // company_slug
    // -----------------------------------------------------------------------

    #[test]
    fn slug_lowercases_and_joins_words() {
        assert_eq!(company_slug("Salesforce"), "salesforce");
        assert_eq!(company_slug("SAP Concur"), "sap-concur");
        assert_eq!(company_slug("  Monday   Dot  Com "), "monday-dot-com");
    }

    #[test]
    fn slug_strips_punctuation() {
        assert_eq!(company_slug("Monday.com"), "mondaycom");
        assert_eq!(company_slug("O'Reilly & Friends!"), "oreilly-friends");
        assert_eq!(company_slug("Already-Slugged-Name"), "already-slugged-name");
    }

    // -----------------------------------------------------------------------
    // absolutize
    // -----------------------------------------------------------------------

    #[test]
    fn absolutize_handles_all_href_shapes() {
        let base = "https://www.g2.com";
        assert_eq!(
            absolutize(base, "https://www.g2.com/products/x"),
            "https://www.g2.com/products/x"
        );
        assert_eq!(absolutize(base, "/products/x"), "https://www.g2.com/products/x");
        assert_eq!(absolutize(base, "products/x"), "https://www.g2.com/products/x");
    }

    // -----------------------------------------------------------------------
    // link scanning
    // -----------------------------------------------------------------------

    #[test]
    fn product_link_requires_matching_text_and_path() {
        let profile = SiteProfile::capterra();
        let html = r#"
            <div class="search-results">
                <a href="/blog/acmeflow-pricing">AcmeFlow pricing explained</a>
                <a href="/p/12345/acmeflow">AcmeFlow</a>
            </div>
        "#;
        assert_eq!(
            find_product_link(html, &profile, "AcmeFlow").as_deref(),
            Some("https://www.capterra.com/p/12345/acmeflow"),
            "blog link matches text but not the product path"
        );
    }

    #[test]
    fn product_link_match_is_case_insensitive() {
        let profile = SiteProfile::capterra();
        let html = r#"<a href="/p/99/acmeflow">ACMEFLOW — project tracking</a>"#;
        assert!(find_product_link(html, &profile, "acmeflow").is_some());
    }

    #[test]
    fn no_product_link_for_unknown_company() {
        let profile = SiteProfile::capterra();
        let html = r#"<a href="/p/12345/acmeflow">AcmeFlow</a>"#;
        assert_eq!(find_product_link(html, &profile, "NonexistentCo"), None);
    }

    #[test]
    fn review_markers_detected_from_class_or_text() {
        assert!(has_review_markers(
            r#"<div class="review-summary">4.4 average</div>"#
        ));
        assert!(has_review_markers(
            r#"<p>Read 215 reviews from verified users.</p>"#
        ));
        assert!(!has_review_markers(
            r#"<p>Pricing plans and contact information.</p>"#
        ));
    }

    // -----------------------------------------------------------------------
    // full resolution
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn search_resolution_follows_product_page_to_reviews_link() {
        let profile = SiteProfile::capterra();
        let fetcher = StubFetcher::new()
            .page(
                "https://www.capterra.com/search?query=AcmeFlow",
                r#"<a href="/p/12345/acmeflow">AcmeFlow</a>"#,
            )
            .page(
                "https://www.capterra.com/p/12345/acmeflow",
                r#"<h1>AcmeFlow</h1><a href="/p/12345/acmeflow/reviews">Read Reviews</a>"#,
            );

        let url = resolve_listing_url(&fetcher, &profile, "AcmeFlow").await;
        assert_eq!(
            url.as_deref(),
            Some("https://www.capterra.com/p/12345/acmeflow/reviews")
        );
    }

    #[tokio::test]
    async fn slug_resolution_validates_review_markers() {
        let profile = SiteProfile::g2();
        let fetcher = StubFetcher::new().page(
            "https://www.g2.com/products/acmeflow/reviews",
            r#"<h1>AcmeFlow Reviews</h1><div class="paper__bd">review cards here</div>"#,
        );

        let url = resolve_listing_url(&fetcher, &profile, "AcmeFlow").await;
        assert_eq!(
            url.as_deref(),
            Some("https://www.g2.com/products/acmeflow/reviews")
        );
    }

    #[tokio::test]
    async fn slug_template_without_markers_is_rejected() {
        let profile = SiteProfile::g2();
        let fetcher = StubFetcher::new().page(
            "https://www.g2.com/products/acmeflow/reviews",
            r#"<h1>Page not available in your region</h1>"#,
        );

        assert_eq!(resolve_listing_url(&fetcher, &profile, "AcmeFlow").await, None);
    }

    #[tokio::test]
    async fn exhausted_strategies_yield_none() {
        let profile = SiteProfile::capterra();
        let fetcher = StubFetcher::new();
        assert_eq!(
            resolve_listing_url(&fetcher, &profile, "NonexistentCo").await,
            None
        );
    }
}
