//! Listing-page review-set extraction.
//!
//! Locates the review cards on one page of a listing, runs the field
//! extractor over each, applies the date window, and reports whether the
//! page advertises a successor. Card-location strategies are tried in
//! profile order and never merged; when none match, a bounded
//! looks-like-a-review scan keeps badly mangled pages from yielding nothing
//! at all.

use std::sync::OnceLock;

use chrono::NaiveDate;
use revscout_core::{dates, PageResult};
use scraper::{ElementRef, Html, Selector};

use crate::extract::extract_review;
use crate::profiles::SiteProfile;

/// Cap on candidate nodes considered by the fallback scan, so a pathological
/// page cannot turn into unbounded extraction work.
const FALLBACK_NODE_CAP: usize = 50;

/// Extracts all reviews from one listing page, filtered to `[start, end]`.
///
/// Reviews whose canonical date falls outside the closed interval are
/// dropped and counted in `excluded_out_of_range`. Reviews with no
/// resolvable date are always included — an unknown date is not grounds for
/// exclusion. Card nodes the field extractor rejects are skipped silently.
#[must_use]
pub fn extract_page(
    html: &str,
    profile: &SiteProfile,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> PageResult {
    let doc = Html::parse_document(html);
    let cards = locate_cards(&doc, profile);

    let mut reviews = Vec::new();
    let mut excluded = 0usize;
    let mut oldest_dated: Option<NaiveDate> = None;

    for card in &cards {
        let Some(review) = extract_review(*card, profile, today) else {
            continue;
        };
        if let Some(date) = review.date {
            oldest_dated = Some(oldest_dated.map_or(date, |oldest| oldest.min(date)));
            if !dates::within_range(date, start, end) {
                excluded += 1;
                continue;
            }
        }
        reviews.push(review);
    }

    let has_more = has_next_page(&doc, profile);
    tracing::debug!(
        source = %profile.source,
        candidates = cards.len(),
        kept = reviews.len(),
        excluded,
        has_more,
        "extracted listing page"
    );

    PageResult {
        reviews,
        has_more,
        excluded_out_of_range: excluded,
        oldest_dated,
    }
}

/// Locates review-card nodes: first profile strategy with any matches wins.
fn locate_cards<'a>(doc: &'a Html, profile: &SiteProfile) -> Vec<ElementRef<'a>> {
    for selector in profile.cards.iter() {
        let cards: Vec<_> = doc.select(selector).collect();
        if !cards.is_empty() {
            return cards;
        }
    }
    let fallback = fallback_scan(doc);
    if !fallback.is_empty() {
        tracing::debug!(
            count = fallback.len(),
            "no card selector matched; using keyword fallback scan"
        );
    }
    fallback
}

fn fallback_container_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR
        .get_or_init(|| Selector::parse("div, article, section").expect("valid fallback selector"))
}

/// Bounded generic scan: container elements whose direct text mentions
/// review/rating/star vocabulary.
fn fallback_scan(doc: &Html) -> Vec<ElementRef<'_>> {
    doc.select(fallback_container_selector())
        .filter(|element| {
            element
                .children()
                .filter_map(|node| node.value().as_text())
                .any(|text| {
                    let lower = text.to_lowercase();
                    lower.contains("review") || lower.contains("rating") || lower.contains("star")
                })
        })
        .take(FALLBACK_NODE_CAP)
        .collect()
}

/// True when any next-page indicator from the profile matches.
fn has_next_page(doc: &Html, profile: &SiteProfile) -> bool {
    profile
        .next_page
        .iter()
        .any(|selector| doc.select(selector).next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2023, 6, 15)
    }

    fn g2_card(title: &str, published: &str) -> String {
        format!(
            r#"<div class="paper__bd">
                <div itemprop="name">{title}</div>
                <div itemprop="reviewBody">
                    <p class="formatted-text">Long enough body text describing the product in detail.</p>
                </div>
                <meta itemprop="datePublished" content="{published}">
            </div>"#
        )
    }

    fn g2_listing(cards: &[String], has_next: bool) -> String {
        let next = if has_next {
            r#"<div class="pagination__item--next"><a href="?page=2">Next</a></div>"#
        } else {
            ""
        };
        format!("<html><body>{}{next}</body></html>", cards.concat())
    }

    #[test]
    fn keeps_only_reviews_inside_the_closed_interval() {
        let html = g2_listing(
            &[
                g2_card("Right at the start boundary", "2023-01-01"),
                g2_card("Comfortably inside the window", "2023-03-10"),
                g2_card("Right at the end boundary", "2023-06-01"),
                g2_card("Too old for the window", "2022-12-31"),
                g2_card("Too new for the window", "2023-06-02"),
            ],
            false,
        );
        let result = extract_page(
            &html,
            &SiteProfile::g2(),
            date(2023, 1, 1),
            date(2023, 6, 1),
            today(),
        );

        assert_eq!(result.reviews.len(), 3);
        assert_eq!(result.excluded_out_of_range, 2);
        assert!(result
            .reviews
            .iter()
            .all(|r| r.date.is_some_and(|d| dates::within_range(
                d,
                date(2023, 1, 1),
                date(2023, 6, 1)
            ))));
    }

    #[test]
    fn dateless_reviews_are_always_included() {
        let undated = r#"<div class="paper__bd">
            <div itemprop="name">No date on this one at all</div>
            <div itemprop="reviewBody">
                <p class="formatted-text">Still a perfectly extractable review body.</p>
            </div>
        </div>"#;
        let html = g2_listing(&[undated.to_owned()], false);
        let result = extract_page(
            &html,
            &SiteProfile::g2(),
            date(2023, 1, 1),
            date(2023, 1, 2),
            today(),
        );
        assert_eq!(result.reviews.len(), 1);
        assert_eq!(result.reviews[0].date, None);
        assert_eq!(result.excluded_out_of_range, 0);
    }

    #[test]
    fn never_emits_a_review_without_title_or_body() {
        let noise = r#"<div class="paper__bd">
            <div class="stars stars-9"></div>
        </div>"#;
        let html = g2_listing(&[noise.to_owned()], false);
        let result = extract_page(
            &html,
            &SiteProfile::g2(),
            date(2023, 1, 1),
            date(2023, 12, 31),
            today(),
        );
        assert!(result.reviews.is_empty());
    }

    #[test]
    fn oldest_dated_tracks_excluded_reviews_too() {
        let html = g2_listing(
            &[
                g2_card("Inside the window", "2023-03-10"),
                g2_card("Well before the window", "2021-02-01"),
            ],
            false,
        );
        let result = extract_page(
            &html,
            &SiteProfile::g2(),
            date(2023, 1, 1),
            date(2023, 12, 31),
            today(),
        );
        assert_eq!(result.reviews.len(), 1);
        assert_eq!(result.oldest_dated, Some(date(2021, 2, 1)));
    }

    #[test]
    fn next_page_indicator_detection() {
        let with_next = g2_listing(&[g2_card("Has a successor page", "2023-03-10")], true);
        let without_next = g2_listing(&[g2_card("Terminal page", "2023-03-10")], false);
        let profile = SiteProfile::g2();
        let window = (date(2023, 1, 1), date(2023, 12, 31));

        assert!(extract_page(&with_next, &profile, window.0, window.1, today()).has_more);
        assert!(!extract_page(&without_next, &profile, window.0, window.1, today()).has_more);
    }

    #[test]
    fn card_strategies_are_not_merged() {
        // A page with both structured cards and generic review-class nodes:
        // only the first matching strategy's nodes are used.
        let html = format!(
            r#"<html><body>
                {}
                <article class="review-extra">
                    <h3>Should not be extracted</h3>
                    <p>This node belongs to a lower-ranked strategy entirely.</p>
                </article>
            </body></html>"#,
            g2_card("Structured card wins", "2023-03-10")
        );
        let result = extract_page(
            &html,
            &SiteProfile::g2(),
            date(2023, 1, 1),
            date(2023, 12, 31),
            today(),
        );
        assert_eq!(result.reviews.len(), 1);
        assert_eq!(result.reviews[0].title.as_deref(), Some("Structured card wins"));
    }

    #[test]
    fn fallback_scan_is_capped() {
        // No card selector matches; 60 keyword-bearing containers exist but
        // only the first 50 are considered.
        let mut body = String::new();
        for i in 0..60 {
            body.push_str(&format!(
                r#"<section><h4>Review number {i} of the product</h4>review keyword text
                <p>Body text long enough to count as a review fragment here.</p></section>"#
            ));
        }
        let html = format!("<html><body>{body}</body></html>");
        let result = extract_page(
            &html,
            &SiteProfile::capterra(),
            date(2023, 1, 1),
            date(2023, 12, 31),
            today(),
        );
        assert!(
            result.reviews.len() <= FALLBACK_NODE_CAP,
            "fallback produced {} reviews, cap is {FALLBACK_NODE_CAP}",
            result.reviews.len()
        );
        assert!(!result.reviews.is_empty());
    }

    #[test]
    fn empty_page_yields_empty_result_not_error() {
        let result = extract_page(
            "<html><body><p>Nothing here.</p></body></html>",
            &SiteProfile::g2(),
            date(2023, 1, 1),
            date(2023, 12, 31),
            today(),
        );
        assert!(result.reviews.is_empty());
        assert!(!result.has_more);
        assert_eq!(result.excluded_out_of_range, 0);
        assert_eq!(result.oldest_dated, None);
    }
}
