//! Single review-card field extraction.
//!
//! Each field is pulled by walking the profile's selector chain for that
//! field, most specific first, with a plausibility check on the winner.
//! Markup is treated as adversarial: every field extraction fails silently
//! into an absent value, and a card only becomes a [`Review`] at all when a
//! title or body survived.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use revscout_core::{dates, Review};
use scraper::{ElementRef, Selector};

use crate::profiles::{ClassRatingPattern, SelectorChain, SiteProfile};

/// Title candidates outside this range are generic-markup noise — bare
/// section headers on the short end, paragraph text caught by a `strong`
/// fallback on the long end.
const TITLE_MIN_CHARS: usize = 6;
const TITLE_MAX_CHARS: usize = 199;

/// Body fragments shorter than this are UI chrome, not review text.
const BODY_FRAGMENT_MIN_CHARS: usize = 20;

/// Cap on concatenated body fragments; generic selectors on pages that
/// repeat the review text in expandable sections would otherwise balloon
/// the body without bound.
const BODY_FRAGMENT_CAP: usize = 3;

/// Attributes that may carry a machine-readable date when the matched
/// element's text is empty or decorative (e.g. `<meta content="...">`,
/// `<time datetime="...">`).
const DATE_ATTRS: &[&str] = &["datetime", "content"];

/// Attributes checked for an embedded numeric rating.
const RATING_ATTRS: &[&str] = &["aria-label", "title", "data-rating"];

/// Extracts a [`Review`] from one review-card node.
///
/// Returns `None` when neither a title nor a body could be found — a card
/// with only a rating or reviewer metadata is listing chrome, not a review.
/// All other fields are independently optional and fail silently.
#[must_use]
pub fn extract_review(
    card: ElementRef<'_>,
    profile: &SiteProfile,
    today: NaiveDate,
) -> Option<Review> {
    let mut review = Review::empty(profile.source);

    review.title = extract_title(card, &profile.title);
    review.body = extract_body(card, &profile.body);
    if !review.has_content() {
        return None;
    }

    review.date_raw = extract_date_raw(card, &profile.date);
    review.date = review
        .date_raw
        .as_deref()
        .and_then(|raw| dates::normalize_date(raw, today));
    review.rating = extract_rating(card, profile);
    review.reviewer_name = first_text(card, &profile.reviewer_name).filter(|t| t.len() > 1);
    review.reviewer_company = first_text(card, &profile.reviewer_company);
    review.verified = matches_any(card, &profile.verified);
    review.helpful_votes = extract_helpful_votes(card, &profile.helpful_votes);

    Some(review)
}

/// Element text with whitespace collapsed to single spaces.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First decimal number anywhere in `text`.
pub(crate) fn first_number(text: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number regex"));
    re.find(text)?.as_str().parse().ok()
}

fn first_integer(text: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d+").expect("valid integer regex"));
    re.find(text)?.as_str().parse().ok()
}

fn first_text(card: ElementRef<'_>, chain: &SelectorChain) -> Option<String> {
    for selector in chain.iter() {
        let Some(element) = card.select(selector).next() else {
            continue;
        };
        let text = element_text(element);
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

fn matches_any(card: ElementRef<'_>, chain: &SelectorChain) -> bool {
    chain.iter().any(|selector| card.select(selector).next().is_some())
}

fn extract_title(card: ElementRef<'_>, chain: &SelectorChain) -> Option<String> {
    for selector in chain.iter() {
        let Some(element) = card.select(selector).next() else {
            continue;
        };
        let text = element_text(element);
        let chars = text.chars().count();
        if (TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&chars) {
            return Some(text);
        }
        // Implausible length means the selector was too generic here; the
        // next strategy may still find a real title.
    }
    None
}

fn extract_body(card: ElementRef<'_>, chain: &SelectorChain) -> Option<String> {
    let mut fragments: Vec<String> = Vec::new();
    'chains: for selector in chain.iter() {
        for element in card.select(selector) {
            let text = element_text(element);
            if text.chars().count() >= BODY_FRAGMENT_MIN_CHARS && !fragments.contains(&text) {
                fragments.push(text);
            }
            if fragments.len() == BODY_FRAGMENT_CAP {
                break 'chains;
            }
        }
    }
    if fragments.is_empty() {
        None
    } else {
        Some(fragments.join(" "))
    }
}

fn extract_date_raw(card: ElementRef<'_>, chain: &SelectorChain) -> Option<String> {
    for selector in chain.iter() {
        let Some(element) = card.select(selector).next() else {
            continue;
        };
        let text = element_text(element);
        // Anything shorter cannot spell a date; fall back to the
        // machine-readable attributes before trying the next strategy.
        if text.chars().count() > 3 {
            return Some(text);
        }
        for attr in DATE_ATTRS {
            if let Some(value) = element.value().attr(attr) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_owned());
                }
            }
        }
    }
    None
}

fn extract_rating(card: ElementRef<'_>, profile: &SiteProfile) -> Option<f64> {
    for selector in profile.rating.iter() {
        let Some(element) = card.select(selector).next() else {
            continue;
        };
        if let Some(rating) = rating_from_element(element, profile.class_rating) {
            return Some(rating);
        }
    }
    None
}

fn in_rating_scale(value: &f64) -> bool {
    (0.0..=5.0).contains(value)
}

/// Tries the rating strategies against one matched element, in order:
/// a number in the element text, a count of filled-star children, a number
/// in a label attribute, then a numeric class-name suffix. The first hit
/// wins; strategies are never cross-validated.
fn rating_from_element(
    element: ElementRef<'_>,
    class_pattern: Option<ClassRatingPattern>,
) -> Option<f64> {
    // (a) "4.5 out of 5 stars"
    if let Some(rating) = first_number(&element_text(element)).filter(in_rating_scale) {
        return Some(rating);
    }

    // (b) filled-star children
    let filled = element.select(filled_star_selector()).count();
    if let Some(count) = u32::try_from(filled).ok().filter(|c| (1..=5).contains(c)) {
        return Some(f64::from(count));
    }

    // (c) label attributes
    for attr in RATING_ATTRS {
        let candidate = element.value().attr(attr).and_then(first_number);
        if let Some(rating) = candidate.filter(in_rating_scale) {
            return Some(rating);
        }
    }

    // (d) class-name suffix, e.g. stars-8 → 4.0
    let pattern = class_pattern?;
    for class in element.value().classes() {
        if let Some(suffix) = class.strip_prefix(pattern.prefix) {
            if let Ok(value) = suffix.parse::<f64>() {
                let rating = value / pattern.divisor;
                if in_rating_scale(&rating) {
                    return Some(rating);
                }
            }
        }
    }

    None
}

fn filled_star_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Selector::parse(".star-filled, .filled, .active, [class*='fill']")
            .expect("valid filled-star selector")
    })
}

fn extract_helpful_votes(card: ElementRef<'_>, chain: &SelectorChain) -> Option<u32> {
    for selector in chain.iter() {
        let Some(element) = card.select(selector).next() else {
            continue;
        };
        if let Some(votes) = first_integer(&element_text(element)) {
            return Some(votes);
        }
    }
    None
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
