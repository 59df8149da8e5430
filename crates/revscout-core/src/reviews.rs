//! Domain types for extracted customer reviews.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Review aggregator a record was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSource {
    G2,
    Capterra,
}

impl ReviewSource {
    /// Display label as used in output documents (e.g., `"G2"`).
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ReviewSource::G2 => "G2",
            ReviewSource::Capterra => "Capterra",
        }
    }
}

impl std::fmt::Display for ReviewSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One customer review extracted from a listing page.
///
/// Every field except `source` is best-effort: listing markup is unstable and
/// partial records are expected. A `Review` is only emitted at all when at
/// least one of `title`/`body` was found — rating- or metadata-only fragments
/// are discarded as noise by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Short review headline, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Concatenated review text fragments, deduplicated and capped by the
    /// extractor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// The site-supplied date exactly as scraped (display text or a
    /// machine-readable attribute value).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_raw: Option<String>,
    /// Canonical calendar date derived from `date_raw`; `None` when the raw
    /// value could not be normalized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Star rating on the 0–5 scale; `None` when no strategy matched or the
    /// value was out of range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_company: Option<String>,
    /// Whether the site marked the reviewer as verified.
    #[serde(default)]
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helpful_votes: Option<u32>,
    pub source: ReviewSource,
}

impl Review {
    /// Returns a minimal record with only the source set; the extractor
    /// fills fields in as strategies succeed.
    #[must_use]
    pub fn empty(source: ReviewSource) -> Self {
        Self {
            title: None,
            body: None,
            date_raw: None,
            date: None,
            rating: None,
            reviewer_name: None,
            reviewer_company: None,
            verified: false,
            helpful_votes: None,
            source,
        }
    }

    /// Returns `true` if the record carries a title or body and is therefore
    /// worth emitting.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.title.is_some() || self.body.is_some()
    }
}

/// Extraction result for a single listing page.
#[derive(Debug, Clone)]
pub struct PageResult {
    /// Reviews kept after date filtering, in page order.
    pub reviews: Vec<Review>,
    /// Whether the page advertised a further page of results.
    pub has_more: bool,
    /// Reviews that were extracted but fell outside the requested window.
    pub excluded_out_of_range: usize,
    /// Oldest canonical date seen among all extracted reviews on the page,
    /// including ones the date filter excluded. Drives the early-stop rule
    /// on recency-sorted listings.
    pub oldest_dated: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_labels() {
        assert_eq!(ReviewSource::G2.label(), "G2");
        assert_eq!(ReviewSource::Capterra.label(), "Capterra");
        assert_eq!(ReviewSource::Capterra.to_string(), "Capterra");
    }

    #[test]
    fn empty_review_has_no_content() {
        let review = Review::empty(ReviewSource::G2);
        assert!(!review.has_content());
    }

    #[test]
    fn title_or_body_counts_as_content() {
        let mut review = Review::empty(ReviewSource::G2);
        review.title = Some("Solid tool".to_owned());
        assert!(review.has_content());

        let mut review = Review::empty(ReviewSource::Capterra);
        review.body = Some("Does what it says on the tin.".to_owned());
        assert!(review.has_content());
    }

    #[test]
    fn serializes_absent_fields_sparsely() {
        let review = Review::empty(ReviewSource::G2);
        let json = serde_json::to_value(&review).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("title"));
        assert!(!object.contains_key("rating"));
        assert_eq!(object["source"], "g2");
        assert_eq!(object["verified"], false);
    }

    #[test]
    fn serializes_date_as_iso() {
        let mut review = Review::empty(ReviewSource::Capterra);
        review.title = Some("Fine".to_owned());
        review.date = chrono::NaiveDate::from_ymd_opt(2023, 1, 5);
        let json = serde_json::to_value(&review).unwrap();
        assert_eq!(json["date"], "2023-01-05");
    }
}
