//! Output documents: the JSON result file and its CSV sidecar.

use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, SecondsFormat, Utc};
use revscout_core::{Review, ReviewSource};
use serde::Serialize;

/// Top-level JSON document. The shape (`scraper_info` / `query_info` /
/// `reviews`) is kept stable for existing downstream consumers.
#[derive(Debug, Serialize)]
pub struct OutputDocument {
    scraper_info: ScraperInfo,
    query_info: QueryInfo,
    reviews: Vec<Review>,
}

#[derive(Debug, Serialize)]
struct ScraperInfo {
    method: String,
    scraped_at: String,
    total_reviews: usize,
}

#[derive(Debug, Serialize)]
struct QueryInfo {
    company_name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    source: String,
}

impl OutputDocument {
    #[must_use]
    pub fn new(
        company: &str,
        start: NaiveDate,
        end: NaiveDate,
        source: ReviewSource,
        reviews: Vec<Review>,
    ) -> Self {
        Self {
            scraper_info: ScraperInfo {
                method: "http".to_owned(),
                scraped_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                total_reviews: reviews.len(),
            },
            query_info: QueryInfo {
                company_name: company.to_owned(),
                start_date: start,
                end_date: end,
                source: source.label().to_owned(),
            },
            reviews,
        }
    }

    #[must_use]
    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }
}

/// Writes the document as pretty-printed UTF-8 JSON. `serde_json` leaves
/// non-ASCII characters unescaped, which downstream consumers rely on.
pub fn write_json(path: &Path, document: &OutputDocument) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(document).context("serializing output document")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote JSON output");
    Ok(())
}

const CSV_COLUMNS: &[&str] = &[
    "title",
    "body",
    "date",
    "rating",
    "reviewer_name",
    "reviewer_company",
    "verified",
    "helpful_votes",
    "source",
];

/// Writes a flattened CSV next to the JSON for quick inspection. Body text
/// has newlines collapsed so each review stays on one row.
pub fn write_csv(path: &Path, reviews: &[Review]) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    let mut out = String::new();
    out.push_str(&CSV_COLUMNS.join(","));
    out.push('\n');
    for review in reviews {
        let row = [
            csv_field(review.title.as_deref().unwrap_or_default()),
            csv_field(&collapse_newlines(
                review.body.as_deref().unwrap_or_default(),
            )),
            review.date.map(|d| d.to_string()).unwrap_or_default(),
            review.rating.map(|r| r.to_string()).unwrap_or_default(),
            csv_field(review.reviewer_name.as_deref().unwrap_or_default()),
            csv_field(review.reviewer_company.as_deref().unwrap_or_default()),
            review.verified.to_string(),
            review
                .helpful_votes
                .map(|v| v.to_string())
                .unwrap_or_default(),
            review.source.label().to_owned(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote CSV output");
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    Ok(())
}

fn collapse_newlines(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

/// Quotes a field when it contains a delimiter, quote, or newline;
/// embedded quotes are doubled per RFC 4180.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}
