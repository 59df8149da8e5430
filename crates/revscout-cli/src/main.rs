//! Command-line driver for the review scraper.
//!
//! Validates the query, runs one scrape session, writes the JSON/CSV output,
//! and reports a terminal status: success with a review count, or failure
//! with a reason. Partial results (some pages failed, some succeeded) count
//! as success.

mod output;

use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, ValueEnum};
use revscout_core::{AppConfig, ReviewSource};
use revscout_scraper::{
    DelayPolicy, HttpFetcher, Outcome, ScrapeSession, SessionParams, SiteProfile,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    G2,
    Capterra,
}

impl From<SourceArg> for ReviewSource {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::G2 => ReviewSource::G2,
            SourceArg::Capterra => ReviewSource::Capterra,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "revscout")]
#[command(about = "Scrape software-product reviews from G2 or Capterra")]
struct Cli {
    /// Company or product name to search for
    #[arg(long)]
    company: String,

    /// Start of the date window, inclusive (YYYY-MM-DD)
    #[arg(long)]
    start_date: String,

    /// End of the date window, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end_date: String,

    /// Review site to scrape
    #[arg(long, value_enum)]
    source: SourceArg,

    /// Output JSON path (default: <output-dir>/<company>_<source>_reviews.json)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Minimum delay between page fetches, in seconds
    #[arg(long)]
    delay_min: Option<f64>,

    /// Maximum delay between page fetches, in seconds
    #[arg(long)]
    delay_max: Option<f64>,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = revscout_core::load_app_config().context("loading configuration")?;
    init_tracing(&config, cli.verbose);

    let (start, end) = parse_window(&cli.start_date, &cli.end_date)?;
    let today = Utc::now().date_naive();
    if end > today {
        tracing::warn!(end = %end, "end date is in the future");
    }

    let source = ReviewSource::from(cli.source);
    let profile = SiteProfile::for_source(source);
    let pacing = delay_policy(&config, cli.delay_min, cli.delay_max)?;

    let fetcher = HttpFetcher::new(
        config.request_timeout_secs,
        config.user_agent.as_deref(),
        config.max_retries,
        config.retry_backoff_base_secs,
    )
    .context("initializing HTTP session")?;

    let mut params = SessionParams::new(&cli.company, start, end, today);
    params.pacing = pacing;
    let session = ScrapeSession::new(&profile, params);

    // Ctrl-C stops after the in-flight page and keeps what was collected.
    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received — finishing current page, then stopping");
            cancel.cancel();
        }
    });

    let report = session.run(&fetcher).await;

    if report.outcome == Outcome::ListingNotFound {
        println!(
            "failure: no {source} listing found for \"{}\" — zero reviews",
            cli.company
        );
        std::process::exit(1);
    }

    let json_path = cli
        .output
        .unwrap_or_else(|| default_output_path(&config, &cli.company, source));
    let document =
        output::OutputDocument::new(&cli.company, start, end, source, report.reviews);
    output::write_json(&json_path, &document)?;
    output::write_csv(&json_path.with_extension("csv"), document.reviews())?;

    println!(
        "success: {} reviews scraped from {source}",
        document.reviews().len()
    );
    if report.cancelled {
        println!("note: session was cancelled early; results are partial");
    }
    print_summary(document.reviews(), report.excluded_out_of_range, report.pages_visited);
    println!("saved to {}", json_path.display());

    Ok(())
}

fn init_tracing(config: &AppConfig, verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { &config.log_level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Parses and validates the query window. Bad input here is a user-facing
/// CLI error, not a scraper error.
fn parse_window(start: &str, end: &str) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start-date {start:?}: use YYYY-MM-DD"))?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
        .with_context(|| format!("invalid --end-date {end:?}: use YYYY-MM-DD"))?;
    anyhow::ensure!(
        start <= end,
        "--start-date {start} must not be after --end-date {end}"
    );
    Ok((start, end))
}

fn delay_policy(
    config: &AppConfig,
    delay_min: Option<f64>,
    delay_max: Option<f64>,
) -> anyhow::Result<DelayPolicy> {
    let min_ms = match delay_min {
        Some(secs) => ms_from_secs(secs).context("invalid --delay-min")?,
        None => config.delay_min_ms,
    };
    let max_ms = match delay_max {
        Some(secs) => ms_from_secs(secs).context("invalid --delay-max")?,
        None => config.delay_max_ms,
    };
    anyhow::ensure!(
        min_ms <= max_ms,
        "--delay-min ({min_ms}ms) must not exceed --delay-max ({max_ms}ms)"
    );
    Ok(DelayPolicy::new(min_ms, max_ms))
}

fn ms_from_secs(secs: f64) -> anyhow::Result<u64> {
    anyhow::ensure!(
        secs.is_finite() && secs >= 0.0,
        "delay must be a non-negative number of seconds"
    );
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let ms = (secs * 1000.0).round() as u64;
    Ok(ms)
}

fn default_output_path(config: &AppConfig, company: &str, source: ReviewSource) -> PathBuf {
    let safe_company = company.to_lowercase().replace(['/', ' '], "-");
    config.output_dir.join(format!(
        "{safe_company}_{}_reviews.json",
        source.label().to_lowercase()
    ))
}

fn print_summary(
    reviews: &[revscout_core::Review],
    excluded_out_of_range: usize,
    pages_visited: u32,
) {
    let rated: Vec<f64> = reviews.iter().filter_map(|r| r.rating).collect();
    if !rated.is_empty() {
        #[allow(clippy::cast_precision_loss)]
        let average = rated.iter().sum::<f64>() / rated.len() as f64;
        println!(
            "average rating: {average:.1}/5.0 ({} rated reviews)",
            rated.len()
        );
    }
    let dated = reviews.iter().filter(|r| r.date.is_some()).count();
    println!("reviews with dates: {dated}/{}", reviews.len());
    if excluded_out_of_range > 0 {
        println!("excluded as out of range: {excluded_out_of_range}");
    }
    println!("pages visited: {pages_visited}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_window_accepts_iso_dates() {
        let (start, end) = parse_window("2023-01-01", "2023-12-31").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn parse_window_rejects_bad_format() {
        let err = parse_window("01/01/2023", "2023-12-31").unwrap_err();
        assert!(err.to_string().contains("--start-date"));
    }

    #[test]
    fn parse_window_rejects_inverted_range() {
        let err = parse_window("2023-12-31", "2023-01-01").unwrap_err();
        assert!(err.to_string().contains("must not be after"));
    }

    #[test]
    fn ms_from_secs_converts_and_validates() {
        assert_eq!(ms_from_secs(2.5).unwrap(), 2500);
        assert_eq!(ms_from_secs(0.0).unwrap(), 0);
        assert!(ms_from_secs(-1.0).is_err());
        assert!(ms_from_secs(f64::NAN).is_err());
    }

    #[test]
    fn default_output_path_slugs_the_company() {
        let config = AppConfig {
            log_level: "info".to_owned(),
            request_timeout_secs: 30,
            user_agent: None,
            max_retries: 3,
            retry_backoff_base_secs: 2,
            delay_min_ms: 0,
            delay_max_ms: 0,
            output_dir: PathBuf::from("output"),
        };
        let path = default_output_path(&config, "Acme Flow", ReviewSource::G2);
        assert_eq!(path, PathBuf::from("output/acme-flow_g2_reviews.json"));
    }

    #[test]
    fn source_arg_maps_onto_review_source() {
        assert_eq!(ReviewSource::from(SourceArg::G2), ReviewSource::G2);
        assert_eq!(
            ReviewSource::from(SourceArg::Capterra),
            ReviewSource::Capterra
        );
    }
}
