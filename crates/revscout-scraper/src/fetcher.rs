//! Page fetching behind a single interface.
//!
//! The walker and resolver only need "URL in, document out". [`HttpFetcher`]
//! backs that with a reqwest client wearing browser-shaped headers; test
//! doubles implement [`PageFetcher`] over canned HTML. Retry policy for
//! transient failures lives here, not in the walker — a caller treats any
//! returned error as "this page is unavailable" and moves on.

use std::future::Future;
use std::time::Duration;

use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};

use crate::error::ScraperError;
use crate::retry::retry_with_backoff;

/// Browser User-Agent strings rotated across sessions so the default
/// reqwest fingerprint never appears on the wire.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

/// Yields one page of HTML per call.
///
/// Implementations own their retry/backoff policy. The pipeline never
/// branches on which backend is behind this trait.
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns the response body as text.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, ScraperError>> + Send;
}

/// HTTP-backed [`PageFetcher`] for review listing pages.
///
/// The underlying client keeps a cookie store (review sites fingerprint
/// cookieless clients) and sends browser-shaped default headers. One
/// `HttpFetcher` is owned by one scrape session for its lifetime; dropping
/// it releases the connection pool on every exit path.
pub struct HttpFetcher {
    client: Client,
    /// Retry attempts after the first failure for retriable errors.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff: `backoff_base_secs * 2^attempt`.
    backoff_base_secs: u64,
}

impl HttpFetcher {
    /// Creates an `HttpFetcher` with configured timeout, `User-Agent`, and
    /// retry policy.
    ///
    /// When `user_agent` is `None`, one is picked at random from the built-in
    /// browser pool. Set `max_retries` to `0` to disable retries.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::SessionInit`] if the underlying HTTP client
    /// cannot be constructed (e.g., invalid TLS config). This is fatal to the
    /// session and distinct from any per-page failure.
    pub fn new(
        timeout_secs: u64,
        user_agent: Option<&str>,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let user_agent = user_agent.map_or_else(pick_user_agent, str::to_owned);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .cookie_store(true)
            .default_headers(browser_headers())
            .build()
            .map_err(|e| ScraperError::SessionInit {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, ScraperError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScraperError::RateLimited {
                url: url.to_owned(),
                retry_after_secs,
            });
        }

        if status == StatusCode::FORBIDDEN {
            return Err(ScraperError::Blocked {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        Ok(response.text().await?)
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, ScraperError>> + Send {
        async move {
            retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
                self.fetch_once(url)
            })
            .await
        }
    }
}

fn pick_user_agent() -> String {
    let mut rng = rand::rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(USER_AGENTS[0])
        .to_owned()
}

/// Default headers matching what a desktop browser sends on navigation.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(
        "upgrade-insecure-requests",
        HeaderValue::from_static("1"),
    );
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("dnt", HeaderValue::from_static("1"));
    headers
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_fetcher() -> HttpFetcher {
        HttpFetcher::new(5, Some("revscout-test/0.1"), 0, 0).expect("failed to build HttpFetcher")
    }

    #[test]
    fn picked_user_agent_comes_from_the_pool() {
        let ua = pick_user_agent();
        assert!(USER_AGENTS.contains(&ua.as_str()));
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reviews"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let body = test_fetcher()
            .fetch(&format!("{}/reviews", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn sends_browser_shaped_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reviews"))
            .and(header_exists("accept-language"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let result = test_fetcher()
            .fetch(&format!("{}/reviews", server.uri()))
            .await;
        assert!(result.is_ok(), "expected Ok, got: {result:?}");
    }

    #[tokio::test]
    async fn maps_403_to_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result = test_fetcher().fetch(&server.uri()).await;
        assert!(matches!(
            result,
            Err(ScraperError::Blocked { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn maps_429_to_rate_limited_with_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let result = test_fetcher().fetch(&server.uri()).await;
        assert!(matches!(
            result,
            Err(ScraperError::RateLimited {
                retry_after_secs: 7,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn maps_other_failures_to_unexpected_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = test_fetcher().fetch(&server.uri()).await;
        assert!(matches!(
            result,
            Err(ScraperError::UnexpectedStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn retries_rate_limited_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
            .mount(&server)
            .await;

        let fetcher =
            HttpFetcher::new(5, Some("revscout-test/0.1"), 3, 0).expect("failed to build fetcher");
        let body = fetcher.fetch(&server.uri()).await.unwrap();
        assert_eq!(body, "recovered");
    }
}
