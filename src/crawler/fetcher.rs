//! Rate-limited HTTP fetcher
//!
//! This module handles all HTTP requests for the scraper, including:
//! - Building the HTTP client with the configured timeout and headers
//! - Consulting the web cache before any network call
//! - Keeping a minimum delay between two real network requests
//! - Pausing and retrying once on block/challenge pages (interactive mode)
//! - Error classification

use crate::cache::{CachedResponse, WebCache};
use crate::config::Config;
use crate::{ConfigError, Result, ScrapeError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect::Policy, Client};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Wording of the site's block page, whatever its status
const BLOCK_PAGE_MARKER: &str = "unusual activity from your ip";

/// Only trusted on error statuses: regular pages may embed a captcha widget
const CAPTCHA_MARKER: &str = "captcha";

/// A response, fresh or from the web cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
    pub from_cache: bool,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// HTTP 403/429, the block page, or an error page asking to solve a
    /// captcha
    pub fn is_blocked(&self) -> bool {
        if self.status == 403 || self.status == 429 {
            return true;
        }
        let body = self.body.to_ascii_lowercase();
        body.contains(BLOCK_PAGE_MARKER) || (!self.is_success() && body.contains(CAPTCHA_MARKER))
    }

    /// Successful pages and 404s are kept; server errors and block pages never
    pub fn is_cacheable(&self) -> bool {
        (self.is_success() || self.status == 404) && !self.is_blocked()
    }
}

/// Minimum gap between real network requests
///
/// Holds the single process-wide last-request timestamp.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_delay: Duration,
    last_request_time: Option<Instant>,
    request_count: u64,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_request_time: None,
            request_count: 0,
        }
    }

    /// Returns true if a request can be made at `now`
    pub fn can_request(&self, now: Instant) -> bool {
        self.time_until_next_request(now).is_none()
    }

    /// Returns None if a request can be made now, or the duration to wait otherwise
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.min_delay {
            Some(self.min_delay - elapsed)
        } else {
            None
        }
    }

    /// Records that a request was made
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }
}

/// Builds an HTTP client with the configured timeout
pub fn build_http_client(config: &Config) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs_f64(config.http_get_timeout))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Converts configured headers, rejecting names or values HTTP cannot carry
pub fn build_header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConfigError::Validation(format!("Invalid header name '{}': {}", name, e))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            ConfigError::Validation(format!("Invalid value for header '{}': {}", name, e))
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Fetcher that checks the web cache first and is polite on misses
pub struct Fetcher {
    client: Client,
    headers: BTreeMap<String, String>,
    web_cache: Option<WebCache>,
    expire_after: Duration,
    limiter: RateLimiter,
    interactive: bool,
    delay_interactive: Duration,
    cache_hits: u64,
}

impl Fetcher {
    /// Builds the fetcher; `web_cache` is `None` when the cache is disabled
    pub fn new(config: &Config, web_cache: Option<WebCache>) -> Result<Self> {
        build_header_map(&config.headers)?;
        Ok(Self {
            client: build_http_client(config)?,
            headers: config.headers.clone(),
            web_cache,
            expire_after: Duration::from_secs(config.expire_after),
            limiter: RateLimiter::new(Duration::from_secs_f64(config.delay_between_requests)),
            interactive: config.interactive,
            delay_interactive: Duration::from_secs_f64(config.delay_interactive),
            cache_hits: 0,
        })
    }

    /// Fetches `url` with the configured headers
    pub async fn fetch(&mut self, url: &str) -> Result<FetchResponse> {
        self.fetch_with_headers(url, &BTreeMap::new()).await
    }

    /// Fetches `url` with extra headers on top of the configured ones
    ///
    /// Any HTTP status is returned as a response; only timeouts and
    /// connection failures are errors. Never retries, except the single
    /// retry after an interactive pause.
    pub async fn fetch_with_headers(
        &mut self,
        url: &str,
        extra_headers: &BTreeMap<String, String>,
    ) -> Result<FetchResponse> {
        let mut headers = self.headers.clone();
        headers.extend(extra_headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        let key = WebCache::cache_key(url, &headers);

        if let Some(cache) = &self.web_cache {
            if let Some(hit) = cache.get(&key)? {
                self.cache_hits += 1;
                tracing::debug!("Web cache hit for {}", url);
                return Ok(FetchResponse {
                    url: hit.url,
                    status: hit.status,
                    body: hit.body,
                    from_cache: true,
                });
            }
        }

        let header_map = build_header_map(&headers)?;
        let mut response = self.request(url, &header_map).await?;

        if self.interactive && response.is_blocked() {
            tracing::warn!(
                "Blocked by the site on {} (HTTP {}): pausing {:.0}s, clear the challenge in a browser",
                url,
                response.status,
                self.delay_interactive.as_secs_f64()
            );
            tokio::time::sleep(self.delay_interactive).await;
            response = self.request(url, &header_map).await?;
        }

        if let Some(cache) = &self.web_cache {
            if response.is_cacheable() {
                cache.put(
                    &key,
                    &CachedResponse {
                        url: response.url.clone(),
                        status: response.status,
                        body: response.body.clone(),
                    },
                    self.expire_after,
                )?;
            }
        }

        Ok(response)
    }

    /// Fetches `url` and turns HTTP failures into classified errors
    ///
    /// 404 is NotFound, any other non-2xx status is a network error.
    pub async fn fetch_page(&mut self, url: &str) -> Result<FetchResponse> {
        let response = self.fetch(url).await?;
        match response.status {
            200..=299 => Ok(response),
            404 => Err(ScrapeError::NotFound(format!("{} returned HTTP 404", url))),
            status => Err(ScrapeError::network(url, format!("HTTP {}", status))),
        }
    }

    async fn request(&mut self, url: &str, headers: &HeaderMap) -> Result<FetchResponse> {
        if let Some(wait) = self.limiter.time_until_next_request(Instant::now()) {
            tracing::debug!("Waiting {:.2}s before requesting {}", wait.as_secs_f64(), url);
            tokio::time::sleep(wait).await;
        }

        tracing::debug!("GET {}", url);
        let result = self.client.get(url).headers(headers.clone()).send().await;
        self.limiter.record_request(Instant::now());

        let response = result.map_err(|e| classify_error(url, e))?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(FetchResponse {
            url: final_url,
            status,
            body,
            from_cache: false,
        })
    }

    /// Real network requests made so far
    pub fn network_requests(&self) -> u64 {
        self.limiter.request_count()
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }
}

fn classify_error(url: &str, e: reqwest::Error) -> ScrapeError {
    if e.is_timeout() {
        ScrapeError::network(url, "Request timeout")
    } else if e.is_connect() {
        ScrapeError::network(url, format!("Connection failed: {}", e))
    } else if e.is_builder() {
        ScrapeError::InvalidTarget(format!("Cannot request '{}': {}", url, e))
    } else {
        ScrapeError::network(url, e.to_string())
    }
}
