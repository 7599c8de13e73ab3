use std::thread;
use std::time::Duration;

use pulse_core::format_timestamp;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use serde_json::json;
use tracing::{debug, warn};

use crate::graphql::{FetchFailure, HISTORY_QUERY, parse_page};
use crate::types::{CommitPage, IngestError, PageRequest, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

const CLIENT_USER_AGENT: &str = concat!("repo-pulse/", env!("CARGO_PKG_VERSION"));

/// Source of commit-history pages.
pub trait PageFetcher {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<CommitPage>;
}

impl<F: PageFetcher + ?Sized> PageFetcher for Box<F> {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<CommitPage> {
        (**self).fetch_page(request)
    }
}

impl<F: PageFetcher + ?Sized> PageFetcher for &mut F {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<CommitPage> {
        (**self).fetch_page(request)
    }
}

#[derive(Debug, Clone)]
pub struct GithubFetcherConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub page_size: u32,
    pub timeout: Duration,
    pub rate_limit_backoff: Duration,
}

impl Default for GithubFetcherConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
        }
    }
}

/// Walks the default branch history through the GitHub GraphQL API.
pub struct GithubFetcher {
    client: Client,
    config: GithubFetcherConfig,
}

impl GithubFetcher {
    pub fn new(config: GithubFetcherConfig) -> Result<Self> {
        if config.page_size == 0 {
            return Err(IngestError::Protocol("page size must be positive".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| IngestError::Transport(err.to_string()))?;
        Ok(Self { client, config })
    }

    fn request_once(&self, request: &PageRequest) -> std::result::Result<CommitPage, FetchFailure> {
        let body = json!({
            "query": HISTORY_QUERY,
            "variables": {
                "owner": request.repository.owner,
                "name": request.repository.name,
                "first": self.config.page_size,
                "after": request.after,
                "since": format_timestamp(&request.window.start()),
                "until": format_timestamp(&request.window.end()),
            },
        });

        let mut builder = self
            .client
            .post(&self.config.api_url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .json(&body);
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }
        let response = builder
            .send()
            .map_err(|err| IngestError::Transport(err.to_string()))?;

        let status = response.status();
        let remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let text = response
            .text()
            .map_err(|err| IngestError::Transport(err.to_string()))?;
        classify(status, remaining.as_deref(), &text)
    }
}

/// Maps one HTTP response onto a page or a failure. Only 429, and 403 with an
/// exhausted `x-ratelimit-remaining`, count as rate limiting.
fn classify(
    status: StatusCode,
    remaining: Option<&str>,
    body: &str,
) -> std::result::Result<CommitPage, FetchFailure> {
    let quota_spent = remaining.is_some_and(|value| value.trim() == "0");
    if status == StatusCode::TOO_MANY_REQUESTS || (status == StatusCode::FORBIDDEN && quota_spent) {
        return Err(FetchFailure::RateLimited(format!("http {status}")));
    }
    if status.is_server_error() {
        return Err(IngestError::Transport(format!("http {status}: {}", snippet(body))).into());
    }
    if !status.is_success() {
        return Err(IngestError::Protocol(format!("http {status}: {}", snippet(body))).into());
    }
    parse_page(body)
}

impl PageFetcher for GithubFetcher {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<CommitPage> {
        debug!(
            repository = %request.repository,
            after = request.after.as_deref().unwrap_or("<start>"),
            "requesting commit page"
        );
        retry_once_on_rate_limit(self.config.rate_limit_backoff, || {
            self.request_once(request)
        })
    }
}

/// Runs `attempt`, and after a rate-limit failure sleeps `backoff` and runs
/// it exactly once more. Any other failure is returned as-is.
pub(crate) fn retry_once_on_rate_limit<T>(
    backoff: Duration,
    mut attempt: impl FnMut() -> std::result::Result<T, FetchFailure>,
) -> Result<T> {
    match attempt() {
        Ok(value) => Ok(value),
        Err(FetchFailure::Failed(err)) => Err(err),
        Err(FetchFailure::RateLimited(reason)) => {
            warn!(
                reason = %reason,
                backoff_secs = backoff.as_secs(),
                "rate limited; retrying once after back-off"
            );
            thread::sleep(backoff);
            match attempt() {
                Ok(value) => Ok(value),
                Err(FetchFailure::RateLimited(_)) => Err(IngestError::RateLimitExceeded),
                Err(FetchFailure::Failed(err)) => Err(err),
            }
        }
    }
}

fn snippet(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    body[..end].trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_retried_exactly_once() {
        let mut calls = 0;
        let result = retry_once_on_rate_limit(Duration::ZERO, || {
            calls += 1;
            if calls == 1 {
                Err(FetchFailure::RateLimited("http 429".to_string()))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.expect("second attempt succeeds"), 2);
    }

    #[test]
    fn second_rate_limit_surfaces() {
        let mut calls = 0;
        let result: Result<()> = retry_once_on_rate_limit(Duration::ZERO, || {
            calls += 1;
            Err(FetchFailure::RateLimited("http 429".to_string()))
        });
        assert!(matches!(result, Err(IngestError::RateLimitExceeded)));
        assert_eq!(calls, 2);
    }

    #[test]
    fn other_failures_are_not_retried() {
        let mut calls = 0;
        let result: Result<()> = retry_once_on_rate_limit(Duration::ZERO, || {
            calls += 1;
            Err(FetchFailure::Failed(IngestError::Transport(
                "connection reset".to_string(),
            )))
        });
        assert!(matches!(result, Err(IngestError::Transport(_))));
        assert_eq!(calls, 1);
    }

    const EMPTY_PAGE: &str = r#"{"data": {"rateLimit": null, "repository": {"defaultBranchRef": {"target": {"history": {"pageInfo": {"hasNextPage": false, "endCursor": null}, "nodes": []}}}}}}"#;

    #[test]
    fn too_many_requests_is_rate_limited() {
        assert!(matches!(
            classify(StatusCode::TOO_MANY_REQUESTS, None, "slow down"),
            Err(FetchFailure::RateLimited(_))
        ));
    }

    #[test]
    fn forbidden_with_spent_quota_is_rate_limited() {
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, Some("0"), "{}"),
            Err(FetchFailure::RateLimited(_))
        ));
    }

    #[test]
    fn forbidden_with_quota_left_is_protocol_error() {
        for remaining in [None, Some("12")] {
            assert!(matches!(
                classify(StatusCode::FORBIDDEN, remaining, "bad credentials"),
                Err(FetchFailure::Failed(IngestError::Protocol(_)))
            ));
        }
    }

    #[test]
    fn server_errors_are_transport_failures() {
        let Err(FetchFailure::Failed(IngestError::Transport(message))) =
            classify(StatusCode::BAD_GATEWAY, Some("0"), "upstream down")
        else {
            panic!("expected transport failure");
        };
        assert!(message.contains("502"));
        assert!(message.contains("upstream down"));
    }

    #[test]
    fn other_client_errors_are_protocol_errors() {
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, None, "requires authentication"),
            Err(FetchFailure::Failed(IngestError::Protocol(_)))
        ));
    }

    #[test]
    fn success_body_is_parsed() {
        let page = classify(StatusCode::OK, Some("4999"), EMPTY_PAGE).expect("page");
        assert!(page.commits.is_empty());
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        assert_eq!(snippet(&long).chars().count(), 200);
        assert_eq!(snippet("  short "), "short");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = GithubFetcherConfig {
            page_size: 0,
            ..GithubFetcherConfig::default()
        };
        assert!(GithubFetcher::new(config).is_err());
    }
}
