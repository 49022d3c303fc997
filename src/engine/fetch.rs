//! HTTP requests with 429 and error retry

use std::time::Duration;

use rand::Rng;
use reqwest::{Client, Method, StatusCode, header};
use url::Url;

/// Attempts allowed for 429 responses carrying `retry-after`
const MAX_RATE_LIMIT_RETRIES: u32 = 3;
/// First error-retry backoff, doubled per attempt
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
pub(crate) struct RetryPolicy {
    /// Retry 429 responses that carry a `retry-after` header
    pub rate_limited: bool,
    /// Retry 5xx responses and network errors
    pub errors: bool,
    pub error_attempts: u32,
    pub jitter: Duration,
}

#[derive(Debug)]
pub(crate) struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Option<String>,
    retry_after: Option<Duration>,
}

async fn request_once(
    client: &Client,
    method: Method,
    url: &Url,
    want_body: bool,
) -> Result<FetchResponse, reqwest::Error> {
    let response = client.request(method, url.clone()).send().await?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let body = if want_body && status.is_success() {
        Some(response.text().await?)
    } else {
        None
    };

    Ok(FetchResponse {
        status: status.as_u16(),
        content_type,
        body,
        retry_after,
    })
}

/// HEAD for plain checks, falling back to GET when HEAD is not successful;
/// GET directly when the body is needed
async fn request(
    client: &Client,
    url: &Url,
    want_body: bool,
) -> Result<FetchResponse, reqwest::Error> {
    if want_body {
        return request_once(client, Method::GET, url, true).await;
    }
    match request_once(client, Method::HEAD, url, false).await {
        Ok(response) if StatusCode::from_u16(response.status).is_ok_and(|s| s.is_success()) => {
            Ok(response)
        }
        _ => request_once(client, Method::GET, url, false).await,
    }
}

/// Fetch `url`, applying the retry policy
pub(crate) async fn fetch(
    client: &Client,
    url: &Url,
    want_body: bool,
    policy: &RetryPolicy,
) -> Result<FetchResponse, reqwest::Error> {
    let mut rate_limit_retries = 0;
    let mut error_retries = 0;
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let result = request(client, url, want_body).await;

        let delay = match &result {
            Ok(response)
                if response.status == StatusCode::TOO_MANY_REQUESTS.as_u16()
                    && policy.rate_limited
                    && rate_limit_retries < MAX_RATE_LIMIT_RETRIES =>
            {
                response.retry_after.inspect(|delay| {
                    rate_limit_retries += 1;
                    log::debug!("{url} rate limited, retrying in {delay:?}");
                })
            }
            Ok(response)
                if response.status >= 500 && policy.errors && error_retries < policy.error_attempts =>
            {
                error_retries += 1;
                log::debug!(
                    "{url} returned {}, retry {error_retries}/{}",
                    response.status,
                    policy.error_attempts
                );
                Some(next_backoff(&mut backoff, policy.jitter))
            }
            Err(e) if policy.errors && error_retries < policy.error_attempts => {
                error_retries += 1;
                log::debug!("{url} failed: {e}, retry {error_retries}/{}", policy.error_attempts);
                Some(next_backoff(&mut backoff, policy.jitter))
            }
            _ => None,
        };

        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => return result,
        }
    }
}

/// Current backoff plus jitter; doubles the backoff for the next attempt
fn next_backoff(backoff: &mut Duration, jitter: Duration) -> Duration {
    let jitter_ms = jitter.as_millis() as u64;
    let extra = if jitter_ms > 0 {
        rand::rng().random_range(0..jitter_ms)
    } else {
        0
    };
    let delay = *backoff + Duration::from_millis(extra);
    *backoff = (*backoff * 2).min(MAX_BACKOFF);
    delay
}
