//! Shared HTTP retry wrapper
//!
//! `send_with_retry()` stands in for `request.send()` and adds exponential
//! backoff with jitter on 429 and 5xx responses, honoring a numeric
//! Retry-After header when the server sends one. Requests with streaming
//! bodies (multipart uploads) cannot be replayed and go out exactly once.

use reqwest::{Client, Request, Response};
use std::time::Duration;

/// Configuration for HTTP retry behavior
#[derive(Debug, Clone)]
pub struct HttpRetryConfig {
    /// Maximum number of retry attempts (default: 3)
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff (default: 1000)
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds (default: 30000)
    pub max_delay_ms: u64,
    /// Backoff multiplier (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Determine if a status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Parse a Retry-After header value. Only the numeric-seconds form is
/// handled; the HTTP-date form is rare enough to fall through to backoff.
fn parse_retry_after(response: &Response) -> Option<Duration> {
    let value = response.headers().get("retry-after")?.to_str().ok()?;
    let secs = value.parse::<u64>().ok()?;
    Some(Duration::from_secs(secs.min(300)))
}

/// Calculate delay for a given retry attempt with jitter
fn calculate_delay(attempt: u32, config: &HttpRetryConfig) -> Duration {
    let base = config.base_delay_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped = base.min(config.max_delay_ms as f64);
    // 10-30% jitter to avoid thundering herd
    let jitter = capped * (0.1 + rand::random::<f64>() * 0.2);
    Duration::from_millis((capped + jitter) as u64)
}

/// Send an HTTP request, retrying on 429/5xx.
///
/// Callers build a `Request` via `client.get(url)...build()?` and pass it
/// here instead of calling `send()`. Bodies are buffered for replay; a body
/// that cannot be buffered (multipart stream) disables retries for that
/// request rather than replaying it empty.
pub async fn send_with_retry(
    client: &Client,
    request: Request,
    config: &HttpRetryConfig,
) -> Result<Response, reqwest::Error> {
    let method = request.method().clone();
    let url = request.url().clone();
    let headers = request.headers().clone();
    let body_bytes = match request.body() {
        Some(body) => match body.as_bytes() {
            Some(bytes) => Some(bytes.to_vec()),
            // Streaming body, single shot.
            None => return client.execute(request).await,
        },
        None => None,
    };

    let mut last_response = client.execute(request).await?;

    for attempt in 0..config.max_retries {
        if !is_retryable_status(last_response.status().as_u16()) {
            return Ok(last_response);
        }

        // Prefer Retry-After, fall back to exponential backoff
        let delay = parse_retry_after(&last_response)
            .unwrap_or_else(|| calculate_delay(attempt, config));

        tracing::debug!(
            "HTTP {} {} returned {}. Retry {}/{} after {:?}",
            method,
            url,
            last_response.status(),
            attempt + 1,
            config.max_retries,
            delay
        );

        tokio::time::sleep(delay).await;

        let mut retry_req = client.request(method.clone(), url.clone());
        for (key, value) in headers.iter() {
            retry_req = retry_req.header(key, value);
        }
        if let Some(ref body) = body_bytes {
            retry_req = retry_req.body(body.clone());
        }

        last_response = retry_req.send().await?;
    }

    Ok(last_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(502));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(504));
        assert!(!is_retryable_status(200));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(403));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn test_calculate_delay_bounded() {
        let config = HttpRetryConfig::default();
        for attempt in 0..10 {
            let delay = calculate_delay(attempt, &config);
            assert!(delay.as_millis() <= (config.max_delay_ms as u128 * 2)); // With jitter
        }
    }

    #[tokio::test]
    async fn test_send_with_retry_exhausts_attempts_on_503() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = Client::new();
        let config = HttpRetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 1.0,
        };
        let request = client.get(format!("{}/flaky", server.url())).build().unwrap();
        let response = send_with_retry(&client, request, &config).await.unwrap();
        assert_eq!(response.status().as_u16(), 503);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_with_retry_passes_through_client_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = Client::new();
        let request = client.get(format!("{}/missing", server.url())).build().unwrap();
        let response = send_with_retry(&client, request, &HttpRetryConfig::default())
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
        mock.assert_async().await;
    }
}
