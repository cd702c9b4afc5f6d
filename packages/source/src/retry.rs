//! HTTP retry helper for remote adapters.
//!
//! Remote adapters call [`send_text`] instead of
//! `reqwest::RequestBuilder::send()` directly so every request gets
//! exponential backoff on transient failures (timeouts, connection
//! resets, HTTP 429, HTTP 5xx).

use std::time::Duration;

use crate::SourceError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (2s, 4s, 8s, 16s) the total wait before
/// giving up is 30 seconds.
const MAX_RETRIES: u32 = 4;

/// Maximum length of the response body preview included in errors.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends an HTTP request and returns the response body as a `String`.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
///
/// Does **not** retry HTTP 4xx (except 429) since those are permanent.
///
/// # Errors
///
/// Returns [`SourceError::DataUnavailable`] if the server keeps failing or
/// answers with a non-retryable status, and [`SourceError::Http`] if the
/// transport fails permanently.
#[allow(clippy::future_not_send)]
pub async fn send_text<F>(label: &str, build_request: F) -> Result<String, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let unavailable = |message: String| SourceError::DataUnavailable {
        source_label: label.to_string(),
        message,
    };

    let mut last_error = String::new();

    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt);
            log::warn!("{label}: retry {attempt}/{MAX_RETRIES} in {delay:?} ({last_error})");
            tokio::time::sleep(delay).await;
        }

        let response = match build_request().send().await {
            Ok(r) => r,
            Err(e) if is_transient(&e) => {
                last_error = format!("transient error: {e}");
                continue;
            }
            Err(e) => return Err(SourceError::Http(e)),
        };

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            last_error = format!("HTTP {status}");
            continue;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                last_error = format!("failed to read response body: {e}");
                continue;
            }
        };

        if !status.is_success() {
            return Err(unavailable(format!(
                "HTTP {status}: {}",
                preview(&body, BODY_PREVIEW_LEN)
            )));
        }

        return Ok(body);
    }

    Err(unavailable(format!(
        "request failed after {MAX_RETRIES} retries: {last_error}"
    )))
}

/// Truncates a string for error messages, appending "..." if it exceeds
/// `max_len`.
fn preview(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
