use std::time::Duration;

use reqwest::StatusCode;
use tracing::warn;

use crate::errors::{GatewayError, GatewayResult};

/// Retries transport timeouts and 502/503/504 a fixed number of times with a fixed 1-second
/// backoff, matching `http_handler.py`'s `RETRY_COUNT = 10` (the file redefines the constant
/// once; the later value of 10 wins, so this port defines it once).
pub const RETRY_COUNT: u32 = 10;
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status, StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT)
}

/// Runs `attempt` up to `RETRY_COUNT` times, sleeping `RETRY_BACKOFF` between attempts, retrying
/// only on a transport timeout or a retryable HTTP status. Any other error, or exhausting the
/// budget, surfaces immediately.
pub async fn with_retry<T, F, Fut>(endpoint: &'static str, mut attempt: F) -> GatewayResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, GatewayError>>,
{
    let mut last_err = None;
    for attempt_number in 1..=RETRY_COUNT {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retryable = match &err {
                    GatewayError::Request(e) => e.is_timeout() || e.is_connect(),
                    GatewayError::BadStatus(status) => is_retryable_status(*status),
                    _ => false,
                };
                if !retryable {
                    return Err(err);
                }
                warn!(endpoint, attempt = attempt_number, error = %err, "retrying gateway request");
                last_err = Some(err);
                if attempt_number < RETRY_COUNT {
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }
    }
    let _ = last_err;
    Err(GatewayError::TooManyAttempts { endpoint, attempts: RETRY_COUNT })
}
