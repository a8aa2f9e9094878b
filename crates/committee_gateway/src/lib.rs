//! A retrying HTTP client for the availability gateway REST surface.

pub mod client;
pub mod errors;
pub mod retry;

pub use client::AvailabilityGatewayClient;
pub use errors::{GatewayError, GatewayResult};
pub use retry::{with_retry, RETRY_BACKOFF, RETRY_COUNT};
