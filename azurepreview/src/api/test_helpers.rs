//! Test helpers for the ARM client

use super::{Client, ClientOptions, PollConfig, RetryConfig, StaticTokenCredential};
use std::sync::Arc;
use std::time::Duration;

/// Millisecond backoff and polling so mock-server tests finish quickly
pub fn fast_options() -> ClientOptions {
    ClientOptions {
        retry: RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        },
        poll: PollConfig {
            default_interval: Duration::from_millis(5),
            max_duration: Duration::from_secs(5),
        },
        user_agent: None,
    }
}

pub fn create_test_client(url: &str) -> Client {
    Client::with_options(
        url,
        Arc::new(StaticTokenCredential::new("test-token")),
        fast_options(),
    )
    .unwrap()
}

pub fn create_test_provider_data(url: &str) -> crate::AzureProviderData {
    crate::AzureProviderData::new(create_test_client(url), Some("sub-1".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_and_poll_settings() {
        let options = ClientOptions::default();
        assert_eq!(options.retry.max_retries, 3);
        assert_eq!(options.retry.initial_backoff_ms, 100);
        assert_eq!(options.retry.max_backoff_ms, 10000);
        assert_eq!(options.retry.timeout_seconds, 30);
        assert_eq!(options.poll.default_interval, Duration::from_secs(15));
        assert_eq!(options.poll.max_duration, Duration::from_secs(900));
        assert!(options.user_agent.is_none());
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = create_test_client("http://127.0.0.1:1234/");
        assert_eq!(client.base_url(), "http://127.0.0.1:1234");
    }
}
