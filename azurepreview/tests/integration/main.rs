//! Resource and data source lifecycles against a mock ARM endpoint

mod budget_test;
mod resources_data_source_test;
mod subscription_test;

use azurepreview::api::{Client, ClientOptions, PollConfig, RetryConfig, StaticTokenCredential};
use azurepreview::AzureProviderData;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tfplug::types::Dynamic;

pub fn provider_data(url: &str) -> Arc<dyn Any + Send + Sync> {
    let options = ClientOptions {
        retry: RetryConfig {
            max_retries: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            timeout_seconds: 5,
        },
        poll: PollConfig {
            default_interval: Duration::from_millis(5),
            max_duration: Duration::from_secs(5),
        },
        user_agent: Some("azurepreview-integration".to_string()),
    };
    let client = Client::with_options(
        url,
        Arc::new(StaticTokenCredential::new("integration-token")),
        options,
    )
    .unwrap();
    Arc::new(AzureProviderData::new(client, Some("sub-1".to_string())))
}

pub fn strings(items: &[&str]) -> Dynamic {
    Dynamic::List(items.iter().map(|s| Dynamic::from(*s)).collect())
}

pub fn object(entries: Vec<(&str, Dynamic)>) -> Dynamic {
    Dynamic::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<HashMap<_, _>>(),
    )
}
