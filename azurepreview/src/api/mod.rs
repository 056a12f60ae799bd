pub mod auth;
pub mod client;
pub mod consumption;
pub mod environment;
pub mod error;
pub mod resources;
pub mod subscription;
#[cfg(test)]
pub(crate) mod test_helpers;

pub use auth::{AzureCliCredential, ClientSecretCredential, StaticTokenCredential, TokenCredential};
pub use client::{Client, ClientOptions, PollConfig, RetryConfig};
pub use environment::CloudEnvironment;
pub use error::ApiError;

impl Client {
    /// Budget operations
    pub fn budgets(&self) -> consumption::BudgetsApi<'_> {
        consumption::BudgetsApi::new(self)
    }

    /// Subscription lifecycle operations
    pub fn subscriptions(&self) -> subscription::SubscriptionsApi<'_> {
        subscription::SubscriptionsApi::new(self)
    }

    /// Generic resource listing
    pub fn resources(&self) -> resources::ResourcesApi<'_> {
        resources::ResourcesApi::new(self)
    }
}
