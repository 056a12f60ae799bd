//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AzureProviderData {
    pub client: Arc<Client>,
    /// Default subscription for operations that are not scoped by an ID
    pub subscription_id: Option<String>,
}

impl AzureProviderData {
    pub fn new(client: Client, subscription_id: Option<String>) -> Self {
        Self {
            client: Arc::new(client),
            subscription_id,
        }
    }
}
