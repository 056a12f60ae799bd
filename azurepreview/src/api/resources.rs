//! Generic resource listing (Microsoft.Resources)

use serde::Deserialize;
use std::collections::HashMap;
use tfplug::Context;

use super::{ApiError, Client};

pub const API_VERSION: &str = "2020-06-01";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenericResource {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub location: Option<String>,
    pub tags: Option<HashMap<String, String>>,
}

/// Resources API bound to a client
pub struct ResourcesApi<'a> {
    client: &'a Client,
}

impl<'a> ResourcesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /subscriptions/{id}/resources, following every `nextLink`
    ///
    /// `filter` is an OData expression; an empty filter lists everything.
    pub async fn list(
        &self,
        ctx: &Context,
        subscription_id: &str,
        filter: &str,
    ) -> Result<Vec<GenericResource>, ApiError> {
        let path = format!("/subscriptions/{}/resources", subscription_id);
        let mut query = vec![("api-version", API_VERSION)];
        if !filter.is_empty() {
            query.push(("$filter", filter));
        }
        let url = self.client.url(&path, &query)?;
        self.client.list_all(ctx, &url).await
    }
}
