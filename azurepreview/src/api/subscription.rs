//! Subscription lifecycle: create under an enrollment account, read, rename, cancel

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tfplug::Context;

use super::{ApiError, Client};

pub const SUBSCRIPTION_API_VERSION: &str = "2019-10-01-preview";
pub const SUBSCRIPTIONS_API_VERSION: &str = "2019-11-01";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub owners: Vec<AdPrincipal>,
    pub offer_type: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub additional_parameters: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdPrincipal {
    pub object_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationResult {
    pub subscription_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Option<String>,
    pub subscription_id: Option<String>,
    pub display_name: Option<String>,
    pub tenant_id: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct RenameRequest<'a> {
    #[serde(rename = "SubscriptionName")]
    subscription_name: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub subscription_id: Option<String>,
}

/// Subscription API bound to a client
pub struct SubscriptionsApi<'a> {
    client: &'a Client,
}

impl<'a> SubscriptionsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /providers/Microsoft.Billing/enrollmentAccounts/{ea}/providers/Microsoft.Subscription/createSubscription
    ///
    /// Blocks until the long-running operation completes.
    pub async fn create_in_enrollment_account(
        &self,
        ctx: &Context,
        enrollment_account: &str,
        parameters: &CreationParameters,
    ) -> Result<CreationResult, ApiError> {
        let url = self.client.url(
            &format!(
                "/providers/Microsoft.Billing/enrollmentAccounts/{}/providers/Microsoft.Subscription/createSubscription",
                enrollment_account
            ),
            &[("api-version", SUBSCRIPTION_API_VERSION)],
        )?;
        self.client.post_long_running(ctx, &url, parameters).await
    }

    /// GET /subscriptions/{id}
    pub async fn get(&self, subscription_id: &str) -> Result<Subscription, ApiError> {
        let url = self.client.url(
            &format!("/subscriptions/{}", subscription_id),
            &[("api-version", SUBSCRIPTIONS_API_VERSION)],
        )?;
        self.client.get(&url).await
    }

    /// POST /subscriptions/{id}/providers/Microsoft.Subscription/rename
    pub async fn rename(
        &self,
        subscription_id: &str,
        name: &str,
    ) -> Result<Option<OperationResponse>, ApiError> {
        let url = self.client.url(
            &format!(
                "/subscriptions/{}/providers/Microsoft.Subscription/rename",
                subscription_id
            ),
            &[("api-version", SUBSCRIPTION_API_VERSION)],
        )?;
        let body = RenameRequest {
            subscription_name: name,
        };
        self.client.post(&url, Some(&body)).await
    }

    /// POST /subscriptions/{id}/providers/Microsoft.Subscription/cancel
    ///
    /// The service may answer with an empty body.
    pub async fn cancel(
        &self,
        subscription_id: &str,
    ) -> Result<Option<OperationResponse>, ApiError> {
        let url = self.client.url(
            &format!(
                "/subscriptions/{}/providers/Microsoft.Subscription/cancel",
                subscription_id
            ),
            &[("api-version", SUBSCRIPTION_API_VERSION)],
        )?;
        self.client.post::<_, ()>(&url, None).await
    }
}
