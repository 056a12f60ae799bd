//! Microsoft.Consumption budgets API

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{ApiError, Client};
use crate::ids::BudgetId;

pub const API_VERSION: &str = "2019-01-01";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Budget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub budget_type: Option<String>,
    #[serde(rename = "eTag", skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BudgetProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_grain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_period: Option<BudgetTimePeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<BudgetFilters>,
    /// Keyed by notification name; the service may return null entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<HashMap<String, Option<Notification>>>,
    #[serde(skip_serializing)]
    pub current_spend: Option<CurrentSpend>,
}

/// Dates are RFC 3339 strings on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetTimePeriod {
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meters: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub operator: String,
    pub threshold: f64,
    #[serde(default)]
    pub contact_emails: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_groups: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentSpend {
    pub amount: Option<f64>,
    pub unit: Option<String>,
}

/// Budgets API bound to a client
pub struct BudgetsApi<'a> {
    client: &'a Client,
}

impl<'a> BudgetsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn url(&self, id: &BudgetId) -> Result<String, ApiError> {
        self.client
            .url(&id.to_string(), &[("api-version", API_VERSION)])
    }

    /// GET {scope}/providers/Microsoft.Consumption/budgets/{name}
    pub async fn get(&self, id: &BudgetId) -> Result<Budget, ApiError> {
        self.client.get(&self.url(id)?).await
    }

    /// PUT {scope}/providers/Microsoft.Consumption/budgets/{name}
    pub async fn create_or_update(&self, id: &BudgetId, budget: &Budget) -> Result<Budget, ApiError> {
        self.client.put(&self.url(id)?, budget).await
    }

    /// DELETE {scope}/providers/Microsoft.Consumption/budgets/{name}
    pub async fn delete(&self, id: &BudgetId) -> Result<(), ApiError> {
        self.client.delete(&self.url(id)?).await
    }
}
