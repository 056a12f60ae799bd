//! Composite identifier parsing for subscriptions and budgets

use crate::error::{ProviderError, Result};
use std::fmt;

/// Path fragment joining a budget's scope and name
pub const BUDGET_ID_SEPARATOR: &str = "/providers/Microsoft.Consumption/budgets";

/// Extract the subscription GUID from `/subscriptions/<guid>`
///
/// The input must split on `/` into exactly three segments; the third is returned.
pub fn parse_subscription_id(input: &str) -> Result<String> {
    let parts: Vec<&str> = input.split('/').collect();
    if parts.len() != 3 {
        return Err(ProviderError::Format(format!(
            "parsing subscription ID: unexpected format: {:?}",
            input
        )));
    }
    Ok(parts[2].to_string())
}

/// Budget location: the ARM scope it is attached to plus its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetId {
    pub scope: String,
    pub name: String,
}

impl BudgetId {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        let scope: String = scope.into();
        Self {
            scope: scope.trim_end_matches('/').to_string(),
            name: name.into(),
        }
    }
}

impl fmt::Display for BudgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", self.scope, BUDGET_ID_SEPARATOR, self.name)
    }
}

/// Split a budget resource ID on [`BUDGET_ID_SEPARATOR`]
///
/// Exactly one occurrence of the separator is required. The slash between
/// the separator and the name is dropped, and an empty name is rejected.
pub fn parse_budget_id(input: &str) -> Result<BudgetId> {
    let parts: Vec<&str> = input.split(BUDGET_ID_SEPARATOR).collect();
    if parts.len() != 2 {
        return Err(ProviderError::Format(format!(
            "parsing budget resource ID: unexpected format: {:?}",
            input
        )));
    }

    let name = parts[1].strip_prefix('/').unwrap_or(parts[1]);
    if name.is_empty() {
        return Err(ProviderError::Format(format!(
            "parsing budget resource ID: missing budget name: {:?}",
            input
        )));
    }

    Ok(BudgetId {
        scope: parts[0].to_string(),
        name: name.to_string(),
    })
}
