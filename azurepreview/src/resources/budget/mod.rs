//! azurepreview_budget: cost and usage budgets on any Azure scope

pub mod mapping;
pub mod model;
mod resource;

pub use resource::{budget_schema, BudgetResource};
