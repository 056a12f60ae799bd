pub mod budget;
mod subscription;

pub use budget::BudgetResource;
pub use subscription::{subscription_schema, SubscriptionModel, SubscriptionResource};
