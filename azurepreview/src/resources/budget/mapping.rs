//! Budget expand (configuration -> API) and flatten (API -> state) mappers

use super::model::{BudgetModel, FilterModel, NotificationModel, TagModel, TimePeriodModel};
use crate::api::consumption::{Budget, BudgetFilters, BudgetProperties, BudgetTimePeriod, Notification};
use crate::error::{ProviderError, Result};
use crate::ids::BudgetId;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use tfplug::types::AttributePath;
use uuid::Uuid;

fn time_period_path(field: &str) -> AttributePath {
    AttributePath::new("time_period").index(0).attribute(field)
}

fn parse_date(value: Option<&str>, field: &str) -> Result<DateTime<Utc>> {
    let value = value.ok_or_else(|| {
        ProviderError::validation_at(time_period_path(field), format!("{} is required", field))
    })?;
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            ProviderError::validation_at(
                time_period_path(field),
                format!("{} {:?} is not an RFC 3339 timestamp: {}", field, value, e),
            )
        })
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Both dates are required and the start must precede the end
pub fn expand_time_period(input: &TimePeriodModel) -> Result<BudgetTimePeriod> {
    let start = parse_date(input.start_date.as_deref(), "start_date")?;
    let end = parse_date(input.end_date.as_deref(), "end_date")?;
    if start >= end {
        return Err(ProviderError::validation_at(
            time_period_path("end_date"),
            format!(
                "end_date {} must be after start_date {}",
                format_date(&end),
                format_date(&start)
            ),
        ));
    }

    Ok(BudgetTimePeriod {
        start_date: format_date(&start),
        end_date: Some(format_date(&end)),
    })
}

/// Service dates in canonical UTC form; unparseable values pass through
fn normalize_date(value: &str) -> String {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return format_date(&date.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => format_date(&naive.and_utc()),
        Err(_) => value.to_string(),
    }
}

pub fn flatten_time_period(input: Option<&BudgetTimePeriod>) -> Option<TimePeriodModel> {
    input.map(|period| TimePeriodModel {
        start_date: Some(normalize_date(&period.start_date)),
        end_date: period.end_date.as_deref().map(normalize_date),
    })
}

fn parse_meters(meters: &[String]) -> Result<Vec<Uuid>> {
    meters
        .iter()
        .enumerate()
        .map(|(idx, meter)| {
            Uuid::parse_str(meter).map_err(|e| {
                ProviderError::validation_at(
                    AttributePath::new("filters")
                        .index(0)
                        .attribute("meters")
                        .index(idx as i64),
                    format!("meter {:?} is not a valid UUID: {}", meter, e),
                )
            })
        })
        .collect()
}

/// Tag entries keyed by name; a repeated name keeps the last entry's values
fn expand_tags(tags: &[TagModel]) -> Option<HashMap<String, Vec<String>>> {
    if tags.is_empty() {
        return None;
    }
    Some(
        tags.iter()
            .map(|tag| (tag.name.clone(), tag.values.clone()))
            .collect(),
    )
}

pub fn expand_filters(input: Option<&FilterModel>) -> Result<Option<BudgetFilters>> {
    let Some(filters) = input else {
        return Ok(None);
    };

    let meters = if filters.meters.is_empty() {
        None
    } else {
        Some(parse_meters(&filters.meters)?)
    };

    Ok(Some(BudgetFilters {
        resource_groups: Some(filters.resource_groups.clone()),
        resources: Some(filters.resources.clone()),
        meters,
        tags: expand_tags(&filters.tags),
    }))
}

pub fn flatten_filters(input: Option<&BudgetFilters>) -> Option<FilterModel> {
    let filters = input?;

    let mut tags: Vec<TagModel> = filters
        .tags
        .iter()
        .flatten()
        .map(|(name, values)| TagModel {
            name: name.clone(),
            values: values.clone(),
        })
        .collect();
    tags.sort_by(|a, b| a.name.cmp(&b.name));

    Some(FilterModel {
        resource_groups: filters.resource_groups.clone().unwrap_or_default(),
        resources: filters.resources.clone().unwrap_or_default(),
        meters: filters
            .meters
            .iter()
            .flatten()
            .map(Uuid::to_string)
            .collect(),
        tags,
    })
}

fn notification_path(idx: usize, field: &str) -> AttributePath {
    AttributePath::new("notification")
        .index(idx as i64)
        .attribute(field)
}

/// Name-keyed notification map; names must be unique
pub fn expand_notifications(
    input: &[NotificationModel],
) -> Result<Option<HashMap<String, Option<Notification>>>> {
    if input.is_empty() {
        return Ok(None);
    }

    let mut results = HashMap::new();
    for (idx, item) in input.iter().enumerate() {
        if item.name.is_empty() {
            return Err(ProviderError::validation_at(
                notification_path(idx, "name"),
                "notification name must not be empty",
            ));
        }
        let operator = item.operator.clone().ok_or_else(|| {
            ProviderError::validation_at(
                notification_path(idx, "operator"),
                format!("notification {:?} requires an operator", item.name),
            )
        })?;
        let threshold = item.threshold.ok_or_else(|| {
            ProviderError::validation_at(
                notification_path(idx, "threshold"),
                format!("notification {:?} requires a threshold", item.name),
            )
        })?;

        let notification = Notification {
            enabled: item.enabled,
            operator,
            threshold: threshold.trunc(),
            contact_emails: item.contact_emails.clone().unwrap_or_default(),
            contact_roles: Some(item.contact_roles.clone().unwrap_or_default()),
            contact_groups: Some(item.contact_groups.clone().unwrap_or_default()),
        };

        if results.insert(item.name.clone(), Some(notification)).is_some() {
            return Err(ProviderError::validation_at(
                notification_path(idx, "name"),
                format!("notification name {:?} is used more than once", item.name),
            ));
        }
    }

    Ok(Some(results))
}

/// Threshold keeps only its integer part; null entries become name-only blocks
pub fn flatten_notifications(
    input: Option<&HashMap<String, Option<Notification>>>,
) -> Vec<NotificationModel> {
    let mut results: Vec<NotificationModel> = input
        .into_iter()
        .flatten()
        .map(|(name, notification)| match notification {
            Some(n) => NotificationModel {
                name: name.clone(),
                enabled: n.enabled,
                operator: Some(n.operator.clone()),
                threshold: Some(n.threshold.trunc()),
                contact_emails: Some(n.contact_emails.clone()),
                contact_roles: Some(n.contact_roles.clone().unwrap_or_default()),
                contact_groups: Some(n.contact_groups.clone().unwrap_or_default()),
            },
            None => NotificationModel {
                name: name.clone(),
                ..Default::default()
            },
        })
        .collect();
    results.sort_by(|a, b| a.name.cmp(&b.name));
    results
}

/// Full request body; every mapper error surfaces here before any API call
pub fn expand_budget(input: &BudgetModel) -> Result<Budget> {
    let time_period = match &input.time_period {
        Some(period) => Some(expand_time_period(period)?),
        None => None,
    };

    Ok(Budget {
        properties: Some(BudgetProperties {
            category: input.category.clone(),
            amount: input.amount.map(f64::trunc),
            time_grain: input.time_grain.clone(),
            time_period,
            filters: expand_filters(input.filters.as_ref())?,
            notifications: expand_notifications(&input.notifications)?,
            current_spend: None,
        }),
        ..Default::default()
    })
}

/// State from a service response; `id` locates the budget when the body omits it
pub fn flatten_budget(id: &BudgetId, budget: &Budget) -> BudgetModel {
    let props = budget.properties.clone().unwrap_or_default();

    BudgetModel {
        id: budget.id.clone().or_else(|| Some(id.to_string())),
        scope: Some(id.scope.clone()),
        name: budget.name.clone().or_else(|| Some(id.name.clone())),
        category: props.category,
        amount: props.amount.map(f64::trunc),
        time_grain: props.time_grain,
        time_period: flatten_time_period(props.time_period.as_ref()),
        filters: flatten_filters(props.filters.as_ref()),
        notifications: flatten_notifications(props.notifications.as_ref()),
    }
}
