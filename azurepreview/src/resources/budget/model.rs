//! Typed view of the `azurepreview_budget` configuration and state
//!
//! Dynamic values are decoded once into these structs; the mappers in
//! [`super::mapping`] work purely on them.

use crate::convert::{
    flatten_string_list, get_blocks, get_optional_bool, get_optional_number, get_optional_string,
    get_string_list,
};
use std::collections::HashMap;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetModel {
    pub id: Option<String>,
    pub scope: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub time_grain: Option<String>,
    pub time_period: Option<TimePeriodModel>,
    pub filters: Option<FilterModel>,
    pub notifications: Vec<NotificationModel>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimePeriodModel {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterModel {
    pub resource_groups: Vec<String>,
    pub resources: Vec<String>,
    pub meters: Vec<String>,
    pub tags: Vec<TagModel>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagModel {
    pub name: String,
    pub values: Vec<String>,
}

/// A notification whose API entry was null carries only its name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationModel {
    pub name: String,
    pub enabled: Option<bool>,
    pub operator: Option<String>,
    pub threshold: Option<f64>,
    pub contact_emails: Option<Vec<String>>,
    pub contact_roles: Option<Vec<String>>,
    pub contact_groups: Option<Vec<String>>,
}

fn attr(name: &str) -> AttributePath {
    AttributePath::new(name)
}

/// Treat a nested block element as its own value so the path helpers apply
fn element(value: &Dynamic) -> DynamicValue {
    DynamicValue::new(value.clone())
}

fn optional_list(value: &DynamicValue, name: &str) -> Option<Vec<String>> {
    value
        .get(&attr(name))
        .ok()
        .filter(|v| v.is_known_value())
        .map(|_| get_string_list(value, &attr(name)))
}

fn string_or_null(value: &Option<String>) -> Dynamic {
    value.clone().map(Dynamic::String).unwrap_or(Dynamic::Null)
}

fn list_or_null(value: &Option<Vec<String>>) -> Dynamic {
    match value {
        Some(items) => flatten_string_list(Some(items.as_slice())),
        None => Dynamic::Null,
    }
}

impl BudgetModel {
    pub fn from_dynamic(value: &DynamicValue) -> Self {
        let time_period = get_blocks(value, &attr("time_period"))
            .first()
            .map(|v| TimePeriodModel::from_dynamic(&element(v)));
        let filters = get_blocks(value, &attr("filters"))
            .first()
            .map(|v| FilterModel::from_dynamic(&element(v)));
        let notifications = get_blocks(value, &attr("notification"))
            .iter()
            .map(|v| NotificationModel::from_dynamic(&element(v)))
            .collect();

        Self {
            id: get_optional_string(value, &attr("id")),
            scope: get_optional_string(value, &attr("scope")),
            name: get_optional_string(value, &attr("name")),
            category: get_optional_string(value, &attr("category")),
            amount: get_optional_number(value, &attr("amount")),
            time_grain: get_optional_string(value, &attr("time_grain")),
            time_period,
            filters,
            notifications,
        }
    }

    /// State value; absent blocks become empty lists, never null
    pub fn to_dynamic(&self) -> DynamicValue {
        let mut object = HashMap::new();
        object.insert("id".to_string(), string_or_null(&self.id));
        object.insert("scope".to_string(), string_or_null(&self.scope));
        object.insert("name".to_string(), string_or_null(&self.name));
        object.insert("category".to_string(), string_or_null(&self.category));
        object.insert(
            "amount".to_string(),
            self.amount.map(Dynamic::Number).unwrap_or(Dynamic::Null),
        );
        object.insert("time_grain".to_string(), string_or_null(&self.time_grain));
        object.insert(
            "time_period".to_string(),
            Dynamic::List(self.time_period.iter().map(TimePeriodModel::to_dynamic).collect()),
        );
        object.insert(
            "filters".to_string(),
            Dynamic::List(self.filters.iter().map(FilterModel::to_dynamic).collect()),
        );
        object.insert(
            "notification".to_string(),
            Dynamic::List(
                self.notifications
                    .iter()
                    .map(NotificationModel::to_dynamic)
                    .collect(),
            ),
        );
        DynamicValue::new(Dynamic::Map(object))
    }
}

impl TimePeriodModel {
    fn from_dynamic(value: &DynamicValue) -> Self {
        Self {
            start_date: get_optional_string(value, &attr("start_date")),
            end_date: get_optional_string(value, &attr("end_date")),
        }
    }

    fn to_dynamic(&self) -> Dynamic {
        let mut object = HashMap::new();
        object.insert("start_date".to_string(), string_or_null(&self.start_date));
        object.insert("end_date".to_string(), string_or_null(&self.end_date));
        Dynamic::Map(object)
    }
}

impl FilterModel {
    fn from_dynamic(value: &DynamicValue) -> Self {
        Self {
            resource_groups: get_string_list(value, &attr("resource_groups")),
            resources: get_string_list(value, &attr("resources")),
            meters: get_string_list(value, &attr("meters")),
            tags: get_blocks(value, &attr("tag"))
                .iter()
                .map(|v| {
                    let tag = element(v);
                    TagModel {
                        name: get_optional_string(&tag, &attr("name")).unwrap_or_default(),
                        values: get_string_list(&tag, &attr("values")),
                    }
                })
                .collect(),
        }
    }

    fn to_dynamic(&self) -> Dynamic {
        let tags = self
            .tags
            .iter()
            .map(|tag| {
                let mut object = HashMap::new();
                object.insert("name".to_string(), Dynamic::String(tag.name.clone()));
                object.insert("values".to_string(), flatten_string_list(Some(tag.values.as_slice())));
                Dynamic::Map(object)
            })
            .collect();

        let mut object = HashMap::new();
        object.insert(
            "resource_groups".to_string(),
            flatten_string_list(Some(self.resource_groups.as_slice())),
        );
        object.insert(
            "resources".to_string(),
            flatten_string_list(Some(self.resources.as_slice())),
        );
        object.insert("meters".to_string(), flatten_string_list(Some(self.meters.as_slice())));
        object.insert("tag".to_string(), Dynamic::List(tags));
        Dynamic::Map(object)
    }
}

impl NotificationModel {
    fn from_dynamic(value: &DynamicValue) -> Self {
        Self {
            name: get_optional_string(value, &attr("name")).unwrap_or_default(),
            enabled: get_optional_bool(value, &attr("enabled")),
            operator: get_optional_string(value, &attr("operator")),
            threshold: get_optional_number(value, &attr("threshold")),
            contact_emails: optional_list(value, "contact_emails"),
            contact_roles: optional_list(value, "contact_roles"),
            contact_groups: optional_list(value, "contact_groups"),
        }
    }

    fn to_dynamic(&self) -> Dynamic {
        let mut object = HashMap::new();
        object.insert("name".to_string(), Dynamic::String(self.name.clone()));
        object.insert(
            "enabled".to_string(),
            self.enabled.map(Dynamic::Bool).unwrap_or(Dynamic::Null),
        );
        object.insert("operator".to_string(), string_or_null(&self.operator));
        object.insert(
            "threshold".to_string(),
            self.threshold.map(Dynamic::Number).unwrap_or(Dynamic::Null),
        );
        object.insert("contact_emails".to_string(), list_or_null(&self.contact_emails));
        object.insert("contact_roles".to_string(), list_or_null(&self.contact_roles));
        object.insert("contact_groups".to_string(), list_or_null(&self.contact_groups));
        Dynamic::Map(object)
    }
}
