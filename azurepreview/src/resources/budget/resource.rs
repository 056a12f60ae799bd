//! azurepreview_budget resource implementation

use super::mapping::{expand_budget, expand_filters, expand_time_period, flatten_budget};
use super::model::BudgetModel;
use crate::error::ProviderError;
use crate::ids::{parse_budget_id, BudgetId};
use async_trait::async_trait;
use std::collections::HashSet;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceMetadataRequest, ResourceMetadataResponse, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    ResourceWithModifyPlan, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, Schema, SchemaBuilder,
};
use tfplug::types::{has_errors, AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{
    EachElement, NumberIsWholeNumber, StringIsRfc3339, StringIsUuid, StringNotEmpty, StringOneOf,
};

pub const CATEGORIES: &[&str] = &["Cost", "Usage"];
pub const TIME_GRAINS: &[&str] = &[
    "Monthly",
    "Quarterly",
    "Annually",
    "BillingMonth",
    "BillingQuarter",
    "BillingAnnual",
];
pub const OPERATORS: &[&str] = &["EqualTo", "GreaterThan", "GreaterThanOrEqualTo"];

#[derive(Default)]
pub struct BudgetResource {
    provider_data: Option<crate::AzureProviderData>,
}

impl BudgetResource {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn budget_schema() -> Schema {
    let string_list = |name: &str, description: &str| {
        AttributeBuilder::new(name, AttributeType::list_of_strings())
            .description(description)
            .optional()
            .computed()
            .build()
    };

    let time_period = NestedBlockBuilder::new("time_period", NestingMode::List)
        .description("Inclusive date range the budget tracks")
        .attribute(
            AttributeBuilder::new("start_date", AttributeType::String)
                .description("RFC 3339 start date")
                .required()
                .validator(Box::new(StringIsRfc3339))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("end_date", AttributeType::String)
                .description("RFC 3339 end date")
                .required()
                .validator(Box::new(StringIsRfc3339))
                .build(),
        )
        .min_items(1)
        .max_items(1)
        .requires_replace()
        .build();

    let tag = NestedBlockBuilder::new("tag", NestingMode::Set)
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(string_list("values", "Allowed tag values"))
        .build();

    let filters = NestedBlockBuilder::new("filters", NestingMode::List)
        .description("Restricts which costs count against the budget")
        .attribute(string_list("resource_groups", "Resource group names"))
        .attribute(string_list("resources", "Resource IDs"))
        .attribute(
            AttributeBuilder::new("meters", AttributeType::list_of_strings())
                .description("Meter GUIDs")
                .optional()
                .computed()
                .validator(Box::new(EachElement(Box::new(StringIsUuid))))
                .build(),
        )
        .block(tag)
        .max_items(1)
        .build();

    let notification = NestedBlockBuilder::new("notification", NestingMode::Set)
        .description("Alert sent when spend crosses a threshold")
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .validator(Box::new(StringNotEmpty))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("enabled", AttributeType::Bool)
                .optional()
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("operator", AttributeType::String)
                .required()
                .validator(Box::new(StringOneOf::new(OPERATORS)))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("threshold", AttributeType::Number)
                .description("Percentage of the amount")
                .required()
                .validator(Box::new(NumberIsWholeNumber))
                .build(),
        )
        .attribute(string_list("contact_emails", "Email addresses to notify"))
        .attribute(string_list("contact_roles", "Azure AD roles to notify"))
        .attribute(string_list("contact_groups", "Action group IDs to notify"))
        .max_items(5)
        .build();

    SchemaBuilder::new()
        .version(0)
        .description("Manages a cost or usage budget on an Azure scope")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("Resource ID returned by Azure")
                .computed()
                .plan_modifier(Box::new(UseStateForUnknown))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("scope", AttributeType::String)
                .description("Subscription, resource group or management group the budget applies to")
                .required()
                .validator(Box::new(StringNotEmpty))
                .plan_modifier(Box::new(RequiresReplace))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("Budget name, unique within the scope")
                .required()
                .validator(Box::new(StringNotEmpty))
                .plan_modifier(Box::new(RequiresReplace))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("category", AttributeType::String)
                .required()
                .validator(Box::new(StringOneOf::new(CATEGORIES)))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("amount", AttributeType::Number)
                .description("Total amount in the billing currency")
                .required()
                .validator(Box::new(NumberIsWholeNumber))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("time_grain", AttributeType::String)
                .required()
                .validator(Box::new(StringOneOf::new(TIME_GRAINS)))
                .build(),
        )
        .block(time_period)
        .block(filters)
        .block(notification)
        .build()
}

fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

/// Identifier for a budget about to be written
fn target_id(model: &BudgetModel) -> Result<BudgetId, ProviderError> {
    let scope = model
        .scope
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::validation_at(AttributePath::new("scope"), "scope is required"))?;
    let name = model
        .name
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::validation_at(AttributePath::new("name"), "name is required"))?;
    Ok(BudgetId::new(scope, name))
}

fn state_id(state: &DynamicValue) -> Option<String> {
    crate::convert::get_optional_string(state, &AttributePath::new("id"))
}

/// State after a successful PUT, plus the read-back failure if there was one
struct WrittenBudget {
    state: BudgetModel,
    read_error: Option<ProviderError>,
}

impl WrittenBudget {
    fn diagnostics(&self) -> Vec<Diagnostic> {
        self.read_error
            .iter()
            .map(ProviderError::to_diagnostic)
            .collect()
    }
}

impl BudgetResource {
    /// Re-derive state from the service
    async fn read_budget(
        &self,
        data: &crate::AzureProviderData,
        id: &BudgetId,
    ) -> Result<BudgetModel, ProviderError> {
        let budget = data
            .client
            .budgets()
            .get(id)
            .await
            .map_err(|e| ProviderError::from_api(format!("reading budget {}", id), e))?;
        Ok(flatten_budget(id, &budget))
    }

    /// PUT the configured budget, then read it back
    ///
    /// Once the PUT succeeds the budget exists remotely, so a failed read-back
    /// still yields state built from the PUT response.
    async fn write_budget(
        &self,
        data: &crate::AzureProviderData,
        id: &BudgetId,
        config: &DynamicValue,
    ) -> Result<WrittenBudget, ProviderError> {
        let model = BudgetModel::from_dynamic(config);
        let body = expand_budget(&model)?;

        tracing::info!("Writing budget {:?} at scope {:?}", id.name, id.scope);
        let written = data
            .client
            .budgets()
            .create_or_update(id, &body)
            .await
            .map_err(|e| {
                ProviderError::from_api(
                    format!(
                        "creating or updating budget {:?} (scope {:?})",
                        id.name, id.scope
                    ),
                    e,
                )
            })?;

        let canonical = match written.id.as_deref().map(parse_budget_id) {
            Some(Ok(parsed)) => parsed,
            Some(Err(e)) => {
                tracing::warn!("Ignoring unparseable budget ID in PUT response: {}", e);
                id.clone()
            }
            None => id.clone(),
        };
        tracing::debug!("Budget written with ID {}", canonical);

        let (mut state, read_error) = match self.read_budget(data, &canonical).await {
            Ok(state) => (state, None),
            Err(e) => {
                tracing::warn!("Budget {} was written but reading it back failed: {}", canonical, e);
                (flatten_budget(&canonical, &written), Some(e))
            }
        };
        if let Some(returned) = written.id {
            state.id = Some(returned);
        }
        Ok(WrittenBudget { state, read_error })
    }

    /// Mapper checks that need whole-object context; values still unknown are skipped
    fn validate_model(config: &DynamicValue) -> Vec<Diagnostic> {
        let model = BudgetModel::from_dynamic(config);
        let mut diagnostics = Vec::new();

        if let Some(period) = &model.time_period {
            if period.start_date.is_some() && period.end_date.is_some() {
                if let Err(e) = expand_time_period(period) {
                    diagnostics.push(e.to_diagnostic());
                }
            }
        }

        if let Err(e) = expand_filters(model.filters.as_ref()) {
            diagnostics.push(e.to_diagnostic());
        }

        let mut seen = HashSet::new();
        for (idx, notification) in model.notifications.iter().enumerate() {
            if !notification.name.is_empty() && !seen.insert(notification.name.as_str()) {
                diagnostics.push(
                    ProviderError::validation_at(
                        AttributePath::new("notification")
                            .index(idx as i64)
                            .attribute("name"),
                        format!(
                            "notification name {:?} is used more than once",
                            notification.name
                        ),
                    )
                    .to_diagnostic(),
                );
            }
        }

        diagnostics
    }
}

#[async_trait]
impl Resource for BudgetResource {
    fn type_name(&self) -> &str {
        "azurepreview_budget"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: budget_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = budget_schema().validate(&request.config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(Self::validate_model(&request.config));
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![not_configured()],
            };
        };

        let id = match target_id(&BudgetModel::from_dynamic(&request.config)) {
            Ok(id) => id,
            Err(e) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics: vec![e.to_diagnostic()],
                }
            }
        };

        match self.write_budget(provider_data, &id, &request.config).await {
            Ok(written) => CreateResourceResponse {
                diagnostics: written.diagnostics(),
                new_state: written.state.to_dynamic(),
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![e.to_diagnostic()],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let Some(raw_id) = state_id(&request.current_state) else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
            };
        };

        let id = match parse_budget_id(&raw_id) {
            Ok(id) => id,
            Err(e) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![e.to_diagnostic()],
                }
            }
        };

        match self.read_budget(provider_data, &id).await {
            Ok(mut state) => {
                state.id = Some(raw_id);
                ReadResourceResponse {
                    new_state: Some(state.to_dynamic()),
                    diagnostics: vec![],
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Budget {} no longer exists, removing from state", id);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic()],
            },
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![not_configured()],
            };
        };

        // scope and name force replacement, so the prior ID still locates the budget
        let id = match state_id(&request.prior_state)
            .ok_or_else(|| ProviderError::Format("budget state has no ID".to_string()))
            .and_then(|raw| parse_budget_id(&raw))
        {
            Ok(id) => id,
            Err(e) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics: vec![e.to_diagnostic()],
                }
            }
        };

        match self.write_budget(provider_data, &id, &request.config).await {
            Ok(written) => UpdateResourceResponse {
                diagnostics: written.diagnostics(),
                new_state: written.state.to_dynamic(),
            },
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![e.to_diagnostic()],
            },
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let Some(raw_id) = state_id(&request.prior_state) else {
            return DeleteResourceResponse {
                diagnostics: vec![],
            };
        };

        let id = match parse_budget_id(&raw_id) {
            Ok(id) => id,
            Err(e) => {
                return DeleteResourceResponse {
                    diagnostics: vec![e.to_diagnostic()],
                }
            }
        };

        tracing::info!("Deleting budget {:?} at scope {:?}", id.name, id.scope);
        match provider_data.client.budgets().delete(&id).await {
            Ok(()) => DeleteResourceResponse {
                diagnostics: vec![],
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!("Budget {} was already deleted", id);
                DeleteResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(e) => DeleteResourceResponse {
                diagnostics: vec![ProviderError::from_api(
                    format!("deleting budget {:?} (scope {:?})", id.name, id.scope),
                    e,
                )
                .to_diagnostic()],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for BudgetResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<crate::AzureProviderData>() {
                self.provider_data = Some(provider_data.clone());
            } else {
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract AzureProviderData from provider data",
                ));
            }
        } else {
            diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            ));
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithModifyPlan for BudgetResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut planned_state = request.proposed_new_state;
        let mut diagnostics = vec![];

        // Destroy plans pass through untouched
        if planned_state.is_null() {
            return ModifyPlanResponse {
                planned_state,
                requires_replace: vec![],
                diagnostics,
            };
        }

        let requires_replace = budget_schema().requires_replace(&request.prior_state, &planned_state);
        let id_path = AttributePath::new("id");
        let id_known = planned_state
            .get(&id_path)
            .map(Dynamic::is_known_value)
            .unwrap_or(false);

        if request.prior_state.is_null() || !requires_replace.is_empty() || !id_known {
            if let Err(e) = planned_state.mark_unknown(&id_path) {
                diagnostics.push(Diagnostic::error(
                    "Failed to plan budget",
                    format!("Could not mark id as unknown: {}", e),
                ));
            }
        }

        ModifyPlanResponse {
            planned_state,
            requires_replace,
            diagnostics,
        }
    }
}

#[async_trait]
impl ResourceWithImportState for BudgetResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        match parse_budget_id(&request.id) {
            Ok(id) => {
                let state = BudgetModel {
                    id: Some(request.id.clone()),
                    scope: Some(id.scope),
                    name: Some(id.name),
                    ..Default::default()
                };
                ImportResourceStateResponse {
                    imported_resources: vec![ImportedResource {
                        type_name: self.type_name().to_string(),
                        state: state.to_dynamic(),
                    }],
                    diagnostics: vec![],
                }
            }
            Err(e) => ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics: vec![e.to_diagnostic()],
            },
        }
    }
}
