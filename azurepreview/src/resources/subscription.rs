//! azurepreview_subscription resource implementation
//!
//! Subscriptions are created under an EA enrollment account through a
//! long-running operation. Only the display name can change in place;
//! destroying the resource cancels the subscription.

use crate::api::subscription::{AdPrincipal, CreationParameters, Subscription};
use crate::convert::{
    expand_string_list, flatten_string_list, flatten_string_map, get_known, get_optional_string,
    get_string_map,
};
use crate::error::ProviderError;
use crate::ids::parse_subscription_id;
use async_trait::async_trait;
use std::collections::HashMap;
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
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{StringLengthBetween, StringNotEmpty, StringOneOf};

pub const OFFER_TYPES: &[&str] = &["MS-AZR-0017P", "MS-AZR-0148P"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub enrollment_account: Option<String>,
    pub owners: Option<Vec<String>>,
    pub offer_type: Option<String>,
    pub additional_parameters: Option<HashMap<String, String>>,
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
}

fn attr(name: &str) -> AttributePath {
    AttributePath::new(name)
}

fn string_or_null(value: &Option<String>) -> Dynamic {
    value.clone().map(Dynamic::String).unwrap_or(Dynamic::Null)
}

impl SubscriptionModel {
    pub fn from_dynamic(value: &DynamicValue) -> Self {
        Self {
            id: get_optional_string(value, &attr("id")),
            name: get_optional_string(value, &attr("name")),
            enrollment_account: get_optional_string(value, &attr("enrollment_account")),
            owners: get_known(value, &attr("owners")).map(expand_string_list),
            offer_type: get_optional_string(value, &attr("offer_type")),
            additional_parameters: get_known(value, &attr("additional_parameters"))
                .map(|_| get_string_map(value, &attr("additional_parameters"))),
            subscription_id: get_optional_string(value, &attr("subscription_id")),
            tenant_id: get_optional_string(value, &attr("tenant_id")),
        }
    }

    pub fn to_dynamic(&self) -> DynamicValue {
        let mut object = HashMap::new();
        object.insert("id".to_string(), string_or_null(&self.id));
        object.insert("name".to_string(), string_or_null(&self.name));
        object.insert(
            "enrollment_account".to_string(),
            string_or_null(&self.enrollment_account),
        );
        object.insert(
            "owners".to_string(),
            self.owners
                .as_deref()
                .map(|owners| flatten_string_list(Some(owners)))
                .unwrap_or(Dynamic::Null),
        );
        object.insert("offer_type".to_string(), string_or_null(&self.offer_type));
        object.insert(
            "additional_parameters".to_string(),
            self.additional_parameters
                .as_ref()
                .map(|params| flatten_string_map(Some(params)))
                .unwrap_or(Dynamic::Null),
        );
        object.insert(
            "subscription_id".to_string(),
            string_or_null(&self.subscription_id),
        );
        object.insert("tenant_id".to_string(), string_or_null(&self.tenant_id));
        DynamicValue::new(Dynamic::Map(object))
    }

    fn creation_parameters(&self) -> CreationParameters {
        CreationParameters {
            display_name: self.name.clone(),
            owners: self
                .owners
                .iter()
                .flatten()
                .map(|object_id| AdPrincipal {
                    object_id: object_id.clone(),
                })
                .collect(),
            offer_type: self.offer_type.clone().unwrap_or_default(),
            additional_parameters: self.additional_parameters.clone().unwrap_or_default(),
        }
    }

    /// Copy the attributes the service reports back
    fn apply(&mut self, subscription: Subscription) {
        if subscription.display_name.is_some() {
            self.name = subscription.display_name;
        }
        self.subscription_id = subscription.subscription_id;
        self.tenant_id = subscription.tenant_id;
    }
}

#[derive(Default)]
pub struct SubscriptionResource {
    provider_data: Option<crate::AzureProviderData>,
}

impl SubscriptionResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch(
        &self,
        data: &crate::AzureProviderData,
        id: &str,
    ) -> Result<Subscription, ProviderError> {
        let subscription_id = parse_subscription_id(id)?;
        data.client
            .subscriptions()
            .get(&subscription_id)
            .await
            .map_err(|e| ProviderError::from_api(format!("reading subscription (ID {:?})", id), e))
    }
}

pub fn subscription_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Creates an Azure subscription under an EA enrollment account")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("Subscription link, /subscriptions/<guid>")
                .computed()
                .plan_modifier(Box::new(UseStateForUnknown))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("Display name")
                .optional()
                .computed()
                .validator(Box::new(StringLengthBetween { min: 1, max: 60 }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("enrollment_account", AttributeType::String)
                .description("Enrollment account name the subscription is billed to")
                .required()
                .validator(Box::new(StringNotEmpty))
                .plan_modifier(Box::new(RequiresReplace))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("owners", AttributeType::list_of_strings())
                .description("Azure AD object IDs granted ownership")
                .optional()
                .plan_modifier(Box::new(RequiresReplace))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("offer_type", AttributeType::String)
                .required()
                .validator(Box::new(StringOneOf::new(OFFER_TYPES)))
                .plan_modifier(Box::new(RequiresReplace))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("additional_parameters", AttributeType::map_of_strings())
                .optional()
                .plan_modifier(Box::new(RequiresReplace))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("subscription_id", AttributeType::String)
                .computed()
                .plan_modifier(Box::new(UseStateForUnknown))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("tenant_id", AttributeType::String)
                .computed()
                .plan_modifier(Box::new(UseStateForUnknown))
                .build(),
        )
        .build()
}

fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

#[async_trait]
impl Resource for SubscriptionResource {
    fn type_name(&self) -> &str {
        "azurepreview_subscription"
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
            schema: subscription_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: subscription_schema().validate(&request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![not_configured()],
            };
        };

        let mut model = SubscriptionModel::from_dynamic(&request.config);
        let Some(enrollment_account) = model.enrollment_account.clone() else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![ProviderError::validation_at(
                    attr("enrollment_account"),
                    "enrollment_account is required",
                )
                .to_diagnostic()],
            };
        };
        let display_name = model.name.clone().unwrap_or_default();

        tracing::info!(
            "Creating subscription {:?} in enrollment account {:?}",
            display_name,
            enrollment_account
        );
        let created = provider_data
            .client
            .subscriptions()
            .create_in_enrollment_account(&ctx, &enrollment_account, &model.creation_parameters())
            .await
            .map_err(|e| {
                ProviderError::from_api(
                    format!(
                        "creating subscription {:?} in enrollment account {:?}",
                        display_name, enrollment_account
                    ),
                    e,
                )
            });

        let link = match created.map(|result| result.subscription_link) {
            Ok(Some(link)) => link,
            Ok(None) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics: vec![Diagnostic::error(
                        "Azure API request failed",
                        format!(
                            "subscription creation in enrollment account {:?} returned no subscription link",
                            enrollment_account
                        ),
                    )],
                }
            }
            Err(e) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics: vec![e.to_diagnostic()],
                }
            }
        };

        tracing::debug!("Subscription created at {}", link);
        model.id = Some(link.clone());

        match self.fetch(provider_data, &link).await {
            Ok(subscription) => {
                model.apply(subscription);
                CreateResourceResponse {
                    new_state: model.to_dynamic(),
                    diagnostics: vec![],
                }
            }
            Err(e) => CreateResourceResponse {
                new_state: model.to_dynamic(),
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

        let mut model = SubscriptionModel::from_dynamic(&request.current_state);
        let Some(id) = model.id.clone() else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
            };
        };

        match self.fetch(provider_data, &id).await {
            Ok(subscription) => {
                model.apply(subscription);
                ReadResourceResponse {
                    new_state: Some(model.to_dynamic()),
                    diagnostics: vec![],
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Subscription {} no longer exists, removing from state", id);
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

        let prior = SubscriptionModel::from_dynamic(&request.prior_state);
        let mut model = SubscriptionModel::from_dynamic(&request.planned_state);
        let Some(id) = prior.id.clone() else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![ProviderError::Format(
                    "subscription state has no ID".to_string(),
                )
                .to_diagnostic()],
            };
        };
        model.id = Some(id.clone());

        let subscription_id = match parse_subscription_id(&id) {
            Ok(subscription_id) => subscription_id,
            Err(e) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics: vec![e.to_diagnostic()],
                }
            }
        };

        let wanted = get_optional_string(&request.config, &attr("name"));
        if let Some(name) = wanted.filter(|name| Some(name) != prior.name.as_ref()) {
            tracing::info!("Renaming subscription {} to {:?}", subscription_id, name);
            if let Err(e) = provider_data
                .client
                .subscriptions()
                .rename(&subscription_id, &name)
                .await
            {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics: vec![ProviderError::from_api(
                        format!("renaming subscription (ID {:?})", id),
                        e,
                    )
                    .to_diagnostic()],
                };
            }
            model.name = Some(name);
        }

        match self.fetch(provider_data, &id).await {
            Ok(subscription) => {
                model.apply(subscription);
                UpdateResourceResponse {
                    new_state: model.to_dynamic(),
                    diagnostics: vec![],
                }
            }
            Err(e) => UpdateResourceResponse {
                new_state: model.to_dynamic(),
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

        let Some(id) = get_optional_string(&request.prior_state, &attr("id")) else {
            return DeleteResourceResponse {
                diagnostics: vec![],
            };
        };

        let subscription_id = match parse_subscription_id(&id) {
            Ok(subscription_id) => subscription_id,
            Err(e) => {
                return DeleteResourceResponse {
                    diagnostics: vec![e.to_diagnostic()],
                }
            }
        };

        // Cancellation is final on the service side; there is nothing to wait for
        tracing::info!("Cancelling subscription {}", subscription_id);
        match provider_data
            .client
            .subscriptions()
            .cancel(&subscription_id)
            .await
        {
            Ok(_) => DeleteResourceResponse {
                diagnostics: vec![],
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!("Subscription {} was already gone", subscription_id);
                DeleteResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(e) => DeleteResourceResponse {
                diagnostics: vec![ProviderError::from_api(
                    format!("cancelling subscription (ID {:?})", id),
                    e,
                )
                .to_diagnostic()],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for SubscriptionResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        match request.provider_data {
            Some(data) => match data.downcast_ref::<crate::AzureProviderData>() {
                Some(provider_data) => self.provider_data = Some(provider_data.clone()),
                None => diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract AzureProviderData from provider data",
                )),
            },
            None => diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            )),
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithModifyPlan for SubscriptionResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut planned_state = request.proposed_new_state;
        let mut diagnostics = vec![];

        if planned_state.is_null() {
            return ModifyPlanResponse {
                planned_state,
                requires_replace: vec![],
                diagnostics,
            };
        }

        let requires_replace =
            subscription_schema().requires_replace(&request.prior_state, &planned_state);

        let mut computed = vec![];
        if request.prior_state.is_null() || !requires_replace.is_empty() {
            computed.extend(["id", "subscription_id", "tenant_id"]);
            if get_optional_string(&request.config, &attr("name")).is_none() {
                computed.push("name");
            }
        }

        for name in computed {
            if let Err(e) = planned_state.mark_unknown(&attr(name)) {
                diagnostics.push(Diagnostic::error(
                    "Failed to plan subscription",
                    format!("Could not mark {} as unknown: {}", name, e),
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
impl ResourceWithImportState for SubscriptionResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        match parse_subscription_id(&request.id) {
            Ok(subscription_id) => {
                let state = SubscriptionModel {
                    id: Some(request.id.clone()),
                    subscription_id: Some(subscription_id),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_provider_data;
    use mockito::{Matcher, Server};
    use std::sync::Arc;
    use tfplug::types::ClientCapabilities;

    const GUID: &str = "11111111-2222-3333-4444-555555555555";

    fn link() -> String {
        format!("/subscriptions/{}", GUID)
    }

    fn subscription_body(name: &str) -> String {
        format!(
            r#"{{"id":"/subscriptions/{guid}","subscriptionId":"{guid}","displayName":"{name}","tenantId":"tenant-1","state":"Enabled"}}"#,
            guid = GUID,
            name = name
        )
    }

    fn config(name: Option<&str>) -> DynamicValue {
        SubscriptionModel {
            name: name.map(str::to_string),
            enrollment_account: Some("ea-1".to_string()),
            owners: Some(vec!["owner-1".to_string()]),
            offer_type: Some("MS-AZR-0017P".to_string()),
            ..Default::default()
        }
        .to_dynamic()
    }

    fn state(name: &str) -> DynamicValue {
        SubscriptionModel {
            id: Some(link()),
            name: Some(name.to_string()),
            enrollment_account: Some("ea-1".to_string()),
            owners: Some(vec!["owner-1".to_string()]),
            offer_type: Some("MS-AZR-0017P".to_string()),
            subscription_id: Some(GUID.to_string()),
            tenant_id: Some("tenant-1".to_string()),
            ..Default::default()
        }
        .to_dynamic()
    }

    async fn configured(url: &str) -> SubscriptionResource {
        let mut resource = SubscriptionResource::new();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(create_test_provider_data(url))),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        resource
    }

    #[tokio::test]
    async fn create_polls_operation_and_reads_back() {
        let mut server = Server::new_async().await;
        let operation_url = format!("{}/operations/op-1", server.url());

        let start = server
            .mock(
                "POST",
                "/providers/Microsoft.Billing/enrollmentAccounts/ea-1/providers/Microsoft.Subscription/createSubscription",
            )
            .match_query(Matcher::UrlEncoded(
                "api-version".into(),
                "2019-10-01-preview".into(),
            ))
            .match_body(Matcher::PartialJsonString(
                r#"{"displayName":"dev","owners":[{"objectId":"owner-1"}],"offerType":"MS-AZR-0017P"}"#
                    .to_string(),
            ))
            .with_status(202)
            .with_header("Location", &operation_url)
            .with_header("Retry-After", "0")
            .expect(1)
            .create_async()
            .await;
        let poll = server
            .mock("GET", "/operations/op-1")
            .with_body(format!(r#"{{"subscriptionLink":"{}"}}"#, link()))
            .expect(1)
            .create_async()
            .await;
        let get = server
            .mock("GET", link().as_str())
            .match_query(Matcher::UrlEncoded("api-version".into(), "2019-11-01".into()))
            .with_body(subscription_body("dev"))
            .expect(1)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "azurepreview_subscription".to_string(),
                    planned_state: config(Some("dev")),
                    config: config(Some("dev")),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let created = SubscriptionModel::from_dynamic(&response.new_state);
        assert_eq!(created.id, Some(link()));
        assert_eq!(created.subscription_id.as_deref(), Some(GUID));
        assert_eq!(created.tenant_id.as_deref(), Some("tenant-1"));
        assert_eq!(created.owners, Some(vec!["owner-1".to_string()]));
        start.assert_async().await;
        poll.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn update_renames_only_when_name_changes() {
        let mut server = Server::new_async().await;
        let rename_path = format!(
            "/subscriptions/{}/providers/Microsoft.Subscription/rename",
            GUID
        );
        let rename = server
            .mock("POST", rename_path.as_str())
            .match_query(Matcher::Any)
            .match_body(Matcher::JsonString(
                r#"{"SubscriptionName":"renamed"}"#.to_string(),
            ))
            .with_body(format!(r#"{{"subscriptionId":"{}"}}"#, GUID))
            .expect(1)
            .create_async()
            .await;
        let _get = server
            .mock("GET", link().as_str())
            .match_query(Matcher::Any)
            .with_body(subscription_body("renamed"))
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let mut planned = state("dev");
        planned
            .set_string(&attr("name"), "renamed".to_string())
            .unwrap();

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "azurepreview_subscription".to_string(),
                    prior_state: state("dev"),
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response.new_state.get_string(&attr("name")).unwrap(),
            "renamed"
        );
        rename.assert_async().await;

        // Same name: no rename call
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "azurepreview_subscription".to_string(),
                    prior_state: state("renamed"),
                    planned_state: state("renamed"),
                    config: config(Some("renamed")),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        rename.assert_async().await;
    }

    #[tokio::test]
    async fn delete_cancels_subscription() {
        let mut server = Server::new_async().await;
        let cancel = server
            .mock(
                "POST",
                format!("/subscriptions/{}/providers/Microsoft.Subscription/cancel", GUID)
                    .as_str(),
            )
            .match_query(Matcher::UrlEncoded(
                "api-version".into(),
                "2019-10-01-preview".into(),
            ))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "azurepreview_subscription".to_string(),
                    prior_state: state("dev"),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        cancel.assert_async().await;
    }

    #[tokio::test]
    async fn read_of_missing_subscription_clears_state() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", link().as_str())
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":"SubscriptionNotFound","message":"gone"}}"#)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "azurepreview_subscription".to_string(),
                    current_state: state("dev"),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.new_state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn malformed_id_is_reported() {
        let server = Server::new_async().await;
        let resource = configured(&server.url()).await;
        let mut current = state("dev");
        current
            .set_string(&attr("id"), "subscriptions/x/extra".to_string())
            .unwrap();

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "azurepreview_subscription".to_string(),
                    current_state: current,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.new_state.is_some());
        assert_eq!(response.diagnostics[0].summary, "Invalid identifier");
    }

    #[tokio::test]
    async fn validate_checks_name_length_and_offer_type() {
        let resource = SubscriptionResource::new();
        let mut cfg = config(Some(&"x".repeat(61)));
        cfg.set_string(&attr("offer_type"), "MS-AZR-9999P".to_string())
            .unwrap();

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "azurepreview_subscription".to_string(),
                    config: cfg,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        let paths: Vec<String> = response
            .diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_ref().map(ToString::to_string))
            .collect();
        assert_eq!(paths, vec!["name", "offer_type"]);
    }

    #[tokio::test]
    async fn new_subscription_plans_computed_values_unknown() {
        let resource = SubscriptionResource::new();
        let response = resource
            .modify_plan(
                Context::new(),
                ModifyPlanRequest {
                    type_name: "azurepreview_subscription".to_string(),
                    config: config(None),
                    prior_state: DynamicValue::null(),
                    proposed_new_state: config(None),
                },
            )
            .await;

        for name in ["id", "name", "subscription_id", "tenant_id"] {
            assert!(
                matches!(response.planned_state.get(&attr(name)), Ok(Dynamic::Unknown)),
                "{} should be unknown",
                name
            );
        }

        let mut proposed = state("dev");
        proposed
            .set_string(&attr("offer_type"), "MS-AZR-0148P".to_string())
            .unwrap();
        let response = resource
            .modify_plan(
                Context::new(),
                ModifyPlanRequest {
                    type_name: "azurepreview_subscription".to_string(),
                    config: proposed.clone(),
                    prior_state: state("dev"),
                    proposed_new_state: proposed,
                },
            )
            .await;
        assert_eq!(response.requires_replace, vec![attr("offer_type")]);
    }
}
