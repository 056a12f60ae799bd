//! azurepreview_resources data source implementation

use crate::api::resources::GenericResource;
use crate::convert::{get_optional_string, get_string_map};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringNotEmpty;

/// Lookup criteria decoded from the data source configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceQuery {
    pub subscription_id: Option<String>,
    pub name: Option<String>,
    pub resource_type: Option<String>,
    pub resource_group_name: Option<String>,
    pub tags: HashMap<String, String>,
}

impl ResourceQuery {
    pub fn from_dynamic(config: &DynamicValue) -> Self {
        Self {
            subscription_id: get_optional_string(config, &AttributePath::new("subscription_id")),
            name: get_optional_string(config, &AttributePath::new("name")),
            resource_type: get_optional_string(config, &AttributePath::new("type")),
            resource_group_name: get_optional_string(
                config,
                &AttributePath::new("resource_group_name"),
            ),
            tags: get_string_map(config, &AttributePath::new("tags")),
        }
    }

    /// OData `$filter` for the server-side criteria; empty when there are none
    pub fn odata_filter(&self) -> String {
        [
            ("resourceType", &self.resource_type),
            ("name", &self.name),
            ("resourceGroup", &self.resource_group_name),
        ]
        .iter()
        .filter_map(|(field, value)| {
            value
                .as_deref()
                .map(|v| format!("{} eq '{}'", field, v.replace('\'', "''")))
        })
        .collect::<Vec<_>>()
        .join(" and ")
    }

    /// Every requested tag must be present with exactly the requested value
    pub fn matches_tags(&self, resource: &GenericResource) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        let Some(tags) = &resource.tags else {
            return false;
        };
        self.tags
            .iter()
            .all(|(name, value)| tags.get(name) == Some(value))
    }
}

fn flatten_resource(resource: GenericResource) -> Dynamic {
    let mut object = HashMap::new();
    object.insert("id".to_string(), Dynamic::from(resource.id));
    object.insert("name".to_string(), Dynamic::from(resource.name));
    object.insert("type".to_string(), Dynamic::from(resource.resource_type));
    object.insert("location".to_string(), Dynamic::from(resource.location));
    Dynamic::Map(object)
}

pub fn resources_schema() -> Schema {
    let entry: HashMap<String, AttributeType> = [
        ("id", AttributeType::String),
        ("name", AttributeType::String),
        ("type", AttributeType::String),
        ("location", AttributeType::String),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let filter = |name: &str, description: &str| {
        AttributeBuilder::new(name, AttributeType::String)
            .description(description)
            .optional()
            .validator(Box::new(StringNotEmpty))
            .build()
    };

    SchemaBuilder::new()
        .version(0)
        .description("Lists resources in a subscription, optionally filtered")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("Random identifier, new on every read")
                .computed()
                .build(),
        )
        .attribute(filter(
            "subscription_id",
            "Subscription to search; defaults to the provider subscription",
        ))
        .attribute(filter("name", "Exact resource name"))
        .attribute(filter("resource_group_name", "Resource group to search"))
        .attribute(filter("type", "Resource type, e.g. Microsoft.Storage/storageAccounts"))
        .attribute(
            AttributeBuilder::new("tags", AttributeType::map_of_strings())
                .description("Tags a resource must carry, all of them")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "resources",
                AttributeType::List(Box::new(AttributeType::Object(entry))),
            )
            .description("Matching resources")
            .computed()
            .build(),
        )
        .build()
}

#[derive(Default)]
pub struct ResourcesDataSource {
    provider_data: Option<crate::AzureProviderData>,
}

impl ResourcesDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for ResourcesDataSource {
    fn type_name(&self) -> &str {
        "azurepreview_resources"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: resources_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: resources_schema().validate(&request.config),
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                )],
            };
        };

        let query = ResourceQuery::from_dynamic(&request.config);
        let Some(subscription_id) = query
            .subscription_id
            .clone()
            .or_else(|| provider_data.subscription_id.clone())
        else {
            return ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![ProviderError::validation_at(
                    AttributePath::new("subscription_id"),
                    "no subscription_id was given and the provider has no default subscription",
                )
                .to_diagnostic()],
            };
        };

        let filter = query.odata_filter();
        tracing::debug!(
            "Listing resources in subscription {} with filter {:?}",
            subscription_id,
            filter
        );

        let listed = match provider_data
            .client
            .resources()
            .list(&ctx, &subscription_id, &filter)
            .await
        {
            Ok(listed) => listed,
            Err(e) => {
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics: vec![ProviderError::from_api("reading resources", e).to_diagnostic()],
                }
            }
        };

        let total = listed.len();
        let resources: Vec<Dynamic> = listed
            .into_iter()
            .filter(|resource| query.matches_tags(resource))
            .map(flatten_resource)
            .collect();
        tracing::info!("Found {} of {} listed resources", resources.len(), total);

        let mut state = request.config;
        let mut diagnostics = vec![];
        let id = uuid::Uuid::new_v4().to_string();
        for result in [
            state.set_string(&AttributePath::new("id"), id),
            state.set_list(&AttributePath::new("resources"), resources),
        ] {
            if let Err(e) = result {
                diagnostics.push(Diagnostic::error(
                    "Failed to set state",
                    format!("Could not record resources: {}", e),
                ));
            }
        }

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ResourcesDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
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
                "No provider data was provided to the data source",
            )),
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_provider_data;
    use mockito::{Matcher, Server};
    use std::sync::Arc;
    use tfplug::types::ClientCapabilities;

    fn resource(name: &str, tags: Option<&[(&str, &str)]>) -> GenericResource {
        GenericResource {
            id: Some(format!("/subscriptions/sub-1/resourceGroups/rg/providers/x/{}", name)),
            name: Some(name.to_string()),
            resource_type: Some("Microsoft.Storage/storageAccounts".to_string()),
            location: Some("westeurope".to_string()),
            tags: tags.map(|pairs| {
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            }),
        }
    }

    #[test]
    fn filter_joins_criteria_in_fixed_order() {
        let query = ResourceQuery {
            name: Some("acct".to_string()),
            resource_type: Some("Microsoft.Storage/storageAccounts".to_string()),
            resource_group_name: Some("rg1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query.odata_filter(),
            "resourceType eq 'Microsoft.Storage/storageAccounts' and name eq 'acct' and resourceGroup eq 'rg1'"
        );
        assert_eq!(ResourceQuery::default().odata_filter(), "");

        let quoted = ResourceQuery {
            name: Some("o'neil".to_string()),
            ..Default::default()
        };
        assert_eq!(quoted.odata_filter(), "name eq 'o''neil'");
    }

    #[test]
    fn tag_filter_requires_every_pair() {
        let query = ResourceQuery {
            tags: HashMap::from([
                ("env".to_string(), "prod".to_string()),
                ("team".to_string(), "core".to_string()),
            ]),
            ..Default::default()
        };

        assert!(query.matches_tags(&resource("a", Some(&[("env", "prod"), ("team", "core"), ("x", "y")]))));
        assert!(!query.matches_tags(&resource("b", Some(&[("env", "prod")]))));
        assert!(!query.matches_tags(&resource("c", Some(&[("env", "prod"), ("team", "edge")]))));
        assert!(!query.matches_tags(&resource("d", None)));

        assert!(ResourceQuery::default().matches_tags(&resource("d", None)));
    }

    #[tokio::test]
    async fn read_follows_pages_and_filters_tags() {
        let mut server = Server::new_async().await;
        let next_link = format!(
            "{}/subscriptions/sub-2/resources?api-version=2020-06-01&%24skiptoken=page2",
            server.url()
        );
        let first = server
            .mock("GET", "/subscriptions/sub-2/resources")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("api-version".into(), "2020-06-01".into()),
                Matcher::UrlEncoded("$filter".into(), "resourceGroup eq 'rg'".into()),
            ]))
            .with_body(format!(
                r#"{{"value":[{{"id":"/r/1","name":"one","type":"t","location":"westeurope","tags":{{"env":"prod"}}}}],"nextLink":"{}"}}"#,
                next_link
            ))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/subscriptions/sub-2/resources")
            .match_query(Matcher::UrlEncoded("$skiptoken".into(), "page2".into()))
            .with_body(
                r#"{"value":[
                    {"id":"/r/2","name":"two","type":"t","location":"westeurope","tags":{"env":"dev"}},
                    {"id":"/r/3","name":"three","type":"t","location":"westeurope"}
                ]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let mut data_source = ResourcesDataSource::new();
        data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(Arc::new(create_test_provider_data(&server.url()))),
                },
            )
            .await;

        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("subscription_id"), "sub-2".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("resource_group_name"), "rg".to_string())
            .unwrap();
        config
            .set(
                &AttributePath::new("tags"),
                Dynamic::Map(HashMap::from([("env".to_string(), Dynamic::from("prod"))])),
            )
            .unwrap();

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "azurepreview_resources".to_string(),
                    config,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let resources = response
            .state
            .get_list(&AttributePath::new("resources"))
            .unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(
            resources[0].as_map().unwrap()["name"],
            Dynamic::String("one".to_string())
        );
        assert!(!response
            .state
            .get_string(&AttributePath::new("id"))
            .unwrap()
            .is_empty());
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn read_without_any_subscription_fails() {
        let mut data_source = ResourcesDataSource::new();
        let mut provider_data = create_test_provider_data("http://127.0.0.1:1");
        provider_data.subscription_id = None;
        data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(Arc::new(provider_data)),
                },
            )
            .await;

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "azurepreview_resources".to_string(),
                    config: DynamicValue::object(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0]
                .attribute
                .as_ref()
                .map(ToString::to_string)
                .as_deref(),
            Some("subscription_id")
        );
    }
}
