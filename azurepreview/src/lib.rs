pub mod api;
pub mod config;
pub mod convert;
pub mod data_sources;
pub mod error;
pub mod ids;
pub mod provider_data;
pub mod resources;

pub use provider_data::AzureProviderData;

use async_trait::async_trait;
use config::{
    ProviderConfig, CLIENT_ID_ENV, CLIENT_SECRET_ENV, ENVIRONMENT_ENV, SUBSCRIPTION_ID_ENV,
    TENANT_ID_ENV,
};
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::defaults::EnvDefault;
use tfplug::provider::*;
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{has_errors, Diagnostic, ServerCapabilities};
use tfplug::validator::StringNotEmpty;

/// Sent on every ARM request, prefixed with the Terraform version once known
pub const USER_AGENT: &str = concat!(
    "terraform-provider-azurepreview/",
    env!("CARGO_PKG_VERSION")
);

#[derive(Default)]
pub struct AzurePreviewProvider {
    provider_data: Option<Arc<AzureProviderData>>,
}

impl AzurePreviewProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider_data(&self) -> Option<&AzureProviderData> {
        self.provider_data.as_deref()
    }
}

pub fn provider_schema() -> Schema {
    let setting = |name: &str, env_vars: &[&str], description: &str| {
        AttributeBuilder::new(name, AttributeType::String)
            .description(description)
            .optional()
            .validator(Box::new(StringNotEmpty))
            .default(EnvDefault::first_of(env_vars, None))
    };

    SchemaBuilder::new()
        .version(0)
        .description("Azure preview services: budgets, subscriptions and resource lookup")
        .attribute(
            setting(
                "subscription_id",
                &SUBSCRIPTION_ID_ENV,
                "Default subscription. Can also be set with AZURE_SUBSCRIPTION_ID or ARM_SUBSCRIPTION_ID",
            )
            .build(),
        )
        .attribute(
            setting(
                "client_id",
                &CLIENT_ID_ENV,
                "Service principal application ID. Can also be set with AZURE_CLIENT_ID or ARM_CLIENT_ID",
            )
            .build(),
        )
        .attribute(
            setting(
                "client_secret",
                &CLIENT_SECRET_ENV,
                "Service principal secret. Can also be set with AZURE_CLIENT_SECRET or ARM_CLIENT_SECRET",
            )
            .sensitive()
            .build(),
        )
        .attribute(
            setting(
                "tenant_id",
                &TENANT_ID_ENV,
                "Azure AD tenant; requires client_id and client_secret. Can also be set with AZURE_TENANT_ID or ARM_TENANT_ID",
            )
            .build(),
        )
        .attribute(
            setting(
                "environment",
                &ENVIRONMENT_ENV,
                "Cloud environment: public, usgovernment, china or german. Defaults to public",
            )
            .build(),
        )
        .build()
}

#[async_trait]
impl Provider for AzurePreviewProvider {
    fn type_name(&self) -> &str {
        "azurepreview"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities {
                plan_destroy: true,
                get_provider_schema_optional: false,
                move_resource_state: false,
            },
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: provider_schema(),
            diagnostics: vec![],
        }
    }

    async fn meta_schema(
        &self,
        _ctx: Context,
        _request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse {
        ProviderMetaSchemaResponse {
            schema: None,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        tfplug::logging::init_from_env();

        let config = match ProviderConfig::from_config(&request.config) {
            Ok(config) => config,
            Err(e) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![e.to_diagnostic()],
                    provider_data: None,
                }
            }
        };

        let credential = match config.credential() {
            Ok(credential) => credential,
            Err(e) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Failed to set up Azure credentials",
                        e.to_string(),
                    )],
                    provider_data: None,
                }
            }
        };

        let user_agent = if request.terraform_version.is_empty() {
            USER_AGENT.to_string()
        } else {
            format!("Terraform/{} {}", request.terraform_version, USER_AGENT)
        };
        let options = api::ClientOptions {
            user_agent: Some(user_agent),
            ..Default::default()
        };

        let endpoint = config.environment.resource_manager_endpoint();
        match api::Client::with_options(endpoint, credential, options) {
            Ok(client) => {
                tracing::info!(
                    "Configured azurepreview provider for the {} cloud",
                    config.environment
                );
                let data = Arc::new(AzureProviderData::new(client, config.subscription_id));
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(data),
                }
            }
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    "Failed to create API client",
                    e.to_string(),
                )],
                provider_data: None,
            },
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = provider_schema().validate(&request.config);
        if !has_errors(&diagnostics) {
            if let Err(e) = ProviderConfig::from_config(&request.config) {
                diagnostics.push(e.to_diagnostic());
            }
        }
        ValidateProviderConfigResponse { diagnostics }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "azurepreview_budget".to_string(),
            Box::new(|| Box::new(resources::BudgetResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        factories.insert(
            "azurepreview_subscription".to_string(),
            Box::new(|| {
                Box::new(resources::SubscriptionResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "azurepreview_resources".to_string(),
            Box::new(|| {
                Box::new(data_sources::ResourcesDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories
    }
}
