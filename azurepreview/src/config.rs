//! Provider configuration: attribute values, environment fallbacks, credentials

use crate::api::{
    ApiError, AzureCliCredential, ClientSecretCredential, CloudEnvironment, TokenCredential,
};
use crate::convert::get_optional_string;
use crate::error::{ProviderError, Result};
use std::sync::Arc;
use tfplug::defaults::EnvDefault;
use tfplug::types::{AttributePath, DynamicValue};

pub const SUBSCRIPTION_ID_ENV: [&str; 2] = ["AZURE_SUBSCRIPTION_ID", "ARM_SUBSCRIPTION_ID"];
pub const CLIENT_ID_ENV: [&str; 2] = ["AZURE_CLIENT_ID", "ARM_CLIENT_ID"];
pub const CLIENT_SECRET_ENV: [&str; 2] = ["AZURE_CLIENT_SECRET", "ARM_CLIENT_SECRET"];
pub const TENANT_ID_ENV: [&str; 2] = ["AZURE_TENANT_ID", "ARM_TENANT_ID"];
pub const ENVIRONMENT_ENV: [&str; 2] = ["AZURE_ENVIRONMENT", "ARM_ENVIRONMENT"];

/// Resolved provider block
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub subscription_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
    pub environment: CloudEnvironment,
}

/// How the provider authenticates against Azure AD
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    ServicePrincipal {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    AzureCli,
}

impl ProviderConfig {
    /// Read the provider block, falling back to `AZURE_*` then `ARM_*` variables
    pub fn from_config(config: &DynamicValue) -> Result<Self> {
        let resolve = |name: &str, env_vars: &[&str]| -> Option<String> {
            get_optional_string(config, &AttributePath::new(name))
                .or_else(|| EnvDefault::resolver(env_vars, None).lookup())
        };

        let environment = match resolve("environment", &ENVIRONMENT_ENV) {
            Some(name) => name.parse::<CloudEnvironment>().map_err(|e| {
                ProviderError::validation_at(AttributePath::new("environment"), e)
            })?,
            None => CloudEnvironment::default(),
        };

        let config = Self {
            subscription_id: resolve("subscription_id", &SUBSCRIPTION_ID_ENV),
            client_id: resolve("client_id", &CLIENT_ID_ENV),
            client_secret: resolve("client_secret", &CLIENT_SECRET_ENV),
            tenant_id: resolve("tenant_id", &TENANT_ID_ENV),
            environment,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("subscription_id", &self.subscription_id),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("tenant_id", &self.tenant_id),
        ];
        for (name, value) in fields {
            if matches!(value.as_deref(), Some(v) if v.trim().is_empty()) {
                return Err(ProviderError::validation_at(
                    AttributePath::new(name),
                    format!("{} must not be empty", name),
                ));
            }
        }

        if self.tenant_id.is_some() && (self.client_id.is_none() || self.client_secret.is_none())
        {
            return Err(ProviderError::validation_at(
                AttributePath::new("tenant_id"),
                "\"tenant_id\": all of `client_id,client_secret,tenant_id` must be specified",
            ));
        }

        Ok(())
    }

    /// Service principal when all three settings are present, otherwise the CLI session
    pub fn auth_method(&self) -> AuthMethod {
        match (&self.tenant_id, &self.client_id, &self.client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                AuthMethod::ServicePrincipal {
                    tenant_id: tenant_id.clone(),
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                }
            }
            _ => AuthMethod::AzureCli,
        }
    }

    /// Token source scoped to the environment's Resource Manager endpoint
    pub fn credential(&self) -> std::result::Result<Arc<dyn TokenCredential>, ApiError> {
        let resource = self.environment.resource_manager_endpoint();
        match self.auth_method() {
            AuthMethod::ServicePrincipal {
                tenant_id,
                client_id,
                client_secret,
            } => {
                tracing::debug!("Authenticating with service principal {}", client_id);
                Ok(Arc::new(ClientSecretCredential::new(
                    self.environment.active_directory_endpoint(),
                    &tenant_id,
                    &client_id,
                    &client_secret,
                    resource,
                )?))
            }
            AuthMethod::AzureCli => {
                tracing::debug!("Authenticating with the Azure CLI session");
                Ok(Arc::new(AzureCliCredential::new(resource)))
            }
        }
    }
}
