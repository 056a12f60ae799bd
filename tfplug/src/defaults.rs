//! Default value providers for attributes
//!
//! Defaults are evaluated when an attribute is absent or null in configuration.
//! [`crate::schema::Schema::apply_defaults`] fills them into a config value.
//!
//! ```no_run
//! use tfplug::schema::{AttributeBuilder, AttributeType};
//! use tfplug::defaults::EnvDefault;
//!
//! let environment = AttributeBuilder::new("environment", AttributeType::String)
//!     .optional()
//!     .default(EnvDefault::first_of(&["AZURE_ENVIRONMENT", "ARM_ENVIRONMENT"], Some("public")))
//!     .build();
//! ```

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::{Dynamic, DynamicValue};
use std::env;

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Box<dyn Default> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn bool(value: bool) -> Box<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.value.clone()),
        }
    }
}

/// EnvDefault reads the first non-empty variable from an ordered list
pub struct EnvDefault {
    env_vars: Vec<String>,
    fallback: Option<String>,
}

impl EnvDefault {
    pub fn create(env_var: &str, fallback: &str) -> Box<dyn Default> {
        Box::new(Self::resolver(&[env_var], Some(fallback)))
    }

    /// Earlier variables win over later ones
    pub fn first_of(env_vars: &[&str], fallback: Option<&str>) -> Box<dyn Default> {
        Box::new(Self::resolver(env_vars, fallback))
    }

    /// Unboxed form for callers that resolve values directly
    pub fn resolver(env_vars: &[&str], fallback: Option<&str>) -> Self {
        Self {
            env_vars: env_vars.iter().map(|v| v.to_string()).collect(),
            fallback: fallback.map(str::to_string),
        }
    }

    /// Current value, or None when no variable is set and there is no fallback
    pub fn lookup(&self) -> Option<String> {
        self.env_vars
            .iter()
            .filter_map(|name| env::var(name).ok())
            .find(|value| !value.is_empty())
            .or_else(|| self.fallback.clone())
    }
}

impl Default for EnvDefault {
    fn description(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!(
                "default from environment variables {} (fallback: {})",
                self.env_vars.join(", "),
                fallback
            ),
            None => format!(
                "default from environment variables {}",
                self.env_vars.join(", ")
            ),
        }
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.lookup().into()),
        }
    }
}
