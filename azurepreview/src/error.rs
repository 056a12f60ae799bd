//! Provider-level errors and their conversion to diagnostics

use crate::api::ApiError;
use tfplug::types::{AttributePath, Diagnostic};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// A composite identifier did not have the expected shape
    #[error("{0}")]
    Format(String),

    #[error("{message}")]
    Validation {
        message: String,
        attribute: Option<AttributePath>,
    },

    #[error("{0} was not found")]
    NotFound(String),

    #[error("{operation}: {source}")]
    Api {
        operation: String,
        #[source]
        source: ApiError,
    },
}

impl ProviderError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            attribute: None,
        }
    }

    pub fn validation_at(path: AttributePath, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            attribute: Some(path),
        }
    }

    /// Wrap a client failure, folding 404 into `NotFound`
    pub fn from_api(operation: impl Into<String>, source: ApiError) -> Self {
        let operation = operation.into();
        if source.is_not_found() {
            Self::NotFound(operation)
        } else {
            Self::Api { operation, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Self::Format(_) => "Invalid identifier",
            Self::Validation { .. } => "Invalid configuration",
            Self::NotFound(_) => "Resource not found",
            Self::Api { .. } => "Azure API request failed",
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.summary(), self.to_string());
        match self {
            Self::Validation {
                attribute: Some(path),
                ..
            } => diagnostic.with_attribute(path.clone()),
            _ => diagnostic,
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        err.to_diagnostic()
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
