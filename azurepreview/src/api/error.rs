use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}) {code}: {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Operation cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build a status error from an ARM error body
    ///
    /// ARM wraps errors as `{"error": {"code": "...", "message": "..."}}`; any
    /// other body is kept verbatim as the message.
    pub fn from_response_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ArmErrorResponse>(body) {
            Ok(ArmErrorResponse { error: Some(detail) }) => ApiError::Status {
                status,
                code: detail.code.unwrap_or_default(),
                message: detail.message.unwrap_or_default(),
            },
            _ => ApiError::Status {
                status,
                code: String::new(),
                message: body.to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArmErrorResponse {
    error: Option<ArmErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ArmErrorDetail {
    code: Option<String>,
    message: Option<String>,
}
