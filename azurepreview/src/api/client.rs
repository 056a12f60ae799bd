use reqwest::header::{HeaderMap, AUTHORIZATION, LOCATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tfplug::Context;

use super::auth::TokenCredential;
use super::error::ApiError;

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Azure Resource Manager API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    credential: Arc<dyn TokenCredential>,
    user_agent: String,
    options: ClientOptions,
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

/// Polling settings for long-running operations
#[derive(Clone, Debug)]
pub struct PollConfig {
    /// Used when the service sends no Retry-After header
    pub default_interval: Duration,
    pub max_duration: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            default_interval: Duration::from_secs(15),
            max_duration: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    pub retry: RetryConfig,
    pub poll: PollConfig,
    pub user_agent: Option<String>,
}

/// Status document returned by Azure-AsyncOperation endpoints
#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: Option<String>,
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    code: Option<String>,
    message: Option<String>,
}

/// One page of an ARM list operation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    pub next_link: Option<String>,
}

impl Client {
    /// Create a client against a Resource Manager endpoint
    pub fn new(base_url: &str, credential: Arc<dyn TokenCredential>) -> Result<Self, ApiError> {
        Self::with_options(base_url, credential, ClientOptions::default())
    }

    pub fn with_options(
        base_url: &str,
        credential: Arc<dyn TokenCredential>,
        options: ClientOptions,
    ) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.retry.timeout_seconds))
            .build()?;

        let user_agent = options
            .user_agent
            .clone()
            .unwrap_or_else(|| crate::USER_AGENT.to_string());

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: base_url.trim_end_matches('/').to_string(),
                credential,
                user_agent,
                options,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Absolute URL for an ARM path plus query parameters
    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ApiError> {
        let mut url = url::Url::parse(&format!("{}{}", self.inner.base_url, path))
            .map_err(|e| ApiError::Parse(format!("Invalid request URL for {}: {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.into())
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.execute_with_retry(Method::GET, url, None).await?;
        self.parse_success_response(response).await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = to_json(body)?;
        let response = self.execute_with_retry(Method::PUT, url, Some(&body)).await?;
        self.parse_success_response(response).await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let body = body.map(to_json).transpose()?;
        let response = self
            .execute_with_retry(Method::POST, url, body.as_ref())
            .await?;
        self.parse_success_response(response).await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete(&self, url: &str) -> Result<(), ApiError> {
        self.execute_with_retry(Method::DELETE, url, None)
            .await
            .map(|_| ())
    }

    /// Follow `nextLink` until every page of a list operation is collected
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        url: &str,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());

        while let Some(page_url) = next {
            if ctx.is_cancelled() {
                return Err(ApiError::Cancelled);
            }
            let page: Page<T> = self.get(&page_url).await?;
            tracing::debug!("Fetched page with {} items", page.value.len());
            items.extend(page.value);
            next = page.next_link.filter(|link| !link.is_empty());
        }

        Ok(items)
    }

    /// POST that may start a long-running operation; blocks until it completes
    ///
    /// A 200/201 with a body finishes immediately. A 202 is polled through
    /// `Azure-AsyncOperation` or `Location`, honoring `Retry-After`, until the
    /// operation finishes, the poll budget runs out, or `ctx` is cancelled.
    pub async fn post_long_running<T: DeserializeOwned, B: Serialize>(
        &self,
        ctx: &Context,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = to_json(body)?;
        let response = self
            .execute_with_retry(Method::POST, url, Some(&body))
            .await?;

        if response.status() != StatusCode::ACCEPTED {
            return self.parse_success_response(response).await;
        }

        let headers = response.headers().clone();
        let location = header_string(&headers, LOCATION.as_str());
        let async_operation = header_string(&headers, AZURE_ASYNC_OPERATION);
        let poll_url = async_operation
            .clone()
            .or_else(|| location.clone())
            .ok_or_else(|| {
                ApiError::Parse("202 response carried no polling location".to_string())
            })?;

        tracing::info!("Long-running operation started, polling {}", poll_url);

        let started = Instant::now();
        let mut wait = self.retry_after(&headers);

        loop {
            self.poll_wait(ctx, started, wait).await?;

            let response = self.execute_with_retry(Method::GET, &poll_url, None).await?;
            wait = self.retry_after(response.headers());

            if response.status() == StatusCode::ACCEPTED {
                tracing::debug!("Operation still running");
                continue;
            }

            let text = response.text().await?;
            let status = serde_json::from_str::<OperationStatus>(&text)
                .ok()
                .filter(|_| async_operation.is_some());

            let state = status.as_ref().and_then(|s| s.status.clone());

            match state.as_deref() {
                Some("Succeeded") => {
                    tracing::info!("Long-running operation succeeded");
                    return match &location {
                        Some(final_url) if final_url != &poll_url => self.get(final_url).await,
                        _ => parse_body(&text),
                    };
                }
                Some(state @ ("Failed" | "Canceled" | "Cancelled")) => {
                    let error = status.and_then(|s| s.error);
                    return Err(ApiError::Status {
                        status: 200,
                        code: error
                            .as_ref()
                            .and_then(|e| e.code.clone())
                            .unwrap_or_else(|| state.to_string()),
                        message: error
                            .and_then(|e| e.message)
                            .unwrap_or_else(|| format!("operation {}", state.to_lowercase())),
                    });
                }
                Some(other) => {
                    tracing::debug!("Operation status: {}", other);
                    continue;
                }
                None => return parse_body(&text),
            }
        }
    }

    async fn poll_wait(
        &self,
        ctx: &Context,
        started: Instant,
        wait: Duration,
    ) -> Result<(), ApiError> {
        let max = self.inner.options.poll.max_duration;
        let elapsed = started.elapsed();
        if elapsed >= max {
            return Err(ApiError::Timeout(max.as_secs()));
        }
        let wait = wait.min(max - elapsed);

        tokio::select! {
            _ = tokio::time::sleep(wait) => Ok(()),
            _ = ctx.cancelled() => {
                tracing::warn!("Polling cancelled");
                Err(ApiError::Cancelled)
            }
        }
    }

    fn retry_after(&self, headers: &HeaderMap) -> Duration {
        header_string(headers, RETRY_AFTER.as_str())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.inner.options.poll.default_interval)
    }

    /// Execute request with retry logic
    ///
    /// Returns any 2xx response untouched so callers can inspect headers.
    async fn execute_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let retry = &self.inner.options.retry;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= retry.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    retry.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    retry.max_backoff_ms,
                );
                tracing::warn!(
                    "Retrying {} {} after {}ms (attempt {})",
                    method,
                    url,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let token = self.inner.credential.token().await?;

            tracing::debug!("{} request to: {}", method, url);
            if let Some(body) = body {
                tracing::debug!("Request body: {}", body);
            }

            let mut request = self
                .inner
                .http_client
                .request(method.clone(), url)
                .header(AUTHORIZATION, format!("Bearer {}", token))
                .header(USER_AGENT, &self.inner.user_agent);
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status == StatusCode::UNAUTHORIZED {
                        let text = response.text().await.unwrap_or_default();
                        return Err(ApiError::Auth(text));
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(self.handle_error_response(response).await);
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(ApiError::Timeout(retry.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::Request(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response
    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);
        parse_body(&text)
    }

    /// Handle error response
    async fn handle_error_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        ApiError::from_response_body(status, &text)
    }
}

fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    // Empty bodies (204, bare 200) deserialize as JSON null
    let text = if text.trim().is_empty() { "null" } else { text };

    serde_json::from_str::<T>(text).map_err(|e| {
        tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
        ApiError::Parse(format!("Failed to parse response: {}", e))
    })
}

fn to_json<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::Parse(format!("Failed to encode request body: {}", e)))
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
