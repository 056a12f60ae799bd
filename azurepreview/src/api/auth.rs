//! Bearer token acquisition for Azure Resource Manager

use super::error::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::future::Future;
use tokio::sync::RwLock;

/// Tokens are refreshed this long before they expire
const REFRESH_MARGIN_MINUTES: i64 = 5;

#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Returns a bearer token valid for the Resource Manager endpoint
    async fn token(&self) -> Result<String, ApiError>;
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + Duration::minutes(REFRESH_MARGIN_MINUTES) < self.expires_at
    }
}

#[derive(Default)]
struct TokenCache {
    current: RwLock<Option<AccessToken>>,
}

impl TokenCache {
    async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, ApiError>>,
    {
        if let Some(token) = self.current.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.token.clone());
            }
        }

        let mut slot = self.current.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(token) = slot.as_ref() {
            if token.is_fresh() {
                return Ok(token.token.clone());
            }
        }

        let token = refresh().await?;
        tracing::debug!("Acquired new access token expiring at {}", token.expires_at);
        let value = token.token.clone();
        *slot = Some(token);
        Ok(value)
    }
}

/// Service principal client-credentials flow against Azure AD (v1 endpoint)
pub struct ClientSecretCredential {
    http_client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    resource: String,
    cache: TokenCache,
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    // The v1 endpoint returns numbers as strings
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl ClientSecretCredential {
    pub fn new(
        authority: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        resource: &str,
    ) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            token_url: format!(
                "{}/{}/oauth2/token",
                authority.trim_end_matches('/'),
                tenant_id
            ),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            resource: resource.to_string(),
            cache: TokenCache::default(),
        })
    }

    async fn request_token(&self) -> Result<AccessToken, ApiError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("resource", &self.resource)
            .finish();

        tracing::debug!("Requesting token from: {}", self.token_url);

        let response = self
            .http_client
            .post(&self.token_url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Auth(format!(
                "token request returned HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: OAuthTokenResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::Parse(format!("Failed to parse token response: {}", e)))?;

        let expires_in = parsed
            .expires_in
            .as_ref()
            .and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_i64(),
                serde_json::Value::String(s) => s.parse().ok(),
                _ => None,
            })
            .unwrap_or(3600);

        Ok(AccessToken {
            token: parsed.access_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        })
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn token(&self) -> Result<String, ApiError> {
        self.cache.get_or_refresh(|| self.request_token()).await
    }
}

/// Reuses the signed-in Azure CLI session
pub struct AzureCliCredential {
    resource: String,
    cache: TokenCache,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<String>,
    // Newer CLI versions add a POSIX timestamp
    #[serde(default, rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

impl AzureCliCredential {
    pub fn new(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            cache: TokenCache::default(),
        }
    }

    async fn request_token(&self) -> Result<AccessToken, ApiError> {
        tracing::debug!("Requesting token from Azure CLI for {}", self.resource);

        let output = tokio::process::Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                &self.resource,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| ApiError::Auth(format!("failed to run Azure CLI: {}", e)))?;

        if !output.status.success() {
            return Err(ApiError::Auth(format!(
                "Azure CLI exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_cli_token(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn token(&self) -> Result<String, ApiError> {
        self.cache.get_or_refresh(|| self.request_token()).await
    }
}

/// Parse the JSON printed by `az account get-access-token`
pub fn parse_cli_token(output: &str) -> Result<AccessToken, ApiError> {
    let parsed: CliTokenResponse = serde_json::from_str(output)
        .map_err(|e| ApiError::Parse(format!("Failed to parse Azure CLI token: {}", e)))?;

    let expires_at = match (parsed.expires_on_epoch, parsed.expires_on.as_deref()) {
        (Some(epoch), _) => Utc.timestamp_opt(epoch, 0).single(),
        // expiresOn is local wall-clock time without an offset
        (None, Some(local)) => NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).single())
            .map(|dt| dt.with_timezone(&Utc)),
        (None, None) => None,
    }
    .ok_or_else(|| ApiError::Parse("Azure CLI token has no usable expiry".to_string()))?;

    Ok(AccessToken {
        token: parsed.access_token,
        expires_at,
    })
}

/// Fixed token, for pre-acquired tokens and tests
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn token(&self) -> Result<String, ApiError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn client_secret_credential_requests_and_caches_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant-1/oauth2/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "app-id".into()),
                Matcher::UrlEncoded("client_secret".into(), "s3cret".into()),
                Matcher::UrlEncoded(
                    "resource".into(),
                    "https://management.azure.com/".into(),
                ),
            ]))
            .with_body(r#"{"access_token":"token-1","expires_in":"3599","token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let credential = ClientSecretCredential::new(
            &server.url(),
            "tenant-1",
            "app-id",
            "s3cret",
            "https://management.azure.com/",
        )
        .unwrap();

        assert_eq!(credential.token().await.unwrap(), "token-1");
        assert_eq!(credential.token().await.unwrap(), "token-1");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_secret_credential_refreshes_expiring_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant-1/oauth2/token")
            .with_body(r#"{"access_token":"short-lived","expires_in":60}"#)
            .expect(2)
            .create_async()
            .await;

        let credential =
            ClientSecretCredential::new(&server.url(), "tenant-1", "app", "secret", "res").unwrap();

        credential.token().await.unwrap();
        credential.token().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_secret_credential_reports_auth_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/tenant-1/oauth2/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let credential =
            ClientSecretCredential::new(&server.url(), "tenant-1", "app", "wrong", "res").unwrap();

        match credential.token().await {
            Err(ApiError::Auth(message)) => assert!(message.contains("invalid_client")),
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[test]
    fn parses_cli_token_with_epoch_expiry() {
        let token = parse_cli_token(
            r#"{"accessToken":"cli-token","expiresOn":"2030-01-01 00:00:00.000000","expires_on":1893456000,"tenant":"t"}"#,
        )
        .unwrap();

        assert_eq!(token.token, "cli-token");
        assert_eq!(token.expires_at.timestamp(), 1893456000);
    }

    #[test]
    fn parses_cli_token_with_local_expiry() {
        let token =
            parse_cli_token(r#"{"accessToken":"cli-token","expiresOn":"2030-01-01 00:00:00.123456"}"#)
                .unwrap();
        assert!(token.is_fresh());
    }

    #[test]
    fn rejects_cli_output_without_expiry() {
        assert!(parse_cli_token(r#"{"accessToken":"cli-token"}"#).is_err());
    }

    #[tokio::test]
    async fn static_credential_returns_fixed_token() {
        let credential = StaticTokenCredential::new("fixed");
        assert_eq!(credential.token().await.unwrap(), "fixed");
    }
}
