use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Clone)]
pub struct OAuthCodeExchangeRequest {
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub authorization_code: String,
}

#[derive(Debug, Clone)]
pub struct OAuthRefreshRequest {
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[async_trait]
pub trait OAuthHttpClient: Send + Sync {
    async fn exchange_authorization_code(
        &self,
        request: OAuthCodeExchangeRequest,
    ) -> Result<OAuthTokenResponse, InfraError>;

    async fn refresh_access_token(
        &self,
        request: OAuthRefreshRequest,
    ) -> Result<OAuthTokenResponse, InfraError>;

    async fn fetch_user_profile(&self, access_token: &str) -> Result<UserProfile, InfraError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestOAuthClient {
    client: Client,
}

#[derive(Debug, serde::Deserialize)]
struct GoogleTokenResponsePayload {
    #[serde(default)]
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct UserInfoPayload {
    name: Option<String>,
    email: Option<String>,
}

impl ReqwestOAuthClient {
    pub fn new(timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| InfraError::OAuth(format!("failed building http client: {error}")))?;
        Ok(Self { client })
    }

    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<OAuthTokenResponse, InfraError> {
        let response = self
            .client
            .post(endpoint)
            .form(params)
            .send()
            .await
            .map_err(|error| InfraError::OAuth(format!("request failed: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::OAuth(format!("failed reading token response: {error}")))?;

        let parsed = serde_json::from_str::<GoogleTokenResponsePayload>(&body).map_err(|error| {
            InfraError::OAuth(format!("invalid token response payload: {error}; body={body}"))
        })?;

        if !status.is_success() || parsed.error.is_some() || parsed.access_token.is_empty() {
            let code = parsed.error.unwrap_or_else(|| format!("http_{}", status.as_u16()));
            let detail = parsed.error_description.unwrap_or_else(|| body.clone());
            return Err(InfraError::OAuth(format!("token endpoint error: {code}; {detail}")));
        }

        Ok(OAuthTokenResponse {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
            expires_in: parsed.expires_in.unwrap_or(0).max(0),
            token_type: parsed.token_type,
            scope: parsed.scope,
        })
    }
}

fn push_secret(params: &mut Vec<(&str, String)>, client_secret: Option<String>) {
    if let Some(secret) = client_secret.filter(|value| !value.trim().is_empty()) {
        params.push(("client_secret", secret));
    }
}

#[async_trait]
impl OAuthHttpClient for ReqwestOAuthClient {
    async fn exchange_authorization_code(
        &self,
        request: OAuthCodeExchangeRequest,
    ) -> Result<OAuthTokenResponse, InfraError> {
        let mut params = vec![
            ("grant_type", "authorization_code".to_string()),
            ("client_id", request.client_id),
            ("redirect_uri", request.redirect_uri),
            ("code", request.authorization_code),
        ];
        push_secret(&mut params, request.client_secret);
        self.post_form(&request.token_endpoint, &params).await
    }

    async fn refresh_access_token(
        &self,
        request: OAuthRefreshRequest,
    ) -> Result<OAuthTokenResponse, InfraError> {
        let mut params = vec![
            ("grant_type", "refresh_token".to_string()),
            ("client_id", request.client_id),
            ("refresh_token", request.refresh_token),
        ];
        push_secret(&mut params, request.client_secret);
        self.post_form(&request.token_endpoint, &params).await
    }

    async fn fetch_user_profile(&self, access_token: &str) -> Result<UserProfile, InfraError> {
        let response = self
            .client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| InfraError::OAuth(format!("network error while fetching profile: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::OAuth(format!("failed reading profile response: {error}")))?;
        if !status.is_success() {
            return Err(InfraError::OAuth(format!(
                "userinfo endpoint error: http {}",
                status.as_u16()
            )));
        }

        let parsed: UserInfoPayload = serde_json::from_str(&body).map_err(|error| {
            InfraError::OAuth(format!("invalid userinfo payload: {error}; body={body}"))
        })?;
        Ok(UserProfile {
            name: parsed.name,
            email: parsed.email,
        })
    }
}
