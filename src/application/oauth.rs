use crate::domain::models::OAuthToken;
use crate::infrastructure::config::{required_value, GoogleCredentials};
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::oauth_client::{
    OAuthCodeExchangeRequest, OAuthHttpClient, OAuthRefreshRequest, OAuthTokenResponse,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use url::Url;

const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_LEEWAY_SECONDS: i64 = 60;

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub token_endpoint: String,
    pub authorization_endpoint: String,
}

impl OAuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        redirect_uri: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_uri: redirect_uri.into(),
            scopes,
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            authorization_endpoint: DEFAULT_AUTHORIZATION_ENDPOINT.to_string(),
        }
    }

    pub fn from_credentials(credentials: &GoogleCredentials) -> Result<Self, InfraError> {
        let client_id = required_value(
            credentials.client_id.as_deref(),
            &["FOCUSDESK_GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_ID"],
            "google client id",
        )?;
        Ok(Self::new(
            client_id,
            credentials.client_secret.clone(),
            credentials.redirect_uri.clone(),
            credentials.scopes.clone(),
        ))
    }
}

/// A completed Google sign-in: the stored token and, when the profile
/// lookup succeeded, the user's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleSession {
    pub token: OAuthToken,
    pub user_name: Option<String>,
}

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Google sign-in and token upkeep for one calendar user.
pub struct OAuthManager<S, C>
where
    S: CredentialStore,
    C: OAuthHttpClient + ?Sized,
{
    config: OAuthConfig,
    credential_store: Arc<S>,
    oauth_client: Arc<C>,
    now_provider: NowProvider,
}

impl<S, C> OAuthManager<S, C>
where
    S: CredentialStore,
    C: OAuthHttpClient + ?Sized,
{
    pub fn new(config: OAuthConfig, credential_store: Arc<S>, oauth_client: Arc<C>) -> Self {
        Self {
            config,
            credential_store,
            oauth_client,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Consent page URL requesting offline access, so sign-in yields a
    /// refresh token.
    pub fn authorization_url(&self, state: &str) -> Result<String, InfraError> {
        let state = state.trim();
        if state.is_empty() {
            return Err(InfraError::OAuth("state must not be empty".to_string()));
        }
        if self.config.scopes.is_empty() {
            return Err(InfraError::OAuth("no calendar scopes configured".to_string()));
        }

        let scope = self.config.scopes.join(" ");
        let params = [
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ];
        Url::parse_with_params(&self.config.authorization_endpoint, params)
            .map(String::from)
            .map_err(|error| InfraError::OAuth(format!("invalid authorization endpoint: {error}")))
    }

    /// Exchanges the redirect code, stores the token and looks up who signed
    /// in. A failed profile lookup leaves the session without a name.
    pub async fn sign_in(&self, authorization_code: &str) -> Result<GoogleSession, InfraError> {
        let authorization_code = authorization_code.trim();
        if authorization_code.is_empty() {
            return Err(InfraError::OAuth("authorization code must not be empty".to_string()));
        }

        let response = self
            .oauth_client
            .exchange_authorization_code(OAuthCodeExchangeRequest {
                token_endpoint: self.config.token_endpoint.clone(),
                client_id: self.config.client_id.clone(),
                client_secret: self.config.client_secret.clone(),
                redirect_uri: self.config.redirect_uri.clone(),
                authorization_code: authorization_code.to_string(),
            })
            .await?;
        let token = self.token_from_response(response, None);
        self.credential_store.save_token(&token)?;

        let user_name = match self.oauth_client.fetch_user_profile(&token.access_token).await {
            Ok(profile) => profile.display_name().map(ToOwned::to_owned),
            Err(error) => {
                tracing::warn!(error = %error, "signed in but failed fetching profile");
                None
            }
        };
        Ok(GoogleSession { token, user_name })
    }

    /// Bearer token for the next calendar call, refreshed when it is about to
    /// expire. `NotSignedIn` when there is no usable session.
    pub async fn access_token(&self) -> Result<String, InfraError> {
        let Some(stored) = self.credential_store.load_token()? else {
            return Err(InfraError::NotSignedIn);
        };
        if stored.is_valid_at((self.now_provider)(), TOKEN_LEEWAY_SECONDS) {
            return Ok(stored.access_token);
        }

        match self.refresh(stored).await? {
            Some(token) => Ok(token.access_token),
            None => Err(InfraError::NotSignedIn),
        }
    }

    /// `None` when the token cannot be refreshed and the user has to sign in
    /// again.
    async fn refresh(&self, stored: OAuthToken) -> Result<Option<OAuthToken>, InfraError> {
        let Some(refresh_token) = stored.refresh_token else {
            return Ok(None);
        };

        let response = self
            .oauth_client
            .refresh_access_token(OAuthRefreshRequest {
                token_endpoint: self.config.token_endpoint.clone(),
                client_id: self.config.client_id.clone(),
                client_secret: self.config.client_secret.clone(),
                refresh_token: refresh_token.clone(),
            })
            .await;

        match response {
            Ok(response) => {
                let token = self.token_from_response(response, Some(refresh_token));
                self.credential_store.save_token(&token)?;
                tracing::debug!("google access token refreshed");
                Ok(Some(token))
            }
            Err(InfraError::OAuth(message)) => {
                tracing::warn!(error = %message, "token refresh rejected; sign-in required");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    fn token_from_response(
        &self,
        response: OAuthTokenResponse,
        previous_refresh_token: Option<String>,
    ) -> OAuthToken {
        let expires_at = (self.now_provider)() + Duration::seconds(response.expires_in.max(0));
        OAuthToken {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh_token),
            expires_at,
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scope: response.scope,
        }
    }
}
