use crate::domain::models::OAuthToken;
use crate::infrastructure::error::InfraError;
use std::sync::Mutex;

pub trait CredentialStore: Send + Sync {
    fn save_token(&self, token: &OAuthToken) -> Result<(), InfraError>;
    fn load_token(&self) -> Result<Option<OAuthToken>, InfraError>;
    fn delete_token(&self) -> Result<(), InfraError>;
}

/// Session-scoped token holder; tokens are gone when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    token: Mutex<Option<OAuthToken>>,
}

impl InMemoryCredentialStore {
    fn guard(&self) -> Result<std::sync::MutexGuard<'_, Option<OAuthToken>>, InfraError> {
        self.token
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn save_token(&self, token: &OAuthToken) -> Result<(), InfraError> {
        *self.guard()? = Some(token.clone());
        Ok(())
    }

    fn load_token(&self) -> Result<Option<OAuthToken>, InfraError> {
        Ok(self.guard()?.clone())
    }

    fn delete_token(&self) -> Result<(), InfraError> {
        *self.guard()? = None;
        Ok(())
    }
}
