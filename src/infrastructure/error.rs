use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("OAuth error: {0}")]
    OAuth(String),
    #[error("Credential store error: {0}")]
    Credential(String),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not signed in to Google Calendar")]
    NotSignedIn,
}
