use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Text-in, text-out access to a generative language model.
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestGeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

#[derive(Debug, serde::Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, serde::Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, serde::Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, serde::Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, serde::Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, serde::Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl ReqwestGeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let client = Client::builder().timeout(timeout).build().map_err(|error| {
            InfraError::Provider(format!("failed building gemini http client: {error}"))
        })?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    fn generate_endpoint(&self) -> Result<Url, InfraError> {
        let mut url = Url::parse(GEMINI_API_BASE)
            .map_err(|error| InfraError::Provider(format!("invalid gemini base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::Provider("gemini base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("models");
            segments.push(&format!("{}:generateContent", self.model));
        }
        Ok(url)
    }
}

fn extract_text(response: GenerateContentResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl LanguageModelClient for ReqwestGeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, InfraError> {
        let endpoint = self.generate_endpoint()?;
        let payload = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|error| InfraError::Provider(format!("network error while calling gemini: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Provider(format!("failed reading gemini response: {error}")))?;
        if !status.is_success() {
            return Err(InfraError::Provider(format!(
                "gemini api error: http {}; body={body}",
                status.as_u16()
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|error| {
            InfraError::Provider(format!("invalid gemini payload: {error}; body={body}"))
        })?;
        extract_text(parsed)
            .ok_or_else(|| InfraError::Provider("gemini response contained no text".to_string()))
    }
}
