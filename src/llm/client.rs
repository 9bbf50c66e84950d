//! Gemini API client

use super::error::{LlmError, LlmResult};
use super::types::*;
use tracing::debug;

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";

/// Client for the generativelanguage REST API.
///
/// One synchronous call per turn; no retries. Failures map onto
/// [`LlmError`] at this boundary and nothing else leaks upward.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    /// Create a new client with the given API key
    pub fn new(api_key: impl Into<String>) -> LlmResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
        })
    }

    /// Generate one response for the given request.
    ///
    /// `model` is the fully qualified resource name ("models/...").
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> LlmResult<GenerateContentResponse> {
        let url = format!(
            "{}/{}/{}:generateContent?key={}",
            API_BASE_URL, API_VERSION, model, self.api_key
        );
        debug!(model, contents = request.contents.len(), "generateContent");

        let response = self.http_client.post(&url).json(request).send().await?;
        self.decode(response).await
    }

    /// Fetch the model catalog, filtered to the current Gemini text models
    /// and sorted by display name.
    pub async fn list_models(&self) -> LlmResult<Vec<ModelInfo>> {
        let url = format!(
            "{}/{}/models?pageSize=100&key={}",
            API_BASE_URL, API_VERSION, self.api_key
        );

        let response = self.http_client.get(&url).send().await?;
        let listing: ListModelsResponse = self.decode(response).await?;

        let mut models: Vec<ModelInfo> = listing
            .models
            .into_iter()
            .filter(ModelInfo::is_current_gemini)
            .collect();
        models.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(models)
    }

    /// Map the HTTP response onto the typed result: decode the body on
    /// success, or the wrapped error body on failure.
    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> LlmResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(parsed) => parsed.error.message,
                Err(_) => body,
            };
            return Err(LlmError::from_status(status.as_u16(), message));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction() {
        let client = GeminiClient::new("test-key").unwrap();
        assert_eq!(client.api_key, "test-key");
    }
}
