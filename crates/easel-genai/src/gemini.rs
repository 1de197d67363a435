use async_trait::async_trait;

use crate::engine::{Contents, GenerateConfig, GenerationService, InlineImage, ServiceFailure};
use crate::parse::{self, GenerateRequest, GenerateResponse};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Read the API key from `GEMINI_API_KEY`, falling back to `API_KEY`.
pub fn api_key_from_env() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}

/// HTTP client for the Gemini API.
///
/// A missing key is not an error here; requests simply fail with the
/// service's authentication message.
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base(DEFAULT_API_BASE, api_key)
    }

    pub fn from_env() -> Self {
        Self::new(api_key_from_env())
    }

    pub fn with_base(api_base: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn post(&self, model: &str, body: &GenerateRequest) -> Result<GenerateResponse, ServiceFailure> {
        let url = format!("{}/v1beta/models/{model}:generateContent", self.api_base);
        tracing::debug!(%model, "sending generateContent request");

        let mut req = self.http.post(&url).json(body);
        if let Some(key) = &self.api_key {
            req = req.header("x-goog-api-key", key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ServiceFailure::new(format!("request to {model} failed: {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ServiceFailure::new(format!("reading response from {model}: {e}")))?;

        if !status.is_success() {
            let msg = parse::error_message(status.as_u16(), &text);
            tracing::warn!(%model, status = status.as_u16(), error = %msg, "generateContent failed");
            return Err(ServiceFailure(msg));
        }

        serde_json::from_str(&text)
            .map_err(|e| ServiceFailure::new(format!("unexpected response from {model}: {e}")))
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        contents: &Contents,
        config: &GenerateConfig,
    ) -> Result<Vec<InlineImage>, ServiceFailure> {
        let response = self.post(model, &parse::image_request(contents, config)).await?;
        let images = response.images()?;
        tracing::debug!(%model, count = images.len(), "received images");
        Ok(images)
    }

    async fn describe_content(&self, model: &str, contents: &Contents) -> Result<String, ServiceFailure> {
        let response = self.post(model, &parse::describe_request(contents)).await?;
        response
            .text()
            .ok_or_else(|| ServiceFailure::new("model returned no text"))
    }
}
