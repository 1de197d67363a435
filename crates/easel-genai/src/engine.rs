use async_trait::async_trait;

use easel_core::GenerationSettings;

/// Image model used in normal mode.
pub const FAST_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
/// Image model used in high-quality mode.
pub const PRO_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
/// Output size requested in high-quality mode.
pub const PRO_IMAGE_SIZE: &str = "2K";
/// Vision model used to describe images.
pub const DESCRIBE_MODEL: &str = "gemini-2.5-flash";

/// An image passed to or returned by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contents {
    pub text: Option<String>,
    pub inline_image: Option<InlineImage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateConfig {
    pub system_instruction: String,
    pub aspect_ratio: String,
    pub image_size: Option<String>,
}

/// A failed service call. Only a message is available.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ServiceFailure(pub String);

impl ServiceFailure {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// The generative backend.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        contents: &Contents,
        config: &GenerateConfig,
    ) -> Result<Vec<InlineImage>, ServiceFailure>;

    async fn describe_content(&self, model: &str, contents: &Contents) -> Result<String, ServiceFailure>;
}

/// Lets the user pick a paid API key before high-quality requests.
#[async_trait]
pub trait CredentialSelector: Send + Sync {
    async fn has_selected_key(&self) -> Result<bool, ServiceFailure>;
    async fn open_select_key(&self) -> Result<(), ServiceFailure>;
}

/// Model and output size derived from the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChoice {
    pub model: &'static str,
    pub image_size: Option<&'static str>,
}

impl ModelChoice {
    pub fn for_settings(settings: &GenerationSettings) -> Self {
        if settings.high_quality_mode {
            Self {
                model: PRO_IMAGE_MODEL,
                image_size: Some(PRO_IMAGE_SIZE),
            }
        } else {
            Self {
                model: FAST_IMAGE_MODEL,
                image_size: None,
            }
        }
    }

    pub fn config(&self, settings: &GenerationSettings) -> GenerateConfig {
        GenerateConfig {
            system_instruction: settings.system_prompt.clone(),
            aspect_ratio: settings.aspect_ratio.as_str().to_string(),
            image_size: self.image_size.map(str::to_string),
        }
    }
}
