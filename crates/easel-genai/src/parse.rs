//! Wire types for the Gemini `generateContent` endpoint and extraction of
//! images/text from its responses.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::engine::{Contents, GenerateConfig, InlineImage, ServiceFailure};

// --- Request ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest {
    pub contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageConfig {
    pub aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
}

fn user_content(contents: &Contents) -> WireContent {
    let mut parts = Vec::new();
    if let Some(text) = &contents.text {
        parts.push(Part {
            text: Some(text.clone()),
            inline_data: None,
        });
    }
    if let Some(image) = &contents.inline_image {
        parts.push(Part {
            text: None,
            inline_data: Some(Blob {
                mime_type: image.mime_type.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&image.data),
            }),
        });
    }
    WireContent {
        role: Some("user".to_string()),
        parts,
    }
}

pub(crate) fn image_request(contents: &Contents, config: &GenerateConfig) -> GenerateRequest {
    GenerateRequest {
        contents: vec![user_content(contents)],
        system_instruction: Some(WireContent {
            role: None,
            parts: vec![Part {
                text: Some(config.system_instruction.clone()),
                inline_data: None,
            }],
        }),
        generation_config: Some(GenerationConfig {
            response_modalities: vec!["IMAGE"],
            image_config: Some(ImageConfig {
                aspect_ratio: config.aspect_ratio.clone(),
                image_size: config.image_size.clone(),
            }),
        }),
    }
}

pub(crate) fn describe_request(contents: &Contents) -> GenerateRequest {
    GenerateRequest {
        contents: vec![user_content(contents)],
        system_instruction: None,
        generation_config: None,
    }
}

// --- Response ---

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }

    /// Decode every inline image part, in response order.
    pub fn images(&self) -> Result<Vec<InlineImage>, ServiceFailure> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .map(|blob| -> Result<InlineImage, ServiceFailure> {
                let data = base64::engine::general_purpose::STANDARD
                    .decode(blob.data.as_bytes())
                    .map_err(|e| ServiceFailure::new(format!("invalid image data: {e}")))?;
                Ok(InlineImage {
                    mime_type: blob.mime_type.clone(),
                    data,
                })
            })
            .collect()
    }

    /// Concatenated text parts, or `None` when there are none.
    pub fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Pull the human-readable message out of an error body, falling back to the
/// raw body.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => env.error.message,
        Err(_) if body.trim().is_empty() => format!("request failed with status {status}"),
        Err(_) => format!("request failed with status {status}: {}", body.trim()),
    }
}
