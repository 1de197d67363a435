pub mod actions;
pub mod engine;
pub mod gemini;
pub mod layout;
pub mod orchestrator;
mod parse;
pub mod placeholder;
pub mod prompt;

use easel_core::canvas::CanvasError;

pub use actions::{available_actions, trigger, Action, Triggered};
pub use engine::{Contents, CredentialSelector, GenerationService, InlineImage, ModelChoice, ServiceFailure};
pub use gemini::GeminiClient;
pub use orchestrator::{DescribeBatch, GenerateInput, GenerateOutcome, Orchestrator};

/// Substring the service puts in its error when the selected key cannot reach
/// the high-quality model. There is no structured code for this.
pub const CREDENTIAL_ERROR_MARKER: &str = "Requested entity was not found.";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("nothing to generate from: select text or an image, or type a prompt")]
    EmptySelection,

    #[error("generation failed: {0}")]
    Service(String),

    #[error("API key cannot access the high-quality model: {0}")]
    Credential(String),

    #[error("a generation is already running")]
    Busy,

    #[error(transparent)]
    Canvas(#[from] CanvasError),
}

impl GenerationError {
    /// Classify a failed service call.
    pub fn from_service(failure: ServiceFailure, high_quality: bool) -> Self {
        if high_quality && failure.0.contains(CREDENTIAL_ERROR_MARKER) {
            GenerationError::Credential(failure.0)
        } else {
            GenerationError::Service(failure.0)
        }
    }

    /// True when the UI should prompt the user to pick a key again.
    pub fn is_credential(&self) -> bool {
        matches!(self, GenerationError::Credential(_))
    }
}
