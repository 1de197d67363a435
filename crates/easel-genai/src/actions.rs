//! Contextual actions offered for the current selection.

use easel_core::{GenerationSettings, Shape, ShapeKind};

use crate::orchestrator::{DescribeBatch, GenerateInput, GenerateOutcome, Orchestrator};
use crate::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Describe each selected image as text.
    Analyze,
    /// Generate an image from the selection.
    Generate,
}

impl Action {
    /// Everything registered with the canvas toolbar at mount time.
    pub const ALL: [Action; 2] = [Action::Analyze, Action::Generate];

    pub fn icon(&self) -> &'static str {
        match self {
            Action::Analyze => "genai-describe-image",
            Action::Generate => "genai-generate-image",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::Analyze => "Analyze",
            Action::Generate => "Generate",
        }
    }
}

/// Actions for a selection. Empty, or containing anything but text and
/// images, means none. Placeholders are skipped, as the composer skips them.
pub fn available_actions(selection: &[Shape]) -> Vec<Action> {
    let mut has_text = false;
    let mut has_image = false;
    for shape in selection {
        match shape.kind {
            ShapeKind::Text { transient: true, .. } => {}
            ShapeKind::Text { .. } => has_text = true,
            ShapeKind::Image { .. } => has_image = true,
            ShapeKind::Arrow { .. } | ShapeKind::Other { .. } => return vec![],
        }
    }

    if !has_text && !has_image {
        return vec![];
    }
    if has_image && !has_text {
        vec![Action::Analyze, Action::Generate]
    } else {
        vec![Action::Generate]
    }
}

/// Result of running an action.
pub enum Triggered {
    Described(DescribeBatch),
    Generated(GenerateOutcome),
}

/// Run `action` on `selection`.
pub async fn trigger(
    action: Action,
    orchestrator: &Orchestrator,
    selection: &[Shape],
    settings: &GenerationSettings,
) -> Result<Triggered, GenerationError> {
    let ids = selection.iter().map(|s| s.id.clone()).collect::<Vec<_>>();
    match action {
        Action::Analyze => Ok(Triggered::Described(orchestrator.describe(&ids))),
        Action::Generate => orchestrator
            .generate(GenerateInput::Selection(ids), settings)
            .await
            .map(Triggered::Generated),
    }
}
