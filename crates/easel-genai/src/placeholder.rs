use std::sync::Arc;

use easel_core::canvas::Canvas;
use easel_core::{NewShape, ShapeId, Size};

use crate::layout::Placer;

pub const GENERATING_LABEL: &str = "Generating image...";
pub const GENERATING_HQ_LABEL: &str = "Generating high quality image...";
pub const ANALYZING_LABEL: &str = "Analyzing image...";

const PLACEHOLDER_SIZE: Size = Size { w: 240.0, h: 48.0 };

/// Show a transient "working" text shape next to `anchor`.
///
/// Returns the ids as a Vec so every flow clears placeholders the same way.
pub fn show(canvas: &dyn Canvas, label: &str, anchor: Option<&ShapeId>) -> Vec<ShapeId> {
    let id = Placer::new(canvas).create_placed(NewShape::placeholder(label, PLACEHOLDER_SIZE), anchor);
    tracing::debug!(placeholder = %id, %label, "showing placeholder");
    vec![id]
}

/// Remove placeholders. Already-deleted ids are ignored.
pub fn clear(canvas: &dyn Canvas, ids: &[ShapeId]) {
    if ids.is_empty() {
        return;
    }
    canvas.delete_shapes(ids);
    tracing::debug!(count = ids.len(), "cleared placeholders");
}

/// A placeholder set owned by one in-flight request.
///
/// Cleared explicitly on completion, or on drop if the request future is
/// abandoned or panics, so no placeholder outlives its request.
pub struct ActivePlaceholders {
    canvas: Arc<dyn Canvas>,
    ids: Vec<ShapeId>,
}

impl ActivePlaceholders {
    pub fn show(canvas: Arc<dyn Canvas>, label: &str, anchor: Option<&ShapeId>) -> Self {
        let ids = show(canvas.as_ref(), label, anchor);
        Self { canvas, ids }
    }

    pub fn ids(&self) -> &[ShapeId] {
        &self.ids
    }

    pub fn clear(mut self) {
        let ids = std::mem::take(&mut self.ids);
        clear(self.canvas.as_ref(), &ids);
    }
}

impl Drop for ActivePlaceholders {
    fn drop(&mut self) {
        if !self.ids.is_empty() {
            clear(self.canvas.as_ref(), &self.ids);
        }
    }
}
