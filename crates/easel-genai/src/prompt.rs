//! Turn a canvas selection (or a typed prompt) into a generation request.

use easel_core::canvas::Canvas;
use easel_core::{GenerationSettings, Shape, ShapeId, ShapeKind};

use crate::engine::{Contents, InlineImage};
use crate::GenerationError;

/// Prompt used when only a reference image was selected.
pub const FALLBACK_PROMPT: &str = "Create a new image based on this reference image.";

/// Instruction sent with every describe request.
pub const DESCRIBE_PROMPT: &str = "Describe this image in detail. Cover the subject, composition, \
colors, lighting and style, so the description could be used as a prompt to recreate it.";

/// What a selection contributes to a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    pub texts: Vec<String>,
    pub image: Option<InlineImage>,
    /// Shapes that contributed, in selection order. Results are linked from these.
    pub source_ids: Vec<ShapeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt_text: String,
    pub reference_image: Option<InlineImage>,
    pub settings: GenerationSettings,
}

impl GenerationRequest {
    pub fn contents(&self) -> Contents {
        Contents {
            text: Some(self.prompt_text.clone()),
            inline_image: self.reference_image.clone(),
        }
    }
}

impl Composition {
    /// Partition a selection into text and at most one image.
    ///
    /// Only the first image whose asset resolves is used; further images are
    /// ignored and do not count as sources. Placeholders never contribute.
    pub fn from_selection(canvas: &dyn Canvas, selection: &[Shape]) -> Self {
        let mut out = Composition::default();
        for shape in selection {
            match &shape.kind {
                ShapeKind::Text { transient: true, .. } => {}
                ShapeKind::Text { text, .. } => {
                    out.texts.push(text.plain_text());
                    out.source_ids.push(shape.id.clone());
                }
                ShapeKind::Image { asset_id } => {
                    if out.image.is_some() {
                        tracing::debug!(shape = %shape.id, "ignoring additional selected image");
                        continue;
                    }
                    match canvas.asset(asset_id) {
                        Some(asset) => {
                            out.image = Some(InlineImage {
                                mime_type: asset.mime_type,
                                data: asset.data,
                            });
                            out.source_ids.push(shape.id.clone());
                        }
                        None => {
                            tracing::warn!(shape = %shape.id, asset = %asset_id, "selected image has no asset");
                        }
                    }
                }
                ShapeKind::Arrow { .. } | ShapeKind::Other { .. } => {}
            }
        }
        out
    }

    /// A typed prompt: one text, no sources.
    pub fn from_prompt(text: &str) -> Self {
        Composition {
            texts: vec![text.to_string()],
            image: None,
            source_ids: Vec::new(),
        }
    }

    pub fn to_payload(&self, settings: &GenerationSettings) -> Result<GenerationRequest, GenerationError> {
        let joined = self
            .texts
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let prompt_text = match (joined.is_empty(), &self.image) {
            (true, None) => return Err(GenerationError::EmptySelection),
            (true, Some(_)) => FALLBACK_PROMPT.to_string(),
            (false, _) => joined,
        };

        Ok(GenerationRequest {
            prompt_text,
            reference_image: self.image.clone(),
            settings: settings.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_core::canvas::MemoryCanvas;
    use easel_core::{Asset, AssetId, NewShape, Size};
    use pretty_assertions::assert_eq;

    const SIZE: Size = Size { w: 100.0, h: 50.0 };

    fn add_image(canvas: &MemoryCanvas, bytes: &[u8]) -> Shape {
        let asset = Asset {
            id: AssetId::new(),
            data: bytes.to_vec(),
            width: 10,
            height: 10,
            mime_type: "image/png".to_string(),
        };
        canvas.create_asset(asset.clone());
        let id = canvas.create_shape(NewShape::image(asset.id, SIZE));
        canvas.shape(&id).unwrap()
    }

    fn add_text(canvas: &MemoryCanvas, text: &str) -> Shape {
        let id = canvas.create_shape(NewShape::text(text, SIZE));
        canvas.shape(&id).unwrap()
    }

    #[test]
    fn empty_selection_fails_with_empty_selection() {
        let canvas = MemoryCanvas::default();
        let comp = Composition::from_selection(&canvas, &[]);
        assert!(matches!(
            comp.to_payload(&GenerationSettings::default()),
            Err(GenerationError::EmptySelection)
        ));
    }

    #[test]
    fn texts_join_in_selection_order() {
        let canvas = MemoryCanvas::default();
        let a = add_text(&canvas, "a cat\nin a garden");
        let b = add_text(&canvas, "watercolor");
        let comp = Composition::from_selection(&canvas, &[a.clone(), b.clone()]);
        assert_eq!(comp.source_ids, vec![a.id, b.id]);

        let req = comp.to_payload(&GenerationSettings::default()).unwrap();
        assert_eq!(req.prompt_text, "a cat\nin a garden\nwatercolor");
        assert_eq!(req.reference_image, None);
    }

    #[test]
    fn only_first_image_is_used() {
        let canvas = MemoryCanvas::default();
        let first = add_image(&canvas, b"first");
        let second = add_image(&canvas, b"second");
        let comp = Composition::from_selection(&canvas, &[first.clone(), second]);
        assert_eq!(comp.source_ids, vec![first.id]);
        assert_eq!(comp.image.as_ref().map(|i| i.data.as_slice()), Some(&b"first"[..]));
    }

    #[test]
    fn image_without_text_uses_fallback_prompt() {
        let canvas = MemoryCanvas::default();
        let image = add_image(&canvas, b"px");
        let req = Composition::from_selection(&canvas, &[image])
            .to_payload(&GenerationSettings::default())
            .unwrap();
        assert_eq!(req.prompt_text, FALLBACK_PROMPT);
        assert!(req.reference_image.is_some());
    }

    #[test]
    fn placeholders_and_other_shapes_do_not_contribute() {
        let canvas = MemoryCanvas::default();
        let placeholder = canvas.create_shape(NewShape::placeholder("Generating image...", SIZE));
        let placeholder = canvas.shape(&placeholder).unwrap();
        let other = Shape {
            id: ShapeId::from("shape:geo"),
            position: Default::default(),
            size: SIZE,
            kind: ShapeKind::Other {
                type_name: "geo".to_string(),
            },
        };
        let comp = Composition::from_selection(&canvas, &[placeholder, other]);
        assert_eq!(comp, Composition::default());
    }

    #[test]
    fn blank_prompt_is_empty() {
        let comp = Composition::from_prompt("   ");
        assert!(matches!(
            comp.to_payload(&GenerationSettings::default()),
            Err(GenerationError::EmptySelection)
        ));
    }

    #[test]
    fn payload_snapshots_settings() {
        let mut settings = GenerationSettings::default();
        settings.high_quality_mode = true;
        let req = Composition::from_prompt("a fox").to_payload(&settings).unwrap();
        settings.high_quality_mode = false;
        assert!(req.settings.high_quality_mode);
        assert_eq!(
            req.contents(),
            Contents {
                text: Some("a fox".to_string()),
                inline_image: None
            }
        );
    }
}
