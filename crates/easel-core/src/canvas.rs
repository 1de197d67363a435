//! Capability interface onto the drawing canvas.
//!
//! The canvas owns shapes, assets, selection and the camera. Callers never
//! hold references into it; every read returns an owned snapshot, so a shape
//! may disappear between two calls (the user can delete it at any time).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Asset, AssetId, NewShape, Position, Rect, Shape, ShapeId, ShapeKind};

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("shape not found: {0}")]
    ShapeNotFound(ShapeId),

    #[error("shape {0} is not an image")]
    NotAnImage(ShapeId),

    #[error("asset not found: {0}")]
    AssetMissing(AssetId),
}

/// Encoded image produced by [`Canvas::export_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Operations the generation layer needs from the canvas.
///
/// Implementations serialize their own mutations; methods take `&self`.
#[async_trait]
pub trait Canvas: Send + Sync {
    fn shape(&self, id: &ShapeId) -> Option<Shape>;

    /// All shapes on the current page, in creation order.
    fn shapes(&self) -> Vec<Shape>;

    fn create_shape(&self, shape: NewShape) -> ShapeId;

    /// Delete shapes. Ids that no longer exist are ignored.
    fn delete_shapes(&self, ids: &[ShapeId]);

    fn set_position(&self, id: &ShapeId, position: Position);

    fn create_asset(&self, asset: Asset);

    fn asset(&self, id: &AssetId) -> Option<Asset>;

    fn select(&self, ids: &[ShapeId]);

    fn selected_ids(&self) -> Vec<ShapeId>;

    /// Move the camera so the shape is in view.
    fn zoom_to(&self, id: &ShapeId);

    /// Visible page area.
    fn viewport_bounds(&self) -> Rect;

    /// Encode a shape as an image. Renderers rasterize to PNG; the returned
    /// mime type always describes `data`.
    async fn export_image(&self, id: &ShapeId) -> Result<ExportedImage, CanvasError>;
}

// --- In-memory canvas ---

#[derive(Default)]
struct Document {
    shapes: Vec<Shape>,
    assets: HashMap<AssetId, Asset>,
    selection: Vec<ShapeId>,
    viewport: Rect,
}

/// Canvas kept entirely in memory. Used headless and in tests; image shapes
/// export as the bytes of their asset, in the asset's own format.
pub struct MemoryCanvas {
    doc: Mutex<Document>,
}

impl MemoryCanvas {
    pub fn new(viewport: Rect) -> Self {
        Self {
            doc: Mutex::new(Document {
                viewport,
                ..Document::default()
            }),
        }
    }

    fn doc(&self) -> std::sync::MutexGuard<'_, Document> {
        self.doc.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_viewport(&self, viewport: Rect) {
        self.doc().viewport = viewport;
    }

    pub fn count_where(&self, pred: impl Fn(&Shape) -> bool) -> usize {
        self.doc().shapes.iter().filter(|s| pred(*s)).count()
    }

    pub fn placeholder_count(&self) -> usize {
        self.count_where(|s| s.kind.is_placeholder())
    }

    /// Ids of link shapes pointing from `from` to `to`.
    pub fn links_between(&self, from: &ShapeId, to: &ShapeId) -> Vec<ShapeId> {
        self.doc()
            .shapes
            .iter()
            .filter(|s| matches!(&s.kind, ShapeKind::Arrow { from: f, to: t } if f == from && t == to))
            .map(|s| s.id.clone())
            .collect()
    }

    pub fn asset_count(&self) -> usize {
        self.doc().assets.len()
    }
}

impl Default for MemoryCanvas {
    fn default() -> Self {
        Self::new(Rect {
            x: 0.0,
            y: 0.0,
            w: 1280.0,
            h: 800.0,
        })
    }
}

#[async_trait]
impl Canvas for MemoryCanvas {
    fn shape(&self, id: &ShapeId) -> Option<Shape> {
        self.doc().shapes.iter().find(|s| &s.id == id).cloned()
    }

    fn shapes(&self) -> Vec<Shape> {
        self.doc().shapes.clone()
    }

    fn create_shape(&self, shape: NewShape) -> ShapeId {
        let id = shape.id.clone();
        self.doc().shapes.push(shape.into_shape());
        id
    }

    fn delete_shapes(&self, ids: &[ShapeId]) {
        let mut doc = self.doc();
        doc.shapes.retain(|s| !ids.contains(&s.id));
        doc.selection.retain(|s| !ids.contains(s));
    }

    fn set_position(&self, id: &ShapeId, position: Position) {
        if let Some(shape) = self.doc().shapes.iter_mut().find(|s| &s.id == id) {
            shape.position = position;
        }
    }

    fn create_asset(&self, asset: Asset) {
        self.doc().assets.insert(asset.id.clone(), asset);
    }

    fn asset(&self, id: &AssetId) -> Option<Asset> {
        self.doc().assets.get(id).cloned()
    }

    fn select(&self, ids: &[ShapeId]) {
        let mut doc = self.doc();
        let existing: Vec<ShapeId> = ids
            .iter()
            .filter(|id| doc.shapes.iter().any(|s| &s.id == *id))
            .cloned()
            .collect();
        doc.selection = existing;
    }

    fn selected_ids(&self) -> Vec<ShapeId> {
        self.doc().selection.clone()
    }

    fn zoom_to(&self, id: &ShapeId) {
        let mut doc = self.doc();
        let Some(center) = doc.shapes.iter().find(|s| &s.id == id).map(|s| s.bounds().center()) else {
            return;
        };
        let vp = doc.viewport;
        doc.viewport = Rect {
            x: center.x - vp.w / 2.0,
            y: center.y - vp.h / 2.0,
            ..vp
        };
    }

    fn viewport_bounds(&self) -> Rect {
        self.doc().viewport
    }

    async fn export_image(&self, id: &ShapeId) -> Result<ExportedImage, CanvasError> {
        let doc = self.doc();
        let shape = doc
            .shapes
            .iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| CanvasError::ShapeNotFound(id.clone()))?;
        let ShapeKind::Image { asset_id } = &shape.kind else {
            return Err(CanvasError::NotAnImage(id.clone()));
        };
        doc.assets
            .get(asset_id)
            .map(|a| ExportedImage {
                mime_type: a.mime_type.clone(),
                data: a.data.clone(),
            })
            .ok_or_else(|| CanvasError::AssetMissing(asset_id.clone()))
    }
}
