//! Shared fixtures: a scripted generation service and canvas helpers.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use easel_core::canvas::{Canvas, MemoryCanvas};
use easel_core::{Asset, AssetId, NewShape, Position, Rect, ShapeId, ShapeKind, Size};
use easel_genai::engine::{Contents, CredentialSelector, GenerateConfig, GenerationService, InlineImage, ServiceFailure};
use easel_genai::Orchestrator;

pub const VIEWPORT: Rect = Rect {
    x: 0.0,
    y: 0.0,
    w: 1600.0,
    h: 1000.0,
};

/// Image bytes that make the fake describe call fail.
pub const BROKEN_IMAGE: &[u8] = b"broken";

#[derive(Debug, Clone)]
pub struct Call {
    pub model: String,
    pub contents: Contents,
    pub config: Option<GenerateConfig>,
    /// Placeholder labels on the canvas when the call arrived.
    pub placeholders: Vec<String>,
}

/// Pauses `generate_content` until released, to hold a request in flight.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

pub struct FakeService {
    canvas: Arc<MemoryCanvas>,
    images: usize,
    failure: Option<String>,
    gate: Option<Arc<Gate>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeService {
    pub fn new(canvas: Arc<MemoryCanvas>) -> Self {
        Self {
            canvas,
            images: 1,
            failure: None,
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(mut self, images: usize) -> Self {
        self.images = images;
        self
    }

    pub fn failing(mut self, msg: &str) -> Self {
        self.failure = Some(msg.to_string());
        self
    }

    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, model: &str, contents: &Contents, config: Option<&GenerateConfig>) {
        let placeholders = self
            .canvas
            .shapes()
            .into_iter()
            .filter_map(|s| match s.kind {
                ShapeKind::Text { text, transient: true } => Some(text.plain_text()),
                _ => None,
            })
            .collect();
        self.calls.lock().unwrap().push(Call {
            model: model.to_string(),
            contents: contents.clone(),
            config: config.cloned(),
            placeholders,
        });
    }
}

#[async_trait]
impl GenerationService for FakeService {
    async fn generate_content(
        &self,
        model: &str,
        contents: &Contents,
        config: &GenerateConfig,
    ) -> Result<Vec<InlineImage>, ServiceFailure> {
        self.record(model, contents, Some(config));
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if let Some(msg) = &self.failure {
            return Err(ServiceFailure::new(msg.clone()));
        }
        Ok((0..self.images)
            .map(|i| InlineImage {
                mime_type: "image/png".to_string(),
                data: format!("image-{i}").into_bytes(),
            })
            .collect())
    }

    async fn describe_content(&self, model: &str, contents: &Contents) -> Result<String, ServiceFailure> {
        self.record(model, contents, None);
        tokio::task::yield_now().await;
        let data = contents
            .inline_image
            .as_ref()
            .map(|i| i.data.clone())
            .unwrap_or_default();
        if data == BROKEN_IMAGE {
            return Err(ServiceFailure::new("model overloaded"));
        }
        Ok(format!("A picture of {}", String::from_utf8_lossy(&data)))
    }
}

/// Credential selector that reports no key and counts prompts.
#[derive(Default)]
pub struct NoKeySelector {
    pub opened: Mutex<usize>,
}

#[async_trait]
impl CredentialSelector for NoKeySelector {
    async fn has_selected_key(&self) -> Result<bool, ServiceFailure> {
        Ok(false)
    }

    async fn open_select_key(&self) -> Result<(), ServiceFailure> {
        *self.opened.lock().unwrap() += 1;
        Ok(())
    }
}

pub fn canvas() -> Arc<MemoryCanvas> {
    Arc::new(MemoryCanvas::new(VIEWPORT))
}

pub fn orchestrator(canvas: &Arc<MemoryCanvas>, service: &Arc<FakeService>) -> Orchestrator {
    Orchestrator::new(canvas.clone(), service.clone())
}

pub fn add_text(canvas: &MemoryCanvas, text: &str, x: f64, y: f64) -> ShapeId {
    let mut shape = NewShape::text(text, Size { w: 200.0, h: 60.0 });
    shape.position = Position { x, y };
    canvas.create_shape(shape)
}

pub fn add_image(canvas: &MemoryCanvas, bytes: &[u8], x: f64, y: f64) -> ShapeId {
    add_image_as(canvas, bytes, "image/png", x, y)
}

pub fn add_image_as(canvas: &MemoryCanvas, bytes: &[u8], mime_type: &str, x: f64, y: f64) -> ShapeId {
    let asset = Asset {
        id: AssetId::new(),
        data: bytes.to_vec(),
        width: 300,
        height: 200,
        mime_type: mime_type.to_string(),
    };
    canvas.create_asset(asset.clone());
    let mut shape = NewShape::image(asset.id, Size { w: 300.0, h: 200.0 });
    shape.position = Position { x, y };
    canvas.create_shape(shape)
}

pub fn image_count(canvas: &MemoryCanvas) -> usize {
    canvas.count_where(|s| matches!(s.kind, ShapeKind::Image { .. }))
}

pub fn text_shapes(canvas: &MemoryCanvas) -> Vec<(ShapeId, String)> {
    canvas
        .shapes()
        .into_iter()
        .filter_map(|s| match s.kind {
            ShapeKind::Text { text, transient: false } => Some((s.id, text.plain_text())),
            _ => None,
        })
        .collect()
}

pub fn placeholder_labels(canvas: &MemoryCanvas) -> Vec<String> {
    canvas
        .shapes()
        .into_iter()
        .filter_map(|s| match s.kind {
            ShapeKind::Text { text, transient: true } => Some(text.plain_text()),
            _ => None,
        })
        .collect()
}
