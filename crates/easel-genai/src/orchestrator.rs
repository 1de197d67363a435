//! End-to-end generation flows.
//!
//! Each call runs `Idle -> Composing -> AwaitingService -> Committing | Failed
//! -> Idle`. Placeholders are always gone when a call returns, whatever the
//! outcome. Calls are not cancelled when the selection changes; they finish
//! and apply their results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use easel_core::canvas::Canvas;
use easel_core::{AspectRatio, Asset, AssetId, GenerationSettings, NewShape, Shape, ShapeId, ShapeKind, Size};

use crate::engine::{
    Contents, CredentialSelector, GenerationService, InlineImage, ModelChoice, DESCRIBE_MODEL,
};
use crate::layout::Placer;
use crate::placeholder::{ActivePlaceholders, ANALYZING_LABEL, GENERATING_HQ_LABEL, GENERATING_LABEL};
use crate::prompt::{Composition, DESCRIBE_PROMPT};
use crate::GenerationError;

/// Width of description text shapes.
const DESCRIPTION_WIDTH: f64 = 320.0;
const CHARS_PER_LINE: usize = 40;
const LINE_HEIGHT: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Composing,
    AwaitingService,
    Committing,
    Failed,
    Idle,
}

fn enter(op: &'static str, phase: Phase) {
    tracing::debug!(op, ?phase, "phase");
}

/// What `generate` works from.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateInput {
    /// Shapes currently selected on the canvas.
    Selection(Vec<ShapeId>),
    /// Text typed into the prompt box.
    Prompt(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOutcome {
    /// Created image shapes, in the order the service returned them.
    pub shape_ids: Vec<ShapeId>,
    /// Shapes the results were linked from.
    pub source_ids: Vec<ShapeId>,
}

/// Releases the prompt busy flag on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handles to the independent describe tasks started by one `describe` call.
///
/// Dropping the batch does not stop the tasks.
pub struct DescribeBatch {
    tasks: Vec<(ShapeId, JoinHandle<bool>)>,
}

impl DescribeBatch {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn shape_ids(&self) -> impl Iterator<Item = &ShapeId> {
        self.tasks.iter().map(|(id, _)| id)
    }

    /// Wait for every task. Returns how many produced a description.
    pub async fn join(self) -> usize {
        let mut succeeded = 0;
        for (id, handle) in self.tasks {
            match handle.await {
                Ok(true) => succeeded += 1,
                Ok(false) => {}
                Err(e) => tracing::error!(shape = %id, error = %e, "describe task aborted"),
            }
        }
        succeeded
    }
}

/// Drives describe/generate flows against a canvas and a generation service.
#[derive(Clone)]
pub struct Orchestrator {
    canvas: Arc<dyn Canvas>,
    service: Arc<dyn GenerationService>,
    credentials: Option<Arc<dyn CredentialSelector>>,
    prompt_busy: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(canvas: Arc<dyn Canvas>, service: Arc<dyn GenerationService>) -> Self {
        Self {
            canvas,
            service,
            credentials: None,
            prompt_busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_credentials(mut self, selector: Arc<dyn CredentialSelector>) -> Self {
        self.credentials = Some(selector);
        self
    }

    pub fn canvas(&self) -> &Arc<dyn Canvas> {
        &self.canvas
    }

    /// True while a prompt-triggered generation is running.
    pub fn is_busy(&self) -> bool {
        self.prompt_busy.load(Ordering::Acquire)
    }

    // --- describe ---

    /// Start one describe task per selected image shape.
    ///
    /// Tasks run independently: a failure is logged and affects only its own
    /// shape. Must be called from within a Tokio runtime.
    pub fn describe(&self, selection: &[ShapeId]) -> DescribeBatch {
        let tasks = selection
            .iter()
            .filter(|id| {
                matches!(
                    self.canvas.shape(id).map(|s| s.kind),
                    Some(ShapeKind::Image { .. })
                )
            })
            .map(|id| {
                let this = self.clone();
                let task_id = id.clone();
                let handle = tokio::spawn(async move {
                    match this.describe_one(&task_id).await {
                        Ok(text_id) => {
                            tracing::info!(image = %task_id, text = %text_id, "image described");
                            true
                        }
                        Err(e) => {
                            tracing::error!(image = %task_id, error = %e, "describe failed");
                            false
                        }
                    }
                });
                (id.clone(), handle)
            })
            .collect();
        DescribeBatch { tasks }
    }

    async fn describe_one(&self, image_id: &ShapeId) -> Result<ShapeId, GenerationError> {
        enter("describe", Phase::Composing);
        let exported = self.canvas.export_image(image_id).await?;
        let placeholders = ActivePlaceholders::show(self.canvas.clone(), ANALYZING_LABEL, Some(image_id));

        enter("describe", Phase::AwaitingService);
        let contents = Contents {
            text: Some(DESCRIBE_PROMPT.to_string()),
            inline_image: Some(InlineImage {
                mime_type: exported.mime_type,
                data: exported.data,
            }),
        };
        let result = self.service.describe_content(DESCRIBE_MODEL, &contents).await;
        placeholders.clear();

        let description = match result {
            Ok(text) => text,
            Err(failure) => {
                enter("describe", Phase::Failed);
                return Err(GenerationError::Service(failure.0));
            }
        };

        enter("describe", Phase::Committing);
        let placer = Placer::new(self.canvas.as_ref());
        let text_id = placer.create_placed(
            NewShape::text(description.trim(), description_size(&description)),
            Some(image_id),
        );
        placer.link(image_id, &text_id);
        enter("describe", Phase::Idle);
        Ok(text_id)
    }

    // --- generate ---

    /// Generate from the prompt box. Only one runs at a time; a second call
    /// while one is in flight fails with [`GenerationError::Busy`].
    pub async fn generate_from_prompt(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<GenerateOutcome, GenerationError> {
        let _busy = BusyGuard::acquire(&self.prompt_busy).ok_or(GenerationError::Busy)?;
        self.generate(GenerateInput::Prompt(prompt.to_string()), settings).await
    }

    /// Generate images from a selection or prompt and insert them, linked to
    /// their sources. `settings` is read once, here.
    pub async fn generate(
        &self,
        input: GenerateInput,
        settings: &GenerationSettings,
    ) -> Result<GenerateOutcome, GenerationError> {
        enter("generate", Phase::Composing);
        let composition = match &input {
            GenerateInput::Selection(ids) => {
                let selection: Vec<Shape> = ids.iter().filter_map(|id| self.canvas.shape(id)).collect();
                Composition::from_selection(self.canvas.as_ref(), &selection)
            }
            GenerateInput::Prompt(text) => Composition::from_prompt(text),
        };
        let request = composition.to_payload(settings)?;
        let high_quality = request.settings.high_quality_mode;

        if high_quality {
            self.ensure_credential().await;
        }

        let label = if high_quality {
            GENERATING_HQ_LABEL
        } else {
            GENERATING_LABEL
        };
        let placeholders =
            ActivePlaceholders::show(self.canvas.clone(), label, composition.source_ids.first());

        enter("generate", Phase::AwaitingService);
        let choice = ModelChoice::for_settings(&request.settings);
        tracing::info!(
            model = choice.model,
            aspect_ratio = %request.settings.aspect_ratio,
            sources = composition.source_ids.len(),
            has_image = request.reference_image.is_some(),
            "requesting image generation"
        );
        let result = self
            .service
            .generate_content(choice.model, &request.contents(), &choice.config(&request.settings))
            .await;
        placeholders.clear();

        let images = match result {
            Ok(images) if images.is_empty() => Err(GenerationError::Service("no images returned".to_string())),
            Ok(images) => Ok(images),
            Err(failure) => Err(GenerationError::from_service(failure, high_quality)),
        };
        let images = match images {
            Ok(images) => images,
            Err(e) => {
                enter("generate", Phase::Failed);
                tracing::warn!(error = %e, "image generation failed");
                return Err(e);
            }
        };

        enter("generate", Phase::Committing);
        let shape_ids = self.commit_images(images, &composition.source_ids, request.settings.aspect_ratio);
        if let Some(last) = shape_ids.last() {
            self.canvas.select(std::slice::from_ref(last));
            self.canvas.zoom_to(last);
        }
        tracing::info!(count = shape_ids.len(), "generated images inserted");
        enter("generate", Phase::Idle);

        Ok(GenerateOutcome {
            shape_ids,
            source_ids: composition.source_ids,
        })
    }

    /// Create an asset and image shape per result, fanning out from the
    /// previous result, each linked from every source.
    fn commit_images(&self, images: Vec<InlineImage>, sources: &[ShapeId], ratio: AspectRatio) -> Vec<ShapeId> {
        let (width, height) = ratio.dimensions();
        let placer = Placer::new(self.canvas.as_ref());
        let mut created: Vec<ShapeId> = Vec::with_capacity(images.len());

        for image in images {
            let asset = Asset {
                id: AssetId::new(),
                data: image.data,
                width,
                height,
                mime_type: image.mime_type,
            };
            let asset_id = asset.id.clone();
            self.canvas.create_asset(asset);

            let anchor = created.last().or(sources.first());
            let id = placer.create_placed(
                NewShape::image(
                    asset_id,
                    Size {
                        w: width as f64,
                        h: height as f64,
                    },
                ),
                anchor,
            );
            for source in sources {
                placer.link(source, &id);
            }
            created.push(id);
        }
        created
    }

    /// Give the user a chance to pick a key for the high-quality model.
    /// Problems here are logged; the request goes ahead regardless.
    async fn ensure_credential(&self) {
        let Some(selector) = &self.credentials else {
            return;
        };
        match selector.has_selected_key().await {
            Ok(true) => {}
            Ok(false) => {
                if let Err(e) = selector.open_select_key().await {
                    tracing::warn!(error = %e, "credential selection failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "credential check unavailable"),
        }
    }
}

/// Rough box for a description: fixed width, height by wrapped line count.
fn description_size(text: &str) -> Size {
    let lines: usize = text
        .trim()
        .lines()
        .map(|l| l.chars().count().div_ceil(CHARS_PER_LINE).max(1))
        .sum();
    Size {
        w: DESCRIPTION_WIDTH,
        h: lines.max(1) as f64 * LINE_HEIGHT + 16.0,
    }
}
