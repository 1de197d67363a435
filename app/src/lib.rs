use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easel_core::canvas::{Canvas, MemoryCanvas};
use easel_core::settings::{data_dir, FileStore, SettingsStore};
use easel_core::{AspectRatio, Asset, AssetId, GenerationSettings, NewShape, ShapeId, ShapeKind, Size};
use easel_genai::gemini::{api_key_from_env, DEFAULT_API_BASE};
use easel_genai::layout::Placer;
use easel_genai::{GeminiClient, Orchestrator};

pub const USAGE: &str = "\
Usage:
  easel generate <prompt...>          generate images from a prompt
  easel describe <image-file...>      describe one or more images
  easel settings                      print the current generation settings
  easel settings set <key=value...>   update settings (keys: aspect, hq, prompt)";

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "easel_app=info,easel_genai=info,easel_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// --- Configuration ---

/// Runtime configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let api_key = api_key_from_env();
        if api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; generation requests will fail");
        }
        Self {
            api_key,
            api_base: std::env::var("GEMINI_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            data_dir: std::env::var_os("EASEL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(data_dir),
            out_dir: std::env::var_os("EASEL_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    pub fn client(&self) -> GeminiClient {
        GeminiClient::with_base(&self.api_base, self.api_key.clone())
    }

    pub fn settings_store(&self) -> SettingsStore<FileStore> {
        SettingsStore::new(FileStore::new(&self.data_dir))
    }
}

// --- Commands ---

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Generate(String),
    Describe(Vec<PathBuf>),
    ShowSettings,
    SetSettings(Vec<(String, String)>),
}

impl Command {
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let (name, rest) = args.split_first().ok_or_else(|| anyhow!("{USAGE}"))?;
        match name.as_str() {
            "generate" => {
                let prompt = rest.join(" ");
                if prompt.trim().is_empty() {
                    bail!("generate needs a prompt\n\n{USAGE}");
                }
                Ok(Command::Generate(prompt))
            }
            "describe" => {
                if rest.is_empty() {
                    bail!("describe needs at least one image file\n\n{USAGE}");
                }
                Ok(Command::Describe(rest.iter().map(PathBuf::from).collect()))
            }
            "settings" => match rest.split_first() {
                None => Ok(Command::ShowSettings),
                Some((sub, pairs)) if sub == "set" && !pairs.is_empty() => {
                    let pairs = pairs
                        .iter()
                        .map(|p| {
                            p.split_once('=')
                                .map(|(k, v)| (k.to_string(), v.to_string()))
                                .ok_or_else(|| anyhow!("expected key=value, got '{p}'"))
                        })
                        .collect::<anyhow::Result<Vec<_>>>()?;
                    Ok(Command::SetSettings(pairs))
                }
                Some(_) => bail!("{USAGE}"),
            },
            other => bail!("unknown command: {other}\n\n{USAGE}"),
        }
    }
}

/// Apply one `key=value` pair to the settings.
pub fn apply_setting(settings: &mut GenerationSettings, key: &str, value: &str) -> anyhow::Result<()> {
    match key {
        "aspect" => {
            settings.aspect_ratio = AspectRatio::ALL
                .into_iter()
                .find(|r| r.as_str() == value)
                .ok_or_else(|| anyhow!("unknown aspect ratio '{value}' (use 1:1, 3:4, 4:3, 9:16 or 16:9)"))?;
        }
        "hq" => {
            settings.high_quality_mode = match value {
                "on" | "true" | "1" => true,
                "off" | "false" | "0" => false,
                _ => bail!("hq must be on or off, got '{value}'"),
            };
        }
        "prompt" => {
            if value.trim().is_empty() {
                settings.system_prompt = GenerationSettings::default().system_prompt;
            } else {
                settings.system_prompt = value.to_string();
            }
        }
        other => bail!("unknown setting '{other}' (keys: aspect, hq, prompt)"),
    }
    Ok(())
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

/// Longest side of an image shape placed on the canvas by `describe`.
pub const IMAGE_DISPLAY_SIDE: f64 = 512.0;

/// Load an image file as an asset. Format and pixel size come from the file
/// header, not the extension.
pub fn load_image_asset(path: &Path) -> anyhow::Result<Asset> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let reader = image::ImageReader::new(std::io::Cursor::new(&data))
        .with_guessed_format()
        .with_context(|| format!("reading {}", path.display()))?;
    let format = reader
        .format()
        .ok_or_else(|| anyhow!("{} is not a supported image", path.display()))?;
    let (width, height) = reader
        .into_dimensions()
        .with_context(|| format!("reading image header of {}", path.display()))?;
    Ok(Asset {
        id: AssetId::new(),
        data,
        width,
        height,
        mime_type: format.to_mime_type().to_string(),
    })
}

/// Shape size for an asset: scaled so the longest side is
/// [`IMAGE_DISPLAY_SIDE`], keeping the aspect ratio.
pub fn display_size(asset: &Asset) -> Size {
    let (w, h) = (f64::from(asset.width.max(1)), f64::from(asset.height.max(1)));
    let scale = IMAGE_DISPLAY_SIDE / w.max(h);
    Size {
        w: w * scale,
        h: h * scale,
    }
}

/// Write the asset behind each image shape to `dir`. Returns the written paths.
pub fn write_results(canvas: &dyn Canvas, shape_ids: &[ShapeId], dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut written = Vec::new();
    for id in shape_ids {
        let Some(shape) = canvas.shape(id) else { continue };
        let ShapeKind::Image { asset_id } = shape.kind else { continue };
        let asset = canvas
            .asset(&asset_id)
            .ok_or_else(|| anyhow!("image {id} has no asset"))?;
        let stem = asset_id.as_str().trim_start_matches("asset:");
        let path = dir.join(format!("{stem}.{}", extension_for(&asset.mime_type)));
        std::fs::write(&path, &asset.data).with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Text shapes linked from `source`.
fn linked_texts(canvas: &dyn Canvas, source: &ShapeId) -> Vec<String> {
    canvas
        .shapes()
        .into_iter()
        .filter_map(|s| match s.kind {
            ShapeKind::Arrow { from, to } if &from == source => canvas.shape(&to),
            _ => None,
        })
        .filter_map(|s| match s.kind {
            ShapeKind::Text { text, transient: false } => Some(text.plain_text()),
            _ => None,
        })
        .collect()
}

pub async fn run(args: &[String]) -> anyhow::Result<()> {
    let command = Command::parse(args)?;
    let config = AppConfig::from_env();
    let store = config.settings_store();

    match command {
        Command::ShowSettings => {
            println!("{}", serde_json::to_string_pretty(&store.load())?);
        }
        Command::SetSettings(pairs) => {
            let mut settings = store.load();
            for (key, value) in &pairs {
                apply_setting(&mut settings, key, value)?;
            }
            store.try_save(&settings).context("saving settings")?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Command::Generate(prompt) => {
            if !store.has_seen_onboarding() {
                eprintln!("Tip: tune the style with `easel settings set prompt=...`, aspect and hq.");
                store.mark_onboarding_seen();
            }
            let settings = store.load();
            let canvas = Arc::new(MemoryCanvas::default());
            let orchestrator = Orchestrator::new(canvas.clone(), Arc::new(config.client()));

            let outcome = match orchestrator.generate_from_prompt(&prompt, &settings).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_credential() => {
                    bail!("{e}\nSelect an API key with access to the high-quality model (GEMINI_API_KEY), or run `easel settings set hq=off`.")
                }
                Err(e) => return Err(e.into()),
            };

            for path in write_results(canvas.as_ref(), &outcome.shape_ids, &config.out_dir)? {
                println!("{}", path.display());
            }
        }
        Command::Describe(paths) => {
            let canvas = Arc::new(MemoryCanvas::default());
            let orchestrator = Orchestrator::new(canvas.clone(), Arc::new(config.client()));
            let placer = Placer::new(canvas.as_ref());

            let mut images = Vec::with_capacity(paths.len());
            for path in &paths {
                let asset = load_image_asset(path)?;
                let size = display_size(&asset);
                let asset_id = asset.id.clone();
                canvas.create_asset(asset);
                let id = placer.create_placed(NewShape::image(asset_id, size), images.last());
                images.push(id);
            }

            let described = orchestrator.describe(&images).join().await;
            tracing::info!(described, total = images.len(), "describe finished");

            for (path, id) in paths.iter().zip(&images) {
                println!("== {}", path.display());
                match linked_texts(canvas.as_ref(), id).first() {
                    Some(text) => println!("{text}\n"),
                    None => println!("(no description)\n"),
                }
            }
        }
    }
    Ok(())
}
