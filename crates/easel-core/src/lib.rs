pub mod canvas;
pub mod settings;
pub mod style;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Identifiers ---

/// Identifier of a shape owned by the canvas, e.g. "shape:3f2a...".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(String);

impl ShapeId {
    pub fn new() -> Self {
        Self(format!("shape:{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ShapeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ShapeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new() -> Self {
        Self(format!("asset:{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Geometry ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

/// Axis-aligned bounding box in page coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(position: Position, size: Size) -> Self {
        Self {
            x: position.x,
            y: position.y,
            w: size.w,
            h: size.h,
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.w
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.h
    }

    pub fn center(&self) -> Position {
        Position {
            x: self.x + self.w / 2.0,
            y: self.y + self.h / 2.0,
        }
    }

    /// Strict overlap: rectangles that only share an edge do not collide.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }
}

// --- Shapes ---

/// Rich text content of a text shape, one entry per paragraph.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RichText {
    pub paragraphs: Vec<String>,
}

impl RichText {
    pub fn from_plain(text: &str) -> Self {
        Self {
            paragraphs: text.lines().map(|l| l.to_string()).collect(),
        }
    }

    /// Paragraphs joined with newlines.
    pub fn plain_text(&self) -> String {
        self.paragraphs.join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.paragraphs.iter().all(|p| p.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ShapeKind {
    /// Text shape. `transient` marks in-flight placeholders.
    Text { text: RichText, transient: bool },
    Image { asset_id: AssetId },
    /// Directed link from a source shape to a shape derived from it.
    Arrow { from: ShapeId, to: ShapeId },
    Other { type_name: String },
}

impl ShapeKind {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ShapeKind::Text { transient: true, .. })
    }

    pub fn is_link(&self) -> bool {
        matches!(self, ShapeKind::Arrow { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: ShapeId,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    pub kind: ShapeKind,
}

impl Shape {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.position, self.size)
    }
}

/// A shape about to be created. The id is chosen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShape {
    pub id: ShapeId,
    pub position: Position,
    pub size: Size,
    pub kind: ShapeKind,
}

impl NewShape {
    pub fn text(text: &str, size: Size) -> Self {
        Self {
            id: ShapeId::new(),
            position: Position::default(),
            size,
            kind: ShapeKind::Text {
                text: RichText::from_plain(text),
                transient: false,
            },
        }
    }

    pub fn placeholder(label: &str, size: Size) -> Self {
        Self {
            id: ShapeId::new(),
            position: Position::default(),
            size,
            kind: ShapeKind::Text {
                text: RichText::from_plain(label),
                transient: true,
            },
        }
    }

    pub fn image(asset_id: AssetId, size: Size) -> Self {
        Self {
            id: ShapeId::new(),
            position: Position::default(),
            size,
            kind: ShapeKind::Image { asset_id },
        }
    }

    pub fn into_shape(self) -> Shape {
        Shape {
            id: self.id,
            position: self.position,
            size: self.size,
            kind: self.kind,
        }
    }
}

// --- Assets ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: AssetId,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
}

impl Asset {
    /// Inline `data:` URL form used as the asset source.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(raw.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

// --- Generation settings ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "9:16")]
    Tall,
    #[default]
    #[serde(rename = "16:9")]
    Wide,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Landscape,
        AspectRatio::Tall,
        AspectRatio::Wide,
    ];

    /// Ratio string as the generation service expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Tall => "9:16",
            AspectRatio::Wide => "16:9",
        }
    }

    /// Pixel size of the image shape placed for this ratio.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (512, 512),
            AspectRatio::Landscape => (640, 480),
            AspectRatio::Portrait => (480, 640),
            AspectRatio::Tall => (360, 640),
            AspectRatio::Wide => (640, 360),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub system_prompt: String,
    pub aspect_ratio: AspectRatio,
    pub high_quality_mode: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            system_prompt: style::DEFAULT_SYSTEM_PROMPT.to_string(),
            aspect_ratio: AspectRatio::Wide,
            high_quality_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rects_sharing_an_edge_do_not_overlap() {
        let a = Rect { x: 0.0, y: 0.0, w: 100.0, h: 100.0 };
        let b = Rect { x: 100.0, y: 0.0, w: 50.0, h: 50.0 };
        assert!(!a.overlaps(&b));
        let c = Rect { x: 99.0, y: 99.0, w: 10.0, h: 10.0 };
        assert!(a.overlaps(&c));
    }

    #[test]
    fn rich_text_joins_paragraphs_with_newlines() {
        let text = RichText::from_plain("a cat\nin a garden");
        assert_eq!(text.paragraphs.len(), 2);
        assert_eq!(text.plain_text(), "a cat\nin a garden");
        assert!(RichText::from_plain("  \n ").is_blank());
    }

    #[test]
    fn aspect_ratio_serializes_as_ratio_string() {
        let json = serde_json::to_string(&AspectRatio::Tall).unwrap();
        assert_eq!(json, "\"9:16\"");
        let back: AspectRatio = serde_json::from_str("\"4:3\"").unwrap();
        assert_eq!(back, AspectRatio::Landscape);
    }

    #[test]
    fn aspect_ratio_dimension_table() {
        let dims: Vec<(u32, u32)> = AspectRatio::ALL.iter().map(|r| r.dimensions()).collect();
        assert_eq!(
            dims,
            vec![(512, 512), (480, 640), (640, 480), (360, 640), (640, 360)]
        );
        assert_eq!(AspectRatio::default().dimensions(), (640, 360));
    }

    #[test]
    fn settings_serialize_with_camel_case_keys() {
        let settings = GenerationSettings {
            system_prompt: "flat colors".to_string(),
            aspect_ratio: AspectRatio::Square,
            high_quality_mode: true,
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "systemPrompt": "flat colors",
                "aspectRatio": "1:1",
                "highQualityMode": true,
            })
        );
    }

    #[test]
    fn asset_data_url_is_base64_encoded() {
        let asset = Asset {
            id: AssetId::from("asset:1"),
            data: b"png".to_vec(),
            width: 1,
            height: 1,
            mime_type: "image/png".to_string(),
        };
        assert_eq!(asset.data_url(), "data:image/png;base64,cG5n");
    }
}
