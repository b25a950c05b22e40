use std::fmt;

use image::RgbaImage;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Axis-aligned field rectangle in base-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width as u64 && self.bottom() <= height as u64
    }
}

/// Origin of a field's synthetic value.
///
/// Serialized as `{"source": "builtin" | "custom", "value": "<generator id>"}`.
/// `"faker"` is accepted as an alias of `"builtin"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum ValueSource {
    #[serde(alias = "faker")]
    Builtin(String),
    Custom(String),
}

impl ValueSource {
    pub fn builtin(id: impl Into<String>) -> Self {
        ValueSource::Builtin(id.into())
    }

    pub fn custom(id: impl Into<String>) -> Self {
        ValueSource::Custom(id.into())
    }

    pub fn kind(&self) -> ValueSourceKind {
        match self {
            ValueSource::Builtin(_) => ValueSourceKind::Builtin,
            ValueSource::Custom(_) => ValueSourceKind::Custom,
        }
    }

    pub fn generator_id(&self) -> &str {
        match self {
            ValueSource::Builtin(id) | ValueSource::Custom(id) => id,
        }
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.generator_id())
    }
}

/// Registry a value source resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSourceKind {
    Builtin,
    Custom,
}

impl fmt::Display for ValueSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSourceKind::Builtin => f.write_str("builtin"),
            ValueSourceKind::Custom => f.write_str("custom"),
        }
    }
}

/// Declared region and value source of one template field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    pub bbox: BBox,
    #[serde(rename = "metatype")]
    pub value_source: ValueSource,
}

/// A base document image plus its ordered field schema.
///
/// Immutable after construction; workers only ever read it.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    image: RgbaImage,
    fields: IndexMap<String, FieldSpec>,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        image: RgbaImage,
        fields: IndexMap<String, FieldSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            image,
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Fields in declared order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
