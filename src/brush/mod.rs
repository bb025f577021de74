//! Brush module - brush descriptions, stamp generation and dab spacing

mod interpolation;
mod stamp;

pub use interpolation::{interpolate_dabs, path_length, segment_samples};
pub use stamp::{generate, stamp_seed, Stamp, StampSource};

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// A 2-D sample in surface pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    /// Pen pressure if the input device reported one (recorded, not yet used)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f32>,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            pressure: None,
        }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Procedural brush tip shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrushType {
    /// Solid disc
    Circle,
    /// Disc fading from opaque center to transparent rim
    Soft,
    /// Translucent blob cluster
    #[default]
    Watercolor,
    /// Dots scattered around a ring
    Splatter,
    /// Rectangle tilted by 15 degrees
    Flat,
    /// Dense scatter of small dots
    Dry,
}

impl BrushType {
    pub const ALL: [BrushType; 6] = [
        BrushType::Circle,
        BrushType::Soft,
        BrushType::Watercolor,
        BrushType::Splatter,
        BrushType::Flat,
        BrushType::Dry,
    ];

    /// Whether stamps of this type depend on the stamp seed
    pub fn is_randomized(&self) -> bool {
        matches!(
            self,
            BrushType::Watercolor | BrushType::Splatter | BrushType::Dry
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrushType::Circle => "circle",
            BrushType::Soft => "soft",
            BrushType::Watercolor => "watercolor",
            BrushType::Splatter => "splatter",
            BrushType::Flat => "flat",
            BrushType::Dry => "dry",
        }
    }
}

impl fmt::Display for BrushType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The active brush: a procedural type or a custom tip image
#[derive(Clone)]
pub struct BrushSpec {
    pub brush_type: BrushType,
    /// Brush size in pixels (stamp side is twice this)
    pub size: f32,
    /// When set, the stamp is this image resampled; procedural generation is skipped
    pub custom_image: Option<Arc<RgbaImage>>,
}

impl BrushSpec {
    pub fn new(brush_type: BrushType, size: f32) -> Self {
        Self {
            brush_type,
            size,
            custom_image: None,
        }
    }

    pub fn with_image(mut self, image: Arc<RgbaImage>) -> Self {
        self.custom_image = Some(image);
        self
    }
}

impl fmt::Debug for BrushSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrushSpec")
            .field("brush_type", &self.brush_type)
            .field("size", &self.size)
            .field(
                "custom_image",
                &self.custom_image.as_ref().map(|img| img.dimensions()),
            )
            .finish()
    }
}

/// Persisted brush preferences
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrushSettings {
    pub brush_type: BrushType,
    pub brush_size: f32,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            brush_type: BrushType::Watercolor,
            brush_size: 15.0,
        }
    }
}
