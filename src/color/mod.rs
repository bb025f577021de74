//! Color types shared by the mixer, the raster engines and the interfaces.
//!
//! Colors are additive display colors with three normalized channels. At the
//! interfaces they also travel as `#RRGGBB` hex triplets.

mod mixing;

pub use mixing::{pigment_mix, Latent, LATENT_SIZE};

use serde::{Deserialize, Serialize};

/// An additive display color, each channel in 0.0 - 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    /// Create a color from normalized channels (not clamped)
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a color from 8-bit channels
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Quantize to 8-bit channels (round to nearest, clamped)
    pub fn to_rgb8(self) -> [u8; 3] {
        [quantize(self.r), quantize(self.g), quantize(self.b)]
    }

    /// Quantize to an opaque RGBA8 pixel
    pub fn to_rgba8(self) -> [u8; 4] {
        let [r, g, b] = self.to_rgb8();
        [r, g, b, 255]
    }

    /// Parse `#RRGGBB` or `RRGGBB` (case-insensitive)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self::from_rgb8(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Format as uppercase `#RRGGBB`
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }

    /// True when every channel is a finite number inside 0.0 - 1.0
    pub fn is_valid(&self) -> bool {
        [self.r, self.g, self.b]
            .iter()
            .all(|c| c.is_finite() && (0.0..=1.0).contains(c))
    }

    /// Clamp every channel into 0.0 - 1.0
    pub fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
        }
    }
}

#[inline]
fn quantize(channel: f32) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        let c = Color::from_hex("#F5E84C").unwrap();
        assert_eq!(c.to_rgb8(), [0xF5, 0xE8, 0x4C]);
        assert_eq!(Color::from_hex("ffffff"), Some(Color::WHITE));
        assert!(Color::from_hex("#FFF").is_none());
        assert!(Color::from_hex("#GG0000").is_none());
    }

    #[test]
    fn test_hex_formatting() {
        assert_eq!(Color::from_rgb8(0x1c, 0x35, 0x75).to_hex(), "#1C3575");
        assert_eq!(Color::new(0.973, 0.973, 0.961).to_hex(), "#F8F8F5");
    }

    #[test]
    fn test_validity() {
        assert!(Color::new(0.0, 0.5, 1.0).is_valid());
        assert!(!Color::new(1.2, 0.0, 0.0).is_valid());
        assert!(!Color::new(f32::NAN, 0.0, 0.0).is_valid());
        assert_eq!(Color::new(1.2, -0.1, 0.5).clamped(), Color::new(1.0, 0.0, 0.5));
    }
}
