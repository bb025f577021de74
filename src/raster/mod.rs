//! Raster engines
//!
//! A raster engine owns two equal-sized RGBA8 surfaces and composites one
//! brush dab per call with the pigment mixer, ping-ponging between them. The
//! GPU engine runs the dab as a compute pass; the CPU engine runs the same
//! arithmetic row-parallel with rayon. Callers hold a `Box<dyn RasterEngine>`
//! chosen once by [`select_engine`] and never branch on the backend again.

mod cpu;
mod error;
#[cfg(feature = "gpu")]
pub mod gpu;

pub use cpu::CpuRasterEngine;
pub use error::EngineInitError;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::brush::Stamp;
use crate::color::Color;
use crate::config::{BackendPreference, EngineConfig};

/// Lower bound of the mix strength
pub const MIN_MIX_STRENGTH: f32 = 0.01;
/// Upper bound of the mix strength
pub const MAX_MIX_STRENGTH: f32 = 1.0;
/// Mix strength of a fresh engine
pub const DEFAULT_MIX_STRENGTH: f32 = 0.2;
/// Stamp pixels below this alpha contribute nothing
pub const STAMP_ALPHA_EPSILON: f32 = 0.01;
/// Largest surface side accepted by the CPU engine
pub const MAX_SURFACE_SIDE: u32 = 16384;

/// Concrete backend behind a `RasterEngine`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Gpu,
    Cpu,
}

/// One pigment deposit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dab {
    /// Center in surface pixels
    pub x: f32,
    pub y: f32,
    /// Footprint side in pixels; the falloff radius is half of it
    pub diameter: f32,
    pub color: Color,
}

impl Dab {
    /// Whether any part of the footprint lands on a `width` x `height` surface
    pub fn touches(&self, width: u32, height: u32) -> bool {
        DabRegion::new(self, width, height).is_some()
    }
}

/// Compositing surface pair behind a common contract
pub trait RasterEngine: Send {
    fn backend(&self) -> Backend;

    /// Surface `(width, height)`
    fn size(&self) -> (u32, u32);

    /// Fill both surfaces with `base`
    fn clear(&mut self, base: Color);

    /// Mix `dab.color` into the current surface weighted by the stamp and the
    /// radial falloff, then swap surfaces.
    fn deposit_dab(&mut self, dab: &Dab, stamp: &Stamp);

    /// Copy the current surface into the presentation buffer
    fn present_to(&mut self, target: &mut PresentationBuffer);

    /// Overwrite the current surface from the presentation buffer.
    /// Only the overlapping area is copied when sizes differ.
    fn ingest_from(&mut self, source: &PresentationBuffer);

    /// Set the mix strength, clamped to 0.01 - 1.0
    fn set_mix_strength(&mut self, strength: f32);

    fn mix_strength(&self) -> f32;
}

/// Clamp a requested mix strength into the accepted range
pub fn clamp_mix_strength(strength: f32) -> f32 {
    if strength.is_nan() {
        return MIN_MIX_STRENGTH;
    }
    strength.clamp(MIN_MIX_STRENGTH, MAX_MIX_STRENGTH)
}

/// Pick the engine for `config`.
///
/// `auto` and `gpu` try the GPU first and fall back to the CPU engine when no
/// adapter is available. The error is only returned when the CPU engine
/// cannot be created either.
pub fn select_engine(config: &EngineConfig) -> Result<Box<dyn RasterEngine>, EngineInitError> {
    let (width, height) = (config.width, config.height);

    if config.backend != BackendPreference::Cpu {
        match try_gpu(width, height) {
            Ok(engine) => {
                tracing::info!("[Raster] Using GPU engine ({}x{})", width, height);
                return Ok(engine);
            }
            Err(e) => {
                tracing::warn!("[Raster] GPU engine unavailable, falling back to CPU: {}", e);
            }
        }
    }

    let engine = CpuRasterEngine::new(width, height)?;
    tracing::info!("[Raster] Using CPU engine ({}x{})", width, height);
    Ok(Box::new(engine))
}

#[cfg(feature = "gpu")]
fn try_gpu(width: u32, height: u32) -> Result<Box<dyn RasterEngine>, EngineInitError> {
    Ok(Box::new(gpu::GpuRasterEngine::new(width, height)?))
}

#[cfg(not(feature = "gpu"))]
fn try_gpu(_width: u32, _height: u32) -> Result<Box<dyn RasterEngine>, EngineInitError> {
    Err(EngineInitError::Unsupported(
        "built without the `gpu` feature".to_string(),
    ))
}

pub(crate) fn validate_dimensions(width: u32, height: u32, max: u32) -> Result<(), EngineInitError> {
    if width == 0 || height == 0 {
        return Err(EngineInitError::InvalidDimensions { width, height });
    }
    if width > max || height > max {
        return Err(EngineInitError::TooLarge { width, height, max });
    }
    Ok(())
}

/// Pixel footprint of a dab, clipped to the surface.
///
/// The unclipped box starts at `floor(center - diameter / 2)` and spans
/// `ceil(diameter)` pixels. Stamp pixels are mapped onto that box by nearest
/// neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DabRegion {
    /// Unclipped box origin
    pub origin_x: i64,
    pub origin_y: i64,
    /// Unclipped box side
    pub span: u32,
    /// Clipped area on the surface
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl DabRegion {
    pub fn new(dab: &Dab, width: u32, height: u32) -> Option<Self> {
        if !(dab.x.is_finite() && dab.y.is_finite() && dab.diameter.is_finite()) {
            return None;
        }
        if dab.diameter <= 0.0 {
            return None;
        }
        let half = dab.diameter / 2.0;
        let origin_x = (dab.x - half).floor() as i64;
        let origin_y = (dab.y - half).floor() as i64;
        let span = dab.diameter.ceil() as u32;

        let x0 = origin_x.max(0);
        let y0 = origin_y.max(0);
        let x1 = (origin_x + span as i64).min(width as i64);
        let y1 = (origin_y + span as i64).min(height as i64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        Some(Self {
            origin_x,
            origin_y,
            span,
            x0: x0 as u32,
            y0: y0 as u32,
            x1: x1 as u32,
            y1: y1 as u32,
        })
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    /// Stamp alpha for surface pixel `(px, py)`
    #[inline]
    pub fn stamp_alpha(&self, stamp: &Stamp, px: u32, py: u32) -> f32 {
        let side = stamp.side() as i64;
        let span = self.span.max(1) as i64;
        let sx = (px as i64 - self.origin_x) * side / span;
        let sy = (py as i64 - self.origin_y) * side / span;
        stamp.alpha_at(sx, sy)
    }
}

/// Externally visible RGBA8 raster the engine presents into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PresentationBuffer {
    /// Transparent black buffer
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    /// Buffer filled with an opaque color
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let px = color.to_rgba8();
        let mut pixels = Vec::with_capacity((width as usize) * (height as usize) * 4);
        for _ in 0..(width as usize) * (height as usize) {
            pixels.extend_from_slice(&px);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Raw RGBA at integer coordinates
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Color under a pointer position, `None` outside the buffer
    pub fn sample(&self, x: f32, y: f32) -> Option<Color> {
        if !(x.is_finite() && y.is_finite()) || x < 0.0 || y < 0.0 {
            return None;
        }
        let [r, g, b, _] = self.pixel(x.floor() as u32, y.floor() as u32)?;
        Some(Color::from_rgb8(r, g, b))
    }

    /// SHA-256 fingerprint of dimensions and pixels
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(&self.pixels);
        hex::encode(hasher.finalize())
    }

    /// Copy the overlapping area of `other` into `self`
    pub(crate) fn copy_overlap_from(&mut self, other_pixels: &[u8], other_width: u32, other_height: u32) {
        let w = self.width.min(other_width) as usize * 4;
        let h = self.height.min(other_height) as usize;
        let dst_stride = self.width as usize * 4;
        let src_stride = other_width as usize * 4;
        for y in 0..h {
            self.pixels[y * dst_stride..y * dst_stride + w]
                .copy_from_slice(&other_pixels[y * src_stride..y * src_stride + w]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_mix_strength() {
        assert_eq!(clamp_mix_strength(0.0), MIN_MIX_STRENGTH);
        assert_eq!(clamp_mix_strength(5.0), MAX_MIX_STRENGTH);
        assert_eq!(clamp_mix_strength(0.4), 0.4);
        assert_eq!(clamp_mix_strength(f32::NAN), MIN_MIX_STRENGTH);
    }

    #[test]
    fn test_dab_region_centered() {
        let dab = Dab {
            x: 50.0,
            y: 50.0,
            diameter: 30.0,
            color: Color::BLACK,
        };
        let region = DabRegion::new(&dab, 100, 100).unwrap();
        assert_eq!((region.origin_x, region.origin_y, region.span), (35, 35, 30));
        assert_eq!((region.x0, region.y0, region.x1, region.y1), (35, 35, 65, 65));
    }

    #[test]
    fn test_dab_region_clips_and_rejects() {
        let dab = Dab {
            x: 2.0,
            y: 2.0,
            diameter: 10.0,
            color: Color::BLACK,
        };
        let region = DabRegion::new(&dab, 100, 100).unwrap();
        assert_eq!((region.x0, region.y0, region.width(), region.height()), (0, 0, 7, 7));

        let outside = Dab { x: -50.0, ..dab };
        assert!(DabRegion::new(&outside, 100, 100).is_none());
        let nan = Dab { x: f32::NAN, ..dab };
        assert!(DabRegion::new(&nan, 100, 100).is_none());
    }

    #[test]
    fn test_presentation_sample_and_digest() {
        let bg = Color::new(0.973, 0.973, 0.961);
        let a = PresentationBuffer::filled(4, 3, bg);
        assert_eq!(a.sample(1.7, 2.2).map(|c| c.to_rgb8()), Some(bg.to_rgb8()));
        assert!(a.sample(4.0, 0.0).is_none());
        assert!(a.sample(-0.5, 0.0).is_none());

        let mut b = a.clone();
        assert_eq!(a.digest(), b.digest());
        b.pixels_mut()[0] = 0;
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_cpu_only_selection() {
        let config = EngineConfig {
            width: 16,
            height: 8,
            backend: BackendPreference::Cpu,
            ..Default::default()
        };
        let engine = select_engine(&config).unwrap();
        assert_eq!(engine.backend(), Backend::Cpu);
        assert_eq!(engine.size(), (16, 8));
    }

    #[test]
    fn test_selection_rejects_empty_surface() {
        let config = EngineConfig {
            width: 0,
            height: 8,
            backend: BackendPreference::Cpu,
            ..Default::default()
        };
        assert!(matches!(
            select_engine(&config),
            Err(EngineInitError::InvalidDimensions { .. })
        ));
    }
}
