//! Brush stamp generation
//!
//! A stamp is a square alpha mask, side `2 * size`, centered at
//! `(size, size)`. Shapes are rasterized with one pixel of edge coverage and
//! composited source-over inside the mask, the way a 2-D canvas would draw
//! them. Randomized shapes draw their jitter from a `ChaCha8Rng` seeded per
//! dab, so the same `(type, size, seed)` always yields the same mask.

use std::f32::consts::{PI, TAU};

use image::imageops::{self, FilterType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{BrushSpec, BrushType};

/// Alpha mask for one dab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    side: u32,
    alpha: Vec<u8>,
}

impl Stamp {
    /// Build a stamp from raw alpha bytes (row-major, `side * side`)
    pub fn from_alpha(side: u32, alpha: Vec<u8>) -> Option<Self> {
        if side == 0 || alpha.len() != (side as usize) * (side as usize) {
            return None;
        }
        Some(Self { side, alpha })
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    /// Alpha at a stamp pixel, 0.0 outside the mask
    #[inline]
    pub fn alpha_at(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.side as i64 || y >= self.side as i64 {
            return 0.0;
        }
        self.alpha[(y as usize) * (self.side as usize) + x as usize] as f32 / 255.0
    }
}

/// Derive the stamp seed of one dab from its stroke seed
pub fn stamp_seed(stroke_seed: u64, dab_index: u64) -> u64 {
    // splitmix64 finalizer over the combined value
    let mut z = stroke_seed ^ dab_index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Generate the stamp for a brush at `size`.
///
/// A custom tip image bypasses procedural generation and is resampled to the
/// stamp side. `seed` only affects randomized brush types.
pub fn generate(size: f32, spec: &BrushSpec, seed: u64) -> Stamp {
    let size = if size.is_finite() { size.max(0.5) } else { 0.5 };
    let side = ((size * 2.0).round() as u32).max(1);

    if let Some(image) = &spec.custom_image {
        let resized = imageops::resize(image.as_ref(), side, side, FilterType::Triangle);
        let alpha = resized.pixels().map(|p| p.0[3]).collect();
        return Stamp { side, alpha };
    }

    let mut mask = Mask::new(side);
    let (cx, cy) = (size, size);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    match spec.brush_type {
        BrushType::Circle => {
            mask.fill_disc(cx, cy, size * 0.9, 1.0);
        }
        BrushType::Soft => {
            mask.fill_radial(cx, cy, size, &[(0.0, 1.0), (0.7, 0.5), (1.0, 0.0)]);
        }
        BrushType::Watercolor => {
            mask.fill_disc(cx, cy, size * 0.8, 0.8);
            for i in 0..5 {
                let angle = TAU * i as f32 / 5.0 + rng.gen_range(-0.2..0.2);
                let dist = size * 0.5 * rng.gen_range(0.85..1.15);
                mask.fill_disc(
                    cx + angle.cos() * dist,
                    cy + angle.sin() * dist,
                    size * 0.4,
                    0.3,
                );
            }
        }
        BrushType::Splatter => {
            for i in 0..12 {
                let angle = TAU * i as f32 / 12.0;
                let dist = size * (0.3 + rng.gen::<f32>() * 0.6);
                let dot = size * (0.15 + rng.gen::<f32>() * 0.25);
                mask.fill_disc(cx + angle.cos() * dist, cy + angle.sin() * dist, dot, 1.0);
            }
        }
        BrushType::Flat => {
            mask.fill_rotated_rect(cx, cy, size * 1.2, size * 0.4, PI / 12.0);
        }
        BrushType::Dry => {
            for _ in 0..40 {
                let angle = rng.gen::<f32>() * TAU;
                let dist = rng.gen::<f32>() * size * 0.9;
                let dot = size * (0.05 + rng.gen::<f32>() * 0.15);
                mask.fill_disc(cx + angle.cos() * dist, cy + angle.sin() * dist, dot, 0.8);
            }
        }
    }

    mask.into_stamp()
}

/// Stamps for the successive dabs of one stroke.
///
/// Deterministic shapes are generated once; randomized ones are regenerated
/// per dab from `stamp_seed(seed, index)`, so live drawing and replay that
/// walk the same dabs get the same masks.
#[derive(Debug, Clone)]
pub struct StampSource {
    spec: BrushSpec,
    seed: u64,
    fixed: Option<Stamp>,
    issued: u64,
}

impl StampSource {
    pub fn new(spec: BrushSpec, seed: u64) -> Self {
        let fixed = (spec.custom_image.is_some() || !spec.brush_type.is_randomized())
            .then(|| generate(spec.size, &spec, seed));
        Self {
            spec,
            seed,
            fixed,
            issued: 0,
        }
    }

    pub fn spec(&self) -> &BrushSpec {
        &self.spec
    }

    /// Number of stamps handed out so far
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Stamp for the next dab
    pub fn next_stamp(&mut self) -> Stamp {
        let index = self.issued;
        self.issued += 1;
        match &self.fixed {
            Some(stamp) => stamp.clone(),
            None => generate(self.spec.size, &self.spec, stamp_seed(self.seed, index)),
        }
    }
}

/// Floating point scratch mask used while rasterizing shapes
struct Mask {
    side: u32,
    alpha: Vec<f32>,
}

impl Mask {
    fn new(side: u32) -> Self {
        Self {
            side,
            alpha: vec![0.0; (side as usize) * (side as usize)],
        }
    }

    /// Source-over a shape given its per-pixel coverage function
    fn composite(&mut self, opacity: f32, coverage: impl Fn(f32, f32) -> f32) {
        let side = self.side as usize;
        for (idx, dst) in self.alpha.iter_mut().enumerate() {
            let px = (idx % side) as f32 + 0.5;
            let py = (idx / side) as f32 + 0.5;
            let src = coverage(px, py).clamp(0.0, 1.0) * opacity;
            if src > 0.0 {
                *dst = src + *dst * (1.0 - src);
            }
        }
    }

    fn fill_disc(&mut self, cx: f32, cy: f32, radius: f32, opacity: f32) {
        self.composite(opacity, |px, py| {
            let d = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
            radius - d + 0.5
        });
    }

    /// Radial gradient over the whole mask; stops are (offset, alpha) pairs
    fn fill_radial(&mut self, cx: f32, cy: f32, radius: f32, stops: &[(f32, f32)]) {
        self.composite(1.0, |px, py| {
            let d = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
            gradient_at(stops, d / radius.max(f32::EPSILON))
        });
    }

    fn fill_rotated_rect(&mut self, cx: f32, cy: f32, half_w: f32, half_h: f32, angle: f32) {
        let (sin, cos) = angle.sin_cos();
        self.composite(1.0, |px, py| {
            let dx = px - cx;
            let dy = py - cy;
            // Rotate the sample into the rectangle's frame
            let u = dx * cos + dy * sin;
            let v = -dx * sin + dy * cos;
            (half_w - u.abs()).min(half_h - v.abs()) + 0.5
        });
    }

    fn into_stamp(self) -> Stamp {
        let alpha = self
            .alpha
            .iter()
            .map(|a| (a * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect();
        Stamp {
            side: self.side,
            alpha,
        }
    }
}

fn gradient_at(stops: &[(f32, f32)], offset: f32) -> f32 {
    let Some(&(first_offset, first_alpha)) = stops.first() else {
        return 0.0;
    };
    if offset <= first_offset {
        return first_alpha;
    }
    for pair in stops.windows(2) {
        let (o0, a0) = pair[0];
        let (o1, a1) = pair[1];
        if offset <= o1 {
            let t = (offset - o0) / (o1 - o0).max(f32::EPSILON);
            return a0 + (a1 - a0) * t;
        }
    }
    stops.last().map(|&(_, a)| a).unwrap_or(0.0)
}
