//! CPU raster engine
//!
//! Two RGBA8 buffers; each dab is composited row-parallel into the back
//! buffer, the buffers swap, and the dab area is copied back so both stay
//! identical outside a dab in flight. Falloff is linear in distance.

use rayon::prelude::*;

use super::{
    clamp_mix_strength, validate_dimensions, Backend, Dab, DabRegion, EngineInitError,
    PresentationBuffer, RasterEngine, DEFAULT_MIX_STRENGTH, MAX_SURFACE_SIDE,
    STAMP_ALPHA_EPSILON,
};
use crate::brush::Stamp;
use crate::color::{pigment_mix, Color};

pub struct CpuRasterEngine {
    width: u32,
    height: u32,
    surfaces: [Vec<u8>; 2],
    /// Index of the current (presentable) surface
    current: usize,
    mix_strength: f32,
}

impl CpuRasterEngine {
    pub fn new(width: u32, height: u32) -> Result<Self, EngineInitError> {
        validate_dimensions(width, height, MAX_SURFACE_SIDE)?;
        let len = (width as usize) * (height as usize) * 4;
        Ok(Self {
            width,
            height,
            surfaces: [vec![0; len], vec![0; len]],
            current: 0,
            mix_strength: DEFAULT_MIX_STRENGTH,
        })
    }

    /// Current surface bytes
    pub fn current_pixels(&self) -> &[u8] {
        &self.surfaces[self.current]
    }

    fn stride(&self) -> usize {
        self.width as usize * 4
    }
}

impl RasterEngine for CpuRasterEngine {
    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, base: Color) {
        let px = base.to_rgba8();
        for surface in &mut self.surfaces {
            surface.par_chunks_exact_mut(4).for_each(|p| p.copy_from_slice(&px));
        }
    }

    fn deposit_dab(&mut self, dab: &Dab, stamp: &Stamp) {
        let Some(region) = DabRegion::new(dab, self.width, self.height) else {
            return;
        };
        let stride = self.stride();
        let radius = dab.diameter / 2.0;
        let strength = self.mix_strength;
        let color = dab.color;

        let (front, back) = self.surfaces.split_at_mut(1);
        let (current, target) = if self.current == 0 {
            (&front[0], &mut back[0])
        } else {
            (&back[0], &mut front[0])
        };

        let row_start = region.y0 as usize * stride;
        let row_end = region.y1 as usize * stride;
        target[row_start..row_end]
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(row, dst_row)| {
                let py = region.y0 + row as u32;
                let src_row = &current[py as usize * stride..(py as usize + 1) * stride];
                for px in region.x0..region.x1 {
                    let i = px as usize * 4;
                    dst_row[i..i + 4].copy_from_slice(&src_row[i..i + 4]);

                    let alpha = region.stamp_alpha(stamp, px, py);
                    if alpha < STAMP_ALPHA_EPSILON {
                        continue;
                    }
                    let dx = px as f32 - dab.x;
                    let dy = py as f32 - dab.y;
                    let distance = (dx * dx + dy * dy).sqrt();
                    let falloff = (1.0 - distance / radius).max(0.0);
                    let amount = falloff * alpha * strength;
                    if amount <= 0.0 {
                        continue;
                    }

                    let existing = Color::from_rgb8(src_row[i], src_row[i + 1], src_row[i + 2]);
                    let mixed = pigment_mix(existing, color, amount).to_rgba8();
                    dst_row[i..i + 4].copy_from_slice(&mixed);
                }
            });

        self.current = 1 - self.current;

        // Bring the stale surface back in sync over the dab area
        let (front, back) = self.surfaces.split_at_mut(1);
        let (current, stale) = if self.current == 0 {
            (&front[0], &mut back[0])
        } else {
            (&back[0], &mut front[0])
        };
        let x_start = region.x0 as usize * 4;
        let x_end = region.x1 as usize * 4;
        for py in region.y0 as usize..region.y1 as usize {
            let row = py * stride;
            stale[row + x_start..row + x_end].copy_from_slice(&current[row + x_start..row + x_end]);
        }
    }

    fn present_to(&mut self, target: &mut PresentationBuffer) {
        target.copy_overlap_from(&self.surfaces[self.current], self.width, self.height);
    }

    fn ingest_from(&mut self, source: &PresentationBuffer) {
        let mut staged = PresentationBuffer::new(self.width, self.height);
        staged.copy_overlap_from(&self.surfaces[self.current], self.width, self.height);
        staged.copy_overlap_from(source.pixels(), source.width(), source.height());
        for surface in &mut self.surfaces {
            surface.copy_from_slice(staged.pixels());
        }
    }

    fn set_mix_strength(&mut self, strength: f32) {
        self.mix_strength = clamp_mix_strength(strength);
    }

    fn mix_strength(&self) -> f32 {
        self.mix_strength
    }
}
