//! Smudge operator
//!
//! Walks a pointer segment in small steps, picks up the presented color at
//! each step and re-deposits it a short distance further along the drag
//! direction. Every dab is presented before the next sample is read, so the
//! result depends on the path and has to be replayed step by step.

use crate::brush::{segment_samples, BrushSpec, Point, StampSource};
use crate::raster::{Dab, PresentationBuffer, RasterEngine};

/// Smudge state for one gesture
#[derive(Debug, Clone)]
pub struct SmudgeOperator {
    stamps: StampSource,
    size: f32,
    /// 0 - 100
    strength_percent: f32,
    sample_step: f32,
}

impl SmudgeOperator {
    pub fn new(brush: BrushSpec, strength_percent: f32, seed: u64, sample_step: f32) -> Self {
        let strength_percent = if strength_percent.is_finite() {
            strength_percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            size: brush.size,
            stamps: StampSource::new(brush, seed),
            strength_percent,
            sample_step: if sample_step > 0.0 { sample_step } else { 2.0 },
        }
    }

    /// Dabs deposited so far
    pub fn dab_count(&self) -> u64 {
        self.stamps.issued()
    }

    /// How far sampled color travels along the drag direction
    pub fn push_distance(&self) -> f32 {
        (self.size / 2.0) * (self.strength_percent / 100.0)
    }

    /// Smudge from `p1` towards `p2`. Returns the number of dabs deposited.
    pub fn smudge_segment(
        &mut self,
        engine: &mut dyn RasterEngine,
        presentation: &mut PresentationBuffer,
        p1: Point,
        p2: Point,
    ) -> usize {
        if !(p1.is_finite() && p2.is_finite()) {
            return 0;
        }
        let length = p1.distance(&p2);
        if length <= f32::EPSILON {
            return 0;
        }
        let dir_x = (p2.x - p1.x) / length;
        let dir_y = (p2.y - p1.y) / length;
        let push = self.push_distance();

        let mut deposited = 0;
        for sample in segment_samples(p1, p2, self.sample_step) {
            let Some(color) = presentation.sample(sample.x, sample.y) else {
                continue;
            };
            let dab = Dab {
                x: sample.x + dir_x * push,
                y: sample.y + dir_y * push,
                diameter: self.size * 2.0,
                color,
            };
            let stamp = self.stamps.next_stamp();
            engine.deposit_dab(&dab, &stamp);
            engine.present_to(presentation);
            deposited += 1;
        }
        deposited
    }
}
