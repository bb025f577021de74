//! Surface reconstruction from stroke records

use std::sync::Arc;
use std::time::Instant;

use image::RgbaImage;

use super::{HistoryLog, StrokeKind, StrokeRecord};
use crate::brush::{BrushSpec, Point, StampSource};
use crate::color::Color;
use crate::raster::{Dab, PresentationBuffer, RasterEngine};
use crate::smudge::SmudgeOperator;

/// Inputs replay needs besides the records themselves
#[derive(Debug, Clone)]
pub struct ReplayContext {
    /// Fill of a blank surface
    pub background: Color,
    /// Tip image used by records flagged `custom_image`
    pub custom_image: Option<Arc<RgbaImage>>,
    pub smudge_sample_step: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub applied: usize,
    pub skipped: usize,
}

/// Re-executes records against an engine
pub struct Replayer<'a> {
    engine: &'a mut dyn RasterEngine,
    presentation: &'a mut PresentationBuffer,
    ctx: &'a ReplayContext,
}

impl<'a> Replayer<'a> {
    pub fn new(
        engine: &'a mut dyn RasterEngine,
        presentation: &'a mut PresentationBuffer,
        ctx: &'a ReplayContext,
    ) -> Self {
        Self {
            engine,
            presentation,
            ctx,
        }
    }

    /// Clear, start from the log's base, apply every entry up to the cursor
    /// and present once.
    pub fn rebuild(&mut self, log: &HistoryLog) -> ReplayStats {
        let started = Instant::now();
        self.reset_to_base(log);

        let mut stats = ReplayStats::default();
        for record in log.applied() {
            self.apply_counted(record, &mut stats);
        }
        self.engine.present_to(self.presentation);

        tracing::debug!(
            "[Replay] Rebuilt {} entries ({} skipped) in {:?}",
            stats.applied,
            stats.skipped,
            started.elapsed()
        );
        stats
    }

    /// Fold `evicted` records into the log's base image, then put the
    /// current surface back.
    pub fn fold_into_base(&mut self, log: &mut HistoryLog, evicted: &[StrokeRecord]) {
        if evicted.is_empty() {
            return;
        }
        let (width, height) = self.engine.size();
        let mut current = PresentationBuffer::new(width, height);
        self.engine.present_to(&mut current);

        self.reset_to_base(log);
        let mut stats = ReplayStats::default();
        for record in evicted {
            self.apply_counted(record, &mut stats);
        }
        let mut base = PresentationBuffer::new(width, height);
        self.engine.present_to(&mut base);
        log.set_base(Some(base));

        self.engine.ingest_from(&current);
        self.engine.present_to(self.presentation);
        tracing::debug!("[Replay] Folded {} evicted entries into base", stats.applied);
    }

    /// Apply one record on top of the current surface
    pub fn apply(&mut self, record: &StrokeRecord) -> Result<(), String> {
        record.validate()?;
        match record.kind {
            StrokeKind::Init => {}
            StrokeKind::Clear => {
                self.engine.clear(record.color.unwrap_or(self.ctx.background));
            }
            StrokeKind::Brush => {
                let color = record.color.unwrap_or(Color::BLACK);
                let saved = self.engine.mix_strength();
                self.engine.set_mix_strength(record.mix_strength);
                let mut stamps = StampSource::new(brush_spec_for(record, self.ctx), record.seed);
                for point in &record.points {
                    deposit_brush_point(self.engine, &mut stamps, *point, color);
                }
                self.engine.set_mix_strength(saved);
            }
            StrokeKind::Smudge => {
                let saved = self.engine.mix_strength();
                self.engine.set_mix_strength(record.mix_strength);
                // Samples read the presented surface
                self.engine.present_to(self.presentation);
                let mut op = SmudgeOperator::new(
                    brush_spec_for(record, self.ctx),
                    record.smudge_strength,
                    record.seed,
                    self.ctx.smudge_sample_step,
                );
                for pair in record.points.windows(2) {
                    op.smudge_segment(self.engine, self.presentation, pair[0], pair[1]);
                }
                self.engine.set_mix_strength(saved);
            }
        }
        Ok(())
    }

    fn apply_counted(&mut self, record: &StrokeRecord, stats: &mut ReplayStats) {
        match self.apply(record) {
            Ok(()) => stats.applied += 1,
            Err(reason) => {
                tracing::warn!("[Replay] Skipping malformed {:?} record: {}", record.kind, reason);
                stats.skipped += 1;
            }
        }
    }

    fn reset_to_base(&mut self, log: &HistoryLog) {
        self.engine.clear(self.ctx.background);
        if let Some(base) = log.base() {
            self.engine.ingest_from(base);
        }
    }
}

/// Brush for a record: the custom tip when flagged and loaded, else procedural
pub fn brush_spec_for(record: &StrokeRecord, ctx: &ReplayContext) -> BrushSpec {
    let spec = BrushSpec::new(record.brush_type, record.brush_size);
    match (&ctx.custom_image, record.custom_image) {
        (Some(image), true) => spec.with_image(Arc::clone(image)),
        _ => spec,
    }
}

/// Deposit one brush dab; shared by live drawing and replay
pub fn deposit_brush_point(
    engine: &mut dyn RasterEngine,
    stamps: &mut StampSource,
    point: Point,
    color: Color,
) {
    let stamp = stamps.next_stamp();
    let dab = Dab {
        x: point.x,
        y: point.y,
        diameter: stamps.spec().size * 2.0,
        color,
    };
    engine.deposit_dab(&dab, &stamp);
}
