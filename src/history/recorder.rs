//! Gesture recorder: `Idle -> Recording -> Idle`

use super::{StrokeKind, StrokeRecord};
use crate::brush::{BrushType, Point};
use crate::color::Color;

/// Tool parameters captured when a gesture begins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSnapshot {
    pub brush_size: f32,
    pub brush_type: BrushType,
    pub mix_strength: f32,
    pub smudge_strength: f32,
    pub custom_image: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording(StrokeRecord),
}

#[derive(Debug, Default)]
pub struct StrokeRecorder {
    state: RecorderState,
}

impl StrokeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecorderState::Recording(_))
    }

    /// The in-progress record, if any
    pub fn draft(&self) -> Option<&StrokeRecord> {
        match &self.state {
            RecorderState::Recording(record) => Some(record),
            RecorderState::Idle => None,
        }
    }

    /// Start a gesture. A gesture still in progress is abandoned.
    pub fn begin_stroke(
        &mut self,
        kind: StrokeKind,
        color: Option<Color>,
        tools: &ToolSnapshot,
        seed: u64,
    ) {
        if let RecorderState::Recording(old) = &self.state {
            tracing::debug!(
                "[Recorder] Abandoning unfinished {:?} stroke ({} points)",
                old.kind,
                old.points.len()
            );
        }

        let record = StrokeRecord {
            kind,
            points: Vec::new(),
            color: if kind == StrokeKind::Brush { color } else { None },
            brush_size: tools.brush_size,
            brush_type: tools.brush_type,
            mix_strength: tools.mix_strength,
            smudge_strength: if kind == StrokeKind::Smudge {
                tools.smudge_strength
            } else {
                0.0
            },
            seed,
            custom_image: tools.custom_image,
        };
        self.state = RecorderState::Recording(record);
    }

    /// Append a sample. Ignored while idle; returns whether it was recorded.
    pub fn add_point(&mut self, point: Point) -> bool {
        match &mut self.state {
            RecorderState::Recording(record) => {
                record.points.push(point);
                true
            }
            RecorderState::Idle => false,
        }
    }

    /// Finish the gesture. Returns the record when it has at least one point.
    pub fn end_stroke(&mut self) -> Option<StrokeRecord> {
        match std::mem::take(&mut self.state) {
            RecorderState::Recording(record) if !record.points.is_empty() => Some(record),
            _ => None,
        }
    }

    /// Abandon the gesture without committing
    pub fn cancel(&mut self) -> Option<StrokeRecord> {
        match std::mem::take(&mut self.state) {
            RecorderState::Recording(record) => Some(record),
            RecorderState::Idle => None,
        }
    }
}
