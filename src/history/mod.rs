//! Stroke history
//!
//! Completed gestures are kept as geometric [`StrokeRecord`]s in a bounded
//! [`HistoryLog`]. Undo and redo move the cursor and rebuild the surface by
//! replaying records; no raster snapshot is taken per stroke.
//!
//! Entries carry monotonically increasing sequence numbers and the cursor is
//! stored as a sequence number, so evicting the oldest entry never shifts
//! what the cursor refers to. The effect of evicted entries lives on in the
//! log's base image.

mod recorder;
mod replay;

pub use recorder::{RecorderState, StrokeRecorder, ToolSnapshot};
pub use replay::{brush_spec_for, deposit_brush_point, ReplayContext, ReplayStats, Replayer};

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::brush::{BrushType, Point};
use crate::color::Color;
use crate::raster::{PresentationBuffer, DEFAULT_MIX_STRENGTH};

/// Default number of entries a log keeps
pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeKind {
    Brush,
    Smudge,
    Clear,
    Init,
}

/// One completed gesture, immutable once committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeRecord {
    pub kind: StrokeKind,
    /// Dab positions for brush strokes, pointer samples for smudges
    #[serde(default)]
    pub points: Vec<Point>,
    /// Paint color (brush) or fill color (clear)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default)]
    pub brush_size: f32,
    #[serde(default)]
    pub brush_type: BrushType,
    #[serde(default = "default_mix_strength")]
    pub mix_strength: f32,
    /// 0 - 100, smudge only
    #[serde(default)]
    pub smudge_strength: f32,
    /// Stamp seed of the stroke
    #[serde(default)]
    pub seed: u64,
    /// Drawn with the custom tip image instead of the procedural type
    #[serde(default)]
    pub custom_image: bool,
}

fn default_mix_strength() -> f32 {
    DEFAULT_MIX_STRENGTH
}

impl StrokeRecord {
    /// Empty record of `kind` with default tool values
    pub fn new(kind: StrokeKind) -> Self {
        Self {
            kind,
            points: Vec::new(),
            color: None,
            brush_size: 0.0,
            brush_type: BrushType::default(),
            mix_strength: DEFAULT_MIX_STRENGTH,
            smudge_strength: 0.0,
            seed: 0,
            custom_image: false,
        }
    }

    pub fn clear(color: Color) -> Self {
        Self {
            color: Some(color),
            ..Self::new(StrokeKind::Clear)
        }
    }

    pub fn init() -> Self {
        Self::new(StrokeKind::Init)
    }

    /// Check the fields replay depends on
    pub fn validate(&self) -> Result<(), String> {
        match self.kind {
            StrokeKind::Init => Ok(()),
            StrokeKind::Clear => match self.color {
                Some(color) if !color.is_valid() => Err(format!("clear color out of range: {:?}", color)),
                _ => Ok(()),
            },
            StrokeKind::Brush | StrokeKind::Smudge => {
                if self.points.is_empty() {
                    return Err("stroke has no points".to_string());
                }
                if let Some(p) = self.points.iter().find(|p| !p.is_finite()) {
                    return Err(format!("non-finite point {:?}", p));
                }
                if !(self.brush_size.is_finite() && self.brush_size > 0.0) {
                    return Err(format!("invalid brush size {}", self.brush_size));
                }
                if !self.mix_strength.is_finite() {
                    return Err("mix strength is not a number".to_string());
                }
                if self.kind == StrokeKind::Brush {
                    match self.color {
                        Some(color) if color.is_valid() => {}
                        Some(color) => return Err(format!("brush color out of range: {:?}", color)),
                        None => return Err("brush stroke has no color".to_string()),
                    }
                } else if !(0.0..=100.0).contains(&self.smudge_strength) {
                    return Err(format!("smudge strength out of range: {}", self.smudge_strength));
                }
                Ok(())
            }
        }
    }
}

/// A committed record with its sequence number
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub seq: u64,
    pub record: StrokeRecord,
}

/// Persisted shape of a log: `{ "history": [...], "step": n }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub history: Vec<StrokeRecord>,
    pub step: i64,
    /// PNG data URL of the image replay starts from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

/// Bounded, truncating log of committed strokes
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    /// Sequence number of the last applied entry
    cursor: Option<u64>,
    next_seq: u64,
    capacity: usize,
    base: Option<PresentationBuffer>,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            next_seq: 0,
            capacity: capacity.max(1),
            base: None,
        }
    }

    /// Rebuild a log from persisted records.
    ///
    /// `step` is clamped into range. Records beyond capacity are dropped from
    /// the front and returned so the caller can fold them into the base.
    pub fn restore(
        records: Vec<StrokeRecord>,
        step: i64,
        capacity: usize,
        base: Option<PresentationBuffer>,
    ) -> (Self, Vec<StrokeRecord>) {
        let mut log = Self::new(capacity);
        log.base = base;

        let mut records = records;
        let mut step = step;
        let overflow_len = records.len().saturating_sub(log.capacity);
        let overflow: Vec<StrokeRecord> = records.drain(..overflow_len).collect();
        step -= overflow_len as i64;

        for record in records {
            let seq = log.next_seq;
            log.next_seq += 1;
            log.entries.push_back(HistoryEntry { seq, record });
        }
        let len = log.entries.len() as i64;
        let step = if len == 0 { -1 } else { step.clamp(0, len - 1) };
        log.cursor = usize::try_from(step)
            .ok()
            .and_then(|i| log.entries.get(i))
            .map(|e| e.seq);

        (log, overflow)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the last applied entry, -1 when nothing is applied
    pub fn cursor(&self) -> i64 {
        self.cursor_index().map(|i| i as i64).unwrap_or(-1)
    }

    /// Sequence number of the last applied entry
    pub fn cursor_seq(&self) -> Option<u64> {
        self.cursor
    }

    /// Sequence numbers increase but are not contiguous once redo entries
    /// have been discarded, so the index is looked up rather than derived.
    fn cursor_index(&self) -> Option<usize> {
        let seq = self.cursor?;
        self.entries.binary_search_by_key(&seq, |e| e.seq).ok()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &StrokeRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    /// Entries up to and including the cursor, in order
    pub fn applied(&self) -> impl Iterator<Item = &StrokeRecord> {
        let end = self.cursor_index().map(|i| i + 1).unwrap_or(0);
        self.entries.iter().take(end).map(|e| &e.record)
    }

    /// Entries after the cursor
    pub fn redo_available(&self) -> usize {
        let applied = self.cursor_index().map(|i| i + 1).unwrap_or(0);
        self.entries.len().saturating_sub(applied)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor_index().is_some_and(|i| i > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.redo_available() > 0
    }

    pub fn base(&self) -> Option<&PresentationBuffer> {
        self.base.as_ref()
    }

    pub fn set_base(&mut self, base: Option<PresentationBuffer>) {
        self.base = base;
    }

    /// Append `record`: drop redo entries, advance the cursor and evict the
    /// oldest entry when over capacity. Returns the evicted entry.
    pub fn commit(&mut self, record: StrokeRecord) -> Option<HistoryEntry> {
        let keep = self.cursor_index().map(|i| i + 1).unwrap_or(0);
        let dropped = self.entries.len().saturating_sub(keep);
        self.entries.truncate(keep);
        if dropped > 0 {
            tracing::debug!("[History] Discarded {} redo entries", dropped);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        tracing::debug!("[History] Commit #{} ({:?})", seq, record.kind);
        self.entries.push_back(HistoryEntry { seq, record });
        self.cursor = Some(seq);

        if self.entries.len() > self.capacity {
            let evicted = self.entries.pop_front();
            if let Some(entry) = &evicted {
                tracing::debug!("[History] Evicted #{}", entry.seq);
            }
            evicted
        } else {
            None
        }
    }

    /// Step the cursor back one entry. The first entry cannot be undone.
    pub fn undo(&mut self) -> bool {
        let Some(index) = self.cursor_index().filter(|&i| i > 0) else {
            return false;
        };
        self.cursor = self.entries.get(index - 1).map(|e| e.seq);
        true
    }

    /// Step the cursor forward one entry
    pub fn redo(&mut self) -> bool {
        let next = self.cursor_index().map(|i| i + 1).unwrap_or(0);
        match self.entries.get(next) {
            Some(entry) => {
                self.cursor = Some(entry.seq);
                true
            }
            None => false,
        }
    }

    /// Drop every entry and the base
    pub fn reset(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.base = None;
    }

    /// Persistable form; the base is encoded by the caller
    pub fn to_snapshot(&self, base: Option<String>) -> HistorySnapshot {
        HistorySnapshot {
            history: self.records().cloned().collect(),
            step: self.cursor(),
            base,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn brush(x: f32) -> StrokeRecord {
        StrokeRecord {
            points: vec![Point::new(x, x)],
            color: Some(Color::new(1.0, 0.0, 0.0)),
            brush_size: 10.0,
            ..StrokeRecord::new(StrokeKind::Brush)
        }
    }

    #[test]
    fn test_commit_advances_cursor() {
        let mut log = HistoryLog::new(10);
        assert_eq!(log.cursor(), -1);
        log.commit(brush(1.0));
        log.commit(brush(2.0));
        assert_eq!(log.cursor(), 1);
        assert_eq!(log.len(), 2);
        assert!(!log.can_redo());
    }

    #[test]
    fn test_commit_truncates_redo_entries() {
        let mut log = HistoryLog::new(10);
        for i in 0..5 {
            log.commit(brush(i as f32));
        }
        assert!(log.undo());
        assert!(log.undo());
        assert_eq!(log.cursor(), 2);
        assert_eq!(log.redo_available(), 2);

        log.commit(brush(9.0));
        assert_eq!(log.len(), 4);
        assert_eq!(log.cursor(), 3);
        assert_eq!(log.redo_available(), 0);
    }

    #[test]
    fn test_undo_after_commit_over_redo_entries() {
        let mut log = HistoryLog::new(10);
        log.commit(brush(1.0));
        log.commit(brush(2.0));
        log.commit(brush(3.0));
        assert!(log.undo());
        log.commit(brush(4.0));
        assert_eq!(log.cursor(), 2);
        assert!(!log.can_redo());

        assert!(log.undo());
        assert_eq!(log.cursor(), 1);
        assert_eq!(log.applied().last().unwrap().points[0].x, 2.0);
        assert_eq!(log.redo_available(), 1);
        assert!(log.redo());
        assert_eq!(log.applied().last().unwrap().points[0].x, 4.0);
        assert!(!log.redo());
    }

    #[test]
    fn test_three_strokes_two_undos_then_commit() {
        let mut log = HistoryLog::new(10);
        log.commit(brush(1.0));
        log.commit(brush(2.0));
        log.commit(brush(3.0));
        log.undo();
        log.undo();
        assert_eq!(log.cursor(), 0);
        log.commit(brush(4.0));

        let xs: Vec<f32> = log.records().map(|r| r.points[0].x).collect();
        assert_eq!(xs, vec![1.0, 4.0]);
    }

    #[test]
    fn test_capacity_evicts_oldest_and_keeps_cursor_valid() {
        let mut log = HistoryLog::new(3);
        let mut evicted = Vec::new();
        for i in 0..7 {
            if let Some(entry) = log.commit(brush(i as f32)) {
                evicted.push(entry.seq);
            }
            assert!(log.len() <= 3);
            assert!(log.cursor() >= -1 && log.cursor() < log.len() as i64);
        }
        assert_eq!(evicted, vec![0, 1, 2, 3]);
        assert_eq!(log.cursor(), 2);
        assert_eq!(log.cursor_seq(), Some(6));
        let xs: Vec<f32> = log.records().map(|r| r.points[0].x).collect();
        assert_eq!(xs, vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_undo_stops_at_first_entry_and_redo_at_last() {
        let mut log = HistoryLog::new(5);
        assert!(!log.undo());
        assert!(!log.redo());
        log.commit(StrokeRecord::init());
        log.commit(brush(1.0));
        assert!(log.undo());
        assert!(!log.undo());
        assert_eq!(log.cursor(), 0);
        assert!(log.redo());
        assert!(!log.redo());
        assert_eq!(log.applied().count(), 2);
    }

    #[test]
    fn test_undo_after_eviction_uses_sequence_numbers() {
        let mut log = HistoryLog::new(2);
        for i in 0..4 {
            log.commit(brush(i as f32));
        }
        assert!(log.undo());
        assert_eq!(log.cursor(), 0);
        assert_eq!(log.applied().last().unwrap().points[0].x, 2.0);
        log.commit(brush(8.0));
        let xs: Vec<f32> = log.records().map(|r| r.points[0].x).collect();
        assert_eq!(xs, vec![2.0, 8.0]);
    }

    #[test]
    fn test_restore_clamps_step_and_returns_overflow() {
        let records: Vec<_> = (0..5).map(|i| brush(i as f32)).collect();
        let (log, overflow) = HistoryLog::restore(records, 4, 3, None);
        assert_eq!(overflow.len(), 2);
        assert_eq!(log.len(), 3);
        assert_eq!(log.cursor(), 2);

        let (log, _) = HistoryLog::restore(vec![brush(0.0)], 17, 10, None);
        assert_eq!(log.cursor(), 0);
        let (log, _) = HistoryLog::restore(Vec::new(), 3, 10, None);
        assert_eq!(log.cursor(), -1);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut log = HistoryLog::new(5);
        log.commit(StrokeRecord::init());
        log.commit(brush(3.0));
        let json = serde_json::to_value(log.to_snapshot(None)).unwrap();
        assert_eq!(json["step"], 1);
        assert_eq!(json["history"][0]["kind"], "init");
        let stroke = &json["history"][1];
        assert_eq!(stroke["kind"], "brush");
        assert_eq!(stroke["points"][0]["x"], 3.0);
        assert_eq!(stroke["brushSize"], 10.0);
        assert_eq!(stroke["brushType"], "watercolor");
        assert!(stroke.get("mixStrength").is_some());
        assert!(json.get("base").is_none());
    }

    #[test]
    fn test_validate_rejects_malformed_records() {
        assert!(brush(1.0).validate().is_ok());
        assert!(StrokeRecord::init().validate().is_ok());

        let mut no_points = brush(1.0);
        no_points.points.clear();
        assert!(no_points.validate().is_err());

        let mut bad_color = brush(1.0);
        bad_color.color = Some(Color::new(2.0, 0.0, 0.0));
        assert!(bad_color.validate().is_err());

        let mut smudge = brush(1.0);
        smudge.kind = StrokeKind::Smudge;
        smudge.smudge_strength = 150.0;
        assert!(smudge.validate().is_err());
    }

    #[test]
    fn test_record_defaults_when_fields_missing() {
        let record: StrokeRecord =
            serde_json::from_str(r#"{"kind":"clear","color":{"r":1,"g":1,"b":1}}"#).unwrap();
        assert_eq!(record.kind, StrokeKind::Clear);
        assert!(record.points.is_empty());
        assert_eq!(record.mix_strength, DEFAULT_MIX_STRENGTH);
    }
}
