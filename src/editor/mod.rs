//! Editor controller
//!
//! [`Editor`] owns the tool state, the raster engine, the presentation
//! buffer and the history log, and is the single writer for all of them.
//! Input arrives as [`InputEvent`]s; each committed gesture becomes a
//! history entry and schedules a debounced autosave.

mod input;
mod state;

pub use input::{InputEvent, InputQueue, PointerButton};
pub use state::{EditorState, Tool};

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::bridge::{ColorTarget, HostBridge, HostMessage, NullBridge};
use crate::brush::{interpolate_dabs, BrushType, Point, StampSource};
use crate::color::Color;
use crate::config::EngineConfig;
use crate::history::{
    deposit_brush_point, HistoryLog, ReplayContext, ReplayStats, Replayer, StrokeKind,
    StrokeRecord, StrokeRecorder,
};
use crate::palette;
use crate::raster::{
    clamp_mix_strength, select_engine, Backend, Dab, EngineInitError, PresentationBuffer, RasterEngine,
};
use crate::smudge::SmudgeOperator;
use crate::storage::snapshot::{decode_data_url, encode_data_url};
use crate::storage::{
    Autosaver, DecodeError, FileStore, KeyValueStore, PaletteStorage, PersistenceGateway,
    SavePayload, StorageError,
};

/// Click bridging reaches this many brush radii
const BRIDGE_RANGE_RADII: f32 = 1.5;

/// Where the surface came from at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    History,
    Snapshot,
    Fresh,
}

/// Live state of the gesture in progress
enum LiveGesture {
    Brush { stamps: StampSource, color: Color },
    Smudge { op: SmudgeOperator },
}

pub struct Editor {
    config: EngineConfig,
    state: EditorState,
    engine: Box<dyn RasterEngine>,
    presentation: PresentationBuffer,
    log: HistoryLog,
    recorder: StrokeRecorder,
    gesture: Option<LiveGesture>,
    /// Last dab or sample position, kept across gestures for click bridging
    last_point: Option<Point>,
    queue: InputQueue,
    gateway: Option<Arc<dyn PersistenceGateway>>,
    autosaver: Option<Autosaver>,
    bridge: Box<dyn HostBridge>,
    seeds: ChaCha8Rng,
}

impl Editor {
    /// Create an editor on an already selected engine
    pub fn new(config: EngineConfig, mut engine: Box<dyn RasterEngine>) -> Self {
        let state = EditorState::new(clamp_mix_strength(config.mix_strength));
        engine.set_mix_strength(state.mix_strength);
        engine.clear(config.background);
        let (width, height) = engine.size();
        let mut presentation = PresentationBuffer::new(width, height);
        engine.present_to(&mut presentation);

        Self {
            log: HistoryLog::new(config.history_capacity),
            config,
            state,
            engine,
            presentation,
            recorder: StrokeRecorder::new(),
            gesture: None,
            last_point: None,
            queue: InputQueue::new(),
            gateway: None,
            autosaver: None,
            bridge: Box::new(NullBridge),
            seeds: ChaCha8Rng::from_entropy(),
        }
    }

    /// Create an editor on the engine `config` selects
    pub fn start(config: EngineConfig) -> Result<Self, EngineInitError> {
        let engine = select_engine(&config)?;
        Ok(Self::new(config, engine))
    }

    /// Create an editor from the config in the platform data directory
    pub fn start_default() -> Result<Self, EngineInitError> {
        Self::start(EngineConfig::load(&EngineConfig::default_path()))
    }

    /// Persist through `store` and autosave after the configured delay.
    /// Needs a tokio runtime.
    pub fn with_persistence<S: KeyValueStore + 'static>(
        self,
        store: Arc<S>,
    ) -> Result<Self, StorageError> {
        let gateway: Arc<dyn PersistenceGateway> = Arc::new(PaletteStorage::new(store));
        let delay = Duration::from_millis(self.config.autosave_delay_ms);
        let autosaver = Autosaver::spawn(Arc::clone(&gateway), delay)?;
        Ok(self.with_gateway(gateway).with_autosaver(autosaver))
    }

    /// Persist under the platform data directory
    pub fn with_default_persistence(self) -> Result<Self, StorageError> {
        let store = FileStore::default_location();
        tracing::info!("[Editor] Saving to {:?}", store.dir());
        self.with_persistence(Arc::new(store))
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PersistenceGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_autosaver(mut self, autosaver: Autosaver) -> Self {
        self.autosaver = Some(autosaver);
        self
    }

    pub fn with_bridge(mut self, bridge: Box<dyn HostBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    /// Make stroke seeds reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seeds = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn presentation(&self) -> &PresentationBuffer {
        &self.presentation
    }

    pub fn log(&self) -> &HistoryLog {
        &self.log
    }

    pub fn backend(&self) -> Backend {
        self.engine.backend()
    }

    pub fn is_drawing(&self) -> bool {
        self.recorder.is_recording()
    }

    /// SHA-256 of the presented surface
    pub fn fingerprint(&self) -> String {
        self.presentation.digest()
    }

    /// PNG data URL of the presented surface
    pub fn export_data_url(&self) -> Result<String, DecodeError> {
        encode_data_url(&self.presentation)
    }

    // === Startup ===

    /// Restore tool preferences and the surface: saved history first, then
    /// a saved canvas snapshot, else a fresh surface with an `init` entry.
    /// Tells the host once the surface is ready.
    pub fn restore(&mut self) -> RestoreSource {
        let source = self.restore_surface();
        tracing::info!("[Editor] Ready on {:?} backend ({:?})", self.engine.backend(), source);
        self.bridge.post(HostMessage::Loaded);
        source
    }

    fn restore_surface(&mut self) -> RestoreSource {
        let Some(gateway) = self.gateway.clone() else {
            self.start_fresh(None);
            return RestoreSource::Fresh;
        };

        if let Some(settings) = gateway.load_brush_settings() {
            if settings.brush_size.is_finite() && settings.brush_size > 0.0 {
                self.state.brush_type = settings.brush_type;
                self.state.brush_size = settings.brush_size;
            }
        }
        if let Some(name) = gateway.load_palette_preset() {
            if !self.apply_palette(&name) {
                tracing::warn!("[Editor] Unknown saved palette {:?}", name);
            }
        }

        if let Some(snapshot) = gateway.load_history().filter(|s| !s.history.is_empty()) {
            let size = self.engine.size();
            let base = snapshot.base.as_deref().and_then(|url| {
                decode_data_url(url, Some(size))
                    .map_err(|e| tracing::warn!("[Editor] Ignoring saved history base: {}", e))
                    .ok()
            });
            let (log, overflow) = HistoryLog::restore(
                snapshot.history,
                snapshot.step,
                self.config.history_capacity,
                base,
            );
            self.log = log;

            let ctx = self.replay_context();
            let mut replayer = Replayer::new(self.engine.as_mut(), &mut self.presentation, &ctx);
            replayer.fold_into_base(&mut self.log, &overflow);
            let stats = replayer.rebuild(&self.log);
            tracing::info!(
                "[Editor] Restored {} history entries ({} skipped)",
                self.log.len(),
                stats.skipped
            );
            return RestoreSource::History;
        }

        if let Some(url) = gateway.load_canvas_snapshot() {
            match decode_data_url(&url, Some(self.engine.size())) {
                Ok(image) => {
                    self.start_fresh(Some(image));
                    tracing::info!("[Editor] Restored canvas snapshot");
                    return RestoreSource::Snapshot;
                }
                Err(e) => tracing::warn!("[Editor] Ignoring saved canvas: {}", e),
            }
        }

        self.start_fresh(None);
        RestoreSource::Fresh
    }

    fn start_fresh(&mut self, image: Option<PresentationBuffer>) {
        self.log = HistoryLog::new(self.config.history_capacity);
        self.engine.clear(self.config.background);
        if let Some(image) = image {
            self.engine.ingest_from(&image);
            self.log.set_base(Some(image));
        }
        self.engine.present_to(&mut self.presentation);
        self.log.commit(StrokeRecord::init());
    }

    // === Input ===

    pub fn push_event(&mut self, event: InputEvent) {
        self.queue.push(event);
    }

    pub fn queue_mut(&mut self) -> &mut InputQueue {
        &mut self.queue
    }

    /// Handle every queued event in order; returns how many were handled
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.queue.pop() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerDown { x, y, button } => self.pointer_down(Point::new(x, y), button),
            InputEvent::PointerMove { x, y } => self.pointer_move(Point::new(x, y)),
            InputEvent::PointerUp => self.pointer_up(),
            InputEvent::PointerLeave => self.pointer_leave(),
            InputEvent::EyedropperModifier { active } => self.state.eyedropper = active,
        }
    }

    fn pointer_down(&mut self, point: Point, button: PointerButton) {
        if !point.is_finite() {
            return;
        }
        if self.state.eyedropper {
            self.pick_color(point, button);
            return;
        }
        if button != PointerButton::Primary {
            return;
        }
        if self.recorder.is_recording() {
            // A down without an up: close the previous gesture first
            self.pointer_up();
        }

        let seed = self.seeds.gen::<u64>();
        let tools = self.state.tool_snapshot();
        let spec = self.state.brush_spec();

        match self.state.tool {
            Tool::Brush => {
                let color = self.state.foreground;
                self.recorder
                    .begin_stroke(StrokeKind::Brush, Some(color), &tools, seed);
                let mut stamps = StampSource::new(spec, seed);

                let size = self.state.brush_size;
                let dabs = match self.last_point {
                    Some(last) if self.config.bridge_clicks && self.within_bridge(last, point) => {
                        interpolate_dabs(last, point, (size * 0.25).max(1.0))
                    }
                    _ => vec![point],
                };
                for dab in dabs {
                    self.paint_dab(&mut stamps, dab, color);
                }
                self.gesture = Some(LiveGesture::Brush { stamps, color });
            }
            Tool::Smudge => {
                self.recorder
                    .begin_stroke(StrokeKind::Smudge, None, &tools, seed);
                self.recorder.add_point(point);
                let op = SmudgeOperator::new(
                    spec,
                    self.state.smudge_strength,
                    seed,
                    self.config.smudge_sample_step,
                );
                self.gesture = Some(LiveGesture::Smudge { op });
            }
        }
        self.last_point = Some(point);
    }

    fn within_bridge(&self, last: Point, point: Point) -> bool {
        let distance = last.distance(&point);
        let radius = self.state.brush_size / 2.0;
        distance > 0.0 && distance <= radius * BRIDGE_RANGE_RADII
    }

    fn pointer_move(&mut self, point: Point) {
        if self.state.eyedropper || !point.is_finite() {
            return;
        }
        let (Some(mut gesture), Some(last)) = (self.gesture.take(), self.last_point) else {
            return;
        };
        if last.distance(&point) < self.config.min_dab_distance {
            self.gesture = Some(gesture);
            return;
        }

        match &mut gesture {
            LiveGesture::Brush { stamps, color } => {
                let color = *color;
                for dab in interpolate_dabs(last, point, self.config.min_dab_distance) {
                    self.paint_dab(stamps, dab, color);
                }
            }
            LiveGesture::Smudge { op } => {
                op.smudge_segment(self.engine.as_mut(), &mut self.presentation, last, point);
                self.recorder.add_point(point);
            }
        }
        self.gesture = Some(gesture);
        self.last_point = Some(point);
    }

    /// Deposit and record one live dab. Dabs entirely off the surface are
    /// neither stamped nor recorded.
    fn paint_dab(&mut self, stamps: &mut StampSource, point: Point, color: Color) {
        let (width, height) = self.engine.size();
        let footprint = Dab {
            x: point.x,
            y: point.y,
            diameter: stamps.spec().size * 2.0,
            color,
        };
        if !footprint.touches(width, height) {
            return;
        }
        deposit_brush_point(self.engine.as_mut(), stamps, point, color);
        self.engine.present_to(&mut self.presentation);
        self.recorder.add_point(point);
    }

    fn pointer_up(&mut self) {
        self.gesture = None;
        if let Some(record) = self.recorder.end_stroke() {
            self.commit(record);
        }
    }

    /// Abandon the gesture and rebuild the surface without it
    fn pointer_leave(&mut self) {
        self.gesture = None;
        if let Some(draft) = self.recorder.cancel() {
            tracing::debug!(
                "[Editor] Pointer left, abandoning {:?} stroke ({} points)",
                draft.kind,
                draft.points.len()
            );
            self.last_point = None;
            self.rebuild();
        }
    }

    fn pick_color(&mut self, point: Point, button: PointerButton) {
        let Some(color) = self.presentation.sample(point.x, point.y) else {
            return;
        };
        let target = match button {
            PointerButton::Primary => {
                self.state.foreground = color;
                ColorTarget::Foreground
            }
            PointerButton::Secondary => {
                self.state.background = color;
                ColorTarget::Background
            }
        };
        tracing::debug!("[Editor] Picked {} for {:?}", color.to_hex(), target);
        self.bridge.post(HostMessage::set_color(target, color));
    }

    // === History ===

    fn commit(&mut self, record: StrokeRecord) {
        if let Some(evicted) = self.log.commit(record) {
            let ctx = self.replay_context();
            Replayer::new(self.engine.as_mut(), &mut self.presentation, &ctx)
                .fold_into_base(&mut self.log, &[evicted.record]);
        }
        self.schedule_autosave();
    }

    pub fn undo(&mut self) -> bool {
        if self.recorder.is_recording() || !self.log.undo() {
            return false;
        }
        self.rebuild();
        self.schedule_autosave();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.recorder.is_recording() || !self.log.redo() {
            return false;
        }
        self.rebuild();
        self.schedule_autosave();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    /// Fill the surface with the configured background and record it.
    /// Wipes everything saved; the next autosave writes the cleared state.
    pub fn clear_canvas(&mut self) {
        self.gesture = None;
        self.recorder.cancel();
        self.last_point = None;
        let background = self.config.background;
        self.engine.clear(background);
        self.engine.present_to(&mut self.presentation);
        if let Some(gateway) = &self.gateway {
            if let Err(e) = gateway.clear_all() {
                tracing::warn!("[Editor] Failed to clear saved data: {}", e);
            }
        }
        self.commit(StrokeRecord::clear(background));
    }

    fn rebuild(&mut self) -> ReplayStats {
        let ctx = self.replay_context();
        Replayer::new(self.engine.as_mut(), &mut self.presentation, &ctx).rebuild(&self.log)
    }

    fn replay_context(&self) -> ReplayContext {
        ReplayContext {
            background: self.config.background,
            custom_image: self.state.custom_image.clone(),
            smudge_sample_step: self.config.smudge_sample_step,
        }
    }

    fn schedule_autosave(&self) {
        let Some(autosaver) = &self.autosaver else {
            return;
        };
        autosaver.request(SavePayload {
            history: self.log.to_snapshot(None),
            history_base: self.log.base().cloned(),
            canvas: Some(self.presentation.clone()),
            brush_settings: self.state.brush_settings(),
        });
    }

    // === Tools ===

    pub fn select_tool(&mut self, tool: Tool) {
        if self.state.tool != tool {
            tracing::debug!("[Editor] Tool {:?} -> {:?}", self.state.tool, tool);
            self.state.tool = tool;
        }
    }

    /// Switch between brush and smudge
    pub fn toggle_smudge(&mut self) -> Tool {
        let next = match self.state.tool {
            Tool::Brush => Tool::Smudge,
            Tool::Smudge => Tool::Brush,
        };
        self.select_tool(next);
        next
    }

    /// Set the size of the active tool
    pub fn set_brush_size(&mut self, size: f32) {
        if !(size.is_finite() && size > 0.0) {
            return;
        }
        match self.state.tool {
            Tool::Brush => {
                self.state.brush_size = size;
                self.save_brush_settings();
            }
            Tool::Smudge => self.state.smudge_size = size,
        }
    }

    pub fn set_brush_type(&mut self, brush_type: BrushType) {
        self.state.brush_type = brush_type;
        self.save_brush_settings();
    }

    /// Use a tip image instead of the procedural shape, or go back with `None`
    pub fn set_custom_image(&mut self, image: Option<Arc<RgbaImage>>) {
        self.state.custom_image = image;
    }

    pub fn set_mix_strength(&mut self, strength: f32) {
        self.state.mix_strength = clamp_mix_strength(strength);
        self.engine.set_mix_strength(self.state.mix_strength);
    }

    pub fn set_smudge_strength(&mut self, percent: f32) {
        if percent.is_finite() {
            self.state.smudge_strength = percent.clamp(0.0, 100.0);
        }
    }

    pub fn set_foreground(&mut self, color: Color) {
        self.state.foreground = color.clamped();
        self.bridge
            .post(HostMessage::set_color(ColorTarget::Foreground, self.state.foreground));
    }

    pub fn set_background(&mut self, color: Color) {
        self.state.background = color.clamped();
        self.bridge
            .post(HostMessage::set_color(ColorTarget::Background, self.state.background));
    }

    /// Select a palette preset and persist the choice
    pub fn select_palette(&mut self, id: &str) -> bool {
        if !self.apply_palette(id) {
            return false;
        }
        if let Some(gateway) = &self.gateway {
            if let Err(e) = gateway.save_palette_preset(self.state.palette) {
                tracing::warn!("[Editor] Failed to save palette preset: {}", e);
            }
        }
        true
    }

    fn apply_palette(&mut self, id: &str) -> bool {
        let Some(preset) = palette::find(id) else {
            return false;
        };
        self.state.palette = preset.id;
        self.state.foreground = preset.foreground();
        self.state.background = preset.background();
        true
    }

    /// Pick a swatch of the active palette; switches back to the brush
    pub fn pick_palette_color(&mut self, index: usize, button: PointerButton) -> bool {
        let Some(color) = palette::find(self.state.palette).and_then(|p| p.color(index)) else {
            return false;
        };
        match button {
            PointerButton::Primary => self.set_foreground(color),
            PointerButton::Secondary => self.set_background(color),
        }
        self.select_tool(Tool::Brush);
        true
    }

    fn save_brush_settings(&self) {
        if let Some(gateway) = &self.gateway {
            if let Err(e) = gateway.save_brush_settings(&self.state.brush_settings()) {
                tracing::warn!("[Editor] Failed to save brush settings: {}", e);
            }
        }
    }

    /// Wait for pending autosaves to reach storage
    pub async fn flush(&self) {
        if let Some(autosaver) = &self.autosaver {
            autosaver.flush().await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bridge::ChannelBridge;
    use crate::config::BackendPreference;
    use crate::raster::CpuRasterEngine;
    use crate::storage::MemoryStore;

    fn config() -> EngineConfig {
        EngineConfig {
            width: 96,
            height: 64,
            backend: BackendPreference::Cpu,
            ..Default::default()
        }
    }

    fn editor() -> Editor {
        let config = config();
        let engine = CpuRasterEngine::new(config.width, config.height).unwrap();
        let mut editor = Editor::new(config, Box::new(engine)).with_seed(1);
        editor.restore();
        editor
    }

    fn drag(editor: &mut Editor, points: &[(f32, f32)]) {
        editor.queue_mut().push_drag(points);
        editor.process_events();
    }

    #[test]
    fn test_fresh_start_has_init_entry() {
        let editor = editor();
        assert_eq!(editor.log().len(), 1);
        assert_eq!(editor.log().records().next().unwrap().kind, StrokeKind::Init);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_drag_commits_interpolated_dabs() {
        let mut editor = editor();
        drag(&mut editor, &[(10.0, 10.0), (20.0, 10.0)]);
        let record = editor.log().records().last().unwrap().clone();
        assert_eq!(record.kind, StrokeKind::Brush);
        // Down dab plus ceil(10 / 2) interpolated dabs
        assert_eq!(record.points.len(), 6);
        assert_eq!(record.points.last().unwrap().x, 20.0);
        assert_eq!(record.color, Some(editor.state().foreground));
        assert_eq!(editor.log().cursor(), 1);
    }

    #[test]
    fn test_off_surface_dabs_are_not_recorded() {
        let mut editor = editor();
        let blank = editor.fingerprint();
        let before = editor.log().len();
        drag(&mut editor, &[(5000.0, 5000.0), (5400.0, 5000.0)]);
        assert_eq!(editor.log().len(), before);
        assert_eq!(editor.fingerprint(), blank);

        drag(&mut editor, &[(90.0, 30.0), (400.0, 30.0)]);
        let record = editor.log().records().last().unwrap();
        // Size 15 reaches 15px past the center; the edge is at x = 96
        assert!(record.points.iter().all(|p| p.x < 96.0 + 15.0));
        assert!(record.points.len() < 20);
    }

    #[test]
    fn test_short_moves_are_ignored() {
        let mut editor = editor();
        drag(&mut editor, &[(10.0, 10.0), (10.5, 10.5), (11.0, 11.0)]);
        assert_eq!(editor.log().records().last().unwrap().points.len(), 1);
    }

    #[test]
    fn test_close_click_bridges_from_last_dab() {
        let mut editor = editor();
        editor.set_brush_size(20.0);
        drag(&mut editor, &[(30.0, 30.0)]);
        drag(&mut editor, &[(40.0, 30.0)]);
        let record = editor.log().records().last().unwrap();
        // spacing max(1, 20 * 0.25) = 5 over 10px
        assert_eq!(record.points.len(), 2);
        assert_eq!(record.points[0].x, 35.0);

        drag(&mut editor, &[(80.0, 30.0)]);
        assert_eq!(editor.log().records().last().unwrap().points.len(), 1);
    }

    #[test]
    fn test_live_drawing_matches_replay() {
        let mut editor = editor();
        editor.set_brush_type(BrushType::Splatter);
        drag(&mut editor, &[(10.0, 10.0), (30.0, 20.0), (50.0, 40.0)]);
        editor.toggle_smudge();
        drag(&mut editor, &[(20.0, 15.0), (45.0, 30.0)]);
        let live = editor.fingerprint();

        assert!(editor.undo());
        assert!(editor.redo());
        assert_eq!(editor.fingerprint(), live);
    }

    #[test]
    fn test_undo_after_stroke_over_redo_entries() {
        let mut editor = editor();
        drag(&mut editor, &[(10.0, 10.0), (40.0, 10.0)]);
        let first = editor.fingerprint();
        drag(&mut editor, &[(10.0, 40.0), (40.0, 40.0)]);
        assert!(editor.undo());
        drag(&mut editor, &[(60.0, 20.0), (90.0, 50.0)]);
        let replaced = editor.fingerprint();
        assert_eq!(editor.log().cursor(), 2);
        assert!(!editor.can_redo());

        assert!(editor.undo());
        assert_eq!(editor.log().cursor(), 1);
        assert_eq!(editor.fingerprint(), first);
        assert!(editor.can_redo());
        assert!(editor.redo());
        assert_eq!(editor.fingerprint(), replaced);
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_pointer_leave_abandons_gesture() {
        let mut editor = editor();
        let before = editor.fingerprint();
        editor.push_event(InputEvent::down(40.0, 40.0));
        editor.push_event(InputEvent::moved(60.0, 40.0));
        editor.push_event(InputEvent::PointerLeave);
        editor.process_events();
        assert!(!editor.is_drawing());
        assert_eq!(editor.log().len(), 1);
        assert_eq!(editor.fingerprint(), before);
    }

    #[test]
    fn test_eyedropper_picks_and_posts_colors() {
        let (bridge, mut rx) = ChannelBridge::new();
        let mut editor = editor().with_bridge(Box::new(bridge));
        editor.handle_event(InputEvent::EyedropperModifier { active: true });
        editor.handle_event(InputEvent::PointerDown {
            x: 5.0,
            y: 5.0,
            button: PointerButton::Secondary,
        });
        editor.handle_event(InputEvent::PointerUp);

        let surface = editor.config().background.to_hex();
        assert_eq!(editor.state().background.to_hex(), surface);
        assert_eq!(editor.log().len(), 1);
        let message = HostMessage::parse(&rx.try_recv().unwrap()).unwrap();
        match message {
            HostMessage::SetColor { target, color } => {
                assert_eq!(target, ColorTarget::Background);
                assert_eq!(color.hex, surface);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tool_sizes_are_separate() {
        let mut editor = editor();
        editor.set_brush_size(40.0);
        editor.toggle_smudge();
        assert_eq!(editor.state().active_size(), 15.0);
        editor.set_brush_size(6.0);
        editor.toggle_smudge();
        assert_eq!(editor.state().active_size(), 40.0);
        assert_eq!(editor.state().smudge_size, 6.0);
    }

    #[test]
    fn test_palette_selection_and_swatch_pick() {
        let mut editor = editor();
        assert!(editor.select_palette("digitalArtist"));
        assert_eq!(editor.state().foreground.to_hex(), "#FFFF00");
        assert_eq!(editor.state().background.to_hex(), "#000000");
        assert!(!editor.select_palette("nope"));

        editor.toggle_smudge();
        assert!(editor.pick_palette_color(2, PointerButton::Primary));
        assert_eq!(editor.state().foreground.to_hex(), "#FF0000");
        assert_eq!(editor.state().tool, Tool::Brush);
    }

    #[test]
    fn test_clear_canvas_is_undoable() {
        let mut editor = editor();
        drag(&mut editor, &[(20.0, 20.0), (40.0, 20.0)]);
        let painted = editor.fingerprint();
        editor.clear_canvas();
        assert_eq!(
            editor.presentation(),
            &PresentationBuffer::filled(96, 64, editor.config().background)
        );
        assert!(editor.undo());
        assert_eq!(editor.fingerprint(), painted);
    }

    #[test]
    fn test_clear_canvas_wipes_saved_data() {
        let gateway: Arc<dyn PersistenceGateway> =
            Arc::new(PaletteStorage::new(Arc::new(MemoryStore::new())));
        let mut editor = editor().with_gateway(gateway.clone());
        assert!(editor.select_palette("digitalArtist"));
        editor.set_brush_type(BrushType::Flat);
        gateway
            .save_canvas_snapshot(&editor.export_data_url().unwrap())
            .unwrap();
        gateway.save_history(&editor.log().to_snapshot(None)).unwrap();

        editor.clear_canvas();

        assert!(gateway.load_palette_preset().is_none());
        assert!(gateway.load_brush_settings().is_none());
        assert!(gateway.load_canvas_snapshot().is_none());
        assert!(gateway.load_history().is_none());
        assert_eq!(editor.log().records().last().unwrap().kind, StrokeKind::Clear);
    }

    #[test]
    fn test_restore_applies_saved_palette() {
        let gateway: Arc<dyn PersistenceGateway> =
            Arc::new(PaletteStorage::new(Arc::new(MemoryStore::new())));
        let mut first = editor().with_gateway(gateway.clone());
        assert!(first.select_palette("schminckeHoradam"));

        let config = config();
        let engine = CpuRasterEngine::new(config.width, config.height).unwrap();
        let mut second = Editor::new(config, Box::new(engine)).with_gateway(gateway);
        assert_eq!(second.state().palette, palette::DEFAULT_PRESET);
        assert_eq!(second.restore(), RestoreSource::Fresh);

        let preset = palette::find("schminckeHoradam").unwrap();
        assert_eq!(second.state().palette, "schminckeHoradam");
        assert_eq!(second.state().foreground, preset.foreground());
        assert_eq!(second.state().background, preset.background());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistence_uses_configured_delay() {
        let store = Arc::new(MemoryStore::new());
        let config = EngineConfig {
            autosave_delay_ms: 5000,
            ..config()
        };
        let engine = CpuRasterEngine::new(config.width, config.height).unwrap();
        let mut editor = Editor::new(config, Box::new(engine))
            .with_seed(3)
            .with_persistence(store.clone())
            .unwrap();
        assert_eq!(editor.restore(), RestoreSource::Fresh);
        drag(&mut editor, &[(20.0, 20.0), (50.0, 30.0)]);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(store.get("mixpaint_history").unwrap().is_none());

        editor.flush().await;
        let saved = PaletteStorage::new(store).load_history().unwrap();
        assert_eq!(saved.history.len(), 2);
    }

    #[test]
    fn test_restore_prefers_history() {
        let storage = Arc::new(PaletteStorage::new(Arc::new(MemoryStore::new())));
        let gateway: Arc<dyn PersistenceGateway> = storage.clone();

        let mut first = editor().with_gateway(gateway.clone());
        drag(&mut first, &[(20.0, 20.0), (40.0, 30.0)]);
        first.set_brush_type(BrushType::Flat);
        gateway.save_history(&first.log().to_snapshot(None)).unwrap();
        gateway
            .save_canvas_snapshot(&first.export_data_url().unwrap())
            .unwrap();

        let config = config();
        let engine = CpuRasterEngine::new(config.width, config.height).unwrap();
        let mut second = Editor::new(config, Box::new(engine)).with_gateway(gateway);
        assert_eq!(second.restore(), RestoreSource::History);
        assert_eq!(second.fingerprint(), first.fingerprint());
        assert_eq!(second.log().len(), 2);
        assert_eq!(second.state().brush_type, BrushType::Flat);
    }

    #[test]
    fn test_restore_falls_back_to_snapshot_then_fresh() {
        let storage = Arc::new(PaletteStorage::new(Arc::new(MemoryStore::new())));
        let gateway: Arc<dyn PersistenceGateway> = storage.clone();

        let mut painted = editor();
        drag(&mut painted, &[(50.0, 30.0)]);
        gateway
            .save_canvas_snapshot(&painted.export_data_url().unwrap())
            .unwrap();

        let config = config();
        let engine = CpuRasterEngine::new(config.width, config.height).unwrap();
        let mut restored = Editor::new(config.clone(), Box::new(engine)).with_gateway(gateway.clone());
        assert_eq!(restored.restore(), RestoreSource::Snapshot);
        assert_eq!(restored.fingerprint(), painted.fingerprint());
        assert_eq!(restored.log().len(), 1);

        gateway.save_canvas_snapshot("data:image/png;base64,broken").unwrap();
        let engine = CpuRasterEngine::new(config.width, config.height).unwrap();
        let mut fresh = Editor::new(config, Box::new(engine)).with_gateway(gateway);
        assert_eq!(fresh.restore(), RestoreSource::Fresh);
    }
}
