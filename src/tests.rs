//! End-to-end scenarios across editor, history, replay and storage

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use crate::brush::BrushType;
use crate::color::{pigment_mix, Color};
use crate::config::{BackendPreference, EngineConfig};
use crate::editor::{Editor, InputEvent, RestoreSource, Tool};
use crate::history::StrokeKind;
use crate::raster::CpuRasterEngine;
use crate::storage::snapshot::decode_data_url;
use crate::storage::{MemoryStore, PaletteStorage, PersistenceGateway};

fn config(capacity: usize) -> EngineConfig {
    EngineConfig {
        width: 120,
        height: 80,
        history_capacity: capacity,
        backend: BackendPreference::Cpu,
        ..Default::default()
    }
}

fn cpu_editor(config: EngineConfig) -> Editor {
    let engine = CpuRasterEngine::new(config.width, config.height).unwrap();
    Editor::new(config, Box::new(engine)).with_seed(7)
}

fn stroke(editor: &mut Editor, points: &[(f32, f32)]) {
    editor.queue_mut().push_drag(points);
    editor.process_events();
}

#[test]
fn test_single_click_mixes_center_pixel() {
    let mut editor = cpu_editor(config(50));
    editor.restore();
    editor.set_brush_type(BrushType::Circle);
    editor.set_brush_size(10.0);
    editor.set_foreground(Color::new(1.0, 0.0, 0.0));
    editor.set_mix_strength(0.2);

    stroke(&mut editor, &[(60.0, 40.0)]);

    let [r, g, b, _] = editor.config().background.to_rgba8();
    let expected = pigment_mix(Color::from_rgb8(r, g, b), Color::new(1.0, 0.0, 0.0), 0.2);
    assert_eq!(editor.presentation().pixel(60, 40).unwrap(), expected.to_rgba8());
    assert_eq!(
        editor.presentation().pixel(60, 60).unwrap(),
        editor.config().background.to_rgba8()
    );
}

#[test]
fn test_new_stroke_after_undo_discards_redo() {
    let mut editor = cpu_editor(config(50));
    editor.restore();
    stroke(&mut editor, &[(10.0, 10.0), (30.0, 10.0)]);
    stroke(&mut editor, &[(10.0, 30.0), (30.0, 30.0)]);
    stroke(&mut editor, &[(10.0, 50.0), (30.0, 50.0)]);
    assert!(editor.undo());
    assert!(editor.undo());
    assert_eq!(editor.log().cursor(), 1);

    stroke(&mut editor, &[(80.0, 40.0), (100.0, 40.0)]);

    let records: Vec<_> = editor.log().records().collect();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].kind, StrokeKind::Init);
    assert_eq!(records[1].points[0].y, 10.0);
    assert_eq!(records[2].points[0].x, 80.0);
    assert_eq!(editor.log().cursor(), 2);
    assert!(!editor.can_redo());
}

#[test]
fn test_undo_redo_round_trip_is_exact() {
    let mut editor = cpu_editor(config(50));
    editor.restore();
    let blank = editor.fingerprint();

    for (i, brush) in BrushType::ALL.iter().enumerate() {
        editor.set_brush_type(*brush);
        let y = 10.0 + i as f32 * 12.0;
        stroke(&mut editor, &[(10.0, y), (60.0, y + 4.0), (110.0, y)]);
    }
    editor.select_tool(Tool::Smudge);
    stroke(&mut editor, &[(20.0, 10.0), (40.0, 70.0)]);
    let painted = editor.fingerprint();
    assert_ne!(painted, blank);

    while editor.undo() {}
    assert_eq!(editor.fingerprint(), blank);
    while editor.redo() {}
    assert_eq!(editor.fingerprint(), painted);
}

#[test]
fn test_same_seed_same_pixels() {
    let draw = || {
        let mut editor = cpu_editor(config(50));
        editor.restore();
        editor.set_brush_type(BrushType::Dry);
        stroke(&mut editor, &[(15.0, 15.0), (90.0, 60.0)]);
        editor.fingerprint()
    };
    assert_eq!(draw(), draw());
}

#[test]
fn test_eviction_keeps_visible_surface() {
    let mut editor = cpu_editor(config(3));
    editor.restore();
    for i in 0..5 {
        let y = 10.0 + i as f32 * 14.0;
        stroke(&mut editor, &[(10.0, y), (100.0, y)]);
    }
    assert_eq!(editor.log().len(), 3);
    assert!(editor.log().base().is_some());
    let live = editor.fingerprint();

    assert!(editor.undo());
    assert!(editor.undo());
    assert!(!editor.undo());
    assert!(editor.redo());
    assert!(editor.redo());
    assert_eq!(editor.fingerprint(), live);
}

#[test]
fn test_pointer_leave_mid_stroke_keeps_history() {
    let mut editor = cpu_editor(config(50));
    editor.restore();
    stroke(&mut editor, &[(20.0, 20.0), (50.0, 20.0)]);
    let committed = editor.fingerprint();

    editor.push_event(InputEvent::down(20.0, 60.0));
    editor.push_event(InputEvent::moved(80.0, 60.0));
    editor.push_event(InputEvent::PointerLeave);
    editor.push_event(InputEvent::PointerUp);
    editor.process_events();

    assert_eq!(editor.log().len(), 2);
    assert_eq!(editor.fingerprint(), committed);
}

#[tokio::test]
async fn test_autosave_then_restore_reproduces_surface() {
    let store = Arc::new(MemoryStore::new());
    let gateway: Arc<dyn PersistenceGateway> = Arc::new(PaletteStorage::new(store.clone()));

    let mut first = cpu_editor(config(2)).with_persistence(store).unwrap();
    first.restore();
    first.set_brush_type(BrushType::Watercolor);
    for i in 0..4 {
        let y = 12.0 + i as f32 * 16.0;
        stroke(&mut first, &[(10.0, y), (110.0, y)]);
    }
    first.flush().await;

    let saved = gateway.load_history().unwrap();
    assert_eq!(saved.history.len(), 2);
    assert!(saved.base.is_some());
    let canvas = decode_data_url(&gateway.load_canvas_snapshot().unwrap(), Some((120, 80))).unwrap();
    assert_eq!(canvas.digest(), first.fingerprint());

    let mut second = cpu_editor(config(2)).with_gateway(gateway);
    assert_eq!(second.restore(), RestoreSource::History);
    assert_eq!(second.fingerprint(), first.fingerprint());
    assert_eq!(second.state().brush_type, BrushType::Watercolor);
}
