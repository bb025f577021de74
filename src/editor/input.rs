//! Abstract pointer input
//!
//! The editor consumes these events from a queue instead of window
//! callbacks, so gestures can be driven from tests or any host shell.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::brush::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    /// Draws; picks the foreground with the eyedropper
    #[default]
    Primary,
    /// Picks the background with the eyedropper
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    PointerDown {
        x: f32,
        y: f32,
        #[serde(default)]
        button: PointerButton,
    },
    PointerMove {
        x: f32,
        y: f32,
    },
    PointerUp,
    /// Pointer left the drawable surface
    PointerLeave,
    /// Eyedropper modifier key pressed or released
    EyedropperModifier {
        active: bool,
    },
}

impl InputEvent {
    pub fn down(x: f32, y: f32) -> Self {
        Self::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
        }
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self::PointerMove { x, y }
    }

    /// Position carried by the event, if any
    pub fn point(&self) -> Option<Point> {
        match *self {
            Self::PointerDown { x, y, .. } | Self::PointerMove { x, y } => Some(Point::new(x, y)),
            _ => None,
        }
    }
}

/// FIFO of pending input events
#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Enqueue a whole drag: down at the first point, moves, then up
    pub fn push_drag(&mut self, points: &[(f32, f32)]) {
        let Some((&(x, y), rest)) = points.split_first() else {
            return;
        };
        self.push(InputEvent::down(x, y));
        for &(x, y) in rest {
            self.push(InputEvent::moved(x, y));
        }
        self.push(InputEvent::PointerUp);
    }
}
