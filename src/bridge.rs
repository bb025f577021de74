//! Host color bridge
//!
//! When the painter is embedded in another editor, committed color picks
//! are forwarded to the host as JSON messages:
//! `{"type":"setColor","target":"foreground","color":{"r":..,"g":..,"b":..,"hex":"#RRGGBB"}}`.
//! The host answers `{"type":"loaded"}` once it is ready.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::color::Color;
use crate::storage::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTarget {
    Foreground,
    Background,
}

/// Color as the host expects it: 0-255 channels plus hex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub hex: String,
}

impl From<Color> for HostColor {
    fn from(color: Color) -> Self {
        let [r, g, b] = color.to_rgb8();
        Self {
            r,
            g,
            b,
            hex: color.to_hex(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    SetColor { target: ColorTarget, color: HostColor },
    Loaded,
}

impl HostMessage {
    pub fn set_color(target: ColorTarget, color: Color) -> Self {
        Self::SetColor {
            target,
            color: color.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn parse(json: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Outbound channel to the host
pub trait HostBridge: Send {
    /// Fire and forget; delivery failures are logged
    fn post(&self, message: HostMessage);
}

/// Bridge used when no host is attached
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBridge;

impl HostBridge for NullBridge {
    fn post(&self, message: HostMessage) {
        tracing::trace!("[Bridge] No host attached, dropping {:?}", message);
    }
}

/// Bridge that serializes messages into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelBridge {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelBridge {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl HostBridge for ChannelBridge {
    fn post(&self, message: HostMessage) {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("[Bridge] Failed to serialize {:?}: {}", message, e);
                return;
            }
        };
        if self.tx.send(json).is_err() {
            tracing::warn!("[Bridge] Host channel closed");
        } else {
            tracing::debug!("[Bridge] Posted {:?}", message);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_color_wire_shape() {
        let message = HostMessage::set_color(ColorTarget::Background, Color::from_rgb8(255, 128, 0));
        let json: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "setColor");
        assert_eq!(json["target"], "background");
        assert_eq!(json["color"]["r"], 255);
        assert_eq!(json["color"]["g"], 128);
        assert_eq!(json["color"]["b"], 0);
        assert_eq!(json["color"]["hex"], "#FF8000");
    }

    #[test]
    fn test_parse_loaded() {
        assert_eq!(HostMessage::parse(r#"{"type":"loaded"}"#).unwrap(), HostMessage::Loaded);
        assert!(HostMessage::parse(r#"{"type":"unknown"}"#).is_err());
    }

    #[test]
    fn test_channel_bridge_delivers_json() {
        let (bridge, mut rx) = ChannelBridge::new();
        bridge.post(HostMessage::set_color(ColorTarget::Foreground, Color::BLACK));
        let json = rx.try_recv().unwrap();
        assert!(json.contains("\"foreground\""));
        drop(rx);
        bridge.post(HostMessage::Loaded);
    }
}
