//! Tool state owned by the editor

use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::brush::{BrushSettings, BrushSpec, BrushType};
use crate::color::Color;
use crate::history::ToolSnapshot;
use crate::palette;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Brush,
    Smudge,
}

/// Everything the input handlers read and change
#[derive(Debug, Clone)]
pub struct EditorState {
    pub tool: Tool,
    pub foreground: Color,
    pub background: Color,
    pub brush_type: BrushType,
    /// Size of the brush tool
    pub brush_size: f32,
    /// Size of the smudge tool, kept apart from the brush size
    pub smudge_size: f32,
    pub mix_strength: f32,
    /// 0 - 100
    pub smudge_strength: f32,
    pub palette: &'static str,
    /// Eyedropper modifier held
    pub eyedropper: bool,
    pub custom_image: Option<Arc<RgbaImage>>,
}

impl EditorState {
    pub fn new(mix_strength: f32) -> Self {
        let preset = palette::default_preset();
        Self {
            tool: Tool::Brush,
            foreground: preset.foreground(),
            background: preset.background(),
            brush_type: BrushType::Watercolor,
            brush_size: 15.0,
            smudge_size: 15.0,
            mix_strength,
            smudge_strength: 50.0,
            palette: preset.id,
            eyedropper: false,
            custom_image: None,
        }
    }

    /// Size of the active tool
    pub fn active_size(&self) -> f32 {
        match self.tool {
            Tool::Brush => self.brush_size,
            Tool::Smudge => self.smudge_size,
        }
    }

    pub fn brush_spec(&self) -> BrushSpec {
        let spec = BrushSpec::new(self.brush_type, self.active_size());
        match &self.custom_image {
            Some(image) => spec.with_image(Arc::clone(image)),
            None => spec,
        }
    }

    pub fn tool_snapshot(&self) -> ToolSnapshot {
        ToolSnapshot {
            brush_size: self.active_size(),
            brush_type: self.brush_type,
            mix_strength: self.mix_strength,
            smudge_strength: self.smudge_strength,
            custom_image: self.custom_image.is_some(),
        }
    }

    pub fn brush_settings(&self) -> BrushSettings {
        BrushSettings {
            brush_type: self.brush_type,
            brush_size: self.brush_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_default_palette() {
        let state = EditorState::new(0.2);
        assert_eq!(state.foreground.to_hex(), "#F5E84C");
        assert_eq!(state.background.to_hex(), "#F5F5F0");
        assert_eq!(state.tool, Tool::Brush);
        assert_eq!(state.smudge_strength, 50.0);
    }

    #[test]
    fn test_active_size_follows_tool() {
        let mut state = EditorState::new(0.2);
        state.brush_size = 30.0;
        state.smudge_size = 8.0;
        assert_eq!(state.brush_spec().size, 30.0);
        state.tool = Tool::Smudge;
        assert_eq!(state.brush_spec().size, 8.0);
        assert_eq!(state.tool_snapshot().brush_size, 8.0);
        assert_eq!(state.brush_settings().brush_size, 30.0);
    }
}
