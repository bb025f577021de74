//! Palette presets
//!
//! Sixteen-color watercolor sets. Selecting a preset sets the foreground to
//! its first color and the background to its last.

use crate::color::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub hex: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PalettePreset {
    /// Stable identifier, also the persisted preset name
    pub id: &'static str,
    pub name: &'static str,
    pub colors: [PaletteColor; 16],
}

impl PalettePreset {
    pub fn color(&self, index: usize) -> Option<Color> {
        self.colors.get(index).and_then(|c| Color::from_hex(c.hex))
    }

    pub fn foreground(&self) -> Color {
        self.color(0).unwrap_or(Color::BLACK)
    }

    pub fn background(&self) -> Color {
        self.color(15).unwrap_or(Color::WHITE)
    }
}

const fn c(hex: &'static str, name: &'static str) -> PaletteColor {
    PaletteColor { hex, name }
}

pub const DEFAULT_PRESET: &str = "winsorNewtonCotman";

pub static PRESETS: [PalettePreset; 4] = [
    PalettePreset {
        id: "winsorNewtonCotman",
        name: "Winsor & Newton Cotman 16",
        colors: [
            c("#F5E84C", "Lemon Yellow"),
            c("#F0D635", "Cadmium Yellow Pale Hue"),
            c("#ED7F3D", "Cadmium Orange Hue"),
            c("#E85D5D", "Cadmium Red Pale Hue"),
            c("#7A1818", "Alizarin Crimson Hue"),
            c("#6B2A7C", "Purple Lake"),
            c("#1C3575", "Ultramarine"),
            c("#1A8FCC", "Cerulean Blue Hue"),
            c("#0A7A5A", "Viridian Hue"),
            c("#456B0E", "Sap Green"),
            c("#C49665", "Yellow Ochre"),
            c("#8F4A2A", "Raw Sienna"),
            c("#7A3F13", "Burnt Sienna"),
            c("#362320", "Burnt Umber"),
            c("#424B5A", "Payne's Gray"),
            c("#F5F5F0", "Chinese White"),
        ],
    },
    PalettePreset {
        id: "digitalArtist",
        name: "Digital Artist Palette",
        colors: [
            c("#FFFF00", "Yellow"),
            c("#FFA500", "Orange"),
            c("#FF0000", "Red"),
            c("#FF69B4", "Hot Pink"),
            c("#8A2BE2", "Violet"),
            c("#0000FF", "Blue"),
            c("#00BFFF", "Deep Sky Blue"),
            c("#008000", "Green"),
            c("#00FF7F", "Spring Green"),
            c("#8B4513", "Brown"),
            c("#D2B48C", "Tan"),
            c("#FFD700", "Gold"),
            c("#FFFFFF", "White"),
            c("#808080", "Gray"),
            c("#2F4F4F", "Dark Slate Gray"),
            c("#000000", "Black"),
        ],
    },
    PalettePreset {
        id: "schminckeHoradam",
        name: "Schmincke Horadam 16",
        colors: [
            c("#FFEB3B", "Lemon Yellow"),
            c("#FFC107", "Indian Yellow"),
            c("#FF5722", "Vermilion"),
            c("#E91E63", "Ruby Red"),
            c("#9C27B0", "Magenta"),
            c("#673AB7", "Mauve"),
            c("#3F51B5", "Ultramarine Finest"),
            c("#2196F3", "Prussian Blue"),
            c("#03A9F4", "Cerulean Blue"),
            c("#009688", "Phthalo Green"),
            c("#4CAF50", "Permanent Green"),
            c("#8BC34A", "May Green"),
            c("#CDDC39", "Green Earth"),
            c("#A1887F", "Burnt Sienna"),
            c("#795548", "Sepia Brown"),
            c("#607D8B", "Neutral Grey"),
        ],
    },
    PalettePreset {
        id: "kuretakeGansai",
        name: "Kuretake Gansai 16",
        colors: [
            c("#FFEB3B", "Pale Yellow"),
            c("#FFC107", "Yellow"),
            c("#FF9800", "Orange"),
            c("#F44336", "Scarlet"),
            c("#E91E63", "Carmine"),
            c("#9C27B0", "Violet"),
            c("#673AB7", "Purple"),
            c("#3F51B5", "Indigo"),
            c("#2196F3", "Blue"),
            c("#03A9F4", "Light Blue"),
            c("#00BCD4", "Turquoise"),
            c("#009688", "Viridian"),
            c("#4CAF50", "Green"),
            c("#8BC34A", "Sap Green"),
            c("#795548", "Brown"),
            c("#607D8B", "Gray"),
        ],
    },
];

pub fn find(id: &str) -> Option<&'static PalettePreset> {
    PRESETS.iter().find(|p| p.id == id)
}

pub fn default_preset() -> &'static PalettePreset {
    &PRESETS[0]
}
