//! Engine configuration
//!
//! Loaded from `<data dir>/mixpaint/config.json`; every field falls back to its
//! default, a missing file yields the defaults, and `MIXPAINT_BACKEND`
//! overrides the backend choice.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Directory name under the platform data dir
pub const APP_DIR: &str = "mixpaint";

/// Environment variable overriding [`EngineConfig::backend`]
pub const BACKEND_ENV: &str = "MIXPAINT_BACKEND";

/// Which raster engine to try first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// GPU when an adapter exists, otherwise CPU
    #[default]
    Auto,
    /// Same probing as `Auto`, logged as an explicit request
    Gpu,
    /// Never touch the GPU
    Cpu,
}

impl BackendPreference {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "gpu" | "webgl" => Some(Self::Gpu),
            "cpu" | "canvas" => Some(Self::Cpu),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    /// Surface color after a clear or a fresh start
    pub background: Color,
    /// Maximum history entries
    pub history_capacity: usize,
    /// Debounce delay of the autosave
    pub autosave_delay_ms: u64,
    /// Pointer moves shorter than this are ignored
    pub min_dab_distance: f32,
    /// Sample spacing of the smudge operator
    pub smudge_sample_step: f32,
    /// Mix strength of a fresh engine
    pub mix_strength: f32,
    pub backend: BackendPreference,
    /// Interpolate from the previous stroke when clicking close to its end
    pub bridge_clicks: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background: Color::new(0.973, 0.973, 0.961),
            history_capacity: 50,
            autosave_delay_ms: 2000,
            min_dab_distance: 2.0,
            smudge_sample_step: 2.0,
            mix_strength: 0.2,
            backend: BackendPreference::Auto,
            bridge_clicks: true,
        }
    }
}

impl EngineConfig {
    /// Platform data directory of the application
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn default_path() -> PathBuf {
        Self::data_dir().join("config.json")
    }

    /// Read the config at `path`, then apply the environment override
    pub fn load(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<EngineConfig>(&text) {
                Ok(config) => {
                    tracing::debug!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::warn!("Invalid config {:?}, using defaults: {}", path, e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!("Failed to read config {:?}, using defaults: {}", path, e);
                Self::default()
            }
        };
        config.apply_env();
        config.sanitize();
        config
    }

    fn apply_env(&mut self) {
        let Ok(value) = std::env::var(BACKEND_ENV) else {
            return;
        };
        match BackendPreference::parse(&value) {
            Some(backend) => self.backend = backend,
            None => tracing::warn!("Ignoring {}={:?}", BACKEND_ENV, value),
        }
    }

    /// Replace out-of-range values with defaults
    fn sanitize(&mut self) {
        let defaults = Self::default();
        if self.history_capacity == 0 {
            self.history_capacity = defaults.history_capacity;
        }
        if !self.background.is_valid() {
            self.background = defaults.background;
        }
        if !(self.min_dab_distance.is_finite() && self.min_dab_distance >= 0.0) {
            self.min_dab_distance = defaults.min_dab_distance;
        }
        if !(self.smudge_sample_step.is_finite() && self.smudge_sample_step > 0.0) {
            self.smudge_sample_step = defaults.smudge_sample_step;
        }
        self.mix_strength = crate::raster::clamp_mix_strength(self.mix_strength);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.background.to_hex(), "#F8F8F5");
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.autosave_delay_ms, 2000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"width": 320, "backend": "cpu"}"#).unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.height, 600);
        assert_eq!(config.backend, BackendPreference::Cpu);
    }

    #[test]
    fn test_load_missing_and_invalid() {
        let dir = std::env::temp_dir().join(format!("mixpaint-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let missing = EngineConfig::load(&dir.join("nope.json"));
        assert_eq!(missing.history_capacity, 50);

        let bad = dir.join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert_eq!(EngineConfig::load(&bad).width, 800);

        let zero = dir.join("zero.json");
        std::fs::write(&zero, r#"{"historyCapacity": 0, "mixStrength": 9}"#).unwrap();
        let config = EngineConfig::load(&zero);
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.mix_strength, 1.0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(BackendPreference::parse(" GPU "), Some(BackendPreference::Gpu));
        assert_eq!(BackendPreference::parse("canvas"), Some(BackendPreference::Cpu));
        assert_eq!(BackendPreference::parse("metal"), None);
    }
}
