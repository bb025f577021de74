use thiserror::Error;

/// Raster engine creation failure
#[derive(Debug, Error)]
pub enum EngineInitError {
    #[error("no compatible graphics adapter found")]
    NoAdapter,

    #[error("graphics device request failed: {0}")]
    RequestDevice(String),

    #[error("invalid surface dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("surface {width}x{height} exceeds the {max}px limit of this backend")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("backend unsupported: {0}")]
    Unsupported(String),
}
