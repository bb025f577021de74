//! Mixpaint - pigment-mixing paint surface with replayable stroke history
//!
//! The [`editor::Editor`] turns pointer input into brush and smudge dabs on a
//! [`raster::RasterEngine`] (GPU when available, CPU otherwise), records every
//! gesture in a bounded [`history::HistoryLog`] and rebuilds the surface by
//! replay for undo and redo.

pub mod bridge;
pub mod brush;
pub mod color;
pub mod config;
pub mod editor;
pub mod history;
pub mod palette;
pub mod raster;
pub mod smudge;
pub mod storage;

#[cfg(test)]
mod tests;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mixpaint=debug,mixpaint_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Mixpaint initializing...");
}
