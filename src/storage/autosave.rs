//! Debounced background saving
//!
//! The editor hands a [`SavePayload`] to the [`Autosaver`] after every commit
//! and carries on drawing. A tokio task keeps only the newest payload and
//! writes it once no newer request arrived for the debounce delay. PNG
//! encoding and store I/O run on the blocking pool, off the drawing path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::snapshot::encode_data_url;
use super::{PersistenceGateway, StorageError};
use crate::brush::BrushSettings;
use crate::history::HistorySnapshot;
use crate::raster::PresentationBuffer;

/// Everything one autosave writes
#[derive(Debug, Clone)]
pub struct SavePayload {
    /// History without its base; the base is encoded by the saver
    pub history: HistorySnapshot,
    pub history_base: Option<PresentationBuffer>,
    pub canvas: Option<PresentationBuffer>,
    pub brush_settings: BrushSettings,
}

enum Command {
    Save(Box<SavePayload>),
    Flush(oneshot::Sender<()>),
}

pub struct Autosaver {
    tx: mpsc::UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

impl Autosaver {
    /// Start the saver on the current tokio runtime
    pub fn spawn(gateway: Arc<dyn PersistenceGateway>, delay: Duration) -> Result<Self, StorageError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| StorageError::Unavailable(format!("no async runtime: {}", e)))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = runtime.spawn(run(gateway, delay, rx));
        tracing::debug!("[Autosave] Started with {:?} delay", delay);
        Ok(Self { tx, handle })
    }

    /// Queue a save; replaces any pending one. Never blocks.
    pub fn request(&self, payload: SavePayload) {
        if self.tx.send(Command::Save(Box::new(payload))).is_err() {
            tracing::warn!("[Autosave] Saver task is gone, dropping save");
        }
    }

    /// Write the pending payload now and wait for it
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Flush and stop the task
    pub async fn shutdown(self) {
        self.flush().await;
        drop(self.tx);
        if let Err(e) = self.handle.await {
            tracing::warn!("[Autosave] Saver task ended abnormally: {}", e);
        }
    }
}

async fn run(
    gateway: Arc<dyn PersistenceGateway>,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    let mut pending: Option<(Box<SavePayload>, Instant)> = None;

    loop {
        let deadline = pending.as_ref().map(|(_, deadline)| *deadline);
        let command = match deadline {
            Some(deadline) => {
                tokio::select! {
                    command = rx.recv() => command,
                    _ = tokio::time::sleep_until(deadline) => {
                        if let Some((payload, _)) = pending.take() {
                            write_blocking(&gateway, *payload).await;
                        }
                        continue;
                    }
                }
            }
            None => rx.recv().await,
        };

        match command {
            Some(Command::Save(payload)) => {
                pending = Some((payload, Instant::now() + delay));
            }
            Some(Command::Flush(ack)) => {
                if let Some((payload, _)) = pending.take() {
                    write_blocking(&gateway, *payload).await;
                }
                let _ = ack.send(());
            }
            None => {
                if let Some((payload, _)) = pending.take() {
                    write_blocking(&gateway, *payload).await;
                }
                break;
            }
        }
    }
    tracing::debug!("[Autosave] Stopped");
}

async fn write_blocking(gateway: &Arc<dyn PersistenceGateway>, payload: SavePayload) {
    let gateway = Arc::clone(gateway);
    if let Err(e) = tokio::task::spawn_blocking(move || write(gateway.as_ref(), payload)).await {
        tracing::error!("[Autosave] Write task failed: {}", e);
    }
}

fn write(gateway: &dyn PersistenceGateway, payload: SavePayload) {
    let SavePayload {
        mut history,
        history_base,
        canvas,
        brush_settings,
    } = payload;

    if let Some(base) = &history_base {
        match encode_data_url(base) {
            Ok(url) => history.base = Some(url),
            Err(e) => tracing::warn!("[Autosave] Failed to encode history base: {}", e),
        }
    }
    if let Err(e) = gateway.save_history(&history) {
        tracing::warn!("[Autosave] Failed to save history: {}", e);
    }

    if let Some(canvas) = &canvas {
        match encode_data_url(canvas) {
            Ok(url) => {
                if let Err(e) = gateway.save_canvas_snapshot(&url) {
                    tracing::warn!("[Autosave] Failed to save canvas: {}", e);
                }
            }
            Err(e) => tracing::warn!("[Autosave] Failed to encode canvas: {}", e),
        }
    }

    if let Err(e) = gateway.save_brush_settings(&brush_settings) {
        tracing::warn!("[Autosave] Failed to save brush settings: {}", e);
    }

    tracing::info!("[Autosave] Saved {} history entries", history.history.len());
}
