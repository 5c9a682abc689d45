//! Snapshot Scheduler
//!
//! Background thread that snapshots the engine on a fixed interval.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};

use crate::engine::Engine;
use crate::error::{CacheError, Result};

/// Handle to the periodic snapshot thread
///
/// Dropping the handle stops the thread.
pub struct SnapshotScheduler {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SnapshotScheduler {
    /// Spawn the snapshot thread
    pub fn start(engine: Arc<Engine>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(CacheError::Config(
                "snapshot interval must be greater than zero".to_string(),
            ));
        }

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("snapshot".to_string())
            .spawn(move || {
                let ticker = channel::tick(interval);
                tracing::debug!("Snapshot scheduler running every {:?}", interval);

                loop {
                    channel::select! {
                        recv(ticker) -> _ => {
                            if let Err(e) = engine.snapshot() {
                                tracing::error!("Periodic snapshot failed: {}", e);
                            }
                        }
                        recv(stop_rx) -> _ => break,
                    }
                }

                tracing::debug!("Snapshot scheduler stopped");
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for an in-flight snapshot to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Snapshot scheduler thread panicked");
            }
        }
    }
}

impl Drop for SnapshotScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
