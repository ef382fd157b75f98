//! Background sync worker.
//!
//! Wakes once per interval and asks the repository to sync when it is dirty
//! and idle. Stopped through a channel so shutdown does not wait out a full
//! interval.

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

use super::Repository;
use crate::types::Result;

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Languages processed
    pub languages: usize,
    /// Records evicted across all languages
    pub evicted: usize,
    /// Languages whose eviction or index save failed
    pub failed: usize,
}

/// Handle of the background sync thread.
pub struct SyncWorker {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl SyncWorker {
    /// Spawn the sync thread.
    ///
    /// The thread holds only a weak reference, so it never keeps the
    /// repository alive and exits once the repository is dropped.
    pub fn spawn(repository: Weak<Repository>, interval: Duration) -> Result<Self> {
        let (stop, stopped) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("repository-sync".to_string())
            .spawn(move || {
                info!(interval_ms = interval.as_millis() as u64, "Sync worker started");
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let Some(repository) = repository.upgrade() else {
                        break;
                    };
                    if let Some(report) = repository.sync_if_idle() {
                        debug!(?report, "Background sync finished");
                    }
                }
                info!("Sync worker stopped");
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Signal the thread to stop without waiting for it.
    pub fn signal_stop(&self) {
        let _ = self.stop.try_send(());
    }

    /// Signal the thread to stop and wait for it.
    pub fn stop(&mut self) {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Sync worker panicked");
            }
        }
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        self.signal_stop();
    }
}
