//! Mutual exclusion between requests and the background sync.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct GateState {
    active: usize,
    syncing: bool,
}

/// Tracks in-flight requests and lets a sync run only when none are active.
///
/// Requests hold an [`ActiveGuard`] for their whole duration. A sync holds a
/// [`SyncGuard`]; while it does, new requests wait.
#[derive(Debug, Default)]
pub struct ActivityGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl ActivityGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an in-flight request, waiting for a running sync to finish.
    pub fn enter(&self) -> ActiveGuard<'_> {
        let mut state = self.state.lock();
        while state.syncing {
            self.changed.wait(&mut state);
        }
        state.active += 1;
        ActiveGuard { gate: self }
    }

    /// Start a sync if no request is in flight and no other sync runs.
    pub fn try_begin_sync(&self) -> Option<SyncGuard<'_>> {
        let mut state = self.state.lock();
        if state.active > 0 || state.syncing {
            return None;
        }
        state.syncing = true;
        Some(SyncGuard { gate: self })
    }

    /// Start a sync, waiting for in-flight requests and other syncs to finish.
    pub fn begin_sync(&self) -> SyncGuard<'_> {
        let mut state = self.state.lock();
        while state.active > 0 || state.syncing {
            self.changed.wait(&mut state);
        }
        state.syncing = true;
        SyncGuard { gate: self }
    }

    /// Whether any request is in flight.
    pub fn is_busy(&self) -> bool {
        self.state.lock().active > 0
    }
}

/// Held by a request while it runs.
#[must_use]
pub struct ActiveGuard<'a> {
    gate: &'a ActivityGate,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.state.lock();
        state.active -= 1;
        if state.active == 0 {
            self.gate.changed.notify_all();
        }
    }
}

/// Held by a sync while it runs.
#[must_use]
pub struct SyncGuard<'a> {
    gate: &'a ActivityGate,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.gate.state.lock().syncing = false;
        self.gate.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_sync_refused_while_busy() {
        let gate = ActivityGate::new();
        let request = gate.enter();
        assert!(gate.is_busy());
        assert!(gate.try_begin_sync().is_none());

        drop(request);
        assert!(!gate.is_busy());
        let sync = gate.try_begin_sync();
        assert!(sync.is_some());
        assert!(gate.try_begin_sync().is_none());
    }

    #[test]
    fn test_requests_wait_for_sync() {
        let gate = Arc::new(ActivityGate::new());
        let entered = Arc::new(AtomicBool::new(false));

        let sync = gate.begin_sync();
        let handle = {
            let gate = gate.clone();
            let entered = entered.clone();
            thread::spawn(move || {
                let _request = gate.enter();
                entered.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));
        drop(sync);
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }

    #[test]
    fn test_begin_sync_waits_for_requests() {
        let gate = Arc::new(ActivityGate::new());
        let request = gate.enter();
        let synced = Arc::new(AtomicBool::new(false));

        let handle = {
            let gate = gate.clone();
            let synced = synced.clone();
            thread::spawn(move || {
                let _sync = gate.begin_sync();
                synced.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!synced.load(Ordering::SeqCst));
        drop(request);
        handle.join().unwrap();
        assert!(synced.load(Ordering::SeqCst));
    }
}
