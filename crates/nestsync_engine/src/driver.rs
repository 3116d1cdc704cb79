//! Background driver wiring the orchestrator to a network monitor and
//! timers.

use crate::monitor::NetworkMonitor;
use crate::orchestrator::SyncOrchestrator;
use crate::transport::SyncTransport;
use nestsync_store::LocalStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Upper bound on how long the driver sleeps between ticks, so stop
/// requests and deadline changes are observed promptly.
const MAX_WAIT: Duration = Duration::from_millis(500);

/// Owns the thread that drives automatic sync.
///
/// The driver subscribes to the network monitor once at startup, relays
/// connectivity transitions to the orchestrator, and ticks it whenever
/// the periodic interval or a backoff deadline elapses. Everything else
/// — coalescing, state transitions, error classification — stays inside
/// the orchestrator.
pub struct SyncDriver {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncDriver {
    /// Spawns the driver thread.
    pub fn spawn<S, T, M>(orchestrator: Arc<SyncOrchestrator<S, T>>, monitor: Arc<M>) -> Self
    where
        S: LocalStore + 'static,
        T: SyncTransport + 'static,
        M: NetworkMonitor + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let events = monitor.subscribe();
        orchestrator.handle_connectivity(monitor.is_online());

        let handle = thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                let wait = orchestrator.next_due_in().min(MAX_WAIT);
                match events.recv_timeout(wait) {
                    Ok(online) => orchestrator.handle_connectivity(online),
                    Err(RecvTimeoutError::Timeout) => orchestrator.tick(),
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stops the driver and waits for its thread to exit.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SyncDriver {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}
