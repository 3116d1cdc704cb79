//! Network connectivity monitoring.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// Reports connectivity and its transitions.
///
/// The engine subscribes once at startup (via the driver) and treats
/// every `true` event as a reconnect trigger, which always preempts a
/// backoff wait.
pub trait NetworkMonitor: Send + Sync {
    /// Returns the current connectivity.
    fn is_online(&self) -> bool;

    /// Subscribes to connectivity transitions.
    fn subscribe(&self) -> Receiver<bool>;
}

/// A monitor whose connectivity is toggled by the embedder.
///
/// Real applications wire this to their platform reachability callback;
/// tests flip it directly.
#[derive(Debug)]
pub struct ToggleMonitor {
    online: AtomicBool,
    subscribers: Mutex<Vec<Sender<bool>>>,
}

impl ToggleMonitor {
    /// Creates a monitor with the given initial connectivity.
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Updates connectivity and notifies subscribers.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(online).is_ok());
    }
}

impl NetworkMonitor for ToggleMonitor {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> Receiver<bool> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }
}
