//! Single-writer published state
//!
//! The controller owning a `Published` value is its only writer; any number
//! of readers subscribe and observe every later snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

#[derive(Debug)]
pub struct Published<T> {
    tx: watch::Sender<T>,
    version: AtomicU64,
}

impl<T: Clone + PartialEq> Published<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            tx,
            version: AtomicU64::new(0),
        }
    }

    /// Current snapshot
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Publish unconditionally
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Publish only when different from the current snapshot
    pub fn set_if_changed(&self, value: T) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
        if changed {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        changed
    }

    /// Number of snapshots published since creation
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + PartialEq + Default> Default for Published<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
