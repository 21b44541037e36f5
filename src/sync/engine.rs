//! Background worker that keeps the local pantry and the backend converged.
//!
//! Writes land in the local store first; the worker pushes the full snapshot
//! after a debounce window, when connectivity returns, and once more on
//! shutdown. A push failure leaves the dirty state in place, so the next
//! trigger retries the same snapshot.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::connectivity::Connectivity;
use crate::lock::mutex_lock;
use crate::models::{PantryItem, RemotePantryItem};
use crate::repo::PantryRepository;
use crate::store::PantryDb;

/// Debounce window for pushing pantry changes, in milliseconds.
/// 4 seconds batches a burst of edits into a single snapshot push.
pub const DEFAULT_SYNC_DEBOUNCE_MS: u64 = 4000;

enum Command {
    Schedule,
    FlushNow,
    Shutdown,
}

/// Handle to the sync worker task.
pub struct SyncEngine {
    tx: mpsc::UnboundedSender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SyncEngine {
    /// Spawn the worker. Must be called from within a tokio runtime.
    pub fn start(
        db: Arc<PantryDb>,
        repo: Arc<dyn PantryRepository>,
        connectivity: Connectivity,
        debounce: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            db,
            repo,
            connectivity,
            debounce,
            dirty: false,
        };
        let handle = tokio::spawn(worker.run(rx));
        Self {
            tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Note a local change and (re)start the debounce window.
    pub fn schedule(&self) {
        let _ = self.tx.send(Command::Schedule);
    }

    /// Push pending changes immediately, skipping the debounce window.
    pub fn flush_now(&self) {
        let _ = self.tx.send(Command::FlushNow);
    }

    /// Stop the worker after one final push of anything still pending.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
        let handle = mutex_lock(&self.handle, "sync_engine").take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Sync worker ended abnormally");
            }
        }
    }
}

struct Worker {
    db: Arc<PantryDb>,
    repo: Arc<dyn PantryRepository>,
    connectivity: Connectivity,
    debounce: Duration,
    /// Set on every scheduled change, cleared only by a successful push.
    /// Covers deletions, which leave no unsynced row behind to witness them.
    dirty: bool,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        self.hydrate_if_empty().await;

        // Items restored from disk may still carry dirty markers from a
        // session that ended before its push completed.
        self.dirty = self.db.has_unsynced();

        let mut online_rx = self.connectivity.subscribe();
        let mut watching = true;

        let timer = tokio::time::sleep(self.debounce);
        tokio::pin!(timer);
        // Leftover changes get one debounce window instead of pushing
        // mid-startup.
        let mut armed = self.dirty;

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Schedule) => {
                        self.dirty = true;
                        timer.as_mut().reset(Instant::now() + self.debounce);
                        armed = true;
                    }
                    Some(Command::FlushNow) => {
                        armed = false;
                        self.flush().await;
                    }
                    Some(Command::Shutdown) | None => break,
                },
                result = online_rx.changed(), if watching => match result {
                    Ok(()) => {
                        let online = *online_rx.borrow_and_update();
                        if online && self.pending() {
                            debug!("Back online, flushing pantry changes");
                            armed = false;
                            self.flush().await;
                        }
                    }
                    Err(_) => watching = false,
                },
                () = &mut timer, if armed => {
                    armed = false;
                    if self.pending() {
                        self.flush().await;
                    }
                }
            }
        }

        if self.pending() {
            self.flush().await;
        }
    }

    fn pending(&self) -> bool {
        self.dirty || self.db.has_unsynced()
    }

    /// Pull the remote pantry into an empty local store on cold start.
    /// Local data always wins: any item present locally skips the pull, and
    /// an edit racing the pull is re-checked inside the store.
    async fn hydrate_if_empty(&self) {
        if !self.db.is_empty() {
            return;
        }
        if !self.connectivity.is_online() {
            debug!("Offline at startup, skipping pantry hydration");
            return;
        }

        match self.repo.pull().await {
            Ok(remote) if remote.is_empty() => debug!("Remote pantry is empty"),
            Ok(remote) => {
                let count = remote.len();
                if self.db.hydrate(remote) {
                    info!(count, "Hydrated pantry from remote");
                } else {
                    debug!("Local items appeared during hydration; keeping them");
                }
            }
            Err(e) => warn!(error = %e, "Pantry hydration failed; starting from local state"),
        }
    }

    /// Push the full local snapshot. Items edited while the push is in
    /// flight keep their dirty marker and go out with the next push.
    async fn flush(&mut self) {
        if !self.connectivity.is_online() {
            debug!("Offline, keeping pantry changes queued");
            return;
        }

        let snapshot = self.db.all();
        let remote: Vec<RemotePantryItem> = snapshot.iter().map(PantryItem::to_remote).collect();
        let count = remote.len();
        debug!(count, dirty = self.db.unsynced().len(), "Pushing pantry snapshot");

        match self.repo.push(&remote).await {
            Ok(()) => {
                self.db.mark_synced_matching(&snapshot);
                self.dirty = false;
                debug!(count, "Pushed pantry snapshot");
            }
            Err(e) => warn!(error = %e, count, "Pantry push failed; will retry"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
