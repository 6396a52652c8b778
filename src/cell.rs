//! Single-writer serialized access to the cluster state.
//!
//! The [`StateCell`] is the only way cluster state mutates. Writers queue
//! on an async mutex and run one at a time against the latest committed
//! snapshot; readers take lock-free snapshots via [`StateCell::peek`].
//!
//! Serializing writers is what collapses thundering herds: when many
//! in-flight requests observe the same fault, they all enqueue a recovery
//! updater. The first one performs the refresh and commits; the rest run
//! against the refreshed snapshot, notice their trigger is already
//! resolved, and return it unchanged.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::error::{Error, Result};
use crate::state::ClusterState;

/// Serialized mutator over the shared [`ClusterState`] snapshot.
pub struct StateCell {
    /// Writer slot. Holding this across an `update_async` future is what
    /// makes recovery single-flight.
    writer: Mutex<()>,
    /// Last committed snapshot, readable without queueing.
    committed: watch::Sender<Arc<ClusterState>>,
    disposed: AtomicBool,
}

impl StateCell {
    /// A cell holding the empty state.
    pub fn new() -> Self {
        let (committed, _) = watch::channel(ClusterState::zero());
        Self {
            writer: Mutex::new(()),
            committed,
            disposed: AtomicBool::new(false),
        }
    }

    /// Non-blocking read of the last committed snapshot.
    pub fn peek(&self) -> Arc<ClusterState> {
        self.committed.borrow().clone()
    }

    fn check_open(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    fn commit(&self, state: ClusterState) -> Arc<ClusterState> {
        let state = Arc::new(state);
        self.committed.send_replace(state.clone());
        state
    }

    /// Enqueue a pure update; returns the committed result.
    pub async fn update<F>(&self, f: F) -> Result<Arc<ClusterState>>
    where
        F: FnOnce(&ClusterState) -> ClusterState,
    {
        let _slot = self.writer.lock().await;
        self.check_open()?;
        let next = f(&self.peek());
        Ok(self.commit(next))
    }

    /// Enqueue a pure update that also computes a result for the caller
    /// that submitted it.
    pub async fn update_with_result<F, R>(&self, f: F) -> Result<(Arc<ClusterState>, R)>
    where
        F: FnOnce(&ClusterState) -> (ClusterState, R),
    {
        let _slot = self.writer.lock().await;
        self.check_open()?;
        let (next, result) = f(&self.peek());
        Ok((self.commit(next), result))
    }

    /// Enqueue an asynchronous update. The writer slot is held for the
    /// duration of the future, so no other updater runs concurrently; the
    /// future receives the committed snapshot current at its turn.
    ///
    /// The future must not re-enter this cell; a nested update would
    /// deadlock on the writer slot. Reentrant discovery paths run in
    /// critical mode against a local state view instead.
    pub async fn update_async<F, Fut>(&self, f: F) -> Result<Arc<ClusterState>>
    where
        F: FnOnce(Arc<ClusterState>) -> Fut,
        Fut: Future<Output = Result<ClusterState>>,
    {
        let _slot = self.writer.lock().await;
        self.check_open()?;
        let next = f(self.peek()).await?;
        Ok(self.commit(next))
    }

    /// Close every cached channel and reject all further updates.
    ///
    /// `peek` keeps returning the final snapshot so in-flight readers can
    /// finish; their sends fail with terminal channel errors.
    pub async fn dispose(&self) {
        let _slot = self.writer.lock().await;
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let state = self.peek();
        for chan in state.channels() {
            chan.close().await;
        }
    }

    /// Whether the cell was disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
