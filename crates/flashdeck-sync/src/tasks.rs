//! Task ownership
//!
//! Long-lived listeners occupy named [`Slot`]s and are aborted when their
//! wiring is torn down. Short-lived work (remote writes, migrations) is
//! tracked in [`BackgroundTasks`] so callers can wait for it to drain.

use std::collections::HashMap;
use std::future::Future;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

/// Long-lived listener positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Slot {
    AuthPoller,
    PublicFeed,
    PrivateFeed,
    BridgeFeed,
    ChangeListener,
}

impl Slot {
    /// Listeners that belong to one session mode.
    pub(crate) const SESSION: [Slot; 3] = [Self::PrivateFeed, Self::BridgeFeed, Self::ChangeListener];
}

#[derive(Debug, Default)]
pub(crate) struct TaskSlots {
    slots: Mutex<HashMap<Slot, JoinHandle<()>>>,
}

impl TaskSlots {
    /// Install `handle` in `slot`, aborting whatever was there.
    pub(crate) fn install(&self, slot: Slot, handle: JoinHandle<()>) {
        if let Some(previous) = self.slots.lock().insert(slot, handle) {
            previous.abort();
        }
    }

    pub(crate) fn abort(&self, slot: Slot) {
        if let Some(handle) = self.slots.lock().remove(&slot) {
            handle.abort();
        }
    }

    pub(crate) fn abort_session(&self) {
        for slot in Slot::SESSION {
            self.abort(slot);
        }
    }

    pub(crate) fn abort_all(&self) {
        for (_, handle) in self.slots.lock().drain() {
            handle.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self, slot: Slot) -> bool {
        self.slots
            .lock()
            .get(&slot)
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[derive(Debug, Default)]
pub(crate) struct BackgroundTasks {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundTasks {
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Wait until every tracked task, including ones spawned while waiting,
    /// has finished.
    pub(crate) async fn settle(&self) {
        loop {
            let pending = std::mem::take(&mut *self.handles.lock());
            if pending.is_empty() {
                return;
            }
            for result in join_all(pending).await {
                if let Err(err) = result {
                    if err.is_panic() {
                        warn!(error = %err, "background task panicked");
                    }
                }
            }
        }
    }

    pub(crate) fn abort_all(&self) {
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }
}
