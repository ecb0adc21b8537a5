use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::state::ItemId;

/// Cooperative cancellation token. Raising it never interrupts an in-flight
/// call; the run loop polls it between items.
#[derive(Clone, Default)]
pub struct StopSignal {
    raised: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }
}

/// Whether a run is active, and which item it currently owns.
#[derive(Clone, Default)]
pub struct BatchRunState {
    inner: Arc<RunStateInner>,
}

#[derive(Default)]
struct RunStateInner {
    active: AtomicBool,
    current: Mutex<Option<ItemId>>,
    stop: StopSignal,
}

impl BatchRunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn current_item(&self) -> Option<ItemId> {
        self.inner.current.lock().ok().and_then(|c| c.clone())
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.inner.stop.clone()
    }

    /// Mark a run active. Returns `None` when one already is; the guard
    /// clears the flag and the owned item when dropped.
    pub(crate) fn try_begin(&self) -> Option<RunGuard> {
        self.inner
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        self.inner.stop.reset();
        Some(RunGuard {
            state: self.clone(),
        })
    }

    fn set_current(&self, id: Option<ItemId>) {
        if let Ok(mut current) = self.inner.current.lock() {
            *current = id;
        }
    }
}

pub(crate) struct RunGuard {
    state: BatchRunState,
}

impl RunGuard {
    pub(crate) fn claim(&self, id: ItemId) {
        self.state.set_current(Some(id));
    }

    pub(crate) fn release(&self) {
        self.state.set_current(None);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.set_current(None);
        self.state.inner.active.store(false, Ordering::SeqCst);
    }
}
