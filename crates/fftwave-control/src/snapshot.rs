//! Shared DMX control snapshot
//!
//! Writers (the Art-Net listener, UI events) publish a whole new
//! [`DmxControl`]; the render loop loads one consistent copy per tick without
//! taking a lock.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::dmx::DmxControl;

/// Cloneable handle to the current control state
#[derive(Debug, Clone)]
pub struct DmxHandle {
    current: Arc<ArcSwap<DmxControl>>,
}

impl Default for DmxHandle {
    fn default() -> Self {
        Self::new(DmxControl::default())
    }
}

impl DmxHandle {
    /// Handle starting from `initial`
    pub fn new(initial: DmxControl) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Copy of the current state
    pub fn load(&self) -> DmxControl {
        **self.current.load()
    }

    /// Replace the state
    pub fn store(&self, control: DmxControl) {
        self.current.store(Arc::new(control));
    }

    /// Read-modify-write; retried if another writer raced us.
    pub fn update<F>(&self, mut f: F)
    where
        F: FnMut(&mut DmxControl),
    {
        self.current.rcu(|current| {
            let mut next = **current;
            f(&mut next);
            next
        });
    }

    /// Flip the override color on or off
    pub fn toggle_override(&self) {
        self.update(DmxControl::toggle_override);
    }
}
