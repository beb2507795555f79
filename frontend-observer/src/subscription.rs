use std::cell::{Cell, RefCell};

use crate::Destructor;

/// One upstream subscription shared by any number of local listeners.
///
/// The first [`acquire`](SharedSubscription::acquire) attaches upstream, the
/// release of the last lease detaches it. [`reset`](SharedSubscription::reset)
/// detaches at once and invalidates every outstanding lease.
#[derive(Debug, Default)]
pub struct SharedSubscription {
    count: Cell<usize>,
    generation: Cell<u64>,
    active: RefCell<Option<Destructor>>,
}

/// Proof of one `acquire`; hand it back to `release`
#[derive(Debug)]
#[must_use = "a lease must be released to detach upstream"]
pub struct Lease {
    generation: u64,
}

impl SharedSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more listener, calling `attach` on the 0 -> 1 transition
    pub fn acquire(&self, attach: impl FnOnce() -> Destructor) -> Lease {
        let count = self.count.get();
        self.count.set(count + 1);
        if count == 0 {
            let destructor = attach();
            *self.active.borrow_mut() = Some(destructor);
        }
        Lease {
            generation: self.generation.get(),
        }
    }

    /// Count one listener less, detaching on the 1 -> 0 transition.
    /// Leases issued before the last `reset` are ignored.
    pub fn release(&self, lease: Lease) {
        if lease.generation != self.generation.get() {
            return;
        }
        let count = self.count.get().saturating_sub(1);
        self.count.set(count);
        if count == 0 {
            self.detach();
        }
    }

    pub fn reset(&self) {
        self.generation.set(self.generation.get() + 1);
        self.count.set(0);
        self.detach();
    }

    pub fn is_attached(&self) -> bool {
        self.active.borrow().is_some()
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }

    fn detach(&self) {
        let active = self.active.borrow_mut().take();
        if let Some(destructor) = active {
            destructor.call();
        }
    }
}
