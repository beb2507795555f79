use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::{Scheduler, TimerHandle};

/// Trailing-edge debounce: every `trigger` cancels the pending task and
/// schedules the new one `delay` from now.
pub struct Debouncer {
    scheduler: Rc<dyn Scheduler>,
    delay: Duration,
    timer: RefCell<Option<TimerHandle>>,
    armed: Rc<Cell<bool>>,
}

impl Debouncer {
    pub fn new(scheduler: Rc<dyn Scheduler>, delay: Duration) -> Self {
        Debouncer {
            scheduler,
            delay,
            timer: RefCell::new(None),
            armed: Rc::new(Cell::new(false)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn trigger(&self, task: impl FnOnce() + 'static) {
        let previous = self.timer.borrow_mut().take();
        drop(previous);

        let armed = Rc::clone(&self.armed);
        armed.set(true);
        let handle = self.scheduler.schedule(
            self.delay,
            Box::new(move || {
                armed.set(false);
                task();
            }),
        );
        *self.timer.borrow_mut() = Some(handle);
    }

    pub fn cancel(&self) {
        let previous = self.timer.borrow_mut().take();
        drop(previous);
        self.armed.set(false);
    }

    /// Whether a task is scheduled and has not fired yet
    pub fn is_pending(&self) -> bool {
        self.armed.get()
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}
