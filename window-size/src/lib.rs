//! Window Size Service
//!
//! Coalesces bursts of `resize` events into one trailing `Resized`
//! notification. The browser listener exists only while somebody listens.

use std::rc::Rc;
use std::time::Duration;

use frontend_observer::{Destructor, EventName, Observer, SharedSubscription};
use frontend_platform::{Debouncer, ResizeSource, Scheduler};

pub const RESIZE_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowSizeServiceEvent {
    Resized,
}

impl EventName for WindowSizeServiceEvent {
    fn all() -> &'static [Self] {
        &[WindowSizeServiceEvent::Resized]
    }

    fn as_str(self) -> &'static str {
        match self {
            WindowSizeServiceEvent::Resized => "WindowSizeService:resized",
        }
    }
}

struct SizeInner {
    source: Rc<dyn ResizeSource>,
    observer: Observer<WindowSizeServiceEvent, ()>,
    debouncer: Debouncer,
    resize: SharedSubscription,
}

impl SizeInner {
    fn on_resize(inner: &Rc<SizeInner>) {
        let weak = Rc::downgrade(inner);
        inner.debouncer.trigger(move || {
            if let Some(inner) = weak.upgrade() {
                tracing::trace!(target: "window_size", size = ?inner.source.inner_size(), "window resized");
                inner.observer.trigger_event(WindowSizeServiceEvent::Resized, &());
            }
        });
    }

    fn start_listening(inner: &Rc<SizeInner>) -> Destructor {
        let weak = Rc::downgrade(inner);
        let listener = inner.source.on_resize(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                SizeInner::on_resize(&inner);
            }
        }));

        let weak = Rc::downgrade(inner);
        Destructor::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.debouncer.cancel();
            }
            listener.call();
        })
    }
}

#[derive(Clone)]
pub struct WindowSizeService {
    inner: Rc<SizeInner>,
}

impl WindowSizeService {
    pub fn new(source: Rc<dyn ResizeSource>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_delay(source, scheduler, RESIZE_DELAY)
    }

    pub fn with_delay(source: Rc<dyn ResizeSource>, scheduler: Rc<dyn Scheduler>, delay: Duration) -> Self {
        WindowSizeService {
            inner: Rc::new(SizeInner {
                source,
                observer: Observer::new("WindowSizeService"),
                debouncer: Debouncer::new(scheduler, delay),
                resize: SharedSubscription::new(),
            }),
        }
    }

    pub fn width(&self) -> Option<f64> {
        self.inner.source.inner_size().map(|(width, _)| width)
    }

    pub fn height(&self) -> Option<f64> {
        self.inner.source.inner_size().map(|(_, height)| height)
    }

    pub fn size(&self) -> Option<(f64, f64)> {
        self.inner.source.inner_size()
    }

    pub fn on(&self, event: WindowSizeServiceEvent, callback: impl Fn(WindowSizeServiceEvent) + 'static) -> Destructor {
        let lease = self
            .inner
            .resize
            .acquire(|| SizeInner::start_listening(&self.inner));
        let registration = self
            .inner
            .observer
            .listen_event(event, move |event, _| callback(event));

        let weak = Rc::downgrade(&self.inner);
        Destructor::new(move || {
            registration.call();
            if let Some(inner) = weak.upgrade() {
                inner.resize.release(lease);
            }
        })
    }

    pub fn is_listening(&self) -> bool {
        self.inner.resize.is_attached()
    }

    pub fn destroy(&self) {
        self.inner.resize.reset();
        self.inner.observer.destroy();
    }
}

impl std::fmt::Debug for WindowSizeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowSizeService")
            .field("size", &self.size())
            .field("debouncer", &self.inner.debouncer)
            .finish()
    }
}
