//! In-process implementations of the platform traits.
//!
//! Used on the host (no browser) and by the service tests. Each type exposes
//! the knob a test needs to play the browser's part: `external_set` for
//! another tab's storage write, `set_prefers_dark` for an OS theme switch,
//! `deliver` for an inbound message, `resize_to` for a window resize and
//! `advance` for the passage of time.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use frontend_observer::{Destructor, EventName, Observer};

use crate::{DarkModeQuery, KeyValueStore, MessageSource, MessageTarget, PlatformError, ResizeSource, Scheduler, TimerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MemoryEvent {
    StorageChanged,
    PreferenceChanged,
    Message,
    Resize,
}

impl EventName for MemoryEvent {
    fn all() -> &'static [Self] {
        &[
            MemoryEvent::StorageChanged,
            MemoryEvent::PreferenceChanged,
            MemoryEvent::Message,
            MemoryEvent::Resize,
        ]
    }

    fn as_str(self) -> &'static str {
        match self {
            MemoryEvent::StorageChanged => "Memory:storageChanged",
            MemoryEvent::PreferenceChanged => "Memory:preferenceChanged",
            MemoryEvent::Message => "Memory:message",
            MemoryEvent::Resize => "Memory:resize",
        }
    }
}

/// `localStorage` stand-in
#[derive(Debug)]
pub struct MemoryKeyValueStore {
    items: RefCell<HashMap<String, String>>,
    observer: Observer<MemoryEvent, Option<String>>,
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        MemoryKeyValueStore {
            items: RefCell::new(HashMap::new()),
            observer: Observer::new("MemoryKeyValueStore"),
        }
    }

    /// Write as another tab would: the value changes and listeners hear about it
    pub fn external_set(&self, key: &str, value: Option<&str>) {
        match value {
            Some(value) => {
                self.items.borrow_mut().insert(key.to_string(), value.to_string());
            }
            None => {
                self.items.borrow_mut().remove(key);
            }
        }
        self.observer
            .trigger_event(MemoryEvent::StorageChanged, &Some(key.to_string()));
    }

    pub fn external_clear(&self) {
        self.items.borrow_mut().clear();
        self.observer.trigger_event(MemoryEvent::StorageChanged, &None);
    }

    pub fn listener_count(&self) -> usize {
        self.observer.callback_count(MemoryEvent::StorageChanged)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), PlatformError> {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), PlatformError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }

    fn on_storage_change(&self, callback: Rc<dyn Fn(Option<&str>)>) -> Destructor {
        self.observer
            .listen_event(MemoryEvent::StorageChanged, move |_, key| callback(key.as_deref()))
    }
}

/// Media query whose answer is set by hand
#[derive(Debug)]
pub struct MemoryDarkModeQuery {
    dark: Cell<bool>,
    observer: Observer<MemoryEvent, bool>,
}

impl MemoryDarkModeQuery {
    pub fn new(prefers_dark: bool) -> Self {
        MemoryDarkModeQuery {
            dark: Cell::new(prefers_dark),
            observer: Observer::new("MemoryDarkModeQuery"),
        }
    }

    /// Switch the OS preference; listeners fire only on an actual change
    pub fn set_prefers_dark(&self, dark: bool) {
        if self.dark.replace(dark) != dark {
            self.observer.trigger_event(MemoryEvent::PreferenceChanged, &dark);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.observer.callback_count(MemoryEvent::PreferenceChanged)
    }
}

impl DarkModeQuery for MemoryDarkModeQuery {
    fn prefers_dark(&self) -> bool {
        self.dark.get()
    }

    fn on_preference_change(&self, callback: Rc<dyn Fn(bool)>) -> Destructor {
        self.observer
            .listen_event(MemoryEvent::PreferenceChanged, move |_, dark| callback(*dark))
    }
}

/// Message channel. Inbound messages come from `deliver`; outbound posts are
/// recorded with their target origin.
#[derive(Debug)]
pub struct MemoryMessageChannel {
    posted: RefCell<Vec<(String, String)>>,
    observer: Observer<MemoryEvent, String>,
}

impl Default for MemoryMessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMessageChannel {
    pub fn new() -> Self {
        MemoryMessageChannel {
            posted: RefCell::new(Vec::new()),
            observer: Observer::new("MemoryMessageChannel"),
        }
    }

    pub fn deliver(&self, data: &str) {
        self.observer.trigger_event(MemoryEvent::Message, &data.to_string());
    }

    /// `(message, target_origin)` pairs in posting order
    pub fn posted(&self) -> Vec<(String, String)> {
        self.posted.borrow().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.observer.callback_count(MemoryEvent::Message)
    }
}

impl MessageSource for MemoryMessageChannel {
    fn on_message(&self, callback: Rc<dyn Fn(&str)>) -> Destructor {
        self.observer
            .listen_event(MemoryEvent::Message, move |_, data| callback(data))
    }
}

impl MessageTarget for MemoryMessageChannel {
    fn post_message(&self, message: &str, target_origin: &str) -> Result<(), PlatformError> {
        self.posted
            .borrow_mut()
            .push((message.to_string(), target_origin.to_string()));
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemoryResizeSource {
    size: Cell<Option<(f64, f64)>>,
    observer: Observer<MemoryEvent, ()>,
}

impl MemoryResizeSource {
    pub fn new(size: Option<(f64, f64)>) -> Self {
        MemoryResizeSource {
            size: Cell::new(size),
            observer: Observer::new("MemoryResizeSource"),
        }
    }

    pub fn resize_to(&self, width: f64, height: f64) {
        self.size.set(Some((width, height)));
        self.observer.trigger_event(MemoryEvent::Resize, &());
    }

    pub fn listener_count(&self) -> usize {
        self.observer.callback_count(MemoryEvent::Resize)
    }
}

impl ResizeSource for MemoryResizeSource {
    fn inner_size(&self) -> Option<(f64, f64)> {
        self.size.get()
    }

    fn on_resize(&self, callback: Rc<dyn Fn()>) -> Destructor {
        self.observer
            .listen_event(MemoryEvent::Resize, move |_, _| callback())
    }
}

struct ScheduledTask {
    id: u64,
    due: Duration,
    task: Box<dyn FnOnce()>,
    cancelled: Rc<Cell<bool>>,
}

/// Scheduler on a virtual clock that only moves when `advance` is called
#[derive(Default)]
pub struct ManualScheduler {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    queue: RefCell<Vec<ScheduledTask>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Tasks scheduled and neither run nor cancelled
    pub fn pending(&self) -> usize {
        self.queue
            .borrow()
            .iter()
            .filter(|entry| !entry.cancelled.get())
            .count()
    }

    /// Move the clock forward, running due tasks in deadline order.
    /// Tasks scheduled by a running task run too if they fall inside the window.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        loop {
            let next = {
                let mut queue = self.queue.borrow_mut();
                queue.retain(|entry| !entry.cancelled.get());
                let index = queue
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| entry.due <= target)
                    .min_by_key(|(_, entry)| (entry.due, entry.id))
                    .map(|(index, _)| index);
                index.map(|index| queue.remove(index))
            };
            let Some(entry) = next else { break };
            if entry.due > self.now.get() {
                self.now.set(entry.due);
            }
            (entry.task)();
        }
        self.now.set(target);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let cancelled = Rc::new(Cell::new(false));
        self.queue.borrow_mut().push(ScheduledTask {
            id,
            due: self.now.get() + delay,
            task,
            cancelled: Rc::clone(&cancelled),
        });
        TimerHandle::new(move || cancelled.set(true))
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_reports_only_external_writes() {
        let store = MemoryKeyValueStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let listener = store.on_storage_change(Rc::new(move |key: Option<&str>| s.borrow_mut().push(key.map(str::to_string))));

        store.set_item("a", "1").unwrap();
        store.external_set("b", Some("2"));
        store.external_clear();

        assert_eq!(*seen.borrow(), vec![Some("b".to_string()), None]);
        assert_eq!(store.get_item("a"), None);

        listener.call();
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_dark_mode_query_fires_on_change_only() {
        let query = MemoryDarkModeQuery::new(false);
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let _listener = query.on_preference_change(Rc::new(move |_: bool| c.set(c.get() + 1)));

        query.set_prefers_dark(false);
        query.set_prefers_dark(true);
        assert_eq!(count.get(), 1);
        assert!(query.prefers_dark());
    }

    #[test]
    fn test_scheduler_runs_in_deadline_order() {
        let scheduler = ManualScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let o1 = order.clone();
        let _late = scheduler.schedule(Duration::from_millis(30), Box::new(move || o1.borrow_mut().push(30)));
        let o2 = order.clone();
        let _early = scheduler.schedule(Duration::from_millis(10), Box::new(move || o2.borrow_mut().push(10)));
        let o3 = order.clone();
        let dropped = scheduler.schedule(Duration::from_millis(20), Box::new(move || o3.borrow_mut().push(20)));
        drop(dropped);

        scheduler.advance(Duration::from_millis(25));
        assert_eq!(*order.borrow(), vec![10]);
        assert_eq!(scheduler.now(), Duration::from_millis(25));

        scheduler.advance(Duration::from_millis(5));
        assert_eq!(*order.borrow(), vec![10, 30]);
        assert_eq!(scheduler.pending(), 0);
    }
}
