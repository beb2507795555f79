//! Frontend Observer
//!
//! Named-event publish/subscribe registry used by every frontend service.
//! Callbacks fire synchronously, in registration order, on the calling thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

mod subscription;

pub use subscription::{Lease, SharedSubscription};

/// A service event with a namespaced string name, e.g. `"RouteService:pushHistory"`.
pub trait EventName: Copy + Eq + Hash + fmt::Debug + 'static {
    /// Every event the service supports
    fn all() -> &'static [Self];

    fn as_str(self) -> &'static str;

    /// Resolve a string name back to the event
    fn from_name(name: &str) -> Result<Self, UnsupportedEvent> {
        Self::all()
            .iter()
            .copied()
            .find(|event| event.as_str() == name)
            .ok_or_else(|| UnsupportedEvent {
                name: name.to_string(),
            })
    }
}

/// An event name no service recognizes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported event name: {name}")]
pub struct UnsupportedEvent {
    pub name: String,
}

/// Listener callback: receives the event and a borrowed payload
pub type ObserverCallback<E, P> = Rc<dyn Fn(E, &P)>;

/// Unregister handle returned by every `on`/`listen_event` style call.
///
/// The registration is removed only when [`Destructor::call`] runs. Dropping
/// the handle without calling it keeps the listener alive.
#[must_use = "dropping a Destructor keeps the listener registered"]
pub struct Destructor(Option<Box<dyn FnOnce()>>);

impl Destructor {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Destructor(Some(Box::new(f)))
    }

    /// A handle that has nothing to undo
    pub fn noop() -> Self {
        Destructor(None)
    }

    pub fn call(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl fmt::Debug for Destructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destructor")
            .field("armed", &self.0.is_some())
            .finish()
    }
}

struct Registry<E, P> {
    next_id: u64,
    callbacks: HashMap<E, Vec<(u64, ObserverCallback<E, P>)>>,
}

impl<E: EventName, P> Registry<E, P> {
    fn contains(&self, event: E, id: u64) -> bool {
        self.callbacks
            .get(&event)
            .is_some_and(|list| list.iter().any(|(cb_id, _)| *cb_id == id))
    }

    fn remove(&mut self, event: E, id: u64) {
        if let Some(list) = self.callbacks.get_mut(&event) {
            list.retain(|(cb_id, _)| *cb_id != id);
            if list.is_empty() {
                self.callbacks.remove(&event);
            }
        }
    }
}

/// Event registry keyed by `E`, delivering payloads of type `P`.
///
/// Cloning shares the same registry.
pub struct Observer<E: EventName, P: 'static = ()> {
    name: &'static str,
    registry: Rc<RefCell<Registry<E, P>>>,
}

impl<E: EventName, P: 'static> Clone for Observer<E, P> {
    fn clone(&self) -> Self {
        Observer {
            name: self.name,
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<E: EventName, P: 'static> fmt::Debug for Observer<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        let counts: Vec<(&'static str, usize)> = registry
            .callbacks
            .iter()
            .map(|(event, list)| (event.as_str(), list.len()))
            .collect();
        f.debug_struct("Observer")
            .field("name", &self.name)
            .field("callbacks", &counts)
            .finish()
    }
}

impl<E: EventName, P: 'static> Observer<E, P> {
    pub fn new(name: &'static str) -> Self {
        Observer {
            name,
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                callbacks: HashMap::new(),
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register `callback` for `event`. Returns the handle that removes it.
    pub fn listen_event(&self, event: E, callback: impl Fn(E, &P) + 'static) -> Destructor {
        let callback: ObserverCallback<E, P> = Rc::new(callback);
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry
                .callbacks
                .entry(event)
                .or_default()
                .push((id, callback));
            id
        };
        tracing::trace!(target: "frontend_observer", observer = self.name, event = event.as_str(), "listener added");

        let registry = Rc::downgrade(&self.registry);
        let name = self.name;
        Destructor::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().remove(event, id);
                tracing::trace!(target: "frontend_observer", observer = name, event = event.as_str(), "listener removed");
            }
        })
    }

    pub fn has_callbacks(&self, event: E) -> bool {
        self.callback_count(event) > 0
    }

    pub fn callback_count(&self, event: E) -> usize {
        self.registry
            .borrow()
            .callbacks
            .get(&event)
            .map_or(0, Vec::len)
    }

    /// Call every listener of `event` with `payload`.
    ///
    /// Listeners removed by an earlier callback in the same round are skipped;
    /// listeners added during the round first fire on the next trigger.
    pub fn trigger_event(&self, event: E, payload: &P) {
        let snapshot: Vec<(u64, ObserverCallback<E, P>)> = match self.registry.borrow().callbacks.get(&event) {
            Some(list) => list.clone(),
            None => return,
        };
        for (id, callback) in snapshot {
            if self.registry.borrow().contains(event, id) {
                callback(event, payload);
            }
        }
    }

    /// Drop every registration for every event
    pub fn destroy(&self) {
        self.registry.borrow_mut().callbacks.clear();
        tracing::trace!(target: "frontend_observer", observer = self.name, "observer destroyed");
    }
}
