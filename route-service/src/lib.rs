//! Route Service
//!
//! Lets non-UI code request navigation. A router component listens to
//! `PushHistory`; when none is mounted yet the last requested route is kept
//! until the router picks it up with [`RouteService::take_next_history`].

use std::cell::RefCell;
use std::rc::Rc;

use frontend_observer::{Destructor, EventName, Observer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteServiceEvent {
    PushHistory,
}

impl EventName for RouteServiceEvent {
    fn all() -> &'static [Self] {
        &[RouteServiceEvent::PushHistory]
    }

    fn as_str(self) -> &'static str {
        match self {
            RouteServiceEvent::PushHistory => "RouteService:pushHistory",
        }
    }
}

#[derive(Clone)]
pub struct RouteService {
    observer: Observer<RouteServiceEvent, String>,
    next_history: Rc<RefCell<Option<String>>>,
}

impl Default for RouteService {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteService {
    pub fn new() -> Self {
        RouteService {
            observer: Observer::new("RouteService"),
            next_history: Rc::new(RefCell::new(None)),
        }
    }

    pub fn on(&self, event: RouteServiceEvent, callback: impl Fn(RouteServiceEvent, &str) + 'static) -> Destructor {
        self.observer
            .listen_event(event, move |event, route: &String| callback(event, route))
    }

    pub fn destroy(&self) {
        self.observer.destroy();
    }

    /// The route saved while no router was listening; clears it
    pub fn take_next_history(&self) -> Option<String> {
        let history = self.next_history.borrow_mut().take();
        tracing::debug!(target: "route_service", "Route fetched: {:?}", history);
        history
    }

    pub fn set_route(&self, value: impl Into<String>) {
        let value = value.into();
        if self.observer.has_callbacks(RouteServiceEvent::PushHistory) {
            tracing::debug!(target: "route_service", "Triggering route to: {}", value);
            self.observer
                .trigger_event(RouteServiceEvent::PushHistory, &value);
        } else {
            tracing::debug!(target: "route_service", "Route saved for later use: {}", value);
            *self.next_history.borrow_mut() = Some(value);
        }
    }
}

impl std::fmt::Debug for RouteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteService")
            .field("next_history", &self.next_history.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_is_kept_until_taken() {
        let routes = RouteService::new();
        routes.set_route("/first");
        routes.set_route("/second");

        assert_eq!(routes.take_next_history().as_deref(), Some("/second"));
        assert_eq!(routes.take_next_history(), None);
    }

    #[test]
    fn test_route_is_pushed_to_listeners() {
        let routes = RouteService::new();
        let pushed = Rc::new(RefCell::new(Vec::new()));
        let p = pushed.clone();
        let listener = routes.on(RouteServiceEvent::PushHistory, move |_, route| {
            p.borrow_mut().push(route.to_string())
        });

        routes.set_route("/login");
        assert_eq!(*pushed.borrow(), vec!["/login".to_string()]);
        assert_eq!(routes.take_next_history(), None);

        listener.call();
        routes.set_route("/after");
        assert_eq!(pushed.borrow().len(), 1);
        assert_eq!(routes.take_next_history().as_deref(), Some("/after"));
    }

    #[test]
    fn test_destroy_drops_listeners() {
        let routes = RouteService::new();
        let _listener = routes.on(RouteServiceEvent::PushHistory, |_, _| {});
        routes.destroy();
        routes.set_route("/home");
        assert_eq!(routes.take_next_history().as_deref(), Some("/home"));
    }
}
