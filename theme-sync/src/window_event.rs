//! Inbound cross-window JSON messages
//!
//! Payloads are expected to be JSON strings; anything that does not parse is
//! dropped before it reaches listeners.

use std::rc::Rc;

use frontend_observer::{Destructor, EventName, Observer, SharedSubscription};
use frontend_platform::MessageSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowEventServiceEvent {
    JsonMessage,
}

impl EventName for WindowEventServiceEvent {
    fn all() -> &'static [Self] {
        &[WindowEventServiceEvent::JsonMessage]
    }

    fn as_str(self) -> &'static str {
        match self {
            WindowEventServiceEvent::JsonMessage => "WindowEventService:jsonMessage",
        }
    }
}

struct EventInner {
    source: Rc<dyn MessageSource>,
    observer: Observer<WindowEventServiceEvent, serde_json::Value>,
    messages: SharedSubscription,
}

impl EventInner {
    fn handle_message(&self, data: &str) {
        match serde_json::from_str::<serde_json::Value>(data) {
            Ok(message) => self
                .observer
                .trigger_event(WindowEventServiceEvent::JsonMessage, &message),
            Err(e) => {
                tracing::trace!(target: "theme_sync", error = %e, "dropping non-JSON message");
            }
        }
    }
}

#[derive(Clone)]
pub struct WindowEventService {
    inner: Rc<EventInner>,
}

impl WindowEventService {
    pub fn new(source: Rc<dyn MessageSource>) -> Self {
        WindowEventService {
            inner: Rc::new(EventInner {
                source,
                observer: Observer::new("WindowEventService"),
                messages: SharedSubscription::new(),
            }),
        }
    }

    pub fn on(
        &self,
        event: WindowEventServiceEvent,
        callback: impl Fn(WindowEventServiceEvent, &serde_json::Value) + 'static,
    ) -> Destructor {
        let lease = self.inner.messages.acquire(|| {
            let weak = Rc::downgrade(&self.inner);
            self.inner.source.on_message(Rc::new(move |data: &str| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_message(data);
                }
            }))
        });
        let registration = self.inner.observer.listen_event(event, callback);

        let weak = Rc::downgrade(&self.inner);
        Destructor::new(move || {
            registration.call();
            if let Some(inner) = weak.upgrade() {
                inner.messages.release(lease);
            }
        })
    }

    pub fn destroy(&self) {
        self.inner.messages.reset();
        self.inner.observer.destroy();
    }
}

impl std::fmt::Debug for WindowEventService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowEventService")
            .field("observer", &self.inner.observer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontend_platform::memory::MemoryMessageChannel;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn test_delivers_parsed_json_and_drops_the_rest() {
        let channel = Rc::new(MemoryMessageChannel::new());
        let service = WindowEventService::new(channel.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let listener = service.on(WindowEventServiceEvent::JsonMessage, move |_, message| {
            s.borrow_mut().push(message.clone())
        });

        channel.deliver(r#"{"hello":"world"}"#);
        channel.deliver("not json");
        channel.deliver("42");

        assert_eq!(*seen.borrow(), vec![json!({ "hello": "world" }), json!(42)]);

        listener.call();
        assert_eq!(channel.listener_count(), 0);
    }
}
