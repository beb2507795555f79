//! Color scheme reconciliation
//!
//! Precedence: in-process override, then the persisted override, then the
//! OS preference. Upstream listeners (OS, storage, cross-window messages) are
//! attached only while somebody listens to [`ThemeService`].

use std::cell::Cell;
use std::rc::Rc;

use frontend_observer::{Destructor, EventName, Observer, SharedSubscription, UnsupportedEvent};
use frontend_platform::MessageTarget;

use crate::storage::ThemeLocalStorageServiceEvent;
use crate::window_event::WindowEventServiceEvent;
use crate::{stringify_color_scheme, ColorScheme, ThemeChangeMessage, ThemeLocalStorageService, WindowEventService, WindowService};

/// Color scheme is not a secret; callers may still narrow it
pub const DEFAULT_REMOTE_ORIGIN: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeServiceEvent {
    ColorSchemeChanged,
}

impl EventName for ThemeServiceEvent {
    fn all() -> &'static [Self] {
        &[ThemeServiceEvent::ColorSchemeChanged]
    }

    fn as_str(self) -> &'static str {
        match self {
            ThemeServiceEvent::ColorSchemeChanged => "ThemeService:colorSchemeChanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThemeError {
    #[error("ThemeService: {0}")]
    UnsupportedEvent(#[from] UnsupportedEvent),
}

struct ThemeInner {
    observer: Observer<ThemeServiceEvent, ColorScheme>,
    color_scheme: Cell<Option<ColorScheme>>,
    window: WindowService,
    storage: ThemeLocalStorageService,
    events: WindowEventService,
    upstream: SharedSubscription,
    // set while our own write-through is echoed back by the storage service
    writing_through: Cell<bool>,
}

impl ThemeInner {
    fn color_scheme(&self) -> ColorScheme {
        self.color_scheme
            .get()
            .or_else(|| self.storage.color_scheme())
            .unwrap_or_else(|| self.window.color_scheme())
    }

    fn has_listeners(&self) -> bool {
        self.observer.has_callbacks(ThemeServiceEvent::ColorSchemeChanged)
    }

    fn emit(&self, scheme: ColorScheme) {
        self.observer
            .trigger_event(ThemeServiceEvent::ColorSchemeChanged, &scheme);
    }

    fn set_color_scheme(&self, value: Option<ColorScheme>) {
        if self.color_scheme.get() == value {
            return;
        }
        self.color_scheme.set(value);

        if self.storage.color_scheme() != value {
            self.writing_through.set(true);
            let stored = self.storage.set_color_scheme(value);
            self.writing_through.set(false);
            if let Err(e) = stored {
                tracing::warn!(target: "theme_sync", error = %e, "could not persist color scheme");
            }
        }

        if self.has_listeners() {
            self.emit(value.unwrap_or_else(|| self.window.color_scheme()));
        }

        tracing::debug!(target: "theme_sync", "Color scheme changed by user as {}", stringify_color_scheme(value));
    }

    fn handle_system_change(&self, scheme: ColorScheme) {
        if !self.has_listeners() {
            tracing::warn!(target: "theme_sync", "Listening to browser color scheme without own listeners");
        } else if self.color_scheme.get().is_some() {
            tracing::warn!(target: "theme_sync", "Ignoring browser color scheme change, user override is active");
        } else if self.storage.color_scheme().is_some() {
            tracing::debug!(target: "theme_sync", "Ignoring browser color scheme change, stored override is active");
        } else {
            tracing::debug!(target: "theme_sync", "Browser color scheme changed as {}", scheme);
            self.emit(scheme);
        }
    }

    fn handle_storage_change(&self, value: Option<ColorScheme>) {
        if self.writing_through.get() {
            return;
        }
        if !self.has_listeners() {
            tracing::warn!(target: "theme_sync", "Listening to stored color scheme without own listeners");
        } else if self.color_scheme.get().is_some() {
            tracing::warn!(target: "theme_sync", "Ignoring stored color scheme change, user override is active");
        } else {
            tracing::debug!(target: "theme_sync", "Local storage color scheme changed as {}", stringify_color_scheme(value));
            self.emit(self.color_scheme());
        }
    }

    fn handle_message(&self, message: &serde_json::Value) {
        if !self.has_listeners() {
            tracing::warn!(target: "theme_sync", "Listening to window messages without own listeners");
            return;
        }
        match ThemeChangeMessage::parse(message) {
            Some(message) => {
                tracing::debug!(target: "theme_sync", "Color scheme changed through a message as {}", stringify_color_scheme(message.value()));
                self.set_color_scheme(message.value());
            }
            None => tracing::trace!(target: "theme_sync", "ignoring unrelated window message"),
        }
    }

    fn attach_upstream(inner: &Rc<ThemeInner>) -> Destructor {
        let weak = Rc::downgrade(inner);
        let system = inner.window.on_color_scheme_change(move |scheme| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_system_change(scheme);
            }
        });

        let weak = Rc::downgrade(inner);
        let storage = inner
            .storage
            .on(ThemeLocalStorageServiceEvent::ColorSchemeChanged, move |_, value| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_storage_change(value);
                }
            });

        let weak = Rc::downgrade(inner);
        let messages = inner
            .events
            .on(WindowEventServiceEvent::JsonMessage, move |_, message| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_message(message);
                }
            });

        tracing::trace!(target: "theme_sync", "upstream listeners attached");
        Destructor::new(move || {
            system.call();
            storage.call();
            messages.call();
            tracing::trace!(target: "theme_sync", "upstream listeners detached");
        })
    }
}

/// Authoritative light/dark scheme for the application.
///
/// Cloning shares the same state; build one at startup and hand out clones.
#[derive(Clone)]
pub struct ThemeService {
    inner: Rc<ThemeInner>,
}

impl ThemeService {
    pub fn new(window: WindowService, storage: ThemeLocalStorageService, events: WindowEventService) -> Self {
        ThemeService {
            inner: Rc::new(ThemeInner {
                observer: Observer::new("ThemeService"),
                color_scheme: Cell::new(None),
                window,
                storage,
                events,
                upstream: SharedSubscription::new(),
                writing_through: Cell::new(false),
            }),
        }
    }

    pub fn color_scheme(&self) -> ColorScheme {
        self.inner.color_scheme()
    }

    pub fn has_dark_mode(&self) -> bool {
        self.color_scheme() == ColorScheme::Dark
    }

    pub fn has_light_mode(&self) -> bool {
        self.color_scheme() == ColorScheme::Light
    }

    /// The in-process override, if any
    pub fn override_color_scheme(&self) -> Option<ColorScheme> {
        self.inner.color_scheme.get()
    }

    /// Set or clear (`None`) the user's choice. The choice is persisted and
    /// listeners receive the new effective scheme.
    pub fn set_color_scheme(&self, value: Option<ColorScheme>) -> &Self {
        self.inner.set_color_scheme(value);
        self
    }

    pub fn on(
        &self,
        event: ThemeServiceEvent,
        callback: impl Fn(ThemeServiceEvent, ColorScheme) + 'static,
    ) -> Destructor {
        let lease = self
            .inner
            .upstream
            .acquire(|| ThemeInner::attach_upstream(&self.inner));
        let registration = self
            .inner
            .observer
            .listen_event(event, move |event, scheme| callback(event, *scheme));

        let weak = Rc::downgrade(&self.inner);
        Destructor::new(move || {
            registration.call();
            if let Some(inner) = weak.upgrade() {
                inner.upstream.release(lease);
            }
        })
    }

    /// [`on`](ThemeService::on) by event name, for string-dispatched callers
    pub fn on_named(
        &self,
        name: &str,
        callback: impl Fn(ThemeServiceEvent, ColorScheme) + 'static,
    ) -> Result<Destructor, ThemeError> {
        let event = ThemeServiceEvent::from_name(name)?;
        Ok(self.on(event, callback))
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .observer
            .callback_count(ThemeServiceEvent::ColorSchemeChanged)
    }

    /// Whether the OS, storage and message listeners are attached
    pub fn is_listening_upstream(&self) -> bool {
        self.inner.upstream.is_attached()
    }

    /// Detach upstream, forget all listeners and the override
    pub fn destroy(&self) {
        self.inner.upstream.reset();
        self.inner.observer.destroy();
        self.inner.color_scheme.set(None);
    }

    /// Ask another window or frame to use `value`; `None` restores its default.
    ///
    /// `target` is typically the result of `window.open()`, `window.opener`,
    /// `window.parent` or an iframe's `contentWindow`.
    pub fn set_remote_color_scheme(value: Option<ColorScheme>, target: &dyn MessageTarget, origin: &str) {
        let message = match ThemeChangeMessage::color_scheme_changed(value).to_json_string() {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(target: "theme_sync", error = %e, "could not encode theme message");
                return;
            }
        };
        if let Err(e) = target.post_message(&message, origin) {
            tracing::warn!(target: "theme_sync", error = %e, origin, "could not post theme message");
        }
    }

    pub fn unset_remote_color_scheme(target: &dyn MessageTarget, origin: &str) {
        Self::set_remote_color_scheme(None, target, origin);
    }
}

impl std::fmt::Debug for ThemeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeService")
            .field("color_scheme", &self.color_scheme())
            .field("override", &self.inner.color_scheme.get())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{COLOR_SCHEME_CHANGED_MESSAGE, DEFAULT_STORAGE_KEY};
    use frontend_platform::memory::{MemoryDarkModeQuery, MemoryKeyValueStore, MemoryMessageChannel};
    use frontend_platform::KeyValueStore;
    use std::cell::RefCell;

    struct Fixture {
        query: Rc<MemoryDarkModeQuery>,
        store: Rc<MemoryKeyValueStore>,
        channel: Rc<MemoryMessageChannel>,
        service: ThemeService,
    }

    fn setup(prefers_dark: bool) -> Fixture {
        let query = Rc::new(MemoryDarkModeQuery::new(prefers_dark));
        let store = Rc::new(MemoryKeyValueStore::new());
        let channel = Rc::new(MemoryMessageChannel::new());
        let service = ThemeService::new(
            WindowService::new(query.clone()),
            ThemeLocalStorageService::new(store.clone(), DEFAULT_STORAGE_KEY),
            WindowEventService::new(channel.clone()),
        );
        Fixture {
            query,
            store,
            channel,
            service,
        }
    }

    fn record(service: &ThemeService) -> (Rc<RefCell<Vec<ColorScheme>>>, Destructor) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let listener = service.on(ThemeServiceEvent::ColorSchemeChanged, move |_, scheme| {
            s.borrow_mut().push(scheme)
        });
        (seen, listener)
    }

    fn upstream_counts(f: &Fixture) -> (usize, usize, usize) {
        (
            f.query.listener_count(),
            f.store.listener_count(),
            f.channel.listener_count(),
        )
    }

    #[test]
    fn test_falls_back_to_os_default() {
        let f = setup(true);
        assert_eq!(f.service.color_scheme(), ColorScheme::Dark);
        assert!(f.service.has_dark_mode());

        f.query.set_prefers_dark(false);
        assert!(f.service.has_light_mode());
    }

    #[test]
    fn test_source_precedence() {
        let f = setup(false);
        f.store.set_item(DEFAULT_STORAGE_KEY, "dark").unwrap();
        assert_eq!(f.service.color_scheme(), ColorScheme::Dark);

        f.service.set_color_scheme(Some(ColorScheme::Light));
        f.store.set_item(DEFAULT_STORAGE_KEY, "dark").unwrap();
        f.query.set_prefers_dark(true);
        assert_eq!(f.service.color_scheme(), ColorScheme::Light);

        f.service.set_color_scheme(None);
        assert_eq!(f.service.color_scheme(), ColorScheme::Dark);
        assert_eq!(f.store.get_item(DEFAULT_STORAGE_KEY), None);
    }

    #[test]
    fn test_set_writes_through_without_listeners() {
        let f = setup(false);
        f.service.set_color_scheme(Some(ColorScheme::Dark));
        assert_eq!(f.store.get_item(DEFAULT_STORAGE_KEY).as_deref(), Some("dark"));
        assert_eq!(f.service.override_color_scheme(), Some(ColorScheme::Dark));
        assert!(!f.service.is_listening_upstream());
    }

    #[test]
    fn test_set_emits_effective_value_once() {
        let f = setup(true);
        let (seen, _listener) = record(&f.service);

        f.service.set_color_scheme(Some(ColorScheme::Light));
        f.service.set_color_scheme(Some(ColorScheme::Light));
        assert_eq!(*seen.borrow(), vec![ColorScheme::Light]);

        f.service.set_color_scheme(None);
        assert_eq!(*seen.borrow(), vec![ColorScheme::Light, ColorScheme::Dark]);
    }

    #[test]
    fn test_lazy_upstream_attach_and_detach() {
        let f = setup(false);
        assert_eq!(upstream_counts(&f), (0, 0, 0));

        let (_, first) = record(&f.service);
        assert_eq!(upstream_counts(&f), (1, 1, 1));

        let (_, second) = record(&f.service);
        let (_, third) = record(&f.service);
        assert_eq!(upstream_counts(&f), (1, 1, 1));

        second.call();
        first.call();
        assert_eq!(upstream_counts(&f), (1, 1, 1));
        assert!(f.service.is_listening_upstream());

        third.call();
        assert_eq!(upstream_counts(&f), (0, 0, 0));
        assert!(!f.service.is_listening_upstream());

        let (_, again) = record(&f.service);
        assert_eq!(upstream_counts(&f), (1, 1, 1));
        again.call();
        assert_eq!(upstream_counts(&f), (0, 0, 0));
    }

    #[test]
    fn test_listener_attached_while_override_is_set() {
        let f = setup(false);
        f.service.set_color_scheme(Some(ColorScheme::Dark));
        let (_, listener) = record(&f.service);
        assert_eq!(upstream_counts(&f), (1, 1, 1));
        listener.call();
        assert_eq!(upstream_counts(&f), (0, 0, 0));
    }

    #[test]
    fn test_os_change_is_relayed_only_without_overrides() {
        let f = setup(false);
        let (seen, _listener) = record(&f.service);

        f.query.set_prefers_dark(true);
        assert_eq!(*seen.borrow(), vec![ColorScheme::Dark]);

        f.service.set_color_scheme(Some(ColorScheme::Light));
        f.query.set_prefers_dark(false);
        f.query.set_prefers_dark(true);
        assert_eq!(*seen.borrow(), vec![ColorScheme::Dark, ColorScheme::Light]);
        assert_eq!(f.service.color_scheme(), ColorScheme::Light);
    }

    #[test]
    fn test_os_change_hidden_by_stored_override() {
        let f = setup(false);
        f.store.set_item(DEFAULT_STORAGE_KEY, "light").unwrap();
        let (seen, _listener) = record(&f.service);

        f.query.set_prefers_dark(true);
        assert!(seen.borrow().is_empty());
        assert_eq!(f.service.color_scheme(), ColorScheme::Light);
    }

    #[test]
    fn test_external_storage_change() {
        let f = setup(false);
        let (seen, _listener) = record(&f.service);

        f.store.external_set(DEFAULT_STORAGE_KEY, Some("dark"));
        assert_eq!(*seen.borrow(), vec![ColorScheme::Dark]);

        f.service.set_color_scheme(Some(ColorScheme::Light));
        f.store.external_set(DEFAULT_STORAGE_KEY, Some("dark"));
        assert_eq!(*seen.borrow(), vec![ColorScheme::Dark, ColorScheme::Light]);
    }

    #[test]
    fn test_inbound_message_applies_and_persists() {
        let f = setup(false);
        let (seen, _listener) = record(&f.service);

        f.channel
            .deliver(&format!(r#"{{"type":"{}","value":"dark"}}"#, COLOR_SCHEME_CHANGED_MESSAGE));
        assert_eq!(f.service.override_color_scheme(), Some(ColorScheme::Dark));
        assert_eq!(f.store.get_item(DEFAULT_STORAGE_KEY).as_deref(), Some("dark"));

        f.channel
            .deliver(&format!(r#"{{"type":"{}"}}"#, COLOR_SCHEME_CHANGED_MESSAGE));
        assert_eq!(f.service.override_color_scheme(), None);
        assert_eq!(*seen.borrow(), vec![ColorScheme::Dark, ColorScheme::Light]);
    }

    #[test]
    fn test_malformed_messages_are_dropped() {
        let f = setup(false);
        let (seen, _listener) = record(&f.service);

        f.channel.deliver("{not json");
        f.channel.deliver(r#"{"type":"something.else","value":"dark"}"#);
        f.channel
            .deliver(&format!(r#"{{"type":"{}","value":"blue"}}"#, COLOR_SCHEME_CHANGED_MESSAGE));

        assert!(seen.borrow().is_empty());
        assert_eq!(f.service.override_color_scheme(), None);
    }

    #[test]
    fn test_remote_messages_are_posted_with_origin() {
        let channel = MemoryMessageChannel::new();
        ThemeService::set_remote_color_scheme(Some(ColorScheme::Dark), &channel, "https://app.example");
        ThemeService::unset_remote_color_scheme(&channel, DEFAULT_REMOTE_ORIGIN);

        let posted = channel.posted();
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[0].1, "https://app.example");
        assert_eq!(
            ThemeChangeMessage::parse(&serde_json::from_str(&posted[0].0).unwrap()),
            Some(ThemeChangeMessage::color_scheme_changed(Some(ColorScheme::Dark)))
        );
        assert_eq!(posted[1], (format!(r#"{{"type":"{}"}}"#, COLOR_SCHEME_CHANGED_MESSAGE), "*".to_string()));
    }

    #[test]
    fn test_unsupported_event_name_fails_fast() {
        let f = setup(false);
        let err = f.service.on_named("ThemeService:bogus", |_, _| {}).unwrap_err();
        assert_eq!(
            err,
            ThemeError::UnsupportedEvent(UnsupportedEvent {
                name: "ThemeService:bogus".to_string()
            })
        );
        assert_eq!(f.service.listener_count(), 0);
        assert!(!f.service.is_listening_upstream());

        let listener = f
            .service
            .on_named("ThemeService:colorSchemeChanged", |_, _| {})
            .unwrap();
        assert!(f.service.is_listening_upstream());
        listener.call();
    }

    #[test]
    fn test_destroy_detaches_and_forgets() {
        let f = setup(false);
        let (seen, listener) = record(&f.service);
        f.service.set_color_scheme(Some(ColorScheme::Dark));

        f.service.destroy();
        assert_eq!(upstream_counts(&f), (0, 0, 0));
        assert_eq!(f.service.override_color_scheme(), None);

        // stale handle must not disturb a fresh subscription
        let (_, fresh) = record(&f.service);
        listener.call();
        assert_eq!(upstream_counts(&f), (1, 1, 1));
        fresh.call();
        assert_eq!(seen.borrow().len(), 1);
    }
}
