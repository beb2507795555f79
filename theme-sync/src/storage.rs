//! Persisted color scheme override
//!
//! One `localStorage` key holds `"light"` or `"dark"`; a missing key means
//! "no override". Listeners hear about writes made through this service as
//! well as writes made by other tabs.

use std::rc::Rc;

use frontend_observer::{Destructor, EventName, Observer, SharedSubscription};
use frontend_platform::{KeyValueStore, PlatformError};

use crate::{stringify_color_scheme, ColorScheme};

pub const DEFAULT_STORAGE_KEY: &str = "colorScheme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeLocalStorageServiceEvent {
    ColorSchemeChanged,
}

impl EventName for ThemeLocalStorageServiceEvent {
    fn all() -> &'static [Self] {
        &[ThemeLocalStorageServiceEvent::ColorSchemeChanged]
    }

    fn as_str(self) -> &'static str {
        match self {
            ThemeLocalStorageServiceEvent::ColorSchemeChanged => "ThemeLocalStorageService:colorSchemeChanged",
        }
    }
}

struct StorageInner {
    store: Rc<dyn KeyValueStore>,
    key: String,
    observer: Observer<ThemeLocalStorageServiceEvent, Option<ColorScheme>>,
    external: SharedSubscription,
}

impl StorageInner {
    fn color_scheme(&self) -> Option<ColorScheme> {
        let stored = self.store.get_item(&self.key)?;
        match stored.parse() {
            Ok(scheme) => Some(scheme),
            Err(e) => {
                tracing::debug!(target: "theme_sync", key = %self.key, error = %e, "ignoring stored color scheme");
                None
            }
        }
    }

    fn notify(&self) {
        let value = self.color_scheme();
        self.observer
            .trigger_event(ThemeLocalStorageServiceEvent::ColorSchemeChanged, &value);
    }
}

#[derive(Clone)]
pub struct ThemeLocalStorageService {
    inner: Rc<StorageInner>,
}

impl ThemeLocalStorageService {
    pub fn new(store: Rc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        ThemeLocalStorageService {
            inner: Rc::new(StorageInner {
                store,
                key: key.into(),
                observer: Observer::new("ThemeLocalStorageService"),
                external: SharedSubscription::new(),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn color_scheme(&self) -> Option<ColorScheme> {
        self.inner.color_scheme()
    }

    /// Persist the override (`None` removes it) and notify listeners
    pub fn set_color_scheme(&self, value: Option<ColorScheme>) -> Result<(), PlatformError> {
        let inner = &self.inner;
        match value {
            Some(scheme) => inner.store.set_item(&inner.key, scheme.as_str())?,
            None => inner.store.remove_item(&inner.key)?,
        }
        tracing::debug!(target: "theme_sync", "Stored color scheme as {}", stringify_color_scheme(value));
        inner.notify();
        Ok(())
    }

    pub fn on(
        &self,
        event: ThemeLocalStorageServiceEvent,
        callback: impl Fn(ThemeLocalStorageServiceEvent, Option<ColorScheme>) + 'static,
    ) -> Destructor {
        let lease = self.inner.external.acquire(|| {
            let weak = Rc::downgrade(&self.inner);
            self.inner.store.on_storage_change(Rc::new(move |key: Option<&str>| {
                let Some(inner) = weak.upgrade() else { return };
                // `None` means the whole storage was cleared
                if key.map_or(true, |key| key == inner.key) {
                    inner.notify();
                }
            }))
        });
        let registration = self
            .inner
            .observer
            .listen_event(event, move |event, value| callback(event, *value));

        let weak = Rc::downgrade(&self.inner);
        Destructor::new(move || {
            registration.call();
            if let Some(inner) = weak.upgrade() {
                inner.external.release(lease);
            }
        })
    }

    pub fn destroy(&self) {
        self.inner.external.reset();
        self.inner.observer.destroy();
    }
}

impl std::fmt::Debug for ThemeLocalStorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeLocalStorageService")
            .field("key", &self.inner.key)
            .field("observer", &self.inner.observer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontend_platform::memory::MemoryKeyValueStore;
    use std::cell::RefCell;

    fn setup() -> (Rc<MemoryKeyValueStore>, ThemeLocalStorageService) {
        let store = Rc::new(MemoryKeyValueStore::new());
        let service = ThemeLocalStorageService::new(store.clone(), DEFAULT_STORAGE_KEY);
        (store, service)
    }

    #[test]
    fn test_round_trips_through_store() {
        let (store, service) = setup();
        assert_eq!(service.color_scheme(), None);

        service.set_color_scheme(Some(ColorScheme::Dark)).unwrap();
        assert_eq!(store.get_item(DEFAULT_STORAGE_KEY).as_deref(), Some("dark"));
        assert_eq!(service.color_scheme(), Some(ColorScheme::Dark));

        service.set_color_scheme(None).unwrap();
        assert_eq!(store.get_item(DEFAULT_STORAGE_KEY), None);
    }

    #[test]
    fn test_garbage_value_reads_as_unset() {
        let (store, service) = setup();
        store.set_item(DEFAULT_STORAGE_KEY, "sepia").unwrap();
        assert_eq!(service.color_scheme(), None);
    }

    #[test]
    fn test_notifies_own_and_external_writes_for_its_key() {
        let (store, service) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let listener = service.on(ThemeLocalStorageServiceEvent::ColorSchemeChanged, move |_, value| {
            s.borrow_mut().push(value)
        });
        assert_eq!(store.listener_count(), 1);

        service.set_color_scheme(Some(ColorScheme::Light)).unwrap();
        store.external_set("unrelated", Some("x"));
        store.external_set(DEFAULT_STORAGE_KEY, Some("dark"));
        store.external_clear();

        assert_eq!(*seen.borrow(), vec![Some(ColorScheme::Light), Some(ColorScheme::Dark), None]);

        listener.call();
        assert_eq!(store.listener_count(), 0);
    }
}
