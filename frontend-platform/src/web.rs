//! Browser backends over `web-sys`.

use std::rc::Rc;
use std::time::Duration;

use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::{DarkModeQuery, Destructor, KeyValueStore, MessageSource, MessageTarget, PlatformError, ResizeSource, Scheduler, TimerHandle};

const DARK_MODE_QUERY: &str = "(prefers-color-scheme: dark)";

impl PlatformError {
    pub fn from_js(value: JsValue) -> Self {
        PlatformError::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}

/// Attach `handler` to `event` on `target`. The returned destructor removes
/// the listener and frees the closure.
fn listen<E>(target: &web_sys::EventTarget, event: &'static str, mut handler: impl FnMut(E) + 'static) -> Destructor
where
    E: JsCast + 'static,
{
    let closure = Closure::wrap(Box::new(move |ev: web_sys::Event| {
        if let Ok(ev) = ev.dyn_into::<E>() {
            handler(ev);
        }
    }) as Box<dyn FnMut(web_sys::Event)>);

    if let Err(e) = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
        tracing::warn!(target: "frontend_platform", event, error = ?e, "could not add event listener");
        return Destructor::noop();
    }

    let target = target.clone();
    Destructor::new(move || {
        let _ = target.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
        drop(closure);
    })
}

/// The current browser window: resize events, inbound messages and the
/// dark-mode media query.
#[derive(Clone, Debug)]
pub struct BrowserWindow {
    window: web_sys::Window,
    dark_query: Option<web_sys::MediaQueryList>,
}

impl BrowserWindow {
    pub fn new() -> Result<Self, PlatformError> {
        let window = web_sys::window().ok_or(PlatformError::Unavailable("window"))?;
        let dark_query = window
            .match_media(DARK_MODE_QUERY)
            .map_err(PlatformError::from_js)?;
        if dark_query.is_none() {
            tracing::debug!(target: "frontend_platform", "matchMedia unsupported, assuming light scheme");
        }
        Ok(BrowserWindow { window, dark_query })
    }

    pub fn window(&self) -> &web_sys::Window {
        &self.window
    }
}

impl DarkModeQuery for BrowserWindow {
    fn prefers_dark(&self) -> bool {
        self.dark_query.as_ref().is_some_and(|query| query.matches())
    }

    fn on_preference_change(&self, callback: Rc<dyn Fn(bool)>) -> Destructor {
        match &self.dark_query {
            Some(query) => listen(query, "change", move |ev: web_sys::MediaQueryListEvent| {
                callback(ev.matches())
            }),
            None => Destructor::noop(),
        }
    }
}

impl ResizeSource for BrowserWindow {
    fn inner_size(&self) -> Option<(f64, f64)> {
        let width = self.window.inner_width().ok()?.as_f64()?;
        let height = self.window.inner_height().ok()?.as_f64()?;
        Some((width, height))
    }

    fn on_resize(&self, callback: Rc<dyn Fn()>) -> Destructor {
        listen(&self.window, "resize", move |_: web_sys::Event| callback())
    }
}

impl MessageSource for BrowserWindow {
    fn on_message(&self, callback: Rc<dyn Fn(&str)>) -> Destructor {
        listen(&self.window, "message", move |ev: web_sys::MessageEvent| {
            match ev.data().as_string() {
                Some(data) => callback(&data),
                None => tracing::trace!(target: "frontend_platform", origin = %ev.origin(), "ignoring non-string message"),
            }
        })
    }
}

impl MessageTarget for BrowserWindow {
    fn post_message(&self, message: &str, target_origin: &str) -> Result<(), PlatformError> {
        MessageTarget::post_message(&self.window, message, target_origin)
    }
}

/// `window.open()`, `window.opener`, `window.parent` and
/// `HTMLIFrameElement.contentWindow` all hand back a `Window`.
impl MessageTarget for web_sys::Window {
    fn post_message(&self, message: &str, target_origin: &str) -> Result<(), PlatformError> {
        web_sys::Window::post_message(self, &JsValue::from_str(message), target_origin)
            .map_err(PlatformError::from_js)
    }
}

/// `window.localStorage`
#[derive(Clone, Debug)]
pub struct LocalStorage {
    window: web_sys::Window,
    storage: web_sys::Storage,
}

impl LocalStorage {
    pub fn new() -> Result<Self, PlatformError> {
        let window = web_sys::window().ok_or(PlatformError::Unavailable("window"))?;
        let storage = window
            .local_storage()
            .map_err(PlatformError::from_js)?
            .ok_or(PlatformError::Unavailable("localStorage"))?;
        Ok(LocalStorage { window, storage })
    }
}

impl KeyValueStore for LocalStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), PlatformError> {
        self.storage.set_item(key, value).map_err(PlatformError::from_js)
    }

    fn remove_item(&self, key: &str) -> Result<(), PlatformError> {
        self.storage.remove_item(key).map_err(PlatformError::from_js)
    }

    fn on_storage_change(&self, callback: Rc<dyn Fn(Option<&str>)>) -> Destructor {
        listen(&self.window, "storage", move |ev: web_sys::StorageEvent| {
            callback(ev.key().as_deref())
        })
    }
}

/// `setTimeout` through `gloo-timers`
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserScheduler;

impl Scheduler for BrowserScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerHandle {
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        let timeout = Timeout::new(millis, task);
        TimerHandle::new(move || drop(timeout))
    }
}
