//! Frontend Platform
//!
//! The browser surface the services depend on, cut into small traits so the
//! service logic runs the same in the browser and on the host.
//! `web` binds the traits to `web-sys` (wasm32 only); `memory` provides
//! in-process versions.

use std::rc::Rc;
use std::time::Duration;

pub use frontend_observer::Destructor;

mod debounce;
pub mod memory;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use debounce::Debouncer;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("{0} is not available")]
    Unavailable(&'static str),
    #[error("browser call failed: {0}")]
    Js(String),
}

/// String key-value storage (`localStorage`).
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), PlatformError>;

    fn remove_item(&self, key: &str) -> Result<(), PlatformError>;

    /// Changes made by another window/tab. The callback receives the changed
    /// key, or `None` when the whole storage was cleared. Own writes are not
    /// reported.
    fn on_storage_change(&self, callback: Rc<dyn Fn(Option<&str>)>) -> Destructor;
}

/// The `(prefers-color-scheme: dark)` media query
pub trait DarkModeQuery {
    fn prefers_dark(&self) -> bool;

    fn on_preference_change(&self, callback: Rc<dyn Fn(bool)>) -> Destructor;
}

/// Inbound `message` events carrying string payloads
pub trait MessageSource {
    fn on_message(&self, callback: Rc<dyn Fn(&str)>) -> Destructor;
}

/// Anything that accepts `postMessage`: a window, a frame's content window, an opener
pub trait MessageTarget {
    fn post_message(&self, message: &str, target_origin: &str) -> Result<(), PlatformError>;
}

pub trait ResizeSource {
    /// `(innerWidth, innerHeight)`, `None` without a window
    fn inner_size(&self) -> Option<(f64, f64)>;

    fn on_resize(&self, callback: Rc<dyn Fn()>) -> Destructor;
}

/// Deferred task runner (`setTimeout`)
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerHandle;
}

/// A scheduled task. Dropping the handle cancels the task if it has not run.
#[must_use = "dropping a TimerHandle cancels the task"]
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        TimerHandle {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle").finish_non_exhaustive()
    }
}
