use std::rc::Rc;

use email_auth::{HttpClient, ReqwestHttpClient};
use frontend_platform::memory::{
    ManualScheduler, MemoryDarkModeQuery, MemoryKeyValueStore, MemoryMessageChannel, MemoryResizeSource,
};
use frontend_platform::{DarkModeQuery, KeyValueStore, MessageSource, ResizeSource, Scheduler};

/// Backends the services run on
#[derive(Clone)]
pub struct Platform {
    pub storage: Rc<dyn KeyValueStore>,
    pub dark_mode: Rc<dyn DarkModeQuery>,
    pub messages: Rc<dyn MessageSource>,
    pub resize: Rc<dyn ResizeSource>,
    pub scheduler: Rc<dyn Scheduler>,
    pub http: Rc<dyn HttpClient>,
}

impl Platform {
    /// Host backends: empty storage, light scheme, no inbound messages, a
    /// fixed 1280x720 window and a clock that only moves when advanced.
    pub fn in_memory() -> Self {
        Platform {
            storage: Rc::new(MemoryKeyValueStore::new()),
            dark_mode: Rc::new(MemoryDarkModeQuery::new(false)),
            messages: Rc::new(MemoryMessageChannel::new()),
            resize: Rc::new(MemoryResizeSource::new(Some((1280.0, 720.0)))),
            scheduler: Rc::new(ManualScheduler::new()),
            http: Rc::new(ReqwestHttpClient::new()),
        }
    }

    /// The current window. Without `localStorage` (private mode, sandboxed
    /// frames) the color scheme is kept in memory for the session.
    #[cfg(target_arch = "wasm32")]
    pub fn browser() -> Result<Self, frontend_platform::PlatformError> {
        use frontend_platform::web::{BrowserScheduler, BrowserWindow, LocalStorage};

        let window = Rc::new(BrowserWindow::new()?);
        let storage: Rc<dyn KeyValueStore> = match LocalStorage::new() {
            Ok(storage) => Rc::new(storage),
            Err(e) => {
                tracing::warn!(target: "frontend_services", error = %e, "localStorage unavailable, using memory");
                Rc::new(MemoryKeyValueStore::new())
            }
        };

        Ok(Platform {
            storage,
            dark_mode: window.clone(),
            messages: window.clone(),
            resize: window,
            scheduler: Rc::new(BrowserScheduler),
            http: Rc::new(ReqwestHttpClient::new()),
        })
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
