//! Theme Sync
//!
//! Resolves the active light/dark color scheme from three ranked sources
//! (in-process override, persisted override, OS preference) and relays
//! changes between windows and frames via `postMessage`.

pub mod color_scheme;
pub mod message;
pub mod service;
pub mod storage;
pub mod window;
pub mod window_event;

pub use color_scheme::{stringify_color_scheme, ColorScheme, ParseColorSchemeError};
pub use message::{ThemeChangeMessage, COLOR_SCHEME_CHANGED_MESSAGE};
pub use service::{ThemeError, ThemeService, ThemeServiceEvent, DEFAULT_REMOTE_ORIGIN};
pub use storage::{ThemeLocalStorageService, ThemeLocalStorageServiceEvent, DEFAULT_STORAGE_KEY};
pub use window::WindowService;
pub use window_event::{WindowEventService, WindowEventServiceEvent};
