//! Frontend Services
//!
//! Builds every service once at startup from a [`FrontendConfig`] and a
//! [`Platform`]. Consumers get cheap clones sharing the same state.

use std::rc::Rc;

use email_auth::EmailAuthHttpService;
use frontend_cache::FrontendCacheService;
use frontend_logger::LoggerError;
use frontend_platform::MessageTarget;
use route_service::RouteService;
use theme_sync::{ColorScheme, ThemeLocalStorageService, ThemeService, WindowEventService, WindowService};
use window_size::WindowSizeService;

pub mod config;
pub mod platform;

pub use config::{ConfigError, FrontendConfig, CONFIG_GLOBAL};
pub use platform::Platform;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Platform(#[from] frontend_platform::PlatformError),
    #[error(transparent)]
    Logger(#[from] LoggerError),
}

#[derive(Clone, Debug)]
pub struct FrontendServices {
    config: Rc<FrontendConfig>,
    pub theme: ThemeService,
    pub window_size: WindowSizeService,
    pub route: RouteService,
    pub email_auth: Rc<EmailAuthHttpService>,
    pub cache: Rc<FrontendCacheService>,
}

impl FrontendServices {
    pub fn new(config: FrontendConfig, platform: Platform) -> Self {
        let theme = ThemeService::new(
            WindowService::new(platform.dark_mode),
            ThemeLocalStorageService::new(platform.storage, config.theme_storage_key.clone()),
            WindowEventService::new(platform.messages),
        );
        let window_size = WindowSizeService::with_delay(platform.resize, platform.scheduler, config.resize_delay());
        let email_auth = EmailAuthHttpService::new(platform.http, config.email_auth());

        tracing::debug!(
            target: "frontend_services",
            "Services created, language {}, color scheme {}",
            config.language,
            theme.color_scheme()
        );

        FrontendServices {
            config: Rc::new(config),
            theme,
            window_size,
            route: RouteService::new(),
            email_auth: Rc::new(email_auth),
            cache: Rc::new(FrontendCacheService::new()),
        }
    }

    /// Config from the page, browser backends and the console logger
    #[cfg(target_arch = "wasm32")]
    pub fn start_browser(app_name: &str) -> Result<Self, StartupError> {
        let config = FrontendConfig::from_window()?;
        frontend_logger::init_logger(app_name, &config.log_level)?;
        let platform = Platform::browser()?;
        Ok(Self::new(config, platform))
    }

    /// Runs the cache initializers in the background, logging a failure
    #[cfg(target_arch = "wasm32")]
    pub fn spawn_cache_initialization(&self) {
        let cache = self.cache.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = cache.initialize().await {
                tracing::error!(target: "frontend_services", error = %e, "cache initialization failed");
            }
        });
    }

    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }

    /// Installs the console logger at the configured level
    pub fn init_logging(&self, app_name: &str) -> Result<(), StartupError> {
        frontend_logger::init_logger(app_name, &self.config.log_level)?;
        Ok(())
    }

    /// Posts a color scheme change to another window with the configured origin
    pub fn set_remote_color_scheme(&self, value: Option<ColorScheme>, target: &dyn MessageTarget) {
        ThemeService::set_remote_color_scheme(value, target, &self.config.remote_origin);
    }

    pub fn unset_remote_color_scheme(&self, target: &dyn MessageTarget) {
        ThemeService::unset_remote_color_scheme(target, &self.config.remote_origin);
    }

    pub fn destroy(&self) {
        self.theme.destroy();
        self.window_size.destroy();
        self.route.destroy();
    }
}
