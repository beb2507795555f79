use std::time::Duration;

use email_auth::service::{
    DEFAULT_AUTHENTICATE_EMAIL_PATH, DEFAULT_VERIFY_EMAIL_CODE_PATH, DEFAULT_VERIFY_EMAIL_TOKEN_PATH,
};
use email_auth::{EmailAuthConfig, Language};
use serde::{Deserialize, Serialize};
use theme_sync::{DEFAULT_REMOTE_ORIGIN, DEFAULT_STORAGE_KEY};

/// Global the host page may define to configure the services
pub const CONFIG_GLOBAL: &str = "__FRONTEND_CONFIG__";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frontend config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not read window config: {0}")]
    Window(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrontendConfig {
    /// Empty means same origin
    pub api_base_url: String,
    pub language: Language,
    pub authenticate_email_path: String,
    pub verify_email_token_path: String,
    pub verify_email_code_path: String,
    pub resize_delay_ms: u64,
    pub theme_storage_key: String,
    pub remote_origin: String,
    pub log_level: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            language: Language::En,
            authenticate_email_path: DEFAULT_AUTHENTICATE_EMAIL_PATH.to_string(),
            verify_email_token_path: DEFAULT_VERIFY_EMAIL_TOKEN_PATH.to_string(),
            verify_email_code_path: DEFAULT_VERIFY_EMAIL_CODE_PATH.to_string(),
            resize_delay_ms: 200,
            theme_storage_key: DEFAULT_STORAGE_KEY.to_string(),
            remote_origin: DEFAULT_REMOTE_ORIGIN.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl FrontendConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads `window.__FRONTEND_CONFIG__`, defaults when it is absent. An
    /// empty `apiBaseUrl` is filled with the page origin.
    #[cfg(target_arch = "wasm32")]
    pub fn from_window() -> Result<Self, ConfigError> {
        use wasm_bindgen::JsValue;

        let Some(window) = web_sys::window() else {
            return Ok(Self::default());
        };
        let value = js_sys::Reflect::get(&window, &JsValue::from_str(CONFIG_GLOBAL))
            .map_err(|e| ConfigError::Window(e.as_string().unwrap_or_else(|| format!("{:?}", e))))?;

        let mut config: FrontendConfig = if value.is_undefined() || value.is_null() {
            Self::default()
        } else {
            serde_wasm_bindgen::from_value(value).map_err(|e| ConfigError::Window(e.to_string()))?
        };

        if config.api_base_url.is_empty() {
            match window.location().origin() {
                Ok(origin) => config.api_base_url = origin,
                Err(e) => tracing::warn!(target: "frontend_services", "page origin unavailable: {:?}", e),
            }
        }
        Ok(config)
    }

    pub fn resize_delay(&self) -> Duration {
        Duration::from_millis(self.resize_delay_ms)
    }

    pub fn email_auth(&self) -> EmailAuthConfig {
        EmailAuthConfig {
            base_url: self.api_base_url.clone(),
            authenticate_email_path: self.authenticate_email_path.clone(),
            verify_email_token_path: self.verify_email_token_path.clone(),
            verify_email_code_path: self.verify_email_code_path.clone(),
            language: self.language,
        }
    }
}
