//! Cross-window theme message
//!
//! Wire format: `{"type":"fi.nor.ui.ThemeService:colorSchemeChanged","value":"dark"}`.
//! An unset value drops the `value` key, the same as `JSON.stringify` does
//! with `undefined`.

use serde::{Deserialize, Serialize};

use crate::ColorScheme;

pub const COLOR_SCHEME_CHANGED_MESSAGE: &str = "fi.nor.ui.ThemeService:colorSchemeChanged";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThemeChangeMessage {
    #[serde(rename = "fi.nor.ui.ThemeService:colorSchemeChanged")]
    ColorSchemeChanged {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<ColorScheme>,
    },
}

impl ThemeChangeMessage {
    pub fn color_scheme_changed(value: Option<ColorScheme>) -> Self {
        ThemeChangeMessage::ColorSchemeChanged { value }
    }

    pub fn value(&self) -> Option<ColorScheme> {
        match self {
            ThemeChangeMessage::ColorSchemeChanged { value } => *value,
        }
    }

    /// Structural check of an inbound JSON message. Anything that is not a
    /// well-formed theme message yields `None`.
    pub fn parse(message: &serde_json::Value) -> Option<Self> {
        ThemeChangeMessage::deserialize(message).ok()
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_with_namespaced_type() {
        let text = ThemeChangeMessage::color_scheme_changed(Some(ColorScheme::Dark))
            .to_json_string()
            .unwrap();
        assert_eq!(text, r#"{"type":"fi.nor.ui.ThemeService:colorSchemeChanged","value":"dark"}"#);
    }

    #[test]
    fn test_unset_value_is_omitted() {
        let text = ThemeChangeMessage::color_scheme_changed(None)
            .to_json_string()
            .unwrap();
        assert_eq!(text, format!(r#"{{"type":"{}"}}"#, COLOR_SCHEME_CHANGED_MESSAGE));
    }

    #[test]
    fn test_parse_accepts_missing_or_null_value() {
        let missing = json!({ "type": COLOR_SCHEME_CHANGED_MESSAGE });
        let null = json!({ "type": COLOR_SCHEME_CHANGED_MESSAGE, "value": null });
        assert_eq!(ThemeChangeMessage::parse(&missing).map(|m| m.value()), Some(None));
        assert_eq!(ThemeChangeMessage::parse(&null).map(|m| m.value()), Some(None));
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert_eq!(ThemeChangeMessage::parse(&json!({ "type": "other", "value": "dark" })), None);
        assert_eq!(
            ThemeChangeMessage::parse(&json!({ "type": COLOR_SCHEME_CHANGED_MESSAGE, "value": "purple" })),
            None
        );
        assert_eq!(ThemeChangeMessage::parse(&json!("dark")), None);
        assert_eq!(ThemeChangeMessage::parse(&json!(null)), None);
    }
}
