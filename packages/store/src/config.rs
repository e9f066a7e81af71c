//! # Branding document: `config.json`
//!
//! Presentation settings that live next to the student documents in the
//! content store, so the secretariat can rebrand without a redeploy.
//!
//! ```json
//! {
//!   "school_name": "EMEF PA-RESSACA",
//!   "accent_color": "#1f6feb",
//!   "logo_url": "https://example.org/logo.png"
//! }
//! ```
//!
//! Every field has a default, and [`ThemeConfig::from_json_or_default`] treats
//! a missing or unreadable document as the default theme.

use serde::{Deserialize, Serialize};

/// Branding shown by the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "default_school_name")]
    pub school_name: String,
    #[serde(default = "default_accent_color")]
    pub accent_color: String,
    /// Empty string means no logo.
    #[serde(default)]
    pub logo_url: String,
}

fn default_school_name() -> String {
    "Secretaria Escolar".to_string()
}

fn default_accent_color() -> String {
    "#1f6feb".to_string()
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            school_name: default_school_name(),
            accent_color: default_accent_color(),
            logo_url: String::new(),
        }
    }
}

impl ThemeConfig {
    /// The well-known document name.
    pub fn filename() -> &'static str {
        "config.json"
    }

    /// Parse from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Parse, falling back to the default theme.
    pub fn from_json_or_default(bytes: Option<&[u8]>) -> Self {
        bytes
            .and_then(|b| Self::from_json(b).ok())
            .unwrap_or_default()
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_fills_defaults() {
        let theme = ThemeConfig::from_json(br#"{"school_name":"EMEF PA-RESSACA"}"#).unwrap();
        assert_eq!(theme.school_name, "EMEF PA-RESSACA");
        assert_eq!(theme.accent_color, "#1f6feb");
        assert_eq!(theme.logo_url, "");
    }

    #[test]
    fn test_missing_or_garbage_is_default() {
        assert_eq!(ThemeConfig::from_json_or_default(None), ThemeConfig::default());
        assert_eq!(
            ThemeConfig::from_json_or_default(Some(b"not json")),
            ThemeConfig::default()
        );
    }
}
