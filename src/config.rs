// ============================================================================
// spark-bind - Binding Options
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How much binding work happens inside each `@for` item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListItemMode {
    /// Only `{{ }}` interpolation and `[attr]` bindings, applied once per render
    #[default]
    Substitution,
    /// Every registered binding kind, with per-item tables released on the
    /// next render
    Full,
}

/// Options controlling a `Binder`.
///
/// # Example
///
/// ```
/// use spark_bind::{BindOptions, ListItemMode};
///
/// let options = BindOptions::from_json(r#"{ "list_items": "full" }"#).unwrap();
/// assert_eq!(options.list_items, ListItemMode::Full);
/// assert!(options.annotate_placeholders);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindOptions {
    pub list_items: ListItemMode,

    /// Placeholder comments carry the marker they stand in for
    /// (`<!--@if: show-->`) instead of being empty
    pub annotate_placeholders: bool,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            list_items: ListItemMode::Substitution,
            annotate_placeholders: true,
        }
    }
}

impl BindOptions {
    /// Load options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Text for a placeholder comment standing in for `marker="expression"`.
    pub fn placeholder_text(&self, marker: &str, expression: &str) -> String {
        if self.annotate_placeholders {
            format!("{marker}: {expression}")
        } else {
            String::new()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = BindOptions::default();
        assert_eq!(options.list_items, ListItemMode::Substitution);
        assert!(options.annotate_placeholders);
        assert_eq!(BindOptions::from_json("{}").unwrap(), options);
    }

    #[test]
    fn placeholder_text_follows_annotation_flag() {
        let mut options = BindOptions::default();
        assert_eq!(options.placeholder_text("@if", "open"), "@if: open");
        options.annotate_placeholders = false;
        assert_eq!(options.placeholder_text("@if", "open"), "");
    }

    #[test]
    fn bad_json_is_a_config_error() {
        let err = BindOptions::from_json(r#"{ "list_items": "sometimes" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
