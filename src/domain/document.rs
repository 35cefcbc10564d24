//! Content records as seen by lifecycle hooks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the draft/published status field on versioned content.
pub const STATUS_FIELD: &str = "_status";
/// Status value that marks published content.
pub const STATUS_PUBLISHED: &str = "published";

/// A content record snapshot.
///
/// The host schema is opaque to the plugin; only a handful of well-known
/// fields (`path`, `slug`, `id`, `_status`) are ever inspected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Document {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Returns the field when it is present and holds a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn status(&self) -> Option<&str> {
        self.str_field(STATUS_FIELD)
    }

    pub fn is_published(&self) -> bool {
        self.status() == Some(STATUS_PUBLISHED)
    }

    /// Identifier rendered as a path segment.
    ///
    /// Accepts non-empty strings and non-zero numbers; anything else yields `None`.
    pub fn id_segment(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) if id.as_f64() != Some(0.0) => Some(id.to_string()),
            _ => None,
        }
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_status_and_publication() {
        let doc = Document::new(json!({ "_status": "published" }));
        assert_eq!(doc.status(), Some("published"));
        assert!(doc.is_published());

        let draft = Document::new(json!({ "_status": "draft" }));
        assert!(!draft.is_published());
        assert!(!Document::default().is_published());
    }

    #[test]
    fn id_segment_accepts_strings_and_numbers() {
        assert_eq!(
            Document::new(json!({ "id": "42" })).id_segment().as_deref(),
            Some("42")
        );
        assert_eq!(
            Document::new(json!({ "id": 7 })).id_segment().as_deref(),
            Some("7")
        );
        assert_eq!(Document::new(json!({ "id": "" })).id_segment(), None);
        assert_eq!(Document::new(json!({ "id": null })).id_segment(), None);
    }

    #[test]
    fn zero_id_is_treated_as_missing() {
        assert_eq!(Document::new(json!({ "id": 0 })).id_segment(), None);
        assert_eq!(Document::new(json!({ "id": 0.0 })).id_segment(), None);
        assert_eq!(
            Document::new(json!({ "id": -3 })).id_segment().as_deref(),
            Some("-3")
        );
    }

    #[test]
    fn non_string_fields_are_ignored() {
        let doc = Document::new(json!({ "slug": 12, "path": ["a"] }));
        assert_eq!(doc.str_field("slug"), None);
        assert_eq!(doc.str_field("path"), None);
    }
}
