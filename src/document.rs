//! Document model
//!
//! A document is an opaque nested JSON payload (`data`) plus the envelope the
//! storage layer cares about. The same shape is stored at the draft key and,
//! with `isPublished` flipped, at release keys.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Root document entity, stored as JSON at draft and release keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Opaque identifier, stable for the document's lifetime
    pub id: String,
    /// Human-readable label
    pub title: String,
    /// Planning-document content; opaque to the storage layer
    pub data: Value,
    /// Creation timestamp, epoch milliseconds
    pub created_at: i64,
    /// Last-save timestamp, epoch milliseconds
    pub updated_at: i64,
    /// True only on objects stored under a release path
    pub is_published: bool,
}

/// Listing entry returned by `GET /api/documents`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListing {
    pub id: String,
    pub title: String,
    pub updated_at: String,
}

impl Document {
    /// Create a fresh unpublished document stamped with the current time
    pub fn new(id: impl Into<String>, title: impl Into<String>, data: Value) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: id.into(),
            title: title.into(),
            data,
            created_at: now,
            updated_at: now,
            is_published: false,
        }
    }

    /// Built-in starter document used when neither a remote release nor a
    /// local snapshot exists.
    pub fn starter(id: impl Into<String>) -> Self {
        Self::new(id, "1:1 Video Chat - Product Plan", starter_payload())
    }
}

/// Starter planning-document payload for a 1:1 video chat service.
pub fn starter_payload() -> Value {
    json!({
        "overview": {
            "title": "1:1 Video Chat - Product Plan",
            "subtitle": "Real-time one-on-one sessions between creators and fans",
            "description": "Planning document for the video chat service: screens, flows and operating rules.",
            "purpose": ["Define the product scope for the first release"],
            "scope": ["Fan-side and creator-side screen flows"],
            "usage": ["Shared reference for design and engineering"]
        },
        "screens": {
            "fan": [],
            "creator": []
        },
        "rules": []
    })
}

/// Normalize a legacy payload to the current schema.
///
/// Applied exactly once when a payload is loaded from a snapshot or a
/// release. Earlier editor builds stored several list fields as plain
/// strings and used a singular `wireframe` key per screen; this coerces
/// those shapes and fills in missing collections.
pub fn migrate_payload(raw: Value) -> Value {
    let mut payload = match raw {
        Value::Object(map) => Value::Object(map),
        _ => return starter_payload(),
    };

    if let Some(overview) = payload.get_mut("overview").and_then(Value::as_object_mut) {
        for field in ["purpose", "scope", "usage"] {
            coerce_to_array(overview, field);
        }
    } else {
        payload["overview"] = starter_payload()["overview"].clone();
    }

    match payload.get_mut("screens").and_then(Value::as_object_mut) {
        Some(screens) => {
            for mode in ["fan", "creator"] {
                let list = screens.entry(mode).or_insert_with(|| json!([]));
                if let Some(items) = list.as_array_mut() {
                    for screen in items.iter_mut() {
                        migrate_screen(screen);
                    }
                } else {
                    *list = json!([]);
                }
            }
        }
        None => {
            payload["screens"] = json!({ "fan": [], "creator": [] });
        }
    }

    if !payload.get("rules").map(Value::is_array).unwrap_or(false) {
        payload["rules"] = json!([]);
    }

    payload
}

fn migrate_screen(screen: &mut Value) {
    let Some(obj) = screen.as_object_mut() else {
        return;
    };

    for field in ["purpose", "elements", "action"] {
        coerce_to_array(obj, field);
    }

    // Singular `wireframe` predates the `wireframes` list
    if obj.get("wireframes").map(Value::is_array) != Some(true) {
        let migrated = match obj.remove("wireframe") {
            Some(Value::String(s)) => json!([s]),
            _ => json!([]),
        };
        obj.insert("wireframes".to_string(), migrated);
    }
}

fn coerce_to_array(obj: &mut serde_json::Map<String, Value>, field: &str) {
    match obj.get(field) {
        Some(Value::Array(_)) => {}
        Some(Value::String(s)) => {
            let wrapped = json!([s]);
            obj.insert(field.to_string(), wrapped);
        }
        _ => {
            obj.insert(field.to_string(), json!([]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_wraps_scalar_overview_fields() {
        let raw = json!({
            "overview": { "title": "t", "purpose": "single goal" }
        });
        let migrated = migrate_payload(raw);
        assert_eq!(migrated["overview"]["purpose"], json!(["single goal"]));
        assert_eq!(migrated["overview"]["scope"], json!([]));
        assert_eq!(migrated["screens"], json!({ "fan": [], "creator": [] }));
        assert_eq!(migrated["rules"], json!([]));
    }

    #[test]
    fn migrate_renames_singular_wireframe() {
        let raw = json!({
            "overview": { "purpose": [], "scope": [], "usage": [] },
            "screens": {
                "fan": [{ "id": 1, "purpose": "p", "wireframe": "data:image/png;base64,x" }]
            }
        });
        let migrated = migrate_payload(raw);
        let screen = &migrated["screens"]["fan"][0];
        assert_eq!(screen["purpose"], json!(["p"]));
        assert_eq!(screen["wireframes"], json!(["data:image/png;base64,x"]));
        assert!(screen.get("wireframe").is_none());
    }

    #[test]
    fn migrate_is_idempotent_on_current_schema() {
        let current = starter_payload();
        assert_eq!(migrate_payload(current.clone()), current);
    }

    #[test]
    fn document_round_trips_with_camel_case_keys() {
        let doc = Document::new("doc-1", "Title", json!({ "k": 1 }));
        let text = serde_json::to_string(&doc).unwrap();
        assert!(text.contains("\"createdAt\""));
        assert!(text.contains("\"isPublished\":false"));
        let back: Document = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc);
    }
}
