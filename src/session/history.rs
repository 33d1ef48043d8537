//! Client-side version history
//!
//! Every explicit save diffs the previous in-memory payload against the new
//! one and, when anything changed, appends an entry to a capped local log.
//! The log never leaves the client; it is an audit trail, not a sync
//! mechanism.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Most-recent entries kept; the 51st save evicts the oldest
pub const HISTORY_CAP: usize = 50;

/// One recorded save with its human-readable change descriptions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    pub changes: Vec<String>,
    pub author: String,
    /// Short summary of the save
    pub description: String,
}

/// Capped, newest-first log of semantic diffs between saves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionHistory {
    entries: Vec<VersionEntry>,
}

impl VersionHistory {
    /// Record a save. Returns false (and records nothing) when the change
    /// list is empty.
    pub fn record(&mut self, changes: Vec<String>, author: &str) -> bool {
        if changes.is_empty() {
            return false;
        }

        let description = if changes.len() > 3 {
            format!("{} fields changed", changes.len())
        } else {
            changes.join(", ")
        };

        self.entries.insert(
            0,
            VersionEntry {
                id: Uuid::new_v4().to_string(),
                timestamp: Utc::now().timestamp_millis(),
                changes,
                author: author.to_string(),
                description,
            },
        );
        self.entries.truncate(HISTORY_CAP);
        true
    }

    /// Entries, newest first
    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute human-readable change descriptions between two payloads.
///
/// Walks the planning-document shape: overview scalars and lists, the
/// per-mode screen collections (matched by screen id), and the rules list.
/// Unknown or missing fields compare as null and only report when they
/// actually differ.
pub fn diff_payloads(old: &Value, new: &Value) -> Vec<String> {
    let mut changes = Vec::new();

    diff_overview(&old["overview"], &new["overview"], &mut changes);
    for mode in ["fan", "creator"] {
        diff_screens(mode, &old["screens"][mode], &new["screens"][mode], &mut changes);
    }
    diff_rules(&old["rules"], &new["rules"], &mut changes);

    changes
}

fn diff_overview(old: &Value, new: &Value, changes: &mut Vec<String>) {
    for field in ["title", "subtitle"] {
        if old[field] != new[field] {
            changes.push(format!(
                "{field} changed: {} -> {}",
                quoted(&old[field]),
                quoted(&new[field])
            ));
        }
    }
    if old["description"] != new["description"] {
        changes.push("overview description edited".to_string());
    }
    for field in ["purpose", "scope", "usage"] {
        if old[field] != new[field] {
            changes.push(format!("{field} revised"));
        }
    }
}

fn diff_screens(mode: &str, old: &Value, new: &Value, changes: &mut Vec<String>) {
    let old_list = old.as_array().cloned().unwrap_or_default();
    let new_list = new.as_array().cloned().unwrap_or_default();

    if old_list.len() != new_list.len() {
        changes.push(format!(
            "{mode} screens: {} -> {}",
            old_list.len(),
            new_list.len()
        ));
        return;
    }

    for new_screen in &new_list {
        let id = &new_screen["id"];
        let Some(old_screen) = old_list.iter().find(|s| &s["id"] == id) else {
            continue;
        };
        let label = screen_label(id);
        if old_screen["title"] != new_screen["title"] {
            changes.push(format!("screen {label} title changed"));
        }
        for field in ["purpose", "elements", "action", "wireframes"] {
            if old_screen[field] != new_screen[field] {
                changes.push(format!("screen {label} {field} edited"));
            }
        }
        if old_screen["code"] != new_screen["code"] {
            changes.push(format!("screen {label} code edited"));
        }
    }
}

fn diff_rules(old: &Value, new: &Value, changes: &mut Vec<String>) {
    let old_list = old.as_array().cloned().unwrap_or_default();
    let new_list = new.as_array().cloned().unwrap_or_default();

    if old_list.len() != new_list.len() {
        changes.push(format!("rules: {} -> {}", old_list.len(), new_list.len()));
        return;
    }

    for (index, (old_rule, new_rule)) in old_list.iter().zip(&new_list).enumerate() {
        if old_rule["title"] != new_rule["title"] {
            changes.push(format!("rule {} title changed", index + 1));
        }
        if old_rule["content"] != new_rule["content"] {
            changes.push(format!("rule {} content edited", index + 1));
        }
    }
}

fn screen_label(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => "?".to_string(),
    }
}

fn quoted(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(title: &str) -> Value {
        json!({
            "overview": {
                "title": title,
                "subtitle": "sub",
                "description": "desc",
                "purpose": ["p"],
                "scope": ["s"],
                "usage": ["u"]
            },
            "screens": {
                "fan": [{ "id": 1, "title": "Home", "purpose": ["p"], "elements": ["e"], "action": ["a"], "wireframes": [] }],
                "creator": []
            },
            "rules": [{ "title": "r1", "content": "c1" }]
        })
    }

    #[test]
    fn identical_payloads_produce_no_changes() {
        assert!(diff_payloads(&payload("t"), &payload("t")).is_empty());
    }

    #[test]
    fn title_change_is_described_with_both_values() {
        let changes = diff_payloads(&payload("old"), &payload("new"));
        assert_eq!(changes, vec![r#"title changed: "old" -> "new""#.to_string()]);
    }

    #[test]
    fn screen_and_rule_edits_are_reported_individually() {
        let old = payload("t");
        let mut new = payload("t");
        new["screens"]["fan"][0]["elements"] = json!(["e", "extra"]);
        new["rules"][0]["content"] = json!("changed");

        let changes = diff_payloads(&old, &new);
        assert!(changes.contains(&"screen 1 elements edited".to_string()));
        assert!(changes.contains(&"rule 1 content edited".to_string()));
    }

    #[test]
    fn list_length_changes_shortcut_per_item_diffs() {
        let old = payload("t");
        let mut new = payload("t");
        new["screens"]["fan"] = json!([]);

        let changes = diff_payloads(&old, &new);
        assert!(changes.contains(&"fan screens: 1 -> 0".to_string()));
    }

    #[test]
    fn empty_change_list_records_nothing() {
        let mut history = VersionHistory::default();
        assert!(!history.record(vec![], "editor"));
        assert!(history.is_empty());
    }

    #[test]
    fn description_summarizes_long_change_lists() {
        let mut history = VersionHistory::default();
        history.record(vec!["a".into(), "b".into()], "editor");
        assert_eq!(history.entries()[0].description, "a, b");

        history.record(vec!["a".into(), "b".into(), "c".into(), "d".into()], "editor");
        assert_eq!(history.entries()[0].description, "4 fields changed");
    }

    #[test]
    fn history_is_capped_newest_first() {
        let mut history = VersionHistory::default();
        for i in 0..(HISTORY_CAP + 5) {
            history.record(vec![format!("change {i}")], "editor");
        }
        assert_eq!(history.len(), HISTORY_CAP);
        // Newest entry first, oldest five evicted
        assert_eq!(history.entries()[0].changes[0], format!("change {}", HISTORY_CAP + 4));
        assert_eq!(
            history.entries()[HISTORY_CAP - 1].changes[0],
            "change 5".to_string()
        );
    }
}
