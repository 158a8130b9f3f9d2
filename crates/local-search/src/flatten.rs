//! Reduces a nested record to a flat field-path view for matching.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

/// Separator placed between nested keys (`automatic.hostname`).
pub const PATH_SEPARATOR: char = '.';

/// Field path → values view of a single record.
///
/// Only scalar leaves produce values. A sequence contributes each of its
/// elements under the sequence's own path; `null` contributes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatView {
    fields: BTreeMap<String, BTreeSet<String>>,
}

impl FlatView {
    /// Values stored at `field`; empty when the path is unknown.
    pub fn values<'a>(&'a self, field: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .get(field)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn contains(&self, field: &str, value: &str) -> bool {
        self.fields
            .get(field)
            .is_some_and(|values| values.contains(value))
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Every value of every field.
    pub fn all_values(&self) -> impl Iterator<Item = &str> {
        self.fields.values().flatten().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.fields.iter().map(|(path, values)| (path.as_str(), values))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn insert(&mut self, path: &str, value: String) {
        self.fields
            .entry(path.to_string())
            .or_default()
            .insert(value);
    }
}

/// Flattens a mapping into a fresh [`FlatView`].
pub fn flatten(document: &Value) -> FlatView {
    let mut view = FlatView::default();
    if let Value::Object(map) = document {
        for (key, value) in map {
            flatten_into(&mut view, key, value);
        }
    }
    view
}

fn flatten_into(view: &mut FlatView, path: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => view.insert(path, flag.to_string()),
        Value::Number(number) => view.insert(path, number.to_string()),
        Value::String(text) => view.insert(path, text.clone()),
        Value::Array(items) => {
            for item in items {
                flatten_into(view, path, item);
            }
        }
        Value::Object(map) => {
            for (key, nested) in map {
                let nested_path = format!("{path}{PATH_SEPARATOR}{key}");
                flatten_into(view, &nested_path, nested);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_keys_become_dotted_paths() {
        let view = flatten(&json!({
            "automatic": { "hostname": "web01", "kernel": { "name": "Linux" } }
        }));
        assert!(view.contains("automatic.hostname", "web01"));
        assert!(view.contains("automatic.kernel.name", "Linux"));
        assert!(!view.has_field("automatic"));
    }

    #[test]
    fn sequences_yield_multiple_values() {
        let view = flatten(&json!({ "run_list": ["recipe[nginx]", "role[base]"] }));
        let values = view.values("run_list").collect::<Vec<_>>();
        assert_eq!(values, vec!["recipe[nginx]", "role[base]"]);
    }

    #[test]
    fn sequences_of_mappings_share_the_parent_path() {
        let view = flatten(&json!({
            "users": [{ "name": "alice" }, { "name": "bob" }]
        }));
        assert!(view.contains("users.name", "alice"));
        assert!(view.contains("users.name", "bob"));
    }

    #[test]
    fn scalars_use_canonical_strings() {
        let view = flatten(&json!({ "enabled": true, "port": 8080, "ratio": 0.5 }));
        assert!(view.contains("enabled", "true"));
        assert!(view.contains("port", "8080"));
        assert!(view.contains("ratio", "0.5"));
    }

    #[test]
    fn null_leaves_are_absent() {
        let view = flatten(&json!({ "description": null }));
        assert!(!view.has_field("description"));
        assert!(view.is_empty());
    }

    #[test]
    fn unknown_field_has_no_values() {
        let view = flatten(&json!({ "name": "web" }));
        assert_eq!(view.values("missing").count(), 0);
    }

    #[test]
    fn non_mapping_root_is_empty() {
        assert!(flatten(&json!(["a", "b"])).is_empty());
    }
}
