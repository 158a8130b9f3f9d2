use serde_json::{Map, Value};

use crate::document::{BagItem, Document};
use crate::error::{Result, SearchError};
use crate::source::{RecordFormat, SharedSource, StoredRecord};

use super::CollectionProvider;

const WRAPPED_ITEM_CLASS: &str = "Chef::DataBagItem";

/// Lists the items of one named bag.
pub struct BagProvider {
    source: SharedSource,
    bag: String,
}

impl BagProvider {
    pub fn new(source: SharedSource, bag: impl Into<String>) -> Self {
        Self {
            source,
            bag: bag.into(),
        }
    }

    pub fn bag(&self) -> &str {
        &self.bag
    }

    fn decode_item(&self, record: &StoredRecord) -> Result<BagItem> {
        if record.format != RecordFormat::Json {
            return Err(SearchError::UnsupportedEncoding(format!(
                "bag item {}/{}: only .json items are supported, got '{}'",
                self.bag,
                record.id,
                record.format.label()
            )));
        }
        let value: Value = serde_json::from_str(&record.contents)
            .map_err(|error| SearchError::malformed(&record.id, error.to_string()))?;
        let Value::Object(map) = value else {
            return Err(SearchError::malformed(&record.id, "bag item is not a mapping"));
        };
        let raw = unwrap_item(map);
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| record.id.clone());

        Ok(BagItem {
            bag: self.bag.clone(),
            id,
            raw,
        })
    }
}

impl CollectionProvider for BagProvider {
    fn list_candidates(&self) -> Result<Vec<Document>> {
        let records = self.source.list_bag_items(&self.bag)?;
        log::debug!("decoding {} items of bag '{}'", records.len(), self.bag);
        records
            .iter()
            .map(|record| self.decode_item(record).map(Document::BagItem))
            .collect()
    }
}

/// Items saved by the server tooling wrap their data in `raw_data`.
fn unwrap_item(mut map: Map<String, Value>) -> Map<String, Value> {
    let wrapped = map.get("json_class").and_then(Value::as_str) == Some(WRAPPED_ITEM_CLASS)
        && matches!(map.get("raw_data"), Some(Value::Object(_)));
    if !wrapped {
        return map;
    }
    match map.remove("raw_data") {
        Some(Value::Object(raw)) => raw,
        _ => map,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn lists_items_with_ids() {
        let source = MemorySource::new()
            .with_bag_item("users", "alice", &json!({ "id": "alice", "shell": "zsh" }))
            .with_bag_item("users", "bob", &json!({ "shell": "bash" }));
        let provider = BagProvider::new(Arc::new(source), "users");

        let items = provider.list_candidates().expect("items");
        let ids = items.iter().map(Document::id).collect::<Vec<_>>();
        assert_eq!(ids, vec!["alice", "bob"]);
        assert_eq!(provider.bag(), "users");
    }

    #[test]
    fn unwraps_server_item_form() {
        let source = MemorySource::new().with_bag_item(
            "users",
            "data_bag_item_users_alice",
            &json!({
                "json_class": "Chef::DataBagItem",
                "chef_type": "data_bag_item",
                "data_bag": "users",
                "raw_data": { "id": "alice", "groups": ["admin"] }
            }),
        );
        let provider = BagProvider::new(Arc::new(source), "users");

        let items = provider.list_candidates().expect("items");
        let item = items[0].as_bag_item().expect("bag item");
        assert_eq!(item.id, "alice");
        assert!(!item.raw.contains_key("json_class"));
        assert!(items[0].flat_view().contains("groups", "admin"));
    }

    #[test]
    fn missing_bag_fails() {
        let provider = BagProvider::new(Arc::new(MemorySource::new()), "users");
        let err = provider.list_candidates().expect_err("missing");
        assert!(matches!(err, SearchError::BagNotFound(name) if name == "users"));
    }

    #[test]
    fn non_mapping_item_is_malformed() {
        let source = MemorySource::new().with_bag_item("users", "alice", &json!(["alice"]));
        let provider = BagProvider::new(Arc::new(source), "users");
        let err = provider.list_candidates().expect_err("malformed");
        assert!(matches!(err, SearchError::MalformedRecord { id, .. } if id == "alice"));
    }
}
