//! In-memory document source.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Result, SearchError};

use super::{DocumentSource, RecordFormat, StoredRecord};

/// Records held in memory, listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    nodes: Vec<StoredRecord>,
    roles: Vec<StoredRecord>,
    bags: BTreeMap<String, Vec<StoredRecord>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, id: &str, value: &Value) -> Self {
        self.nodes.push(StoredRecord::json(id, value));
        self
    }

    pub fn with_role(mut self, id: &str, value: &Value) -> Self {
        self.roles.push(StoredRecord::json(id, value));
        self
    }

    /// Adds a role written in the role DSL.
    pub fn with_role_dsl(mut self, id: &str, source: &str) -> Self {
        self.roles
            .push(StoredRecord::new(id, RecordFormat::RoleDsl, source));
        self
    }

    /// Declares a bag, possibly without items.
    pub fn with_bag(mut self, bag: &str) -> Self {
        self.bags.entry(bag.to_string()).or_default();
        self
    }

    pub fn with_bag_item(mut self, bag: &str, id: &str, value: &Value) -> Self {
        self.bags
            .entry(bag.to_string())
            .or_default()
            .push(StoredRecord::json(id, value));
        self
    }

    /// Adds an arbitrary stored node record, e.g. one that does not decode.
    pub fn push_node(&mut self, record: StoredRecord) {
        self.nodes.push(record);
    }

    pub fn push_role(&mut self, record: StoredRecord) {
        self.roles.push(record);
    }

    pub fn push_bag_item(&mut self, bag: &str, record: StoredRecord) {
        self.bags.entry(bag.to_string()).or_default().push(record);
    }
}

impl DocumentSource for MemorySource {
    fn list_nodes(&self) -> Result<Vec<StoredRecord>> {
        Ok(self.nodes.clone())
    }

    fn list_roles(&self) -> Result<Vec<StoredRecord>> {
        Ok(self.roles.clone())
    }

    fn list_bag_items(&self, bag: &str) -> Result<Vec<StoredRecord>> {
        self.bags
            .get(bag)
            .cloned()
            .ok_or_else(|| SearchError::BagNotFound(bag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_insertion_order() {
        let source = MemorySource::new()
            .with_node("b", &json!({ "name": "b" }))
            .with_node("a", &json!({ "name": "a" }));
        let ids = source
            .list_nodes()
            .unwrap()
            .into_iter()
            .map(|record| record.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn empty_bag_exists() {
        let source = MemorySource::new().with_bag("users");
        assert!(source.list_bag_items("users").unwrap().is_empty());
    }

    #[test]
    fn unknown_bag_is_not_found() {
        let source = MemorySource::new();
        let err = source.list_bag_items("users").unwrap_err();
        assert!(matches!(err, SearchError::BagNotFound(name) if name == "users"));
    }

    #[test]
    fn dsl_roles_keep_their_format() {
        let source = MemorySource::new().with_role_dsl("web", "name \"web\"");
        let roles = source.list_roles().unwrap();
        assert_eq!(roles[0].format, RecordFormat::RoleDsl);
        assert_eq!(source.find_role("web").unwrap(), Some(roles[0].clone()));
    }
}
