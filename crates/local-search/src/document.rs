//! Searchable record kinds.
//!
//! Every record kind reduces to a single JSON mapping (its search view) that
//! the flattener turns into field paths. Records are immutable once decoded;
//! the search path only reads them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::flatten::{flatten, FlatView};
use crate::merge::{merge_attributes, AttributeLayer};
use crate::run_list::RunListItem;

pub const DEFAULT_ENVIRONMENT: &str = "_default";

/// A record returned by a search.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Node(NodeRecord),
    Role(RoleRecord),
    BagItem(BagItem),
}

impl Document {
    /// Identity: node name, role name, or bag item id.
    pub fn id(&self) -> &str {
        match self {
            Self::Node(node) => node.name.as_str(),
            Self::Role(role) => role.name.as_str(),
            Self::BagItem(item) => item.id.as_str(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::Role(_) => "role",
            Self::BagItem(_) => "data_bag_item",
        }
    }

    pub fn search_view(&self) -> Value {
        match self {
            Self::Node(node) => node.search_view(),
            Self::Role(role) => role.search_view(),
            Self::BagItem(item) => item.search_view(),
        }
    }

    /// A fresh flattened view; nothing is cached on the record.
    pub fn flat_view(&self) -> FlatView {
        flatten(&self.search_view())
    }

    pub fn as_node(&self) -> Option<&NodeRecord> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_role(&self) -> Option<&RoleRecord> {
        match self {
            Self::Role(role) => Some(role),
            _ => None,
        }
    }

    pub fn as_bag_item(&self) -> Option<&BagItem> {
        match self {
            Self::BagItem(item) => Some(item),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// A host record with its attribute layers and expanded run list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeRecord {
    pub name: String,
    pub chef_environment: String,
    pub run_list: Vec<RunListItem>,
    pub attributes: BTreeMap<AttributeLayer, Map<String, Value>>,
    /// Recipes reached by expanding the run list through roles, in order.
    pub expanded_recipes: Vec<String>,
    /// Roles visited during expansion, in order.
    pub expanded_roles: Vec<String>,
}

impl NodeRecord {
    pub fn layer(&self, layer: AttributeLayer) -> Option<&Map<String, Value>> {
        self.attributes.get(&layer)
    }

    /// The effective attributes after precedence merge.
    pub fn merged_attributes(&self) -> Map<String, Value> {
        merge_attributes(
            AttributeLayer::ALL
                .iter()
                .filter_map(|layer| self.attributes.get(layer)),
        )
    }

    pub fn hostname(&self) -> Option<&str> {
        self.layer(AttributeLayer::Automatic)?
            .get("hostname")?
            .as_str()
    }

    /// Recipes named directly in the run list.
    pub fn recipe_names(&self) -> Vec<String> {
        self.run_list
            .iter()
            .filter_map(|item| match item {
                RunListItem::Recipe(name) => Some(name.clone()),
                RunListItem::Role(_) => None,
            })
            .collect()
    }

    /// Roles named directly in the run list.
    pub fn role_names(&self) -> Vec<String> {
        self.run_list
            .iter()
            .filter_map(|item| match item {
                RunListItem::Role(name) => Some(name.clone()),
                RunListItem::Recipe(_) => None,
            })
            .collect()
    }

    /// Merged attributes at the top level, then the node's own keys.
    ///
    /// The raw `automatic`/`normal`/`default`/`override` sections are also
    /// exposed (`automatic.hostname`) unless a merged attribute already owns
    /// that key.
    pub fn search_view(&self) -> Value {
        let mut view = self.merged_attributes();

        for (key, layer) in [
            ("default", AttributeLayer::Default),
            ("normal", AttributeLayer::Normal),
            ("override", AttributeLayer::Override),
            ("automatic", AttributeLayer::Automatic),
        ] {
            if view.contains_key(key) {
                continue;
            }
            if let Some(section) = self.layer(layer) {
                view.insert(key.to_string(), Value::Object(section.clone()));
            }
        }

        view.insert("name".to_string(), Value::from(self.name.clone()));
        view.insert(
            "chef_environment".to_string(),
            Value::from(self.chef_environment.clone()),
        );
        view.insert("chef_type".to_string(), Value::from("node"));
        view.insert("json_class".to_string(), Value::from("Chef::Node"));
        view.insert(
            "run_list".to_string(),
            Value::from(
                self.run_list
                    .iter()
                    .map(|item| item.to_string())
                    .collect::<Vec<_>>(),
            ),
        );
        view.insert("recipe".to_string(), Value::from(self.recipe_names()));
        view.insert("role".to_string(), Value::from(self.role_names()));
        view.insert(
            "recipes".to_string(),
            Value::from(self.expanded_recipes.clone()),
        );
        view.insert("roles".to_string(), Value::from(self.expanded_roles.clone()));
        Value::Object(view)
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// A role definition, from either role encoding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub run_list: Vec<String>,
    #[serde(default)]
    pub env_run_lists: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub default_attributes: Map<String, Value>,
    #[serde(default)]
    pub override_attributes: Map<String, Value>,
    /// Keys outside the role schema, kept searchable.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoleRecord {
    /// Run list for an environment, falling back to the default run list.
    pub fn run_list_for(&self, environment: &str) -> &[String] {
        self.env_run_lists
            .get(environment)
            .map(Vec::as_slice)
            .unwrap_or(self.run_list.as_slice())
    }

    pub fn search_view(&self) -> Value {
        let mut view = self.extra.clone();
        view.insert("name".to_string(), Value::from(self.name.clone()));
        view.insert(
            "description".to_string(),
            Value::from(self.description.clone()),
        );
        view.insert("run_list".to_string(), Value::from(self.run_list.clone()));
        view.insert(
            "env_run_lists".to_string(),
            Value::Object(
                self.env_run_lists
                    .iter()
                    .map(|(env, list)| (env.clone(), Value::from(list.clone())))
                    .collect(),
            ),
        );
        view.insert(
            "default_attributes".to_string(),
            Value::Object(self.default_attributes.clone()),
        );
        view.insert(
            "override_attributes".to_string(),
            Value::Object(self.override_attributes.clone()),
        );
        view.insert("chef_type".to_string(), Value::from("role"));
        view.insert("json_class".to_string(), Value::from("Chef::Role"));
        Value::Object(view)
    }
}

// ---------------------------------------------------------------------------
// Bag items
// ---------------------------------------------------------------------------

/// One item of a named bag; its mapping is searched as stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BagItem {
    pub bag: String,
    pub id: String,
    pub raw: Map<String, Value>,
}

impl BagItem {
    pub fn search_view(&self) -> Value {
        Value::Object(self.raw.clone())
    }
}
