//! Node records: decoding, legacy normalization, and run-list expansion.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::{Map, Value};

use crate::document::{Document, NodeRecord, RoleRecord, DEFAULT_ENVIRONMENT};
use crate::error::{Result, SearchError};
use crate::merge::{merge_attributes, AttributeLayer};
use crate::run_list::RunListItem;
use crate::source::{DocumentSource, RecordFormat, SharedSource, StoredRecord};

use super::role::decode_role;
use super::CollectionProvider;

pub struct NodeProvider {
    source: SharedSource,
}

impl NodeProvider {
    pub fn new(source: SharedSource) -> Self {
        Self { source }
    }
}

impl CollectionProvider for NodeProvider {
    fn list_candidates(&self) -> Result<Vec<Document>> {
        let records = self.source.list_nodes()?;
        log::debug!("decoding {} node records", records.len());
        let mut expander = RoleExpander::new(self.source.as_ref());
        records
            .iter()
            .map(|record| decode_node(record, &mut expander).map(Document::Node))
            .collect()
    }
}

/// Decodes one stored node and expands its run list.
pub fn decode_node(record: &StoredRecord, expander: &mut RoleExpander<'_>) -> Result<NodeRecord> {
    let id = record.id.as_str();
    if record.format != RecordFormat::Json {
        return Err(SearchError::UnsupportedEncoding(format!(
            "node {id}: only .json nodes are supported, got '{}'",
            record.format.label()
        )));
    }

    let value: Value = serde_json::from_str(&record.contents)
        .map_err(|error| SearchError::malformed(id, error.to_string()))?;
    let Value::Object(mut raw) = value else {
        return Err(SearchError::malformed(id, "node is not a mapping"));
    };

    relocate_hostname(id, &mut raw)?;

    let mut attributes = BTreeMap::new();
    let legacy_normal = take_layer(id, &mut raw, "attributes")?;
    let layers = [
        ("default", AttributeLayer::Default),
        ("normal", AttributeLayer::Normal),
        ("override", AttributeLayer::Override),
        ("automatic", AttributeLayer::Automatic),
    ];
    for (key, layer) in layers {
        if let Some(section) = take_layer(id, &mut raw, key)? {
            attributes.insert(layer, section);
        }
    }
    if let Some(section) = legacy_normal {
        attributes.entry(AttributeLayer::Normal).or_insert(section);
    }

    let hostname = attributes
        .get(&AttributeLayer::Automatic)
        .and_then(|automatic| automatic.get("hostname"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let name = match optional_string(id, &raw, "name")? {
        Some(name) if !name.is_empty() => name,
        _ => hostname
            .ok_or_else(|| SearchError::malformed(id, "node has neither a name nor a hostname"))?,
    };
    let chef_environment = optional_string(id, &raw, "chef_environment")?
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

    let run_list = read_run_list(id, &raw)?;
    let expansion = expander.expand(&run_list, &chef_environment)?;
    if !expansion.role_default.is_empty() {
        attributes.insert(AttributeLayer::RoleDefault, expansion.role_default);
    }
    if !expansion.role_override.is_empty() {
        attributes.insert(AttributeLayer::RoleOverride, expansion.role_override);
    }

    Ok(NodeRecord {
        name,
        chef_environment,
        run_list,
        attributes,
        expanded_recipes: expansion.recipes,
        expanded_roles: expansion.roles,
    })
}

/// A top-level `hostname` belongs in the automatic attributes.
fn relocate_hostname(id: &str, raw: &mut Map<String, Value>) -> Result<()> {
    let Some(hostname) = raw.remove("hostname") else {
        return Ok(());
    };
    let automatic = raw
        .entry("automatic")
        .or_insert_with(|| Value::Object(Map::new()));
    if automatic.is_null() {
        *automatic = Value::Object(Map::new());
    }
    let Value::Object(automatic) = automatic else {
        return Err(SearchError::malformed(id, "'automatic' is not a mapping"));
    };
    automatic.insert("hostname".to_string(), hostname);
    Ok(())
}

fn take_layer(
    id: &str,
    raw: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<Map<String, Value>>> {
    match raw.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(section)) => Ok(Some(section)),
        Some(_) => Err(SearchError::malformed(id, format!("'{key}' is not a mapping"))),
    }
}

fn optional_string(id: &str, raw: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(SearchError::malformed(id, format!("'{key}' is not a string"))),
    }
}

/// `run_list` when present, otherwise the legacy `recipes` list.
fn read_run_list(id: &str, raw: &Map<String, Value>) -> Result<Vec<RunListItem>> {
    let key = if raw.contains_key("run_list") {
        "run_list"
    } else {
        "recipes"
    };
    let entries = match raw.get(key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(SearchError::malformed(id, format!("'{key}' is not a list")));
        }
    };

    entries
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .and_then(RunListItem::parse)
                .ok_or_else(|| {
                    SearchError::malformed(id, format!("invalid run list entry {entry}"))
                })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Run-list expansion
// ---------------------------------------------------------------------------

/// Recipes and roles reached from a run list, plus the attributes its roles
/// contribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunListExpansion {
    pub recipes: Vec<String>,
    pub roles: Vec<String>,
    pub role_default: Map<String, Value>,
    pub role_override: Map<String, Value>,
}

/// Expands `role[...]` entries against the role source.
///
/// Roles are looked up at most once per expander, so one expander can be
/// shared across a whole node listing.
pub struct RoleExpander<'a> {
    source: &'a dyn DocumentSource,
    cache: HashMap<String, Option<RoleRecord>>,
}

impl<'a> RoleExpander<'a> {
    pub fn new(source: &'a dyn DocumentSource) -> Self {
        Self {
            source,
            cache: HashMap::new(),
        }
    }

    /// Depth-first, in run-list order. Each role is visited once, so cycles
    /// terminate; roles missing from the source are skipped.
    pub fn expand(&mut self, run_list: &[RunListItem], environment: &str) -> Result<RunListExpansion> {
        let mut expansion = RunListExpansion::default();
        let mut visited = HashSet::new();
        self.expand_items(run_list, environment, &mut visited, &mut expansion)?;
        Ok(expansion)
    }

    fn expand_items(
        &mut self,
        items: &[RunListItem],
        environment: &str,
        visited: &mut HashSet<String>,
        expansion: &mut RunListExpansion,
    ) -> Result<()> {
        for item in items {
            let name = match item {
                RunListItem::Recipe(recipe) => {
                    if !expansion.recipes.contains(recipe) {
                        expansion.recipes.push(recipe.clone());
                    }
                    continue;
                }
                RunListItem::Role(name) => name,
            };
            if !visited.insert(name.clone()) {
                continue;
            }
            let Some(role) = self.load(name)? else {
                log::warn!("role '{name}' not found, skipping it during run list expansion");
                continue;
            };

            expansion.roles.push(name.clone());
            expansion.role_default =
                merge_attributes([&expansion.role_default, &role.default_attributes]);
            expansion.role_override =
                merge_attributes([&expansion.role_override, &role.override_attributes]);

            let nested = role
                .run_list_for(environment)
                .iter()
                .filter_map(|entry| {
                    let parsed = RunListItem::parse(entry);
                    if parsed.is_none() {
                        log::warn!("role '{name}' has invalid run list entry '{entry}'");
                    }
                    parsed
                })
                .collect::<Vec<_>>();
            self.expand_items(&nested, environment, visited, expansion)?;
        }
        Ok(())
    }

    fn load(&mut self, name: &str) -> Result<Option<RoleRecord>> {
        if let Some(cached) = self.cache.get(name) {
            return Ok(cached.clone());
        }
        let role = match self.source.find_role(name)? {
            Some(record) => Some(decode_role(&record)?),
            None => None,
        };
        self.cache.insert(name.to_string(), role.clone());
        Ok(role)
    }
}
