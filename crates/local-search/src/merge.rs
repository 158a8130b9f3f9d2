//! Attribute precedence merge for node records.

use serde_json::{Map, Value};

/// Attribute layers of a node, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeLayer {
    Default,
    RoleDefault,
    Normal,
    Override,
    RoleOverride,
    Automatic,
}

impl AttributeLayer {
    pub const ALL: [AttributeLayer; 6] = [
        AttributeLayer::Default,
        AttributeLayer::RoleDefault,
        AttributeLayer::Normal,
        AttributeLayer::Override,
        AttributeLayer::RoleOverride,
        AttributeLayer::Automatic,
    ];
}

/// Merges attribute mappings given in ascending precedence order.
///
/// Mappings merge key by key; any other value from a higher layer replaces
/// whatever the lower layers held at that key. The inputs are left untouched.
pub fn merge_attributes<'a, I>(layers: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut merged = Map::new();
    for layer in layers {
        deep_merge_into(&mut merged, layer);
    }
    merged
}

fn deep_merge_into(target: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) =
            (target.get_mut(key), value)
        {
            deep_merge_into(existing, incoming);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}
