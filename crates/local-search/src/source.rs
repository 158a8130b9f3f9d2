//! Document sources: where candidate records come from.
//!
//! A source only enumerates stored records and hands back their raw text plus
//! the encoding it was stored in. Decoding, and deciding whether an encoding is
//! acceptable, is left to the collection providers.

mod directory;
mod memory;

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;

pub use directory::DirectorySource;
pub use memory::MemorySource;

/// Encoding of a stored record, as reported by its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFormat {
    /// Declarative JSON data.
    Json,
    /// Role definition written in the role DSL (`.rb`).
    RoleDsl,
    /// Anything else, carrying the extension or format label.
    Other(String),
}

impl RecordFormat {
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "json" => Self::Json,
            "rb" => Self::RoleDsl,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Json => "json",
            Self::RoleDsl => "rb",
            Self::Other(label) => label.as_str(),
        }
    }
}

/// One stored record, undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Identity used by the source (file stem, item id).
    pub id: String,
    pub format: RecordFormat,
    pub contents: String,
}

impl StoredRecord {
    pub fn new(id: impl Into<String>, format: RecordFormat, contents: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            format,
            contents: contents.into(),
        }
    }

    pub fn json(id: impl Into<String>, value: &Value) -> Self {
        Self::new(id, RecordFormat::Json, value.to_string())
    }
}

/// Enumerates stored records per collection.
///
/// Listing order must be stable between calls; search results follow it.
pub trait DocumentSource: Send + Sync {
    fn list_nodes(&self) -> Result<Vec<StoredRecord>>;

    fn list_roles(&self) -> Result<Vec<StoredRecord>>;

    /// Items of the named bag. Fails with `BagNotFound` if the bag does not exist.
    fn list_bag_items(&self, bag: &str) -> Result<Vec<StoredRecord>>;

    /// Looks up a single role by id; the first listed match wins.
    fn find_role(&self, name: &str) -> Result<Option<StoredRecord>> {
        Ok(self
            .list_roles()?
            .into_iter()
            .find(|record| record.id == name))
    }
}

pub type SharedSource = Arc<dyn DocumentSource>;
