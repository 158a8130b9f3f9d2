use crate::document::{Document, RoleRecord};
use crate::error::{Result, SearchError};
use crate::source::{RecordFormat, SharedSource, StoredRecord};

use super::role_dsl::read_role_dsl;
use super::CollectionProvider;

pub struct RoleProvider {
    source: SharedSource,
}

impl RoleProvider {
    pub fn new(source: SharedSource) -> Self {
        Self { source }
    }
}

impl CollectionProvider for RoleProvider {
    fn list_candidates(&self) -> Result<Vec<Document>> {
        let records = self.source.list_roles()?;
        log::debug!("decoding {} role records", records.len());
        records
            .iter()
            .map(|record| decode_role(record).map(Document::Role))
            .collect()
    }
}

/// Decodes a stored role from either role encoding.
///
/// A role without a name takes the record id.
pub fn decode_role(record: &StoredRecord) -> Result<RoleRecord> {
    let mut role = match &record.format {
        RecordFormat::Json => serde_json::from_str::<RoleRecord>(&record.contents)
            .map_err(|error| SearchError::malformed(&record.id, error.to_string()))?,
        RecordFormat::RoleDsl => read_role_dsl(&record.id, &record.contents)?,
        RecordFormat::Other(label) => {
            return Err(SearchError::UnsupportedEncoding(format!(
                "role {}: only .json and .rb roles are supported, got '{label}'",
                record.id
            )));
        }
    };
    if role.name.is_empty() {
        role.name = record.id.clone();
    }
    Ok(role)
}
