//! Directory-backed document source.
//!
//! Layout, relative to a [`SourceConfig`]:
//! - nodes: `<node_path>/*.json`
//! - roles: `<role_path>/*.json` and `<role_path>/*.rb`
//! - bags: `<data_bag_path>/<bag>/*.json`

use std::path::{Path, PathBuf};

use crate::config::SourceConfig;
use crate::error::{Result, SearchError};

use super::{DocumentSource, RecordFormat, StoredRecord};

const ROLE_EXTENSIONS: &[&str] = &["json", "rb"];
const JSON_EXTENSIONS: &[&str] = &["json"];

#[derive(Debug, Clone)]
pub struct DirectorySource {
    config: SourceConfig,
}

impl DirectorySource {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn bag_path(&self, bag: &str) -> Result<PathBuf> {
        validate_bag_name(bag)?;
        Ok(self.config.data_bag_path.join(bag))
    }
}

impl DocumentSource for DirectorySource {
    fn list_nodes(&self) -> Result<Vec<StoredRecord>> {
        read_records(&self.config.node_path(), JSON_EXTENSIONS)
    }

    fn list_roles(&self) -> Result<Vec<StoredRecord>> {
        read_records(&self.config.role_path, ROLE_EXTENSIONS)
    }

    fn list_bag_items(&self, bag: &str) -> Result<Vec<StoredRecord>> {
        let path = self.bag_path(bag)?;
        if !path.is_dir() {
            return Err(SearchError::BagNotFound(bag.to_string()));
        }
        read_records(&path, JSON_EXTENSIONS)
    }
}

fn validate_bag_name(bag: &str) -> Result<()> {
    if bag.is_empty() || bag == "." || bag == ".." || bag.contains(['/', '\\']) {
        return Err(SearchError::BagNotFound(bag.to_string()));
    }
    Ok(())
}

/// Reads every record file with an accepted extension, sorted by file name.
///
/// A missing directory is an empty collection.
fn read_records(dir: &Path, extensions: &[&str]) -> Result<Vec<StoredRecord>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("record directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(error) => return Err(error.into()),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                log::warn!("skipping unreadable entry in {}: {error}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        if extensions.contains(&extension) {
            paths.push(path);
        }
    }
    paths.sort();

    paths.iter().map(|path| read_record(path)).collect()
}

fn read_record(path: &Path) -> Result<StoredRecord> {
    let id = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(RecordFormat::from_extension)
        .unwrap_or_else(|| RecordFormat::Other(String::new()));

    let bytes = std::fs::read(path)?;
    let contents = String::from_utf8(bytes).map_err(|error| {
        SearchError::malformed(path.display().to_string(), format!("not UTF-8: {error}"))
    })?;

    Ok(StoredRecord {
        id,
        format,
        contents,
    })
}
