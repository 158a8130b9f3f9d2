//! Storage layout for the directory-backed document source.
//!
//! [`SourceConfig::load`] reads a JSON file such as
//!
//! ```json
//! { "data_bag_path": "/srv/kitchen/data_bags", "role_path": "/srv/kitchen/roles" }
//! ```
//!
//! and fills any missing key with the built-in defaults. The config is handed
//! to [`DirectorySource`](crate::source::DirectorySource) explicitly; nothing
//! in this crate reads process-wide settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SearchError};

pub const DEFAULT_DATA_BAG_PATH: &str = "data_bags";
pub const DEFAULT_ROLE_PATH: &str = "roles";

/// Name of the data bag directory that holds node records.
pub const NODE_BAG_NAME: &str = "node";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_data_bag_path")]
    pub data_bag_path: PathBuf,
    #[serde(default = "default_role_path")]
    pub role_path: PathBuf,
    /// Overrides `<data_bag_path>/node` as the node record directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_path: Option<PathBuf>,
}

fn default_data_bag_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_BAG_PATH)
}

fn default_role_path() -> PathBuf {
    PathBuf::from(DEFAULT_ROLE_PATH)
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl SourceConfig {
    /// Returns the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        Self {
            data_bag_path: default_data_bag_path(),
            role_path: default_role_path(),
            node_path: None,
        }
    }

    /// Lays out every collection below a single repository root.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_bag_path: root.join(DEFAULT_DATA_BAG_PATH),
            role_path: root.join(DEFAULT_ROLE_PATH),
            node_path: None,
        }
    }

    /// Loads a JSON config file, layering it on top of the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(SearchError::PathNotFound(path.to_path_buf()))
            }
            Err(error) => return Err(error.into()),
        };
        serde_json::from_slice(&bytes).map_err(|error| {
            SearchError::Config(format!("failed to parse {}: {error}", path.display()))
        })
    }

    pub fn node_path(&self) -> PathBuf {
        self.node_path
            .clone()
            .unwrap_or_else(|| self.data_bag_path.join(NODE_BAG_NAME))
    }
}
