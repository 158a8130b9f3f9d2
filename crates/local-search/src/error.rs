use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("Unsupported option: {0}")]
    UnsupportedOption(String),

    #[error("Malformed record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Bag not found: {0}")]
    BagNotFound(String),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Config error: {0}")]
    Config(String),
}

impl SearchError {
    pub(crate) fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn query(message: impl Into<String>) -> Self {
        Self::UnsupportedQuery(message.into())
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
