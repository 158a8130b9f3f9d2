//! Local, in-memory search over node, role, and bag records.
//!
//! This crate provides:
//! - A parser and matcher for a small Lucene-like query language
//! - Flattening of nested records into dotted field paths
//! - Collection providers that decode and normalize stored records
//! - A search entry point with `start`/`rows` windowing
//!
//! Every search lists and scans its collection in full; there is no index.

pub mod config;
pub mod document;
pub mod error;
pub mod flatten;
pub mod merge;
pub mod provider;
pub mod query;
pub mod run_list;
pub mod search;
pub mod source;

// Re-export main types
pub use config::SourceConfig;
pub use document::{BagItem, Document, NodeRecord, RoleRecord};
pub use error::{Result, SearchError};
pub use flatten::{flatten, FlatView};
pub use merge::{merge_attributes, AttributeLayer};
pub use provider::CollectionProvider;
pub use query::{parse_query, QueryExpression, QueryMatcher, QueryParser};
pub use run_list::RunListItem;
pub use search::{Collection, SearchRequest, SearchResults, Searcher, DEFAULT_ROWS, DEFAULT_START};
pub use source::{DirectorySource, DocumentSource, MemorySource, SharedSource, StoredRecord};
