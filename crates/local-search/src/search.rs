//! Search entry points.
//!
//! This module provides:
//! - [`SearchRequest`] and [`Collection`] describing one search call
//! - [`Searcher`], which runs a request against a document source
//! - [`SearchResults`], the lazily produced window of matches

mod engine;
mod request;
mod results;

pub use engine::Searcher;
pub use request::{Collection, SearchRequest, DEFAULT_ROWS, DEFAULT_START};
pub use results::SearchResults;
