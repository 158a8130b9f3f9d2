//! Query parsing, normalization, and matching.
//!
//! This module provides the restricted Lucene-style query language:
//! - Expression types (AND, OR, NOT, field terms, match-all)
//! - Query parsing and tokenization
//! - Normalization (flattening, reordering by cost)
//! - Matching against a flattened record

mod expression;
mod matcher;
mod optimizer;
mod parser;
mod wildcard;

pub use expression::{QueryExpression, QueryField, QueryTerm, QueryValue, StringRange};
pub use matcher::{matches, QueryMatcher};
pub use optimizer::optimize_expression;
pub use parser::QueryParser;
pub use wildcard::{GlobPattern, GlobToken};

use crate::error::Result;

/// Parses and normalizes query text. `None` or blank text is match-all.
pub fn parse_query(text: Option<&str>) -> Result<QueryExpression> {
    QueryMatcher::compile(text).map(|matcher| matcher.expression().clone())
}
