//! Collection providers turn stored records into searchable documents.
//!
//! Each provider holds an explicit source handle and lists every candidate of
//! its collection, decoded and normalized, in source order.

mod bag;
mod node;
mod role;
mod role_dsl;

use crate::document::Document;
use crate::error::Result;

pub use bag::BagProvider;
pub use node::{decode_node, NodeProvider, RoleExpander, RunListExpansion};
pub use role::{decode_role, RoleProvider};
pub use role_dsl::read_role_dsl;

pub trait CollectionProvider: Send + Sync {
    /// Every candidate document in listing order.
    ///
    /// A record that cannot be decoded fails the whole listing.
    fn list_candidates(&self) -> Result<Vec<Document>>;
}
