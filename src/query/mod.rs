//! Query Rewriting Module
//!
//! Translates between the client's view of tags (human-readable names) and each backend's
//! view (compact numeric ids).
//!
//! ## Responsibilities
//! - **Search Spec**: Extracting declared facets, sort keys and the `from`/`size` window
//!   from a client query.
//! - **Rewriting**: Per node, normalizing pagination and replacing tag names with that
//!   node's ids, expanding wildcard patterns into explicit id lists.
//! - **Resolution**: Per node result, mapping facet ids back to names so facets can be
//!   merged across nodes.
//!
//! ## Submodules
//! - **`types`**: Search Spec, sort keys and the table of tag-bearing fields.
//! - **`rewriter`**: Outbound query rewriting.
//! - **`resolver`**: Inbound facet id resolution.

pub mod resolver;
pub mod rewriter;
pub mod types;

#[cfg(test)]
mod tests;
