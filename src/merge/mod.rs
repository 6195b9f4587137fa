//! Result Merge Module
//!
//! Gather half of the scatter-gather engine: combines the per-node payloads of one
//! dispatch into the single response a client expects from one cluster.
//!
//! ## Strategies
//! - **Shallow merge**: node/cluster stats listings.
//! - **Numeric summation**: cluster health, relabelled as the combined cluster.
//! - **Per-index doc counts**: index status.
//! - **Min-by-version / first-existing**: version probe and direct document lookups.
//! - **De-duplication by id**: auto-complete style tag and field listings.
//! - **Hit/facet merge**: general search, followed by a global sort and window.
//!
//! ## Submodules
//! - **`strategies`**: The simple per-endpoint strategies.
//! - **`facets`**: Terms/histogram facet accumulators.
//! - **`hits`**: The search merge (totals, hits, facets).
//! - **`sort`**: Multi-key hit ordering and pagination.

pub mod facets;
pub mod hits;
pub mod sort;
pub mod strategies;
