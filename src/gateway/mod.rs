//! Federation Gateway Module
//!
//! The client-facing HTTP surface. Clients talk to the gateway exactly as they would talk
//! to a single search cluster; each request is classified, fanned out to every node and
//! answered with one merged document.
//!
//! ## Request Pipeline
//! 1. **Classify**: `(method, path)` selects a [`routes::Route`]; unknown requests get a 404.
//! 2. **Rewrite**: Search bodies are rewritten per node (tag names to ids, pagination).
//! 3. **Dispatch**: Concurrent fan-out; failing nodes are dropped from the merge.
//! 4. **Resolve**: Facet tag ids in node results are mapped back to names.
//! 5. **Merge**: The route's merge strategy builds the response.
//!
//! ## Submodules
//! - **`routes`**: Pure route classification.
//! - **`service`**: The [`service::Gateway`] orchestrator.
//! - **`msearch`**: Multi-search batch framing and position-wise merging.
//! - **`handlers`**: The axum router and its single fallback handler.

pub mod handlers;
pub mod msearch;
pub mod routes;
pub mod service;
