//! Federated Search Gateway Library
//!
//! A scatter-gather front end that makes several independent search clusters look like
//! one. It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The gateway is composed of loosely coupled stages:
//!
//! - **`cluster`**: The fixed, ordered node list, the per-node HTTP transport and each
//!   node's tag directory (name <-> numeric id cache).
//! - **`query`**: Client query analysis (facets, sort, window) and the per-node rewrite of
//!   tag names into ids, plus the reverse mapping of ids found in facet results.
//! - **`dispatch`**: Concurrent fan-out of one request to every node, joined in node order
//!   with an explicit per-node outcome.
//! - **`merge`**: Endpoint merge strategies, facet accumulation and the global
//!   sort/paginate step.
//! - **`gateway`**: The HTTP surface: route classification, orchestration and the axum router.
//! - **`config`**: Startup flags and environment fallbacks.
//! - **`error`**: The shared [`error::GatewayError`] type.

pub mod cluster;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod merge;
pub mod query;
