//! Request Dispatch Module
//!
//! Scatter half of the scatter-gather engine: one logical request is sent to every node
//! concurrently and the per-node outcomes are joined back in node-list order.
//!
//! ## Guarantees
//! - **Ordering**: Results follow the configured node order, never completion order, so every
//!   merge downstream is deterministic.
//! - **Forward progress**: Each node yields exactly one terminal outcome (payload or failure).
//!   The outbound client's request timeout bounds how long any node can hold the join.
//! - **Partial failure**: A failing node is reported in its own slot; it never aborts the others.

pub mod dispatcher;
pub mod types;
