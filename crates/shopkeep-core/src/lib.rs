//! Core types and traits for the product query planner.
//!
//! This crate provides the structured product records returned by the
//! retrieval backends, the query descriptors sent to them, the backend
//! traits themselves, and the shared error type.

/// Error types and result definitions.
pub mod error;
/// Query descriptors and record filters understood by the backends.
pub mod query;
/// Trait definitions for the graph and vector retrieval backends.
pub mod traits;
/// Product record types.
pub mod types;

pub use error::{Error, Result};
pub use query::{
    Entity, RecordFilters, RelationKind, RelationshipQuery, ResultOrdering, SemanticQuery,
    size_number,
};
pub use traits::{GraphBackend, VectorBackend};
pub use types::{CategoryRef, Product, ProductId, ScoredProduct, StockStatus};
