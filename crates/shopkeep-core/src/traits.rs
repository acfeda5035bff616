use async_trait::async_trait;

use crate::{Product, RelationshipQuery, Result, ScoredProduct, SemanticQuery};

/// Symbolic relationship store (products, categories and their relations).
///
/// Implementations are long-lived handles shared by concurrent requests, so
/// they must be safe to call from many tasks at once.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Returns a short identifier for logs.
    fn name(&self) -> &'static str;

    /// Executes a relation-typed lookup.
    ///
    /// # Errors
    ///
    /// Returns an error only when the backend itself cannot answer. No
    /// matching products is `Ok(vec![])`.
    async fn execute_relationship_query(&self, query: &RelationshipQuery) -> Result<Vec<Product>>;
}

/// Semantic similarity store answering free-text ranked lookups.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Returns a short identifier for logs.
    fn name(&self) -> &'static str;

    /// Ranks products against `query.text`, honouring the structured filters.
    ///
    /// # Errors
    ///
    /// Returns an error only when the backend itself cannot answer. No
    /// matching products is `Ok(vec![])`.
    async fn execute_semantic_query(&self, query: &SemanticQuery) -> Result<Vec<ScoredProduct>>;
}
