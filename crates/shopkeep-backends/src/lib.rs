//! Retrieval backend adapters for the product query planner.

/// In-memory product catalog answering both graph and semantic queries.
pub mod memory;
/// Scripted backend for tests and benchmarks.
pub mod mock;
/// Neo4j graph adapter over the HTTP transactional endpoint.
pub mod neo4j;

pub use memory::InMemoryCatalog;
pub use mock::{MockBackend, MockReply};
pub use neo4j::{Neo4jConfig, Neo4jHttpBackend};
