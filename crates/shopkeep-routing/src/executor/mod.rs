//! Plan execution: stage dependency graph and the concurrent executor.

/// Stage dependency graph
pub mod graph;
/// Concurrent stage executor
pub mod pool;

pub use graph::StageGraph;
pub use pool::PlanExecutor;
