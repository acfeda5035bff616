//! Query planning and execution for product questions.
//!
//! A query is analyzed into an intent and parameters, mapped to a plan of
//! graph and vector retrieval stages, executed with bounded concurrency,
//! and the stage results are deduplicated, budgeted and formatted.

/// Activation, intent classification and slot extraction
pub mod analyzer;
/// Deduplication and result budgeting
pub mod combiner;
/// Engine configuration and TOML loading
pub mod config;
/// End-to-end planning engine
pub mod engine;
/// Routing errors
pub mod error;
/// Concurrent plan execution
pub mod executor;
/// Intent-specific result shaping
pub mod formatter;
/// Plan generation per intent
pub mod planner;
/// Shared routing types
pub mod types;

pub use analyzer::{
    ActivationDetector, CueTable, ParameterExtractor, QueryAnalysis, QueryAnalyzer,
    QueryClassifier,
};
pub use combiner::{ResultCombiner, record_units};
pub use config::{BudgetConfig, CategoryLexicon, EngineConfig, ExecutionConfig, RetrievalConfig};
pub use engine::PlanningEngine;
pub use error::{Result, RoutingError};
pub use executor::{PlanExecutor, StageGraph};
pub use formatter::{ComparisonEntry, FormattedResult, ResultFormatter};
pub use planner::{Plan, PlanGenerator, PlanStage, StageQuery};
pub use types::{
    BackendKind, CombinedRecord, CombinedResult, ExtractedParameters, Intent, StageFailure,
    StageId, StageResult, StageStatus,
};
