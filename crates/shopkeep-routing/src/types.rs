use crate::error::RoutingError;
use serde::{Deserialize, Serialize};
use shopkeep_core::{Product, ScoredProduct};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Classified purpose of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Side-by-side attributes of two named products
    Comparison,
    /// Products like a reference product
    Similarity,
    /// Products cheaper than a reference product
    PriceComparison,
    /// Products suited to a use case
    Recommendation,
    /// Anything else, answered by a single semantic lookup
    Simple,
}

impl Intent {
    /// Lowercase snake-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Comparison => "comparison",
            Self::Similarity => "similarity",
            Self::PriceComparison => "price_comparison",
            Self::Recommendation => "recommendation",
            Self::Simple => "simple",
        }
    }
}

impl Display for Intent {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = RoutingError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_lowercase().as_str() {
            "comparison" => Ok(Self::Comparison),
            "similarity" => Ok(Self::Similarity),
            "price_comparison" => Ok(Self::PriceComparison),
            "recommendation" => Ok(Self::Recommendation),
            "simple" => Ok(Self::Simple),
            other => Err(RoutingError::UnknownIntent(other.to_owned())),
        }
    }
}

/// Structured slots pulled out of the query text.
///
/// A `None` slot was not found in the query and means "unconstrained".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedParameters {
    /// Product the similarity or price query is anchored on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_product: Option<String>,
    /// The two products being compared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_targets: Option<(String, String)>,
    /// Upper price bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_ceiling: Option<f64>,
    /// Requested size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Lexicon category the query mentions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Intended use case the query mentions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_case: Option<String>,
}

impl ExtractedParameters {
    /// Whether no slot was filled.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Display for ExtractedParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut slots = Vec::new();
        if let Some(reference) = &self.reference_product {
            slots.push(format!("reference_product: {reference:?}"));
        }
        if let Some((first, second)) = &self.comparison_targets {
            slots.push(format!("comparison_targets: ({first:?}, {second:?})"));
        }
        if let Some(ceiling) = self.price_ceiling {
            slots.push(format!("price_ceiling: {ceiling}"));
        }
        if let Some(size) = &self.size {
            slots.push(format!("size: {size:?}"));
        }
        if let Some(category) = &self.category {
            slots.push(format!("category: {category:?}"));
        }
        if let Some(use_case) = &self.use_case {
            slots.push(format!("use_case: {use_case:?}"));
        }
        write!(f, "{{{}}}", slots.join(", "))
    }
}

/// Position of a stage within its plan, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(usize);

impl StageId {
    /// Stage id from its 1-based position.
    pub const fn new(number: usize) -> Self {
        Self(number)
    }

    /// The 1-based position.
    pub const fn number(self) -> usize {
        self.0
    }
}

impl Display for StageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "stage {}", self.0)
    }
}

/// Which backend answers a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Relationship lookups
    Graph,
    /// Semantic similarity search
    Vector,
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Graph => "graph",
            Self::Vector => "vector",
        })
    }
}

/// Why a stage produced no usable records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageFailure {
    /// The backend reported an error
    Backend {
        /// Backend error text
        message: String,
    },
    /// The backend call exceeded the stage timeout
    Timeout {
        /// Timeout that elapsed
        after_ms: u64,
    },
    /// The prerequisite stage failed or returned nothing
    DependencyUnmet {
        /// Stage this one waited on
        dependency: StageId,
    },
    /// The stage task panicked or was aborted before reporting
    Crashed {
        /// Panic or cancellation text
        message: String,
    },
}

impl Display for StageFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Backend { message } => f.write_str(message),
            Self::Timeout { after_ms } => write!(f, "timed out after {after_ms}ms"),
            Self::DependencyUnmet { .. } => f.write_str("dependency-unmet"),
            Self::Crashed { message } => write!(f, "crashed: {message}"),
        }
    }
}

/// Outcome of a single stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "failure", rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage completed
    Ok,
    /// Stage did not complete
    Failed(StageFailure),
}

impl StageStatus {
    /// Whether the stage completed.
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl Display for StageStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}

/// Records returned by one stage, plus how the stage went.
///
/// Graph records carry a score of `0.0`; only vector records are ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage that produced the result
    pub stage: StageId,
    /// Backend that answered
    pub backend: BackendKind,
    /// Human-readable stage summary, e.g. `lookup 'Nike Air Zoom'`
    pub description: String,
    /// Entity name or query text the stage was about
    pub subject: String,
    /// How the stage went
    pub status: StageStatus,
    /// Records, empty when failed
    pub records: Vec<ScoredProduct>,
    /// Whether the records came from the stage's fallback query
    pub used_fallback: bool,
    /// Wall time spent on the stage
    pub elapsed_ms: u64,
}

impl StageResult {
    /// OK with at least one record.
    pub fn has_records(&self) -> bool {
        self.status.is_ok() && !self.records.is_empty()
    }
}

/// A deduplicated record with the stages that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRecord {
    /// The merged record
    #[serde(flatten)]
    pub product: Product,
    /// Score from the first stage that produced the record
    pub score: f32,
    /// Contributing stages, in the order they were merged
    pub provenance: Vec<StageId>,
}

/// Merged output of every OK stage, bounded by the result budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    /// Kept records in merge order
    pub records: Vec<CombinedRecord>,
    /// Deduplicated records dropped from the tail by the budget
    pub omitted: usize,
    /// Budget units consumed by `records`
    pub units_used: usize,
}

impl CombinedResult {
    /// Whether no record was kept.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of kept records.
    pub fn len(&self) -> usize {
        self.records.len()
    }
}
