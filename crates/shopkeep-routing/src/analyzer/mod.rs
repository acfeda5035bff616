//! Query analysis: activation, classification and parameter extraction.
//!
//! All three stages share one compiled [`CueTable`], so activation and
//! classification can never disagree about which cues exist.

/// Activation detection (plan or direct lookup)
pub mod activation;
/// Intent classification under a fixed precedence
pub mod classifier;
/// Structured slot extraction
pub mod extract;
/// Cue tables and auxiliary patterns
pub mod patterns;

use crate::config::CategoryLexicon;
use crate::error::Result;
use crate::types::{ExtractedParameters, Intent};
use serde::Serialize;
use std::sync::Arc;

pub use activation::ActivationDetector;
pub use classifier::QueryClassifier;
pub use extract::ParameterExtractor;
pub use patterns::{CueFamily, CueTable, PRECEDENCE};

/// What the analyzer learned about a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnalysis {
    /// Whether the query needs a multi-stage plan
    pub active: bool,
    /// Classified intent, `simple` when inactive
    pub intent: Intent,
    /// Slots extracted for the intent
    pub parameters: ExtractedParameters,
}

/// Runs activation, then classification and extraction for active queries.
#[derive(Debug, Clone)]
pub struct QueryAnalyzer {
    detector: ActivationDetector,
    classifier: QueryClassifier,
    extractor: ParameterExtractor,
}

impl QueryAnalyzer {
    /// Compiles the cue tables and builds the three analysis stages.
    ///
    /// # Errors
    /// Returns an error if a pattern fails to compile
    pub fn new(lexicon: CategoryLexicon) -> Result<Self> {
        let cues = Arc::new(CueTable::compile()?);
        Ok(Self {
            detector: ActivationDetector::new(Arc::clone(&cues)),
            classifier: QueryClassifier::new(Arc::clone(&cues)),
            extractor: ParameterExtractor::new(cues, lexicon)?,
        })
    }

    /// Analyzes `query`. Inactive queries are `simple` with no parameters
    /// and are never classified.
    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        if !self.detector.needs_planning(query) {
            return QueryAnalysis {
                active: false,
                intent: Intent::Simple,
                parameters: ExtractedParameters::default(),
            };
        }

        let intent = self.classifier.classify(query);
        let parameters = self.extractor.extract(query, intent);
        tracing::debug!("Classified as {intent} with parameters {parameters}");

        QueryAnalysis {
            active: true,
            intent,
            parameters,
        }
    }

    /// Activation stage.
    pub fn detector(&self) -> &ActivationDetector {
        &self.detector
    }

    /// Classification stage.
    pub fn classifier(&self) -> &QueryClassifier {
        &self.classifier
    }

    /// Extraction stage.
    pub fn extractor(&self) -> &ParameterExtractor {
        &self.extractor
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "Test code is allowed to use expect")]
mod tests {
    use super::*;

    fn analyzer() -> QueryAnalyzer {
        QueryAnalyzer::new(CategoryLexicon::default()).expect("analyzer failed to build")
    }

    #[test]
    fn test_inactive_query_is_simple_without_parameters() {
        let analysis = analyzer().analyze("zapatillas rojas talla 42");
        assert!(!analysis.active);
        assert_eq!(analysis.intent, Intent::Simple);
        assert!(analysis.parameters.is_empty());
    }

    #[test]
    fn test_ordinary_like_sentence_stays_simple() {
        let analysis = analyzer().analyze("I would like running shoes but in red");
        assert!(!analysis.active);
        assert_eq!(analysis.intent, Intent::Simple);
    }

    #[test]
    fn test_comma_led_comparison_targets() {
        let analysis = analyzer().analyze("cuál es mejor para correr, Pegasus 40 vs Nano X3");
        assert_eq!(analysis.intent, Intent::Comparison);
        assert_eq!(
            analysis.parameters.comparison_targets,
            Some(("Pegasus 40".to_owned(), "Nano X3".to_owned()))
        );
    }

    #[test]
    fn test_active_query_end_to_end() {
        let analysis = analyzer().analyze("alternativas más baratas que el Metcon 9 en talla 42");
        assert!(analysis.active);
        assert_eq!(analysis.intent, Intent::PriceComparison);
        assert_eq!(analysis.parameters.reference_product.as_deref(), Some("Metcon 9"));
        assert_eq!(analysis.parameters.size.as_deref(), Some("42"));
    }
}
