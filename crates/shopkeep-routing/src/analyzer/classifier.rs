use super::patterns::{CueTable, PRECEDENCE};
use crate::types::Intent;
use std::sync::Arc;

/// Assigns an active query to exactly one intent.
///
/// Families are tried in [`PRECEDENCE`] order and the first match wins, so
/// overlapping cues resolve the same way regardless of where they appear
/// in the text.
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    cues: Arc<CueTable>,
}

impl QueryClassifier {
    /// Classifier over a shared cue table.
    pub fn new(cues: Arc<CueTable>) -> Self {
        Self { cues }
    }

    /// Classifies `query`, returning [`Intent::Simple`] when no family matches.
    pub fn classify(&self, query: &str) -> Intent {
        PRECEDENCE
            .into_iter()
            .find(|intent| self.cues.matches(*intent, query))
            .unwrap_or(Intent::Simple)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "Test code is allowed to use expect")]
mod tests {
    use super::*;

    fn classifier() -> QueryClassifier {
        QueryClassifier::new(Arc::new(CueTable::compile().expect("cue table failed to compile")))
    }

    #[test]
    fn test_single_family_queries() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("comparar Nike Air Zoom vs Adidas Ultraboost"),
            Intent::Comparison
        );
        assert_eq!(
            classifier.classify("productos similares al Metcon 9"),
            Intent::Similarity
        );
        assert_eq!(
            classifier.classify("algo más barato que el Metcon 9"),
            Intent::PriceComparison
        );
        assert_eq!(
            classifier.classify("lo mejor para correr en montaña"),
            Intent::Recommendation
        );
    }

    #[test]
    fn test_price_cue_beats_similarity_cue() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("similar to the Metcon 9 but cheaper"),
            Intent::PriceComparison
        );
        assert_eq!(
            classifier.classify("alternativas al Metcon 9 pero más baratas"),
            Intent::PriceComparison
        );
    }

    #[test]
    fn test_comparison_beats_similarity_and_recommendation() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("compare Pegasus 40 vs something similar to the Nano X3"),
            Intent::Comparison
        );
        assert_eq!(
            classifier.classify("cuál es mejor para correr, Pegasus 40 vs Nano X3"),
            Intent::Comparison
        );
    }

    #[test]
    fn test_no_cue_is_simple() {
        assert_eq!(classifier().classify("zapatillas rojas"), Intent::Simple);
    }
}
