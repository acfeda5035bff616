use super::patterns::CueTable;
use std::sync::Arc;

/// Decides whether a query needs a multi-stage plan.
///
/// A query is active when any cue family matches. Inactive queries are
/// answered by the direct semantic path and never reach the classifier.
#[derive(Debug, Clone)]
pub struct ActivationDetector {
    cues: Arc<CueTable>,
}

impl ActivationDetector {
    /// Detector over a shared cue table.
    pub fn new(cues: Arc<CueTable>) -> Self {
        Self { cues }
    }

    /// Whether `query` matches any similarity, comparison, price or
    /// recommendation cue.
    pub fn needs_planning(&self, query: &str) -> bool {
        self.cues.any_match(query)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "Test code is allowed to use expect")]
mod tests {
    use super::*;

    fn detector() -> ActivationDetector {
        ActivationDetector::new(Arc::new(CueTable::compile().expect("cue table failed to compile")))
    }

    #[test]
    fn test_cue_queries_activate() {
        let detector = detector();
        for query in [
            "productos similares al Metcon 9",
            "comparar Nike Air Zoom vs Adidas Ultraboost",
            "alternativas más baratas que el Metcon 9 en talla 42",
            "¿qué me recomiendas para correr en montaña?",
            "which is better, Pegasus 40 or Nano X3",
            "something like the Pegasus but cheaper",
        ] {
            assert!(detector.needs_planning(query), "expected activation: {query}");
        }
    }

    #[test]
    fn test_plain_queries_stay_inactive() {
        let detector = detector();
        for query in [
            "zapatillas rojas",
            "pulsera de cuarzo rosa",
            "waterproof trail jacket",
            "",
        ] {
            assert!(!detector.needs_planning(query), "unexpected activation: {query}");
        }
    }
}
