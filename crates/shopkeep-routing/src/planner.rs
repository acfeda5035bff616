//! Plan generation: intent and parameters to an ordered list of stages.

use crate::config::RetrievalConfig;
use crate::error::{Result, RoutingError};
use crate::types::{BackendKind, ExtractedParameters, Intent, StageId};
use serde::Serialize;
use shopkeep_core::{
    Entity, RecordFilters, RelationKind, RelationshipQuery, ResultOrdering, SemanticQuery,
};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Backend-specific descriptor of what a stage asks for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StageQuery {
    /// Entity lookup against the graph backend
    #[serde(rename = "graph")]
    Relationship(RelationshipQuery),
    /// Similarity search against the vector backend
    #[serde(rename = "vector")]
    Semantic(SemanticQuery),
}

impl StageQuery {
    /// Backend that answers this query.
    pub const fn backend(&self) -> BackendKind {
        match self {
            Self::Relationship(_) => BackendKind::Graph,
            Self::Semantic(_) => BackendKind::Vector,
        }
    }

    /// Filters attached to the query.
    pub const fn filters(&self) -> &RecordFilters {
        match self {
            Self::Relationship(query) => &query.filters,
            Self::Semantic(query) => &query.filters,
        }
    }

    /// Maximum number of records the stage keeps.
    pub const fn limit(&self) -> usize {
        match self {
            Self::Relationship(query) => query.limit,
            Self::Semantic(query) => query.top_k,
        }
    }

    /// Entity name or query text the stage is about.
    pub fn subject(&self) -> String {
        match self {
            Self::Relationship(query) => match &query.entity {
                Entity::Name(name) => name.clone(),
                ids @ Entity::Ids(_) => ids.to_string(),
            },
            Self::Semantic(query) => query.text.clone(),
        }
    }
}

impl Display for StageQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Relationship(query) => write!(
                f,
                "graph {} {} ({}, limit {})",
                query.relation,
                query.entity,
                query.filters.describe(),
                query.limit
            ),
            Self::Semantic(query) => write!(
                f,
                "vector '{}' ({}, top {})",
                query.text,
                query.filters.describe(),
                query.top_k
            ),
        }
    }
}

/// One backend call within a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStage {
    /// Position in the plan, starting at 1
    pub id: StageId,
    /// Human-readable summary
    pub description: String,
    /// What the stage asks its backend
    pub query: StageQuery,
    /// Run instead when `query` succeeds with no records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<StageQuery>,
    /// Earlier stage whose record ids this stage consumes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<StageId>,
}

impl PlanStage {
    /// Creates an independent stage. Its id is assigned by [`Plan::new`].
    pub fn new(description: impl Into<String>, query: StageQuery) -> Self {
        Self {
            id: StageId::new(0),
            description: description.into(),
            query,
            fallback: None,
            depends_on: None,
        }
    }

    /// Query to run when the primary returns nothing.
    #[must_use]
    pub fn with_fallback(mut self, fallback: StageQuery) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Make the stage wait for `stage`.
    #[must_use]
    pub fn depending_on(mut self, stage: StageId) -> Self {
        self.depends_on = Some(stage);
        self
    }

    /// Backend that answers the primary query.
    pub const fn backend(&self) -> BackendKind {
        self.query.backend()
    }

    /// Whether the stage waits on another stage.
    pub const fn is_dependent(&self) -> bool {
        self.depends_on.is_some()
    }
}

/// Ordered stages for one query, created per request and then discarded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    /// Intent the plan answers
    pub intent: Intent,
    /// Parameters the stages were built from
    pub parameters: ExtractedParameters,
    /// Stages in execution order
    pub stages: Vec<PlanStage>,
    /// Why the plan has no stages, when it has none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Plan {
    /// Creates a plan, numbering stages from 1 in the given order.
    pub fn new(intent: Intent, parameters: ExtractedParameters, stages: Vec<PlanStage>) -> Self {
        let stages = stages
            .into_iter()
            .enumerate()
            .map(|(index, mut stage)| {
                stage.id = StageId::new(index + 1);
                stage
            })
            .collect();
        Self {
            intent,
            parameters,
            stages,
            reason: None,
        }
    }

    /// A plan with no stages because a required slot is missing.
    pub fn insufficient(
        intent: Intent,
        parameters: ExtractedParameters,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            intent,
            parameters,
            stages: Vec::new(),
            reason: Some(reason.into()),
        }
    }

    /// Whether there is nothing to run.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage numbered `id`.
    pub fn stage(&self, id: StageId) -> Option<&PlanStage> {
        self.stages.iter().find(|stage| stage.id == id)
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "intent: {}", self.intent)?;
        writeln!(f, "parameters: {}", self.parameters)?;
        if let Some(reason) = &self.reason {
            writeln!(f, "no stages: {reason}")?;
        }
        for stage in &self.stages {
            write!(f, "{}. {} [{}]", stage.id.number(), stage.description, stage.query)?;
            if let Some(dependency) = stage.depends_on {
                write!(f, " after {dependency}")?;
            }
            writeln!(f)?;
            if let Some(fallback) = &stage.fallback {
                writeln!(f, "   if empty: [{fallback}]")?;
            }
        }
        Ok(())
    }
}

/// Deterministic mapping from intent and parameters to a stage template.
#[derive(Debug, Clone, Default)]
pub struct PlanGenerator {
    retrieval: RetrievalConfig,
}

impl PlanGenerator {
    /// Generator using the given per-stage limits.
    pub fn new(retrieval: RetrievalConfig) -> Self {
        Self { retrieval }
    }

    /// Builds the plan for an active query.
    ///
    /// # Errors
    /// Returns [`RoutingError::UnknownIntent`] for [`Intent::Simple`], which
    /// is answered by [`Self::direct`] and never planned.
    pub fn generate(&self, intent: Intent, parameters: ExtractedParameters) -> Result<Plan> {
        match intent {
            Intent::Similarity => Ok(self.similarity(parameters)),
            Intent::PriceComparison => Ok(self.price_comparison(parameters)),
            Intent::Comparison => Ok(Self::comparison(parameters)),
            Intent::Recommendation => Ok(self.recommendation(parameters)),
            Intent::Simple => Err(RoutingError::UnknownIntent(
                "simple queries use the direct semantic path and have no plan template".to_owned(),
            )),
        }
    }

    /// One semantic stage over the raw query text, in-stock only.
    pub fn direct(&self, query: &str) -> Plan {
        let search = SemanticQuery::new(query.trim(), self.retrieval.direct_top_k)
            .with_filters(RecordFilters::new().in_stock());
        Plan::new(
            Intent::Simple,
            ExtractedParameters::default(),
            vec![PlanStage::new(
                format!("semantic search for '{}'", query.trim()),
                StageQuery::Semantic(search),
            )],
        )
    }

    fn similarity(&self, parameters: ExtractedParameters) -> Plan {
        let Some(reference) = parameters.reference_product.clone() else {
            return Plan::insufficient(
                Intent::Similarity,
                parameters,
                "no reference product to find similar items for",
            );
        };

        let filters = RecordFilters::new()
            .in_stock()
            .with_max_price(parameters.price_ceiling);
        let stage = PlanStage::new(
            format!("products similar to '{reference}'"),
            self.similar_to(&reference, filters),
        );
        Plan::new(Intent::Similarity, parameters, vec![stage])
    }

    fn price_comparison(&self, parameters: ExtractedParameters) -> Plan {
        let Some(reference) = parameters.reference_product.clone() else {
            return Plan::insufficient(
                Intent::PriceComparison,
                parameters,
                "no reference product to compare prices against",
            );
        };

        let filters = RecordFilters::new()
            .in_stock()
            .with_size(parameters.size.clone())
            .with_max_price(parameters.price_ceiling);
        let cheaper = RelationshipQuery::new(
            Entity::Name(reference.clone()),
            RelationKind::CheaperThan,
        )
        .with_filters(filters.clone())
        .with_ordering(ResultOrdering::PriceAscending)
        .with_limit(self.retrieval.graph_limit);

        let stage = PlanStage::new(
            format!("products cheaper than '{reference}'"),
            StageQuery::Relationship(cheaper),
        )
        .with_fallback(self.similar_to(&reference, filters));
        Plan::new(Intent::PriceComparison, parameters, vec![stage])
    }

    fn comparison(parameters: ExtractedParameters) -> Plan {
        let Some((first, second)) = parameters.comparison_targets.clone() else {
            return Plan::insufficient(
                Intent::Comparison,
                parameters,
                "need two products to compare",
            );
        };

        let stages = [first, second]
            .into_iter()
            .map(|target| {
                let lookup = RelationshipQuery::new(Entity::Name(target.clone()), RelationKind::Lookup)
                    .with_limit(1);
                PlanStage::new(format!("lookup '{target}'"), StageQuery::Relationship(lookup))
            })
            .collect();
        Plan::new(Intent::Comparison, parameters, stages)
    }

    fn recommendation(&self, parameters: ExtractedParameters) -> Plan {
        let filters = RecordFilters::new()
            .in_stock()
            .with_category(parameters.category.clone())
            .with_size(parameters.size.clone())
            .with_max_price(parameters.price_ceiling);

        if let Some(use_case) = parameters.use_case.clone() {
            let search = SemanticQuery::new(use_case.clone(), self.retrieval.vector_top_k)
                .with_filters(filters);
            let stage = PlanStage::new(
                format!("products suited to '{use_case}'"),
                StageQuery::Semantic(search),
            );
            return Plan::new(Intent::Recommendation, parameters, vec![stage]);
        }

        let Some(category) = parameters.category.clone() else {
            return Plan::insufficient(
                Intent::Recommendation,
                parameters,
                "no use case or category to recommend for",
            );
        };

        // The category already anchors the query; filtering on it again is redundant.
        let browse = RelationshipQuery::new(
            Entity::Name(category.clone()),
            RelationKind::BelongsToCategory,
        )
        .with_filters(filters.with_category(None))
        .with_ordering(ResultOrdering::PriceAscending)
        .with_limit(self.retrieval.graph_limit);
        let stage = PlanStage::new(
            format!("products in category '{category}'"),
            StageQuery::Relationship(browse),
        );
        Plan::new(Intent::Recommendation, parameters, vec![stage])
    }

    fn similar_to(&self, reference: &str, filters: RecordFilters) -> StageQuery {
        StageQuery::Relationship(
            RelationshipQuery::new(Entity::Name(reference.to_owned()), RelationKind::SimilarTo)
                .with_filters(filters)
                .with_ordering(ResultOrdering::SameCategoryThenNearestPrice)
                .with_limit(self.retrieval.graph_limit),
        )
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "Test code is allowed to use expect")]
mod tests {
    use super::*;

    fn relationship(stage: &PlanStage) -> &RelationshipQuery {
        match &stage.query {
            StageQuery::Relationship(query) => query,
            StageQuery::Semantic(query) => panic!("expected a graph stage, got {query:?}"),
        }
    }

    fn generate(intent: Intent, parameters: ExtractedParameters) -> Plan {
        PlanGenerator::default().generate(intent, parameters).expect("plan generation failed")
    }

    #[test]
    fn test_comparison_has_two_independent_lookups() {
        let plan = generate(
            Intent::Comparison,
            ExtractedParameters {
                comparison_targets: Some(("Nike Air Zoom".to_owned(), "Adidas Ultraboost".to_owned())),
                ..ExtractedParameters::default()
            },
        );

        assert_eq!(plan.stages.len(), 2);
        assert!(plan.stages.iter().all(|stage| !stage.is_dependent()));
        assert!(plan.stages.iter().all(|stage| stage.backend() == BackendKind::Graph));
        assert_eq!(relationship(&plan.stages[0]).relation, RelationKind::Lookup);
        assert_eq!(plan.stages[1].query.subject(), "Adidas Ultraboost");
        assert_eq!(plan.stages[1].id, StageId::new(2));
    }

    #[test]
    fn test_similarity_without_reference_is_empty() {
        let plan = generate(Intent::Similarity, ExtractedParameters::default());
        assert!(plan.is_empty());
        assert!(plan.reason.is_some());
    }

    #[test]
    fn test_similarity_filters_in_stock() {
        let plan = generate(
            Intent::Similarity,
            ExtractedParameters {
                reference_product: Some("Metcon 9".to_owned()),
                ..ExtractedParameters::default()
            },
        );
        let query = relationship(&plan.stages[0]);
        assert_eq!(query.relation, RelationKind::SimilarTo);
        assert!(query.filters.in_stock_only);
        assert_eq!(query.ordering, ResultOrdering::SameCategoryThenNearestPrice);
    }

    #[test]
    fn test_price_comparison_carries_size_and_fallback() {
        let plan = generate(
            Intent::PriceComparison,
            ExtractedParameters {
                reference_product: Some("Metcon 9".to_owned()),
                size: Some("42".to_owned()),
                ..ExtractedParameters::default()
            },
        );

        assert_eq!(plan.stages.len(), 1);
        let stage = &plan.stages[0];
        let query = relationship(stage);
        assert_eq!(query.relation, RelationKind::CheaperThan);
        assert_eq!(query.filters.size.as_deref(), Some("42"));
        assert!(query.filters.in_stock_only);
        assert!(matches!(
            &stage.fallback,
            Some(StageQuery::Relationship(fallback)) if fallback.relation == RelationKind::SimilarTo
        ));
    }

    #[test]
    fn test_recommendation_is_semantic() {
        let plan = generate(
            Intent::Recommendation,
            ExtractedParameters {
                use_case: Some("correr en montaña".to_owned()),
                category: Some("calzado".to_owned()),
                ..ExtractedParameters::default()
            },
        );
        let StageQuery::Semantic(query) = &plan.stages[0].query else {
            panic!("expected a vector stage");
        };
        assert_eq!(query.text, "correr en montaña");
        assert_eq!(query.filters.category.as_deref(), Some("calzado"));
        assert_eq!(query.top_k, 10);
    }

    #[test]
    fn test_recommendation_falls_back_to_category_browse() {
        let plan = generate(
            Intent::Recommendation,
            ExtractedParameters {
                category: Some("pulseras".to_owned()),
                ..ExtractedParameters::default()
            },
        );
        let query = relationship(&plan.stages[0]);
        assert_eq!(query.relation, RelationKind::BelongsToCategory);
        assert_eq!(query.ordering, ResultOrdering::PriceAscending);

        let empty = generate(Intent::Recommendation, ExtractedParameters::default());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_simple_is_not_planned() {
        let result = PlanGenerator::default().generate(Intent::Simple, ExtractedParameters::default());
        assert!(matches!(result, Err(RoutingError::UnknownIntent(_))));

        let direct = PlanGenerator::default().direct("zapatillas rojas");
        assert_eq!(direct.stages.len(), 1);
        assert_eq!(direct.stages[0].backend(), BackendKind::Vector);
        assert!(direct.stages[0].query.filters().in_stock_only);
    }
}
