use std::sync::Arc;

use shopkeep_core::{GraphBackend, VectorBackend};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, info, info_span};

use crate::analyzer::{QueryAnalysis, QueryAnalyzer};
use crate::combiner::ResultCombiner;
use crate::config::EngineConfig;
use crate::executor::PlanExecutor;
use crate::formatter::{FormattedResult, ResultFormatter};
use crate::planner::{Plan, PlanGenerator};
use crate::Result;

/// High-level entry point that coordinates analysis, planning, execution,
/// combination and formatting for one query at a time.
#[derive(Clone)]
pub struct PlanningEngine {
    config: EngineConfig,
    analyzer: Arc<QueryAnalyzer>,
    generator: PlanGenerator,
    executor: Arc<PlanExecutor>,
    combiner: ResultCombiner,
}

impl PlanningEngine {
    /// Creates an engine over the given backends.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or a cue pattern
    /// fails to compile
    pub fn new(
        config: EngineConfig,
        graph: Arc<dyn GraphBackend>,
        vector: Arc<dyn VectorBackend>,
    ) -> Result<Self> {
        config.validate()?;
        let analyzer = Arc::new(QueryAnalyzer::new(config.categories.clone())?);
        let generator = PlanGenerator::new(config.retrieval.clone());
        let executor = Arc::new(PlanExecutor::new(graph, vector, &config.execution));
        let combiner = ResultCombiner::new(config.budget.clone());

        Ok(Self {
            config,
            analyzer,
            generator,
            executor,
            combiner,
        })
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyzes `query` without planning it.
    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        self.analyzer.analyze(query)
    }

    /// Builds the plan for `query` without running it.
    ///
    /// Inactive queries get the direct single-stage semantic plan.
    ///
    /// # Errors
    /// Returns an error if the plan generator rejects the analysis
    pub fn plan(&self, query: &str) -> Result<Plan> {
        let analysis = self.analyze(query);
        if !analysis.active {
            return Ok(self.generator.direct(query));
        }
        self.generator.generate(analysis.intent, analysis.parameters)
    }

    /// Runs an already built plan and formats the outcome.
    ///
    /// # Errors
    /// Returns an error if a stage is malformed or `cancel` fires
    pub async fn execute_plan(
        &self,
        plan: &Plan,
        cancel: &CancellationToken,
    ) -> Result<FormattedResult> {
        if plan.is_empty() {
            let reason = plan
                .reason
                .clone()
                .unwrap_or_else(|| "no retrieval stage applies".to_owned());
            info!("Nothing to run for {} query: {reason}", plan.intent);
            return Ok(ResultFormatter::need_more_information(plan.intent, reason));
        }

        let results = self.executor.execute(plan, cancel).await?;
        let combined = self.combiner.combine(&results);
        info!(
            "Combined {} record(s) from {} stage(s), {} omitted",
            combined.len(),
            results.len(),
            combined.omitted
        );

        Ok(ResultFormatter::format(plan.intent, &results, &combined))
    }

    /// Plans and executes `query`.
    ///
    /// # Errors
    /// See [`Self::plan_and_execute_with_cancel`]
    pub async fn plan_and_execute(&self, query: &str) -> Result<FormattedResult> {
        self.plan_and_execute_with_cancel(query, &CancellationToken::new())
            .await
    }

    /// Plans and executes `query`, aborting in-flight stages if `cancel`
    /// fires.
    ///
    /// # Errors
    /// Returns an error for malformed plans or cancellation. Backend
    /// failures are reported inside the formatted result instead.
    pub async fn plan_and_execute_with_cancel(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<FormattedResult> {
        let span = info_span!("plan_and_execute", query = %query.trim());
        async {
            let plan = self.plan(query)?;
            info!(
                "Intent {} with {} stage(s), parameters {}",
                plan.intent,
                plan.stages.len(),
                plan.parameters
            );
            self.execute_plan(&plan, cancel).await
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "Test code is allowed to use expect")]
mod tests {
    use super::*;
    use crate::types::Intent;
    use shopkeep_backends::MockBackend;

    fn engine(backend: &Arc<MockBackend>) -> PlanningEngine {
        let graph: Arc<dyn GraphBackend> = Arc::<MockBackend>::clone(backend);
        let vector: Arc<dyn VectorBackend> = Arc::<MockBackend>::clone(backend);
        PlanningEngine::new(EngineConfig::default(), graph, vector).expect("engine should build")
    }

    #[test]
    fn test_inactive_query_gets_direct_plan() {
        let backend = Arc::new(MockBackend::new());
        let plan = engine(&backend).plan("zapatillas rojas").expect("plan failed");
        assert_eq!(plan.intent, Intent::Simple);
        assert_eq!(plan.stages.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_plan_skips_backends() {
        let backend = Arc::new(MockBackend::new());
        let engine = engine(&backend);
        let formatted = engine.plan_and_execute("show me something similar to the").await.expect("query failed");
        assert!(matches!(
            formatted,
            FormattedResult::NeedMoreInformation {
                intent: Intent::Similarity,
                ..
            }
        ));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let backend = Arc::new(MockBackend::new());
        let engine = engine(&backend);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = engine
            .plan_and_execute_with_cancel("productos similares al Metcon 9", &cancel)
            .await;
        assert!(matches!(outcome, Err(crate::RoutingError::Cancelled)));
    }
}
