use std::collections::{BTreeMap, HashMap, VecDeque};
use std::result::Result as StdResult;
use std::sync::Arc;
use std::time::{Duration, Instant};

use shopkeep_core::{
    Entity, Error as CoreError, GraphBackend, ProductId, ScoredProduct, VectorBackend,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::error::Elapsed;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::graph::StageGraph;
use crate::config::ExecutionConfig;
use crate::planner::{Plan, PlanStage, StageQuery};
use crate::types::{StageFailure, StageId, StageResult, StageStatus};
use crate::{Result, RoutingError};

/// Runs plan stages against the injected backends.
///
/// Independent stages run concurrently up to the configured limit. A
/// failing stage is recorded and does not stop its siblings; only stages
/// depending on it are skipped.
pub struct PlanExecutor {
    graph: Arc<dyn GraphBackend>,
    vector: Arc<dyn VectorBackend>,
    stage_timeout: Duration,
    max_concurrent: usize,
}

impl PlanExecutor {
    /// Create a new plan executor
    pub fn new(
        graph: Arc<dyn GraphBackend>,
        vector: Arc<dyn VectorBackend>,
        execution: &ExecutionConfig,
    ) -> Self {
        Self {
            graph,
            vector,
            stage_timeout: execution.stage_timeout(),
            max_concurrent: execution.max_concurrent_stages.max(1),
        }
    }

    /// Execute every stage of `plan`, returning results in stage order.
    ///
    /// # Errors
    /// Returns [`RoutingError::MalformedStage`] before any backend call if a
    /// stage descriptor or dependency is invalid, and
    /// [`RoutingError::Cancelled`] if `cancel` fires while stages are in
    /// flight. Backend failures are never errors here.
    pub async fn execute(
        &self,
        plan: &Plan,
        cancel: &CancellationToken,
    ) -> Result<Vec<StageResult>> {
        let graph = StageGraph::from_plan(plan)?;
        validate_queries(plan)?;
        tracing::debug!("Executing {} stage(s)", graph.len());

        let mut results = BTreeMap::new();
        let mut in_flight = HashMap::new();
        let mut join_set = JoinSet::new();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut ready: VecDeque<StageId> = graph.roots().into();

        loop {
            if cancel.is_cancelled() {
                join_set.abort_all();
                return Err(RoutingError::Cancelled);
            }

            while let Some(stage_id) = ready.pop_front() {
                let Some(stage) = plan.stage(stage_id) else {
                    continue;
                };

                match resolve_dependency(stage, &results) {
                    Err(failure) => {
                        tracing::warn!("{stage_id} ({}) skipped: {failure}", stage.description);
                        results.insert(stage_id, unrun(stage, failure));
                        ready.extend(graph.dependents(stage_id));
                    }
                    Ok((query, fallback)) => {
                        let task = StageTask {
                            stage: stage_id,
                            description: stage.description.clone(),
                            query,
                            fallback,
                            graph: Arc::clone(&self.graph),
                            vector: Arc::clone(&self.vector),
                            timeout: self.stage_timeout,
                        };
                        let permits = Arc::clone(&semaphore);

                        let handle = join_set.spawn(async move {
                            let permit = permits.acquire_owned().await;
                            let result = task.run().await;
                            drop(permit);
                            result
                        });
                        in_flight.insert(handle.id(), stage_id);
                    }
                }
            }

            if join_set.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::warn!("Plan cancelled with {} stage(s) in flight", join_set.len());
                    join_set.abort_all();
                    return Err(RoutingError::Cancelled);
                }
                Some(joined) = join_set.join_next_with_id() => {
                    let result = match joined {
                        Ok((task_id, result)) => {
                            in_flight.remove(&task_id);
                            result
                        }
                        Err(join_error) => {
                            let stage_id = in_flight.remove(&join_error.id()).ok_or_else(|| {
                                RoutingError::Other(format!("unknown stage task failed: {join_error}"))
                            })?;
                            let Some(stage) = plan.stage(stage_id) else {
                                continue;
                            };
                            tracing::warn!("{stage_id} ({}) crashed: {join_error}", stage.description);
                            unrun(stage, StageFailure::Crashed { message: join_error.to_string() })
                        }
                    };
                    ready.extend(graph.dependents(result.stage));
                    results.insert(result.stage, result);
                }
                else => break,
            }
        }

        Ok(results.into_values().collect())
    }
}

/// Everything a spawned stage needs, owned so the task is `'static`.
struct StageTask {
    stage: StageId,
    description: String,
    query: StageQuery,
    fallback: Option<StageQuery>,
    graph: Arc<dyn GraphBackend>,
    vector: Arc<dyn VectorBackend>,
    timeout: Duration,
}

impl StageTask {
    async fn run(self) -> StageResult {
        let start = Instant::now();
        tracing::debug!("Dispatching {} [{}]", self.stage, self.query);

        let primary = self.dispatch(&self.query).await;
        let (outcome, used_fallback) = match (primary, &self.fallback) {
            (Ok(records), Some(fallback)) if records.is_empty() => {
                tracing::debug!("{} returned nothing, trying [{fallback}]", self.stage);
                (self.dispatch(fallback).await, true)
            }
            (primary, _) => (primary, false),
        };

        let (status, records) = match outcome {
            Ok(records) => (StageStatus::Ok, records),
            Err(failure) => {
                tracing::warn!("{} ({}) failed: {failure}", self.stage, self.description);
                (StageStatus::Failed(failure), Vec::new())
            }
        };

        StageResult {
            stage: self.stage,
            backend: self.query.backend(),
            description: self.description,
            subject: self.query.subject(),
            status,
            records,
            used_fallback,
            elapsed_ms: millis(start.elapsed()),
        }
    }

    /// One bounded backend call, with the stage filters re-applied.
    async fn dispatch(&self, query: &StageQuery) -> StdResult<Vec<ScoredProduct>, StageFailure> {
        let timed_out = |_: Elapsed| StageFailure::Timeout {
            after_ms: millis(self.timeout),
        };
        let records = match query {
            StageQuery::Relationship(relationship) => timeout(
                self.timeout,
                self.graph.execute_relationship_query(relationship),
            )
            .await
            .map_err(timed_out)?
            .map_err(backend_failure)?
            .into_iter()
            .map(|product| ScoredProduct::new(product, 0.0))
            .collect::<Vec<_>>(),
            StageQuery::Semantic(semantic) => {
                timeout(self.timeout, self.vector.execute_semantic_query(semantic))
                    .await
                    .map_err(timed_out)?
                    .map_err(backend_failure)?
            }
        };

        let filters = query.filters();
        Ok(records
            .into_iter()
            .filter(|record| filters.matches(&record.product))
            .take(query.limit())
            .collect())
    }
}

fn backend_failure(error: CoreError) -> StageFailure {
    StageFailure::Backend {
        message: error.to_string(),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Result for a stage that produced no records of its own: skipped for an
/// unmet dependency, or crashed before reporting.
fn unrun(stage: &PlanStage, failure: StageFailure) -> StageResult {
    StageResult {
        stage: stage.id,
        backend: stage.backend(),
        description: stage.description.clone(),
        subject: stage.query.subject(),
        status: StageStatus::Failed(failure),
        records: Vec::new(),
        used_fallback: false,
        elapsed_ms: 0,
    }
}

/// Binds a dependent stage to its prerequisite's record ids.
fn resolve_dependency(
    stage: &PlanStage,
    results: &BTreeMap<StageId, StageResult>,
) -> StdResult<(StageQuery, Option<StageQuery>), StageFailure> {
    let Some(dependency) = stage.depends_on else {
        return Ok((stage.query.clone(), stage.fallback.clone()));
    };

    let ids: Vec<ProductId> = results
        .get(&dependency)
        .filter(|result| result.has_records())
        .map(|result| {
            result
                .records
                .iter()
                .map(|record| record.product.id.clone())
                .collect()
        })
        .ok_or(StageFailure::DependencyUnmet { dependency })?;

    Ok((
        bind_ids(&stage.query, &ids),
        stage.fallback.as_ref().map(|fallback| bind_ids(fallback, &ids)),
    ))
}

fn bind_ids(query: &StageQuery, ids: &[ProductId]) -> StageQuery {
    match query {
        StageQuery::Relationship(relationship) => {
            let mut bound = relationship.clone();
            bound.entity = Entity::Ids(ids.to_vec());
            StageQuery::Relationship(bound)
        }
        StageQuery::Semantic(semantic) => {
            let mut bound = semantic.clone();
            bound.filters.candidate_ids = Some(ids.to_vec());
            StageQuery::Semantic(bound)
        }
    }
}

/// Query checks run before any backend call. Numbering and dependency
/// order are checked by [`StageGraph::from_plan`].
fn validate_queries(plan: &Plan) -> Result<()> {
    for stage in &plan.stages {
        validate_query(stage, &stage.query)?;
        if let Some(fallback) = &stage.fallback {
            validate_query(stage, fallback)?;
        }
    }
    Ok(())
}

fn validate_query(stage: &PlanStage, query: &StageQuery) -> Result<()> {
    let problem = match query {
        StageQuery::Relationship(relationship) => match &relationship.entity {
            _ if relationship.limit == 0 => Some("relationship limit is zero"),
            Entity::Name(name) if name.trim().is_empty() => Some("entity name is empty"),
            Entity::Ids(ids) if ids.is_empty() && !stage.is_dependent() => {
                Some("entity id list is empty")
            }
            _ => None,
        },
        StageQuery::Semantic(semantic) => {
            if semantic.top_k == 0 {
                Some("semantic top_k is zero")
            } else if semantic.text.trim().is_empty() {
                Some("semantic query text is empty")
            } else {
                None
            }
        }
    };

    problem.map_or(Ok(()), |problem| {
        Err(RoutingError::MalformedStage(format!(
            "{} ({}): {problem}",
            stage.id, stage.description
        )))
    })
}
