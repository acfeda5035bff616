use crate::planner::Plan;
use crate::types::StageId;
use crate::{Result, RoutingError};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

/// Dependency forest of a plan.
///
/// Every stage has at most one prerequisite, and that prerequisite always
/// comes earlier in the plan, so the graph is a forest rooted at the
/// independent stages. Node `n` holds stage `n + 1`.
#[derive(Debug, Clone)]
pub struct StageGraph {
    forest: DiGraph<StageId, ()>,
}

impl StageGraph {
    /// Builds the forest, checking stage numbering and dependency order.
    ///
    /// # Errors
    /// Returns [`RoutingError::MalformedStage`] if stages are not numbered
    /// `1..=n` in order, or a stage depends on itself or a later stage
    pub fn from_plan(plan: &Plan) -> Result<Self> {
        let mut forest = DiGraph::with_capacity(plan.stages.len(), plan.stages.len());

        for (position, stage) in plan.stages.iter().enumerate() {
            let expected = StageId::new(position + 1);
            if stage.id != expected {
                return Err(RoutingError::MalformedStage(format!(
                    "stage at position {} is numbered {}",
                    expected.number(),
                    stage.id.number()
                )));
            }
            let node = forest.add_node(stage.id);

            if let Some(dependency) = stage.depends_on {
                if dependency.number() == 0 || dependency >= stage.id {
                    return Err(RoutingError::MalformedStage(format!(
                        "{} depends on {dependency}, which does not run before it",
                        stage.id
                    )));
                }
                forest.add_edge(node_of(dependency), node, ());
            }
        }

        Ok(Self { forest })
    }

    /// Stages with no prerequisite, in plan order.
    #[must_use]
    pub fn roots(&self) -> Vec<StageId> {
        self.forest
            .externals(Direction::Incoming)
            .map(|node| self.forest[node])
            .collect()
    }

    /// Stages waiting directly on `stage`, in plan order.
    #[must_use]
    pub fn dependents(&self, stage: StageId) -> Vec<StageId> {
        let Some(node) = self.node(stage) else {
            return Vec::new();
        };
        let mut dependents: Vec<StageId> = self
            .forest
            .neighbors_directed(node, Direction::Outgoing)
            .map(|child| self.forest[child])
            .collect();
        dependents.sort_unstable();
        dependents
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forest.node_count()
    }

    /// Whether the plan had no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forest.node_count() == 0
    }

    fn node(&self, stage: StageId) -> Option<NodeIndex> {
        (stage.number() >= 1 && stage.number() <= self.len()).then(|| node_of(stage))
    }
}

fn node_of(stage: StageId) -> NodeIndex {
    NodeIndex::new(stage.number().saturating_sub(1))
}
