//! Mock backend for testing plan execution.
//!
//! Replies are scripted per relation kind and entity/text pattern, so tests
//! can exercise partial failures, timeouts and empty results without a real
//! graph or vector store.

use async_trait::async_trait;
use shopkeep_core::{
    Error, GraphBackend, Product, RelationKind, RelationshipQuery, Result, ScoredProduct,
    SemanticQuery, VectorBackend,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

/// Scripted reply for a matching call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return these records (scores are ignored by graph calls).
    Records(Vec<ScoredProduct>),
    /// Fail as an unreachable backend.
    Unavailable(String),
    /// Wait before producing the inner reply.
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    /// Unscored graph records.
    #[must_use]
    pub fn products(products: Vec<Product>) -> Self {
        Self::Records(
            products
                .into_iter()
                .map(|product| ScoredProduct::new(product, 1.0))
                .collect(),
        )
    }
}

/// One scripted rule. `relation == None` marks a semantic rule.
#[derive(Debug, Clone)]
struct Rule {
    relation: Option<RelationKind>,
    pattern: String,
    reply: MockReply,
}

/// Backend implementing both traits from scripted rules.
#[derive(Clone, Default)]
pub struct MockBackend {
    rules: Arc<Mutex<Vec<Rule>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MockBackend {
    /// Create a backend that answers every call with an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to graph calls of `relation` whose entity contains `pattern`.
    #[must_use]
    pub fn with_graph_reply(
        self,
        relation: RelationKind,
        pattern: impl Into<String>,
        reply: MockReply,
    ) -> Self {
        lock(&self.rules).push(Rule {
            relation: Some(relation),
            pattern: pattern.into().to_lowercase(),
            reply,
        });
        self
    }

    /// Reply to semantic calls whose text contains `pattern`.
    #[must_use]
    pub fn with_semantic_reply(self, pattern: impl Into<String>, reply: MockReply) -> Self {
        lock(&self.rules).push(Rule {
            relation: None,
            pattern: pattern.into().to_lowercase(),
            reply,
        });
        self
    }

    /// Every call made so far, formatted as `graph:<relation>:<entity>` or
    /// `vector:<text>`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn find_reply(&self, relation: Option<RelationKind>, subject: &str) -> Option<MockReply> {
        let subject = subject.to_lowercase();
        lock(&self.rules)
            .iter()
            .find(|rule| rule.relation == relation && subject.contains(&rule.pattern))
            .map(|rule| rule.reply.clone())
    }

    async fn resolve(reply: Option<MockReply>) -> Result<Vec<ScoredProduct>> {
        let mut current = reply;
        loop {
            match current {
                None => return Ok(Vec::new()),
                Some(MockReply::Records(records)) => return Ok(records),
                Some(MockReply::Unavailable(message)) => return Err(Error::Unavailable(message)),
                Some(MockReply::Delayed(delay, inner)) => {
                    sleep(delay).await;
                    current = Some(*inner);
                }
            }
        }
    }
}

#[async_trait]
impl GraphBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock-graph"
    }

    async fn execute_relationship_query(&self, query: &RelationshipQuery) -> Result<Vec<Product>> {
        let subject = query.entity.to_string();
        lock(&self.calls).push(format!("graph:{}:{subject}", query.relation));
        let reply = self.find_reply(Some(query.relation), &subject);
        let records = Self::resolve(reply).await?;
        Ok(records.into_iter().map(|scored| scored.product).collect())
    }
}

#[async_trait]
impl VectorBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock-vector"
    }

    async fn execute_semantic_query(&self, query: &SemanticQuery) -> Result<Vec<ScoredProduct>> {
        lock(&self.calls).push(format!("vector:{}", query.text));
        let reply = self.find_reply(None, &query.text);
        Self::resolve(reply).await
    }
}
