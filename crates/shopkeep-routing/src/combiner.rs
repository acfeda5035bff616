//! Deduplication and budgeting of stage results.

use crate::config::BudgetConfig;
use crate::types::{CombinedRecord, CombinedResult, StageResult};
use shopkeep_core::{Product, ProductId};
use std::collections::HashMap;

/// Merges the records of every OK stage into one bounded list.
///
/// Stage order is the primary sort key and backend order is kept within a
/// stage. The first occurrence of an id wins; later occurrences only add
/// their stage to its provenance. The budget truncates the tail.
#[derive(Debug, Clone, Default)]
pub struct ResultCombiner {
    budget: BudgetConfig,
}

impl ResultCombiner {
    /// Combiner bounded by `budget`.
    pub fn new(budget: BudgetConfig) -> Self {
        Self { budget }
    }

    /// Merges OK stages in plan order, deduplicating by product id and
    /// trimming the tail to the budget.
    pub fn combine(&self, results: &[StageResult]) -> CombinedResult {
        let mut records: Vec<CombinedRecord> = Vec::new();
        let mut positions: HashMap<ProductId, usize> = HashMap::new();

        for result in results.iter().filter(|result| result.status.is_ok()) {
            for scored in &result.records {
                if let Some(&position) = positions.get(&scored.product.id) {
                    let provenance = &mut records[position].provenance;
                    if !provenance.contains(&result.stage) {
                        provenance.push(result.stage);
                    }
                    continue;
                }

                positions.insert(scored.product.id.clone(), records.len());
                records.push(CombinedRecord {
                    product: scored.product.clone(),
                    score: scored.score,
                    provenance: vec![result.stage],
                });
            }
        }

        let total = records.len();
        let mut units_used = 0;
        let mut kept = 0;
        for record in &records {
            let cost = record_units(&record.product);
            if kept == self.budget.max_results || units_used + cost > self.budget.result_units {
                break;
            }
            units_used += cost;
            kept += 1;
        }
        records.truncate(kept);

        if kept < total {
            tracing::debug!("Budget kept {kept} of {total} records ({units_used} units)");
        }

        CombinedResult {
            records,
            omitted: total - kept,
            units_used,
        }
    }
}

/// Budget units a record consumes: its serialized length in four-byte
/// chunks, at least one.
pub fn record_units(product: &Product) -> usize {
    serde_json::to_string(product)
        .map_or(1, |rendered| rendered.len().div_ceil(4))
        .max(1)
}
