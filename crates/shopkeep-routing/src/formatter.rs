//! Rendering of combined results into an intent-specific, bounded structure.

use crate::types::{CombinedRecord, CombinedResult, Intent, StageResult, StageStatus};
use serde::Serialize;
use shopkeep_core::Product;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Final answer handed to the caller.
///
/// Serializes to JSON for programmatic callers; `Display` renders Markdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormattedResult {
    /// Ordered product list for similarity, price, recommendation and simple queries
    Ranked {
        /// Intent the list answers
        intent: Intent,
        /// Combined records in merge order
        items: Vec<CombinedRecord>,
        /// One line per failed stage
        notices: Vec<String>,
        /// Records dropped by the result budget
        omitted: usize,
    },
    /// Side-by-side attributes of the comparison targets
    Comparison {
        /// One entry per target, in the order asked
        entries: Vec<ComparisonEntry>,
        /// Absolute price gap when both targets were found
        #[serde(skip_serializing_if = "Option::is_none")]
        price_difference: Option<f64>,
        /// Name of the cheaper product, if the prices differ
        #[serde(skip_serializing_if = "Option::is_none")]
        cheaper: Option<String>,
        /// One line per failed stage
        notices: Vec<String>,
    },
    /// Every stage ran but nothing matched
    NoResults {
        /// Intent that found nothing
        intent: Intent,
        /// One line per failed stage
        notices: Vec<String>,
    },
    /// A required slot was missing, so nothing ran
    NeedMoreInformation {
        /// Intent that could not be planned
        intent: Intent,
        /// What the user should add
        reason: String,
    },
}

/// Outcome of one comparison target's lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ComparisonEntry {
    /// The lookup matched a product
    Found {
        /// Name the user asked about
        target: String,
        /// Matched product
        product: Product,
    },
    /// The lookup ran and matched nothing
    NotFound {
        /// Name the user asked about
        target: String,
    },
    /// The lookup stage failed
    Failed {
        /// Name the user asked about
        target: String,
        /// Why the stage failed
        reason: String,
    },
}

impl ComparisonEntry {
    /// Name the user asked about.
    pub fn target(&self) -> &str {
        match self {
            Self::Found { target, .. } | Self::NotFound { target } | Self::Failed { target, .. } => {
                target
            }
        }
    }

    /// Matched product, if the lookup found one.
    pub const fn product(&self) -> Option<&Product> {
        match self {
            Self::Found { product, .. } => Some(product),
            Self::NotFound { .. } | Self::Failed { .. } => None,
        }
    }
}

/// Pure, total f.
#[derive(Debug, Clone, Copy)]
pub struct ResultFormatter;

impl ResultFormatter {
    /// Formats the stage results of an executed plan.
    pub fn format(
        intent: Intent,
        results: &[StageResult],
        combined: &CombinedResult,
    ) -> FormattedResult {
        let notices = failure_notices(results);

        if intent == Intent::Comparison {
            return Self::comparison(results, combined, notices);
        }

        if combined.is_empty() {
            return FormattedResult::NoResults { intent, notices };
        }

        let mut items = combined.records.clone();
        match intent {
            Intent::PriceComparison => {
                items.sort_by(|left, right| left.product.price.total_cmp(&right.product.price));
            }
            Intent::Recommendation | Intent::Simple => {
                items.sort_by(|left, right| right.score.total_cmp(&left.score));
            }
            Intent::Similarity | Intent::Comparison => {}
        }

        FormattedResult::Ranked {
            intent,
            items,
            notices,
            omitted: combined.omitted,
        }
    }

    /// Answer for a plan that could not be built.
    pub fn need_more_information(intent: Intent, reason: impl Into<String>) -> FormattedResult {
        FormattedResult::NeedMoreInformation {
            intent,
            reason: reason.into(),
        }
    }

    fn comparison(
        results: &[StageResult],
        combined: &CombinedResult,
        notices: Vec<String>,
    ) -> FormattedResult {
        let entries: Vec<ComparisonEntry> = results
            .iter()
            .map(|result| {
                let target = result.subject.clone();
                match &result.status {
                    StageStatus::Failed(failure) => ComparisonEntry::Failed {
                        target,
                        reason: failure.to_string(),
                    },
                    StageStatus::Ok => {
                        let record = combined
                            .records
                            .iter()
                            .find(|record| record.provenance.contains(&result.stage));
                        match record {
                            Some(record) => ComparisonEntry::Found {
                                target,
                                product: record.product.clone(),
                            },
                            None => ComparisonEntry::NotFound { target },
                        }
                    }
                }
            })
            .collect();

        let nothing_to_show = entries
            .iter()
            .all(|entry| matches!(entry, ComparisonEntry::NotFound { .. }));
        if nothing_to_show {
            return FormattedResult::NoResults {
                intent: Intent::Comparison,
                notices,
            };
        }

        let found: Vec<&Product> = entries.iter().filter_map(ComparisonEntry::product).collect();
        let (price_difference, cheaper) = match found.as_slice() {
            [first, second, ..] => {
                let difference = ((first.price - second.price).abs() * 100.0).round() / 100.0;
                let cheaper = if first.price < second.price {
                    Some(first.name.clone())
                } else if second.price < first.price {
                    Some(second.name.clone())
                } else {
                    None
                };
                (Some(difference), cheaper)
            }
            _ => (None, None),
        };

        FormattedResult::Comparison {
            entries,
            price_difference,
            cheaper,
            notices,
        }
    }
}

fn failure_notices(results: &[StageResult]) -> Vec<String> {
    results
        .iter()
        .filter(|result| !result.status.is_ok())
        .map(|result| format!("{} ({}) {}", result.stage, result.description, result.status))
        .collect()
}

const fn ranked_title(intent: Intent) -> &'static str {
    match intent {
        Intent::PriceComparison => "Cheaper alternatives",
        Intent::Similarity => "Similar products",
        Intent::Recommendation => "Recommended products",
        Intent::Comparison | Intent::Simple => "Results",
    }
}

fn categories(product: &Product) -> String {
    if product.categories.is_empty() {
        return "-".to_owned();
    }
    product
        .categories
        .iter()
        .map(|category| category.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_notices(f: &mut Formatter<'_>, notices: &[String]) -> FmtResult {
    if notices.is_empty() {
        return Ok(());
    }
    writeln!(f)?;
    for notice in notices {
        writeln!(f, "> {notice}")?;
    }
    Ok(())
}

impl Display for FormattedResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Ranked {
                intent,
                items,
                notices,
                omitted,
            } => {
                writeln!(f, "## {}", ranked_title(*intent))?;
                writeln!(f)?;
                for (index, item) in items.iter().enumerate() {
                    write!(
                        f,
                        "{}. **{}** - USD {:.2} ({}) [{}]",
                        index + 1,
                        item.product.name,
                        item.product.price,
                        categories(&item.product),
                        item.product.stock_status
                    )?;
                    if item.score > 0.0 {
                        write!(f, " relevance {:.2}", item.score)?;
                    }
                    writeln!(f)?;
                }
                if *omitted > 0 {
                    writeln!(f)?;
                    writeln!(f, "_{omitted} more result(s) omitted_")?;
                }
                write_notices(f, notices)
            }
            Self::Comparison {
                entries,
                price_difference,
                cheaper,
                notices,
            } => {
                writeln!(f, "## Product comparison")?;
                for entry in entries {
                    writeln!(f)?;
                    match entry {
                        ComparisonEntry::Found { product, .. } => {
                            writeln!(f, "**{}**", product.name)?;
                            writeln!(f, "- Price: USD {:.2}", product.price)?;
                            writeln!(f, "- Categories: {}", categories(product))?;
                            writeln!(f, "- Stock: {}", product.stock_status)?;
                            if !product.sizes.is_empty() {
                                writeln!(f, "- Sizes: {}", product.sizes.join(", "))?;
                            }
                        }
                        ComparisonEntry::NotFound { target } => {
                            writeln!(f, "**{target}**: not found in the catalog")?;
                        }
                        ComparisonEntry::Failed { target, reason } => {
                            writeln!(f, "**{target}**: lookup failed ({reason})")?;
                        }
                    }
                }
                if let Some(difference) = price_difference {
                    writeln!(f)?;
                    writeln!(f, "**Price difference:** USD {difference:.2}")?;
                }
                if let Some(cheaper) = cheaper {
                    writeln!(f, "**Cheaper:** {cheaper}")?;
                }
                write_notices(f, notices)
            }
            Self::NoResults { notices, .. } => {
                writeln!(f, "No products matched the criteria.")?;
                write_notices(f, notices)
            }
            Self::NeedMoreInformation { intent, reason } => {
                writeln!(
                    f,
                    "Need more information to answer this {intent} query: {reason}."
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackendKind, StageFailure, StageId};
    use shopkeep_core::ScoredProduct;

    fn result(stage: usize, subject: &str, status: StageStatus, records: Vec<ScoredProduct>) -> StageResult {
        StageResult {
            stage: StageId::new(stage),
            backend: BackendKind::Graph,
            description: format!("lookup '{subject}'"),
            subject: subject.to_owned(),
            status,
            records,
            used_fallback: false,
            elapsed_ms: 1,
        }
    }

    fn record(stage: usize, id: &str, price: f64, score: f32) -> CombinedRecord {
        CombinedRecord {
            product: Product::new(id, format!("Product {id}"), price),
            score,
            provenance: vec![StageId::new(stage)],
        }
    }

    fn combined(records: Vec<CombinedRecord>) -> CombinedResult {
        CombinedResult {
            records,
            omitted: 0,
            units_used: 0,
        }
    }

    #[test]
    fn test_price_comparison_ranks_by_price_ascending() {
        let formatted = ResultFormatter::format(
            Intent::PriceComparison,
            &[],
            &combined(vec![record(1, "a", 140.0, 0.0), record(1, "b", 90.0, 0.0)]),
        );
        let FormattedResult::Ranked { items, .. } = formatted else {
            panic!("expected a ranked list");
        };
        assert_eq!(items[0].product.id.as_str(), "b");
        assert_eq!(items[1].product.id.as_str(), "a");
    }

    #[test]
    fn test_recommendation_ranks_by_score_keeping_ties_stable() {
        let formatted = ResultFormatter::format(
            Intent::Recommendation,
            &[],
            &combined(vec![
                record(1, "a", 10.0, 0.2),
                record(1, "b", 10.0, 0.9),
                record(1, "c", 10.0, 0.2),
            ]),
        );
        let FormattedResult::Ranked { items, .. } = formatted else {
            panic!("expected a ranked list");
        };
        let order: Vec<&str> = items.iter().map(|item| item.product.id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_empty_result_is_explicit() {
        let formatted = ResultFormatter::format(Intent::Similarity, &[], &CombinedResult::default());
        assert_eq!(
            formatted,
            FormattedResult::NoResults {
                intent: Intent::Similarity,
                notices: Vec::new()
            }
        );
        assert_eq!(formatted.to_string(), "No products matched the criteria.\n");
    }

    #[test]
    fn test_comparison_marks_failed_lookup() {
        let found = Product::new("1", "Nike Air Zoom", 120.0).with_category("Calzado");
        let results = [
            result(1, "Nike Air Zoom", StageStatus::Ok, vec![ScoredProduct::new(found.clone(), 0.0)]),
            result(
                2,
                "Adidas Ultraboost",
                StageStatus::Failed(StageFailure::Backend {
                    message: "backend unavailable: graph down".to_owned(),
                }),
                Vec::new(),
            ),
        ];
        let combined = combined(vec![CombinedRecord {
            product: found,
            score: 0.0,
            provenance: vec![StageId::new(1)],
        }]);

        let formatted = ResultFormatter::format(Intent::Comparison, &results, &combined);
        let FormattedResult::Comparison {
            entries,
            price_difference,
            notices,
            ..
        } = &formatted
        else {
            panic!("expected a comparison");
        };
        assert!(matches!(entries[0], ComparisonEntry::Found { .. }));
        assert!(matches!(entries[1], ComparisonEntry::Failed { .. }));
        assert_eq!(*price_difference, None);
        assert_eq!(
            notices,
            &vec!["stage 2 (lookup 'Adidas Ultraboost') failed: backend unavailable: graph down".to_owned()]
        );

        let rendered = formatted.to_string();
        assert!(rendered.contains("**Nike Air Zoom**"));
        assert!(rendered.contains("**Adidas Ultraboost**: lookup failed"));
    }

    #[test]
    fn test_comparison_price_difference() {
        let first = Product::new("1", "Pegasus 40", 120.0);
        let second = Product::new("2", "Nano X3", 140.5);
        let results = [
            result(1, "Pegasus", StageStatus::Ok, vec![ScoredProduct::new(first.clone(), 0.0)]),
            result(2, "Nano", StageStatus::Ok, vec![ScoredProduct::new(second.clone(), 0.0)]),
        ];
        let combined = combined(vec![
            CombinedRecord { product: first, score: 0.0, provenance: vec![StageId::new(1)] },
            CombinedRecord { product: second, score: 0.0, provenance: vec![StageId::new(2)] },
        ]);

        let formatted = ResultFormatter::format(Intent::Comparison, &results, &combined);
        let FormattedResult::Comparison { price_difference, cheaper, .. } = formatted else {
            panic!("expected a comparison");
        };
        assert_eq!(price_difference, Some(20.5));
        assert_eq!(cheaper.as_deref(), Some("Pegasus 40"));
    }

    #[test]
    fn test_need_more_information_renders_reason() {
        let formatted = ResultFormatter::need_more_information(Intent::Similarity, "no reference product");
        assert_eq!(
            formatted.to_string(),
            "Need more information to answer this similarity query: no reference product.\n"
        );
    }
}
