use crate::types::{Product, ProductId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Relationship kinds the graph backend answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    /// Products filed under a category whose name contains the entity.
    BelongsToCategory,
    /// Same category, or price within ±20 % of the reference.
    SimilarTo,
    /// Strictly lower price than the reference.
    CheaperThan,
    /// The referenced product itself, with its full attribute set.
    Lookup,
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::BelongsToCategory => "belongs-to-category",
            Self::SimilarTo => "similar-to",
            Self::CheaperThan => "cheaper-than",
            Self::Lookup => "lookup",
        })
    }
}

/// Anchor of a relationship query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    /// Free-text name, matched case-insensitively as a substring.
    Name(String),
    /// Exact identifiers, produced from an earlier stage's output.
    Ids(Vec<ProductId>),
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Name(name) => write!(f, "'{name}'"),
            Self::Ids(ids) => {
                let joined = ids
                    .iter()
                    .map(ProductId::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "ids [{joined}]")
            }
        }
    }
}

/// How a backend should order the records it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrdering {
    /// Whatever order the backend produces.
    #[default]
    Backend,
    /// Same category as the reference first, then by distance to its price.
    SameCategoryThenNearestPrice,
    /// Cheapest first.
    PriceAscending,
    /// Highest semantic score first.
    ScoreDescending,
}

/// Structured predicates applied to returned records.
///
/// Every field is optional. A `None` field is unconstrained, and a record that
/// does not report an attribute (no sizes, no categories) is never excluded
/// by a predicate on that attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilters {
    /// Keep only records whose stock status is `instock`
    pub in_stock_only: bool,
    /// Category name, matched case-insensitively as a substring
    pub category: Option<String>,
    /// Size the product must be offered in
    pub size: Option<String>,
    /// Inclusive lower price bound
    pub min_price: Option<f64>,
    /// Inclusive upper price bound
    pub max_price: Option<f64>,
    /// Restrict results to these ids
    pub candidate_ids: Option<Vec<ProductId>>,
}

impl RecordFilters {
    /// Unconstrained filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `instock`.
    #[must_use]
    pub fn in_stock(mut self) -> Self {
        self.in_stock_only = true;
        self
    }

    /// Set or clear the category predicate.
    #[must_use]
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    /// Set or clear the size predicate.
    #[must_use]
    pub fn with_size(mut self, size: Option<String>) -> Self {
        self.size = size;
        self
    }

    /// Set or clear the price ceiling.
    #[must_use]
    pub fn with_max_price(mut self, max_price: Option<f64>) -> Self {
        self.max_price = max_price;
        self
    }

    /// Restrict to `ids`.
    #[must_use]
    pub fn with_candidate_ids(mut self, ids: Vec<ProductId>) -> Self {
        self.candidate_ids = Some(ids);
        self
    }

    /// Whether `product` satisfies every predicate.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if self.in_stock_only && !product.stock_status.is_in_stock() {
            return false;
        }

        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }

        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }

        if let Some(ids) = &self.candidate_ids
            && !ids.contains(&product.id)
        {
            return false;
        }

        if let Some(category) = &self.category
            && !product.categories.is_empty()
        {
            let wanted = category.to_lowercase();
            let filed = product
                .categories
                .iter()
                .any(|candidate| candidate.name.to_lowercase().contains(&wanted));
            if !filed {
                return false;
            }
        }

        if let Some(size) = &self.size
            && !product.sizes.is_empty()
            && !product.sizes.iter().any(|offered| sizes_match(offered, size))
        {
            return false;
        }

        true
    }

    /// Short human-readable summary, e.g. `in stock, size 42`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.in_stock_only {
            parts.push("in stock".to_owned());
        }
        if let Some(category) = &self.category {
            parts.push(format!("category {category}"));
        }
        if let Some(size) = &self.size {
            parts.push(format!("size {size}"));
        }
        if let Some(max_price) = self.max_price {
            parts.push(format!("price <= {max_price}"));
        }
        if let Some(ids) = &self.candidate_ids {
            parts.push(format!("{} candidate ids", ids.len()));
        }
        if parts.is_empty() {
            "unfiltered".to_owned()
        } else {
            parts.join(", ")
        }
    }
}

/// Sizes match on their leading number when both have one ("42" == "42 EU"),
/// otherwise on case-insensitive text.
fn sizes_match(offered: &str, wanted: &str) -> bool {
    match (size_number(offered), size_number(wanted)) {
        (Some(left), Some(right)) => left == right,
        _ => offered.trim().eq_ignore_ascii_case(wanted.trim()),
    }
}

/// Leading number of a size label with `,` read as `.`, e.g. `42` for
/// `42 EU` or `10.5` for `10,5`.
pub fn size_number(text: &str) -> Option<String> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|character| character.is_ascii_digit() || matches!(character, '.' | ','))
        .map(|character| if character == ',' { '.' } else { character })
        .collect();
    let digits = digits.trim_end_matches('.');
    (!digits.is_empty()).then(|| digits.to_owned())
}

/// Relation-typed lookup sent to a [`GraphBackend`](crate::GraphBackend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipQuery {
    /// What the relation is anchored on
    pub entity: Entity,
    /// Relation to follow from the anchor
    pub relation: RelationKind,
    /// Predicates every returned record must satisfy
    pub filters: RecordFilters,
    /// Requested record order
    pub ordering: ResultOrdering,
    /// Maximum number of records
    pub limit: usize,
}

impl RelationshipQuery {
    /// Unfiltered query returning at most five records.
    #[must_use]
    pub fn new(entity: Entity, relation: RelationKind) -> Self {
        Self {
            entity,
            relation,
            filters: RecordFilters::default(),
            ordering: ResultOrdering::Backend,
            limit: 5,
        }
    }

    /// Replace the filters.
    #[must_use]
    pub fn with_filters(mut self, filters: RecordFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Set the record order.
    #[must_use]
    pub fn with_ordering(mut self, ordering: ResultOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Set the record limit.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Free-text ranked lookup sent to a [`VectorBackend`](crate::VectorBackend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticQuery {
    /// Free text to rank against
    pub text: String,
    /// Predicates every returned record must satisfy
    pub filters: RecordFilters,
    /// Maximum number of records
    pub top_k: usize,
}

impl SemanticQuery {
    /// Unfiltered query for the `top_k` best matches.
    #[must_use]
    pub fn new(text: impl Into<String>, top_k: usize) -> Self {
        Self {
            text: text.into(),
            filters: RecordFilters::default(),
            top_k,
        }
    }

    /// Replace the filters.
    #[must_use]
    pub fn with_filters(mut self, filters: RecordFilters) -> Self {
        self.filters = filters;
        self
    }
}
