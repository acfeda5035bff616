//! In-memory product catalog.
//!
//! Answers relationship queries with the same rules the graph ingestion uses
//! to create its edges, and semantic queries with a token-overlap score. It
//! backs the CLI when no graph server is configured and gives tests a
//! realistic catalog without network access.

use async_trait::async_trait;
use serde_json::from_str;
use shopkeep_core::{
    Entity, GraphBackend, Product, RelationKind, RelationshipQuery, Result, ResultOrdering,
    ScoredProduct, SemanticQuery, VectorBackend,
};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs::read_to_string;

/// Maximum relative price distance for two products to count as similar.
const SIMILAR_PRICE_RATIO: f64 = 0.2;

/// Words too common to say anything about a product.
const STOPWORDS: &[&str] = &[
    "de", "del", "el", "la", "los", "las", "un", "una", "para", "por", "con", "que", "en", "y",
    "the", "a", "an", "for", "with", "and", "of", "to", "in", "me", "my", "mi", "quiero", "busco",
];

/// Product catalog held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Vec<Product>,
}

impl InMemoryCatalog {
    /// Create a catalog from already-parsed products.
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Parse a JSON array of products.
    ///
    /// # Errors
    /// Returns an error if the JSON is not an array of product records.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(from_str(json)?))
    }

    /// Load a JSON catalog file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path).await?;
        let catalog = Self::from_json(&contents)?;
        tracing::info!(
            "Loaded {} products from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Number of products in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// All products in catalog order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Products the entity refers to. Name matches put exact names first.
    fn anchors(&self, entity: &Entity) -> Vec<&Product> {
        match entity {
            Entity::Name(name) => {
                let wanted = fold(name);
                let mut exact = Vec::new();
                let mut partial = Vec::new();
                for product in &self.products {
                    let folded = fold(&product.name);
                    if folded == wanted {
                        exact.push(product);
                    } else if folded.contains(&wanted) {
                        partial.push(product);
                    }
                }
                exact.extend(partial);
                exact
            }
            Entity::Ids(ids) => self
                .products
                .iter()
                .filter(|product| ids.contains(&product.id))
                .collect(),
        }
    }

    fn similar_to<'catalog>(&'catalog self, anchors: &[&Product]) -> Vec<&'catalog Product> {
        let anchor_ids: HashSet<_> = anchors.iter().map(|anchor| &anchor.id).collect();
        self.products
            .iter()
            .filter(|candidate| !anchor_ids.contains(&candidate.id))
            .filter(|candidate| {
                anchors.iter().any(|anchor| {
                    anchor.shares_category_with(candidate)
                        || (anchor.price > 0.0
                            && (anchor.price - candidate.price).abs() / anchor.price
                                <= SIMILAR_PRICE_RATIO)
                })
            })
            .collect()
    }

    fn cheaper_than<'catalog>(&'catalog self, anchors: &[&Product]) -> Vec<&'catalog Product> {
        let Some(ceiling) = anchors
            .iter()
            .map(|anchor| anchor.price)
            .max_by(f64::total_cmp)
        else {
            return Vec::new();
        };
        let anchor_ids: HashSet<_> = anchors.iter().map(|anchor| &anchor.id).collect();
        self.products
            .iter()
            .filter(|candidate| !anchor_ids.contains(&candidate.id) && candidate.price < ceiling)
            .collect()
    }

    fn belongs_to_category<'catalog>(&'catalog self, entity: &Entity) -> Vec<&'catalog Product> {
        let wanted: Vec<String> = match entity {
            Entity::Name(name) => vec![fold(name)],
            Entity::Ids(_) => self
                .anchors(entity)
                .iter()
                .flat_map(|anchor| anchor.categories.iter().map(|category| fold(&category.name)))
                .collect(),
        };
        self.products
            .iter()
            .filter(|product| {
                product.categories.iter().any(|category| {
                    let folded = fold(&category.name);
                    wanted.iter().any(|name| folded.contains(name.as_str()))
                })
            })
            .collect()
    }
}

/// Sort `records` according to `ordering`, using the first anchor as reference.
fn order_records(records: &mut [Product], ordering: ResultOrdering, reference: Option<&Product>) {
    match ordering {
        ResultOrdering::Backend | ResultOrdering::ScoreDescending => {}
        ResultOrdering::PriceAscending => {
            records.sort_by(|left, right| left.price.total_cmp(&right.price));
        }
        ResultOrdering::SameCategoryThenNearestPrice => {
            let Some(reference) = reference else {
                return;
            };
            records.sort_by(|left, right| {
                let left_same = reference.shares_category_with(left);
                let right_same = reference.shares_category_with(right);
                right_same.cmp(&left_same).then_with(|| {
                    let left_distance = (left.price - reference.price).abs();
                    let right_distance = (right.price - reference.price).abs();
                    left_distance.total_cmp(&right_distance)
                })
            });
        }
    }
}

#[async_trait]
impl GraphBackend for InMemoryCatalog {
    fn name(&self) -> &'static str {
        "memory-graph"
    }

    async fn execute_relationship_query(&self, query: &RelationshipQuery) -> Result<Vec<Product>> {
        let anchors = self.anchors(&query.entity);

        let candidates = match query.relation {
            RelationKind::Lookup => anchors.clone(),
            RelationKind::SimilarTo => self.similar_to(&anchors),
            RelationKind::CheaperThan => self.cheaper_than(&anchors),
            RelationKind::BelongsToCategory => self.belongs_to_category(&query.entity),
        };

        let mut records: Vec<Product> = candidates
            .into_iter()
            .filter(|product| query.filters.matches(product))
            .cloned()
            .collect();
        order_records(&mut records, query.ordering, anchors.first().copied());
        records.truncate(query.limit);

        tracing::debug!(
            "{} {} {} -> {} records",
            GraphBackend::name(self),
            query.relation,
            query.entity,
            records.len()
        );
        Ok(records)
    }
}

#[async_trait]
impl VectorBackend for InMemoryCatalog {
    fn name(&self) -> &'static str {
        "memory-vector"
    }

    async fn execute_semantic_query(&self, query: &SemanticQuery) -> Result<Vec<ScoredProduct>> {
        let terms = terms(&query.text);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredProduct> = self
            .products
            .iter()
            .filter(|product| query.filters.matches(product))
            .filter_map(|product| {
                let haystack = searchable_terms(product);
                let hits = terms.iter().filter(|term| haystack.contains(*term)).count();
                (hits > 0).then(|| ScoredProduct::new(product.clone(), hits as f32 / terms.len() as f32))
            })
            .collect();
        scored.sort_by(|left, right| {
            right
                .score
                .partial_cmp(&left.score)
                .unwrap_or(Ordering::Equal)
        });
        scored.truncate(query.top_k);

        tracing::debug!(
            "{} '{}' -> {} records",
            VectorBackend::name(self),
            query.text,
            scored.len()
        );
        Ok(scored)
    }
}

/// Lowercase and strip the Spanish diacritics the catalog commonly carries.
fn fold(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|character| match character {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    fold(text)
        .split(|character: char| !character.is_alphanumeric())
        .filter(|term| term.len() > 1 && !STOPWORDS.contains(term))
        .filter(|term| seen.insert((*term).to_owned()))
        .map(str::to_owned)
        .collect()
}

fn searchable_terms(product: &Product) -> HashSet<String> {
    let mut text = product.name.clone();
    for category in &product.categories {
        text.push(' ');
        text.push_str(&category.name);
    }
    for extra in [&product.brand, &product.description].into_iter().flatten() {
        text.push(' ');
        text.push_str(extra);
    }
    terms(&text).into_iter().collect()
}
