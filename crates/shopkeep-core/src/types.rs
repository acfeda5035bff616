use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Catalog identifier of a product.
///
/// Catalog exports use integer ids while the graph store keeps strings, so
/// both forms deserialize into the same textual id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Wraps a textual id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Integer(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Integer(number) => Self(number.to_string()),
        })
    }
}

/// Stock status as reported by the store (`instock`, `outofstock`, ...).
///
/// A record that does not report a status is `Unknown`, which never passes
/// an in-stock filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    /// Available to buy
    InStock,
    /// Not available
    OutOfStock,
    /// Orderable, ships later
    OnBackorder,
    /// Any other status, or none reported
    #[default]
    #[serde(other)]
    Unknown,
}

impl StockStatus {
    /// Whether the status is exactly `instock`.
    #[must_use]
    pub fn is_in_stock(self) -> bool {
        matches!(self, Self::InStock)
    }
}

impl Display for StockStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::InStock => "instock",
            Self::OutOfStock => "outofstock",
            Self::OnBackorder => "onbackorder",
            Self::Unknown => "unknown",
        })
    }
}

/// Reference to a catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryRef {
    /// Category name as stored
    pub name: String,
}

impl CategoryRef {
    /// Reference to the category called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A product record as returned by either backend.
///
/// `id`, `name` and `price` are always present; a missing `stock_status`
/// reads as [`StockStatus::Unknown`]. The remaining attributes are optional:
/// an empty list or `None` means the backend did not
/// report them, not that the product has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Price in the store currency
    pub price: f64,
    /// Availability, `unknown` when not reported
    #[serde(default)]
    pub stock_status: StockStatus,
    /// Categories the product is filed under
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    /// Offered sizes
    #[serde(default, deserialize_with = "deserialize_sizes")]
    pub sizes: Vec<String>,
    /// Brand name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Store SKU
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Product {
    /// In-stock product with no optional attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: ProductId::new(id),
            name: name.into(),
            price,
            stock_status: StockStatus::InStock,
            categories: Vec::new(),
            sizes: Vec::new(),
            brand: None,
            sku: None,
            description: None,
        }
    }

    /// Set the stock status.
    #[must_use]
    pub fn with_stock_status(mut self, stock_status: StockStatus) -> Self {
        self.stock_status = stock_status;
        self
    }

    /// Add a category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(CategoryRef::new(category));
        self
    }

    /// Replace the offered sizes.
    #[must_use]
    pub fn with_sizes<I, S>(mut self, sizes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sizes = sizes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the brand.
    #[must_use]
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// First category reported for the product, if any.
    #[must_use]
    pub fn primary_category(&self) -> Option<&str> {
        self.categories.first().map(|category| category.name.as_str())
    }

    /// Whether the product shares at least one category with `other`.
    #[must_use]
    pub fn shares_category_with(&self, other: &Self) -> bool {
        self.categories.iter().any(|category| {
            other
                .categories
                .iter()
                .any(|theirs| theirs.name.eq_ignore_ascii_case(&category.name))
        })
    }
}

/// A product ranked by a semantic backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
    /// The ranked record
    #[serde(flatten)]
    pub product: Product,
    /// Backend similarity, higher is closer
    pub score: f32,
}

impl ScoredProduct {
    /// Pairs a product with its score.
    #[must_use]
    pub fn new(product: Product, score: f32) -> Self {
        Self { product, score }
    }
}

/// Sizes arrive either as a list or as the store's comma-separated string.
fn deserialize_sizes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSizes {
        List(Vec<String>),
        Joined(String),
        Missing(()),
    }

    Ok(match RawSizes::deserialize(deserializer)? {
        RawSizes::List(sizes) => sizes,
        RawSizes::Joined(joined) => joined
            .split([',', ';', '|'])
            .map(str::trim)
            .filter(|size| !size.is_empty())
            .map(str::to_owned)
            .collect(),
        RawSizes::Missing(()) => Vec::new(),
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "Test code is allowed to use expect")]
mod tests {
    use super::*;
    use serde_json::{from_str, to_value};

    #[test]
    fn test_product_id_from_integer_and_string() {
        let numeric: ProductId = from_str("1042").expect("integer id should parse");
        let textual: ProductId = from_str("\"1042\"").expect("string id should parse");
        assert_eq!(numeric, textual);
        assert_eq!(numeric.as_str(), "1042");
    }

    #[test]
    fn test_product_from_store_export() {
        let json = r#"{
            "id": 7,
            "name": "Metcon 9",
            "price": 149.9,
            "stock_status": "instock",
            "categories": [{"name": "Calzado"}],
            "sizes": "40, 41,42"
        }"#;
        let product: Product = from_str(json).expect("product should parse");

        assert_eq!(product.id.as_str(), "7");
        assert!(product.stock_status.is_in_stock());
        assert_eq!(product.primary_category(), Some("Calzado"));
        assert_eq!(product.sizes, vec!["40", "41", "42"]);
        assert!(product.brand.is_none());
    }

    #[test]
    fn test_unknown_stock_status() {
        let json = r#"{"id": "x", "name": "X", "price": 1.0, "stock_status": "discontinued"}"#;
        let product: Product = from_str(json).expect("product should parse");
        assert_eq!(product.stock_status, StockStatus::Unknown);
        assert!(!product.stock_status.is_in_stock());
    }

    #[test]
    fn test_missing_stock_status_is_unknown() {
        let json = r#"{"id": 3, "name": "Nano X3", "price": 120.0}"#;
        let product: Product = from_str(json).expect("product should parse");
        assert_eq!(product.stock_status, StockStatus::Unknown);
        assert!(!product.stock_status.is_in_stock());
    }

    #[test]
    fn test_shares_category_is_case_insensitive() {
        let shoe = Product::new("1", "Metcon 9", 150.0).with_category("Calzado");
        let other = Product::new("2", "Pegasus 40", 130.0).with_category("calzado");
        let bracelet = Product::new("3", "Pulsera 9", 20.0).with_category("Pulseras");

        assert!(shoe.shares_category_with(&other));
        assert!(!shoe.shares_category_with(&bracelet));
    }

    #[test]
    fn test_scored_product_flattens() {
        let scored = ScoredProduct::new(Product::new("1", "Metcon 9", 150.0), 0.75);
        let value = to_value(&scored).expect("serialize failed");
        assert_eq!(value["name"], "Metcon 9");
        assert_eq!(value["stock_status"], "instock");
    }
}
