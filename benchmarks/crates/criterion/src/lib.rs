//! Shared fixtures for the criterion benchmarks.

use shopkeep_backends::InMemoryCatalog;
use shopkeep_core::{Product, StockStatus};

const CATEGORIES: [&str; 4] = ["Calzado", "Ropa", "Accesorios", "Pulseras"];
const WORDS: [&str; 8] = [
    "trail", "running", "urbano", "cuero", "impermeable", "ligero", "training", "casual",
];

/// A deterministic catalog of `size` products spread over four categories.
pub fn catalog(size: usize) -> InMemoryCatalog {
    let products = (0..size)
        .map(|index| {
            let word = WORDS[index % WORDS.len()];
            let category = CATEGORIES[index % CATEGORIES.len()];
            let stock = if index % 7 == 0 {
                StockStatus::OutOfStock
            } else {
                StockStatus::InStock
            };
            Product::new(
                index.to_string(),
                format!("Modelo {index} {word}"),
                20.0 + (index % 50) as f64 * 3.5,
            )
            .with_category(category)
            .with_sizes(["40", "41", "42", "43"])
            .with_stock_status(stock)
            .with_description(format!("producto {word} para uso diario"))
        })
        .collect();
    InMemoryCatalog::new(products)
}
