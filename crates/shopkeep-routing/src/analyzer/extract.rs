use super::patterns::{
    ARTICLES, CLAUSE_BOUNDARY, COMPARISON_LEAD_IN, CueTable, LEADING_ARTICLE, PRICE_CEILING,
    PRICE_ONLY, SIZE,
};
use crate::config::CategoryLexicon;
use crate::error::Result;
use crate::types::{ExtractedParameters, Intent};
use regex::Regex;
use std::sync::Arc;

/// Pulls structured slots out of free text.
///
/// Extraction never fails: a slot with no candidate is left absent and the
/// planner decides what to do about it.
#[derive(Debug, Clone)]
pub struct ParameterExtractor {
    cues: Arc<CueTable>,
    boundary: Regex,
    lead_in: Regex,
    price_ceiling: Regex,
    price_only: Regex,
    size: Regex,
    leading_article: Regex,
    lexicon: CategoryLexicon,
}

impl ParameterExtractor {
    /// Creates an extractor over the shared cue table.
    ///
    /// # Errors
    /// Returns an error if an auxiliary pattern fails to compile
    pub fn new(cues: Arc<CueTable>, lexicon: CategoryLexicon) -> Result<Self> {
        Ok(Self {
            cues,
            boundary: Regex::new(CLAUSE_BOUNDARY)?,
            lead_in: Regex::new(COMPARISON_LEAD_IN)?,
            price_ceiling: Regex::new(PRICE_CEILING)?,
            price_only: Regex::new(PRICE_ONLY)?,
            size: Regex::new(SIZE)?,
            leading_article: Regex::new(LEADING_ARTICLE)?,
            lexicon,
        })
    }

    /// Extracts every slot relevant to `intent` from `query`.
    pub fn extract(&self, query: &str, intent: Intent) -> ExtractedParameters {
        let mut parameters = ExtractedParameters::default();

        match intent {
            Intent::Comparison => {
                parameters.comparison_targets = self.comparison_targets(query);
            }
            Intent::Similarity => {
                parameters.reference_product = self.phrase(Intent::Similarity, "reference", query);
            }
            Intent::PriceComparison => {
                let price_reference = self.phrase(Intent::PriceComparison, "reference", query);
                let amount = price_reference
                    .as_deref()
                    .and_then(|reference| self.amount_only(reference));
                parameters.price_ceiling = amount;
                parameters.reference_product = price_reference
                    .filter(|_| amount.is_none())
                    .or_else(|| self.phrase(Intent::Similarity, "reference", query));
            }
            Intent::Recommendation => {
                parameters.use_case = self.phrase(Intent::Recommendation, "use_case", query);
            }
            Intent::Simple => {}
        }

        if parameters.price_ceiling.is_none() {
            parameters.price_ceiling = self.price_ceiling(query);
        }
        parameters.size = self.size(query);
        parameters.category = self.category(query);

        parameters
    }

    /// First non-empty `group` capture among the cues for `intent`.
    fn phrase(&self, intent: Intent, group: &str, query: &str) -> Option<String> {
        self.cues.cues(intent).iter().find_map(|cue| {
            let captured = cue.captures(query)?.name(group)?;
            self.clean(self.until_boundary(captured.as_str()))
        })
    }

    fn comparison_targets(&self, query: &str) -> Option<(String, String)> {
        self.cues
            .cues(Intent::Comparison)
            .iter()
            .find_map(|cue| {
                let captures = cue.captures(query)?;
                let first = self.first_target(captures.name("first")?.as_str())?;
                let second = self.clean(self.until_boundary(captures.name("second")?.as_str()))?;
                Some((first, second))
            })
    }

    /// The first comparison target is whatever follows the last clause
    /// break, minus lead-in words such as `precios de`.
    fn first_target(&self, phrase: &str) -> Option<String> {
        let last_clause = phrase
            .rfind([',', ':', ';'])
            .map_or(phrase, |index| &phrase[index + 1..]);
        let cleaned = self.clean(last_clause)?;
        self.clean(&self.lead_in.replace(&cleaned, ""))
    }

    fn until_boundary<'text>(&self, phrase: &'text str) -> &'text str {
        self.boundary
            .find(phrase)
            .map_or(phrase, |boundary| &phrase[..boundary.start()])
    }

    /// Trims punctuation, collapses whitespace and strips leading articles.
    fn clean(&self, phrase: &str) -> Option<String> {
        let mut current = collapse(phrase.trim_matches(is_edge_noise));
        loop {
            let stripped = collapse(
                self.leading_article
                    .replace(&current, "")
                    .trim_matches(is_edge_noise),
            );
            if stripped == current {
                break;
            }
            current = stripped;
        }

        let only_article = ARTICLES
            .iter()
            .any(|article| current.eq_ignore_ascii_case(article));
        (!current.is_empty() && !only_article).then_some(current)
    }

    fn amount_only(&self, phrase: &str) -> Option<f64> {
        let captures = self.price_only.captures(phrase.trim())?;
        parse_amount(captures.name("amount")?.as_str())
    }

    fn price_ceiling(&self, query: &str) -> Option<f64> {
        let captures = self.price_ceiling.captures(query)?;
        parse_amount(captures.name("amount")?.as_str())
    }

    fn size(&self, query: &str) -> Option<String> {
        let captures = self.size.captures(query)?;
        if let Some(letter) = captures.name("letter") {
            return Some(letter.as_str().to_uppercase());
        }
        let number = captures.name("number")?.as_str().replace(',', ".");
        Some(match captures.name("unit") {
            Some(unit) => format!("{number} {}", unit.as_str().to_uppercase()),
            None => number,
        })
    }

    /// First lexicon category with a keyword present as a whole word.
    fn category(&self, query: &str) -> Option<String> {
        let text = format!(" {} ", normalize_words(query));
        self.lexicon
            .entries()
            .find(|(_, keywords)| {
                keywords.iter().any(|keyword| {
                    let keyword = normalize_words(keyword);
                    !keyword.is_empty() && text.contains(&format!(" {keyword} "))
                })
            })
            .map(|(category, _)| category.to_owned())
    }
}

fn is_edge_noise(character: char) -> bool {
    character.is_whitespace()
        || matches!(
            character,
            '"' | '\'' | '¿' | '?' | '¡' | '!' | '.' | ',' | ';' | ':' | '(' | ')'
        )
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercases, folds Spanish accents and turns punctuation into spaces.
fn normalize_words(text: &str) -> String {
    let spaced: String = text
        .to_lowercase()
        .chars()
        .map(|character| match character {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            other if other.is_alphanumeric() => other,
            _ => ' ',
        })
        .collect();
    collapse(&spaced)
}

fn parse_amount(amount: &str) -> Option<f64> {
    amount.replace(',', ".").parse().ok()
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "Test code is allowed to use expect")]
mod tests {
    use super::*;

    fn extractor() -> ParameterExtractor {
        let cues = Arc::new(CueTable::compile().expect("cue table failed to compile"));
        ParameterExtractor::new(cues, CategoryLexicon::default())
            .expect("extractor failed to compile")
    }

    #[test]
    fn test_price_reference_and_size() {
        let parameters = extractor().extract(
            "alternativas más baratas que el Metcon 9 en talla 42",
            Intent::PriceComparison,
        );
        assert_eq!(
            parameters,
            ExtractedParameters {
                reference_product: Some("Metcon 9".to_owned()),
                size: Some("42".to_owned()),
                ..ExtractedParameters::default()
            }
        );
    }

    #[test]
    fn test_leading_article_stripped() {
        let parameters = extractor().extract("algo similar al el Metcon 9", Intent::Similarity);
        assert_eq!(parameters.reference_product.as_deref(), Some("Metcon 9"));

        let parameters = extractor().extract("productos parecidos a el Metcon 9", Intent::Similarity);
        assert_eq!(parameters.reference_product.as_deref(), Some("Metcon 9"));
    }

    #[test]
    fn test_similarity_reference_used_for_but_cheaper() {
        let parameters =
            extractor().extract("similar to the Metcon 9 but cheaper", Intent::PriceComparison);
        assert_eq!(parameters.reference_product.as_deref(), Some("Metcon 9"));
    }

    #[test]
    fn test_comparison_targets() {
        let parameters = extractor().extract(
            "comparar Nike Air Zoom vs Adidas Ultraboost",
            Intent::Comparison,
        );
        assert_eq!(
            parameters.comparison_targets,
            Some(("Nike Air Zoom".to_owned(), "Adidas Ultraboost".to_owned()))
        );

        let parameters = extractor().extract(
            "diferencias entre la Pegasus 40 y las Nano X3?",
            Intent::Comparison,
        );
        assert_eq!(
            parameters.comparison_targets,
            Some(("Pegasus 40".to_owned(), "Nano X3".to_owned()))
        );
    }

    #[test]
    fn test_first_target_after_clause_break() {
        let extractor = extractor();
        let cases = [
            ("cuál es mejor para correr, Pegasus 40 vs Nano X3", "Pegasus 40", "Nano X3"),
            (
                "quiero comparar precios: Nike Air Zoom vs Adidas Ultraboost",
                "Nike Air Zoom",
                "Adidas Ultraboost",
            ),
            ("¿cuál es mejor para correr, Pegasus 40 o Nano X3?", "Pegasus 40", "Nano X3"),
            ("compara los precios de la Pegasus 40 con el Nano X3", "Pegasus 40", "Nano X3"),
        ];
        for (query, first, second) in cases {
            let parameters = extractor.extract(query, Intent::Comparison);
            assert_eq!(
                parameters.comparison_targets,
                Some((first.to_owned(), second.to_owned())),
                "query: {query}"
            );
        }
    }

    #[test]
    fn test_category_ignores_accents() {
        let extractor = extractor();
        let parameters = extractor.extract("el mejor pantalon para correr", Intent::Recommendation);
        assert_eq!(parameters.category.as_deref(), Some("ropa"));

        let parameters = extractor.extract("zapatíllas ideales para correr", Intent::Recommendation);
        assert_eq!(parameters.category.as_deref(), Some("calzado"));
    }

    #[test]
    fn test_numeric_price_reference_becomes_ceiling() {
        let parameters = extractor().extract("zapatillas más baratas que 100 dólares", Intent::PriceComparison);
        assert_eq!(parameters.price_ceiling, Some(100.0));
        assert_eq!(parameters.reference_product, None);
        assert_eq!(parameters.category.as_deref(), Some("calzado"));
    }

    #[test]
    fn test_price_ceiling_cues() {
        let extractor = extractor();
        let cases = [
            ("mejor para correr hasta 80 USD", 80.0),
            ("best shoes for trail running under $120", 120.0),
            ("ideal para yoga por debajo de 49,90 €", 49.9),
            ("lo mejor para el gimnasio menos de 60", 60.0),
        ];
        for (query, expected) in cases {
            let parameters = extractor.extract(query, Intent::Recommendation);
            assert_eq!(parameters.price_ceiling, Some(expected), "query: {query}");
        }
    }

    #[test]
    fn test_use_case_stops_at_boundary() {
        let parameters = extractor().extract(
            "¿qué zapatillas me recomiendas para correr en montaña, talla 43?",
            Intent::Recommendation,
        );
        assert_eq!(parameters.use_case.as_deref(), Some("correr en montaña"));
        assert_eq!(parameters.size.as_deref(), Some("43"));
        assert_eq!(parameters.category.as_deref(), Some("calzado"));
    }

    #[test]
    fn test_size_units_and_letters() {
        let extractor = extractor();
        let parameters = extractor.extract("best running shoes for marathons size 10.5 us", Intent::Recommendation);
        assert_eq!(parameters.size.as_deref(), Some("10.5 US"));

        let parameters = extractor.extract("chaqueta ideal para lluvia talla m", Intent::Recommendation);
        assert_eq!(parameters.size.as_deref(), Some("M"));
        assert_eq!(parameters.category.as_deref(), Some("ropa"));
    }

    #[test]
    fn test_missing_slots_stay_absent() {
        let parameters = extractor().extract("show me something similar to the", Intent::Similarity);
        assert!(parameters.is_empty());
    }
}
