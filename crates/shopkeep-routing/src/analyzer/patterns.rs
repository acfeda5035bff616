//! Cue tables for activation, classification and extraction.
//!
//! Each family is a list of regular expressions tied to one intent. Cues are
//! compiled case-insensitively and run against the raw query text, so
//! captured names keep their casing. Named groups:
//!
//! - `reference`: the product a similarity or price cue points at
//! - `first` / `second`: the two comparison targets
//! - `use_case`: what a recommendation is for
//!
//! Cues without a group still count for activation and classification.

use crate::error::Result;
use crate::types::Intent;
use regex::Regex;
use std::result::Result as StdResult;

/// A list of cues that all signal the same intent.
#[derive(Debug, Clone, Copy)]
pub struct CueFamily {
    /// Intent the cues signal
    pub intent: Intent,
    /// Case-insensitive regex sources
    pub cues: &'static [&'static str],
}

/// Classification order when several families match the same query.
pub const PRECEDENCE: [Intent; 4] = [
    Intent::PriceComparison,
    Intent::Comparison,
    Intent::Similarity,
    Intent::Recommendation,
];

/// "Like X but", "similar to" and alternatives.
pub const SIMILARITY_CUES: CueFamily = CueFamily {
    intent: Intent::Similarity,
    cues: &[
        r"\bsimilar(?:es)?\s+(?:a|al|to)\s+(?P<reference>.+)",
        r"\bparecid[oa]s?\s+(?:a|al)\s+(?P<reference>.+)",
        r"\balternativas?\s+(?:a|al)\s+(?P<reference>.+)",
        r"\balternatives?\s+to\s+(?P<reference>.+)",
        r"\b(?:algo|alguno|alguna|uno|una|otros?|otras?|productos?|zapatillas?)\s+como\s+(?P<reference>.+?)\s+pero\b",
        r"\b(?:something|anything|one|ones|products?|items?|shoes?)\s+like\s+(?P<reference>.+?)\s+but\b",
    ],
};

/// Head-to-head comparisons between two products.
pub const COMPARISON_CUES: CueFamily = CueFamily {
    intent: Intent::Comparison,
    cues: &[
        r"\bcompar[ae]r?\s+(?P<first>.+?)\s+(?:vs\.?|versus|con|with|and|y)\s+(?P<second>.+)",
        r"\bdiferencias?\s+entre\s+(?P<first>.+?)\s+y\s+(?P<second>.+)",
        r"\bdifferences?\s+between\s+(?P<first>.+?)\s+and\s+(?P<second>.+)",
        r"\b(?:cu[aá]l|qu[eé])\s+es\s+mejor\s*,?\s+(?P<first>.+?)\s+o\s+(?P<second>.+)",
        r"\bwhich\s+is\s+better\s*,?\s+(?P<first>.+?)\s+or\s+(?P<second>.+)",
        r"(?:^|[,:;])\s*(?P<first>[^,:;\s][^,:;]*?)\s+(?:vs\.?|versus)\s+(?P<second>.+)",
    ],
};

/// Cheaper alternatives and price ceilings.
pub const PRICE_CUES: CueFamily = CueFamily {
    intent: Intent::PriceComparison,
    cues: &[
        r"\bm[aá]s\s+barat[oa]s?\s+que\s+(?P<reference>.+)",
        r"\bmenos\s+car[oa]s?\s+que\s+(?P<reference>.+)",
        r"\becon[oó]mic[oa]s?\s+(?:que|a)\s+(?P<reference>.+)",
        r"\bmejor\s+precio\s+que\s+(?P<reference>.+)",
        r"\bcheaper\s+than\s+(?P<reference>.+)",
        r"\bless\s+expensive\s+than\s+(?P<reference>.+)",
        r"\b(?:lower|better)\s+price\s+than\s+(?P<reference>.+)",
        r"\bpero\s+m[aá]s\s+barat[oa]s?\b",
        r"\bbut\s+cheaper\b",
    ],
};

/// Requests for advice or suggestions.
pub const RECOMMENDATION_CUES: CueFamily = CueFamily {
    intent: Intent::Recommendation,
    cues: &[
        r"\bmejor(?:es)?\s+para\s+(?P<use_case>.+)",
        r"\brecomi[eé]nd(?:a|o|as|ame|eme)\s+(?:\w+\s+){0,2}para\s+(?P<use_case>.+)",
        r"\bideal(?:es)?\s+para\s+(?P<use_case>.+)",
        r"\bbest\s+(?:\w+\s+){0,2}for\s+(?P<use_case>.+)",
        r"\brecommend(?:ed)?\s+(?:\w+\s+){0,2}for\s+(?P<use_case>.+)",
        r"\b(?:ideal|good)\s+for\s+(?P<use_case>.+)",
    ],
};

/// Families in activation order.
pub const CUE_FAMILIES: [CueFamily; 4] = [
    SIMILARITY_CUES,
    COMPARISON_CUES,
    PRICE_CUES,
    RECOMMENDATION_CUES,
];

/// Words and punctuation that end a captured name or phrase.
pub const CLAUSE_BOUNDARY: &str = r"(?i)\s*(?:[,;?!]|\.(?:\s|$)|\b(?:pero|but|en\s+talla|in\s+size|talla|size|para|for|con|with|under|below|hasta|menos\s+de|por\s+debajo\s+de|que\s+cueste|that\s+costs?)\b)";

/// Lead-in words before the first comparison target, e.g. `precios de`.
pub const COMPARISON_LEAD_IN: &str = r"(?i)^(?:(?:los|las|the)\s+)?(?:precios?|prices?|entre|between)\s+(?:(?:de|del|of)\s+)?";

/// Numeric price bound after a ceiling cue.
pub const PRICE_CEILING: &str = r"(?i)(?:\bmenor(?:es)?\s+(?:a|de|que)|\bmenos\s+de|\bhasta|\bpor\s+debajo\s+de|\bm[aá]ximo|\bunder|\bbelow|\bless\s+than|\bup\s+to|\bmax(?:imum)?)\s*(?:de\s+)?(?:usd|us\$|\$|€|eur)?\s*(?P<amount>\d+(?:[.,]\d+)?)";

/// A reference that is only an amount, e.g. `100 dólares`.
pub const PRICE_ONLY: &str = r"(?i)^(?:usd|us\$|\$|€|eur)?\s*(?P<amount>\d+(?:[.,]\d+)?)\s*(?:usd|\$|€|eur|euros?|d[oó]lares|dollars?)?$";

/// Size after a size cue, numeric with an optional unit, or a letter size.
pub const SIZE: &str = r"(?i)\b(?:talla|size|n[uú]mero|number)\s*:?\s*(?:(?P<number>\d+(?:[.,]\d+)?)(?:\s*(?P<unit>eu|us|uk|cm)\b)?|(?P<letter>xxs|xs|s|m|l|xl|xxl)\b)";

/// Leading article removed from extracted names.
pub const LEADING_ARTICLE: &str = r"(?i)^(?:el|la|los|las|lo|un|una|unos|unas|al|del|the|a|an)\s+";

/// Articles that, standing alone, leave nothing to extract.
pub const ARTICLES: [&str; 14] = [
    "el", "la", "los", "las", "lo", "un", "una", "unos", "unas", "al", "del", "the", "a", "an",
];

/// Compiled cue families.
#[derive(Debug, Clone)]
pub struct CueTable {
    families: Vec<(Intent, Vec<Regex>)>,
}

impl CueTable {
    /// Compiles the built-in families.
    ///
    /// # Errors
    /// Returns an error if a cue is not a valid regular expression
    pub fn compile() -> Result<Self> {
        Self::from_families(&CUE_FAMILIES)
    }

    /// Compiles the given families, keeping their order.
    ///
    /// # Errors
    /// Returns an error if a cue is not a valid regular expression
    pub fn from_families(families: &[CueFamily]) -> Result<Self> {
        let families = families
            .iter()
            .map(|family| {
                let cues = family
                    .cues
                    .iter()
                    .map(|cue| Regex::new(&format!("(?i){cue}")))
                    .collect::<StdResult<Vec<_>, _>>()?;
                Ok((family.intent, cues))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { families })
    }

    /// Whether any cue of any family matches.
    pub fn any_match(&self, text: &str) -> bool {
        self.families
            .iter()
            .any(|(_, cues)| cues.iter().any(|cue| cue.is_match(text)))
    }

    /// Whether a cue of the family for `intent` matches.
    pub fn matches(&self, intent: Intent, text: &str) -> bool {
        self.cues(intent).iter().any(|cue| cue.is_match(text))
    }

    /// Compiled cues for `intent`, in table order.
    pub fn cues(&self, intent: Intent) -> &[Regex] {
        self.families
            .iter()
            .find(|(family, _)| *family == intent)
            .map(|(_, cues)| cues.as_slice())
            .unwrap_or_default()
    }

    /// Every intent with a matching cue, in activation order.
    pub fn matching_intents(&self, text: &str) -> Vec<Intent> {
        self.families
            .iter()
            .filter(|(_, cues)| cues.iter().any(|cue| cue.is_match(text)))
            .map(|(intent, _)| *intent)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "Test code is allowed to use expect")]
mod tests {
    use super::*;

    fn table() -> CueTable {
        CueTable::compile().expect("cue table failed to compile")
    }

    #[test]
    fn test_every_auxiliary_pattern_compiles() {
        for pattern in [
            CLAUSE_BOUNDARY,
            COMPARISON_LEAD_IN,
            PRICE_CEILING,
            PRICE_ONLY,
            SIZE,
            LEADING_ARTICLE,
        ] {
            Regex::new(pattern).expect("auxiliary pattern should compile");
        }
    }

    #[test]
    fn test_precedence_covers_every_planned_intent() {
        for family in CUE_FAMILIES {
            assert!(PRECEDENCE.contains(&family.intent));
        }
    }

    #[test]
    fn test_accents_are_optional() {
        let table = table();
        assert!(table.matches(Intent::PriceComparison, "algo más barato que el Metcon"));
        assert!(table.matches(Intent::PriceComparison, "algo mas barato que el Metcon"));
        assert!(table.matches(Intent::PriceComparison, "ALGO MÁS BARATO QUE EL METCON"));
    }

    #[test]
    fn test_matching_intents_reports_overlaps() {
        let table = table();
        let intents = table.matching_intents("similar to the Metcon 9 but cheaper");
        assert_eq!(intents, vec![Intent::Similarity, Intent::PriceComparison]);
    }

    #[test]
    fn test_plain_query_matches_nothing() {
        assert!(!table().any_match("zapatillas rojas para mujer"));
    }

    #[test]
    fn test_like_needs_a_product_word() {
        let table = table();
        assert!(!table.any_match("I would like running shoes but in red"));
        assert!(!table.any_match("como siempre, pero en azul"));
        assert!(table.matches(Intent::Similarity, "something like the Pegasus but in blue"));
        assert!(table.matches(Intent::Similarity, "algo como el Metcon 9 pero en azul"));
    }
}
