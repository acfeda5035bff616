//! Engine configuration: result budget, execution limits, retrieval sizes,
//! the category lexicon and backend connection settings.

use crate::error::{Result, RoutingError};
use serde::{Deserialize, Serialize};
use shopkeep_backends::Neo4jConfig;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete engine configuration.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size bound on the combined result
    pub budget: BudgetConfig,
    /// Stage execution limits
    pub execution: ExecutionConfig,
    /// Per-stage retrieval sizes
    pub retrieval: RetrievalConfig,
    /// Neo4j connection settings
    pub neo4j: Neo4jConfig,
    /// Canonical category name to the keywords that select it
    pub categories: CategoryLexicon,
}

/// Bound on how much the combined result may contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Token-equivalent units the combined records may consume
    pub result_units: usize,
    /// Hard cap on the number of combined records
    pub max_results: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            result_units: 2000,
            max_results: 10,
        }
    }
}

/// Stage execution limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Timeout for a single backend call in milliseconds
    pub stage_timeout_ms: u64,
    /// Maximum number of stages in flight at once
    pub max_concurrent_stages: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            stage_timeout_ms: 5000,
            max_concurrent_stages: 4,
        }
    }
}

impl ExecutionConfig {
    /// Stage timeout as a [`Duration`].
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }
}

/// How many records each kind of stage asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Limit for relationship queries
    pub graph_limit: usize,
    /// `top_k` for planned semantic stages
    pub vector_top_k: usize,
    /// `top_k` for the direct semantic path used by unplanned queries
    pub direct_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            graph_limit: 5,
            vector_top_k: 10,
            direct_top_k: 20,
        }
    }
}

/// Keyword lexicon used to recognise a category mention in a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryLexicon(BTreeMap<String, Vec<String>>);

impl CategoryLexicon {
    /// Creates a lexicon from `(category, keywords)` pairs.
    pub fn new<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, K)>,
        K: IntoIterator<Item = String>,
    {
        Self(
            entries
                .into_iter()
                .map(|(category, keywords)| (category, keywords.into_iter().collect()))
                .collect(),
        )
    }

    /// Iterates categories in name order with their keywords.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(category, keywords)| (category.as_str(), keywords.as_slice()))
    }

    /// Whether no category is configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CategoryLexicon {
    fn default() -> Self {
        let table: [(&str, &[&str]); 4] = [
            (
                "accesorios",
                &[
                    "accesorio", "accesorios", "gorra", "gorras", "mochila", "mochilas",
                    "calcetines", "medias", "cap", "caps", "backpack", "backpacks", "socks",
                    "accessory", "accessories",
                ],
            ),
            (
                "calzado",
                &[
                    "calzado", "zapatilla", "zapatillas", "zapato", "zapatos", "tenis", "bota",
                    "botas", "sandalias", "shoe", "shoes", "sneaker", "sneakers", "boots",
                    "trainers", "footwear",
                ],
            ),
            (
                "pulseras",
                &[
                    "pulsera", "pulseras", "brazalete", "brazaletes", "bracelet", "bracelets",
                ],
            ),
            (
                "ropa",
                &[
                    "ropa", "camiseta", "camisetas", "chaqueta", "chaquetas", "pantalón",
                    "pantalones", "sudadera", "sudaderas", "shirt", "shirts", "jacket",
                    "jackets", "pants", "hoodie", "hoodies", "clothing", "apparel",
                ],
            ),
        ];

        Self::new(table.into_iter().map(|(category, keywords)| {
            (
                category.to_owned(),
                keywords.iter().map(|keyword| (*keyword).to_owned()).collect::<Vec<_>>(),
            )
        }))
    }
}

impl EngineConfig {
    /// Get the default config directory path (`~/.shopkeep`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        use dirs::home_dir;
        let home = home_dir()
            .ok_or_else(|| RoutingError::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".shopkeep"))
    }

    /// Get the default config file path (`~/.shopkeep/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location, creating it with default
    /// values if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = "# Shopkeep Configuration File\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize your settings\n\n";

        fs::write(path, format!("{header}{}", self.to_toml()?))?;
        Ok(())
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    /// Returns an error if serialization fails
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|error| RoutingError::Config(format!("Failed to serialize config: {error}")))
    }

    /// Rejects values the engine cannot run with.
    ///
    /// # Errors
    /// Returns an error naming the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.execution.max_concurrent_stages == 0 {
            return Err(RoutingError::Config(
                "execution.max_concurrent_stages must be at least 1".to_owned(),
            ));
        }
        if self.execution.stage_timeout_ms == 0 {
            return Err(RoutingError::Config(
                "execution.stage_timeout_ms must be at least 1".to_owned(),
            ));
        }
        if self.budget.max_results == 0 || self.budget.result_units == 0 {
            return Err(RoutingError::Config(
                "budget values must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "Test code is allowed to use expect")]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.budget.result_units, 2000);
        assert_eq!(config.budget.max_results, 10);
        assert_eq!(config.execution.stage_timeout(), Duration::from_secs(5));
        assert_eq!(config.retrieval.direct_top_k, 20);
        config.validate().expect("default config should validate");
    }

    #[test]
    fn test_default_lexicon_is_bilingual() {
        let lexicon = CategoryLexicon::default();
        let calzado = lexicon
            .entries()
            .find(|(category, _)| *category == "calzado")
            .map(|(_, keywords)| keywords.to_vec())
            .unwrap_or_default();
        assert!(calzado.iter().any(|keyword| keyword == "zapatillas"));
        assert!(calzado.iter().any(|keyword| keyword == "sneakers"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().expect("temp dir failed");
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = EngineConfig::default();
        config.budget.max_results = 3;
        config.neo4j.uri = Some("http://graph:7474".to_owned());

        config.save_to_file(&path).expect("save failed");
        let contents = fs::read_to_string(&path).unwrap_or_default();
        assert!(contents.starts_with("# Shopkeep Configuration File"));

        let loaded = EngineConfig::load_from_file(&path).expect("load failed");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("temp dir failed");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[execution]\nstage_timeout_ms = 250\n").expect("write failed");

        let loaded = EngineConfig::load_from_file(&path).expect("load failed");
        assert_eq!(loaded.execution.stage_timeout_ms, 250);
        assert_eq!(loaded.execution.max_concurrent_stages, 4);
        assert_eq!(loaded.categories, CategoryLexicon::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = TempDir::new().expect("temp dir failed");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[execution]\nmax_concurrent_stages = 0\n").expect("write failed");
        assert!(matches!(
            EngineConfig::load_from_file(&path),
            Err(RoutingError::Config(_))
        ));
    }
}
