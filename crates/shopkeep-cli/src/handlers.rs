//! Command handlers for CLI operations

use anyhow::{Context as _, Result};
use shopkeep_backends::{InMemoryCatalog, Neo4jHttpBackend};
use shopkeep_core::{GraphBackend, VectorBackend};
use shopkeep_routing::{EngineConfig, PlanningEngine};
use std::io::{Write as _, stdout};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Load the configuration from `path`, or from `~/.shopkeep/config.toml`.
///
/// An unreadable default file falls back to the built-in defaults; an
/// explicitly named file must load.
fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = path {
        return EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    Ok(EngineConfig::load_or_create().unwrap_or_else(|error| {
        warn!("Failed to load config from ~/.shopkeep/config.toml: {error}");
        warn!("Using default configuration");
        EngineConfig::default()
    }))
}

async fn load_catalog(path: Option<&Path>) -> Result<Arc<InMemoryCatalog>> {
    let Some(path) = path else {
        warn!("No catalog given, semantic search will return nothing");
        return Ok(Arc::new(InMemoryCatalog::default()));
    };
    let catalog = InMemoryCatalog::load(path)
        .await
        .with_context(|| format!("Failed to load catalog from {}", path.display()))?;
    Ok(Arc::new(catalog))
}

fn build_engine(
    config: EngineConfig,
    catalog: &Arc<InMemoryCatalog>,
    use_neo4j: bool,
) -> Result<PlanningEngine> {
    let graph: Arc<dyn GraphBackend> = if use_neo4j {
        info!("Graph queries go to Neo4j at {}", config.neo4j.uri());
        Arc::new(Neo4jHttpBackend::new(&config.neo4j)?)
    } else {
        Arc::<InMemoryCatalog>::clone(catalog)
    };
    let vector: Arc<dyn VectorBackend> = Arc::<InMemoryCatalog>::clone(catalog);
    Ok(PlanningEngine::new(config, graph, vector)?)
}

/// Handle the query command
///
/// # Errors
/// Returns an error if the configuration, catalog or plan is invalid, or the
/// query was interrupted
pub async fn handle_query(
    text: &str,
    catalog: Option<&Path>,
    use_neo4j: bool,
    config: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let catalog = load_catalog(catalog).await?;
    let engine = build_engine(config, &catalog, use_neo4j)?;

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the running plan");
            watcher.cancel();
        }
    });

    let formatted = engine.plan_and_execute_with_cancel(text, &cancel).await?;

    let mut out = stdout().lock();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&formatted)?)?;
    } else {
        write!(out, "{formatted}")?;
    }
    Ok(())
}

/// Handle the plan command - show what would run without calling a backend.
///
/// # Errors
/// Returns an error if the configuration is invalid or planning fails
pub fn handle_plan(text: &str, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let engine = build_engine(config, &Arc::new(InMemoryCatalog::default()), false)?;

    let analysis = engine.analyze(text);
    let plan = engine.plan(text)?;

    let mut out = stdout().lock();
    writeln!(
        out,
        "activation: {}",
        if analysis.active { "planned" } else { "direct semantic search" }
    )?;
    write!(out, "{plan}")?;
    Ok(())
}

/// Handle the config command
///
/// # Errors
/// Returns an error if the configuration cannot be loaded or serialized
pub fn handle_config(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let mut out = stdout().lock();
    write!(out, "{}", config.to_toml()?)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "Test code is allowed to use expect")]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_config_must_exist() {
        let temp = TempDir::new().expect("temp dir");
        let missing = temp.path().join("missing.toml");
        load_config(Some(missing.as_path())).expect_err("a missing explicit config must not load");
    }

    #[test]
    fn test_explicit_config_overrides_defaults() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[budget]\nmax_results = 3\n").expect("write config");
        let config = load_config(Some(path.as_path())).expect("config should load");
        assert_eq!(config.budget.max_results, 3);
        assert_eq!(config.execution, EngineConfig::default().execution);
    }

    #[tokio::test]
    async fn test_catalog_file_loads() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("products.json");
        let body = r#"[{"id": 1, "name": "Metcon 9", "price": 150.0}]"#;
        fs::write(&path, body).expect("write catalog");
        let catalog = load_catalog(Some(path.as_path())).await.expect("catalog should load");
        assert_eq!(catalog.len(), 1);
    }
}
