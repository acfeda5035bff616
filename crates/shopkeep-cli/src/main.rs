//! Shopkeep CLI - product question planner command-line interface
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::missing_panics_doc,
        reason = "Allow for tests"
    )
)]

use anyhow::Result;
use clap::Parser as _;
use cli::{Cli, Commands};
use std::io::stderr;
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt as _, registry, util::SubscriberInitExt as _,
};

mod cli;
mod handlers;

#[tokio::main]
async fn main() -> Result<()> {
    registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "shopkeep=info,shopkeep_routing=info,shopkeep_backends=info".into()
        }))
        .with(fmt::layer().with_writer(stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Query {
            text,
            catalog,
            neo4j,
            config,
            json,
        } => {
            handlers::handle_query(&text, catalog.as_deref(), neo4j, config.as_deref(), json)
                .await?;
        }
        Commands::Plan { text, config } => handlers::handle_plan(&text, config.as_deref())?,
        Commands::Config { config } => handlers::handle_config(config.as_deref())?,
    }

    Ok(())
}
