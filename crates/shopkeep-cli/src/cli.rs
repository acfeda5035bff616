use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shopkeep")]
#[command(about = "Plans and runs product questions against graph and vector backends", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Answer a product question")]
    Query {
        #[arg(help = "The question, in Spanish or English")]
        text: String,

        #[arg(long, help = "JSON product catalog used for semantic search and, without --neo4j, for graph queries")]
        catalog: Option<PathBuf>,

        #[arg(long, help = "Send graph queries to Neo4j instead of the catalog")]
        neo4j: bool,

        #[arg(long, help = "Configuration file (defaults to ~/.shopkeep/config.toml)")]
        config: Option<PathBuf>,

        #[arg(long, help = "Print the result as JSON instead of Markdown")]
        json: bool,
    },

    #[command(about = "Show the plan for a question without running it")]
    Plan {
        #[arg(help = "The question, in Spanish or English")]
        text: String,

        #[arg(long, help = "Configuration file (defaults to ~/.shopkeep/config.toml)")]
        config: Option<PathBuf>,
    },

    #[command(about = "Print the effective configuration as TOML")]
    Config {
        #[arg(long, help = "Configuration file (defaults to ~/.shopkeep/config.toml)")]
        config: Option<PathBuf>,
    },
}
