pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "scope3-quote")]
#[command(about = "Scope 3 consulting quote calculator")]
pub struct CliConfig {
    #[arg(long, short, default_value = "quote.toml", help = "Quote file (TOML)")]
    pub config: String,

    #[arg(long, help = "Override [catalog] path")]
    pub catalog_dir: Option<String>,

    #[arg(long, help = "Override [export] output_path")]
    pub output_path: Option<String>,

    #[arg(long, help = "Print the outcome as JSON on stdout")]
    pub json: bool,

    #[arg(long, help = "Validate and summarize without writing a report")]
    pub dry_run: bool,

    #[arg(long, help = "Fail when any catalog table cannot be loaded")]
    pub strict_catalog: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}
