pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, toml_config::QuoteConfig};

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use core::{
    catalog::{load_catalog, CatalogStore, CatalogTables},
    engine::{QuoteEngine, QuoteReport},
    pipeline::QuotePipeline,
    session::QuoteSession,
};
pub use domain::model::{
    Catalog, Group, LineItem, QuoteInputs, QuoteOutcome, QuoteResult, Region, TaskKey, Toggle,
};
pub use utils::error::{QuoteError, Result};
