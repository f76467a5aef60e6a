pub mod aggregation;
pub mod breakdown;
pub mod catalog;
pub mod engine;
pub mod escalation;
pub mod export;
pub mod pipeline;
pub mod selection;
pub mod session;

pub use crate::domain::model::{Catalog, QuoteInputs, QuoteOutcome, QuoteResult, Toggle};
pub use crate::domain::ports::{ConfigProvider, LoadedCatalog, Pipeline, Storage};
pub use crate::utils::error::Result;
pub use catalog::{CatalogStore, CatalogTables};
pub use engine::{QuoteEngine, QuoteReport};
pub use pipeline::QuotePipeline;
pub use selection::SelectionState;
pub use session::QuoteSession;
