use crate::domain::model::{Catalog, QuoteInputs, QuoteOutcome, Toggle};
use crate::utils::error::{QuoteError, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn inputs(&self) -> &QuoteInputs;
    fn catalog_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn toggles(&self) -> Vec<Toggle>;
}

/// Catalog plus the tables that failed to load and were replaced by empty ones.
#[derive(Debug)]
pub struct LoadedCatalog {
    pub catalog: Arc<Catalog>,
    pub warnings: Vec<QuoteError>,
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<LoadedCatalog>;
    async fn transform(&self, catalog: Arc<Catalog>) -> Result<QuoteOutcome>;
    /// Returns the written report path, or `None` when no report is offered.
    async fn load(&self, outcome: &QuoteOutcome) -> Result<Option<String>>;
}
