use crate::core::catalog::{
    load_catalog, CatalogStore, CatalogTables, GROUP_FILE, SCALE_FILE, SERVICE_FILE,
};
use crate::core::export::{export_file_name, export_quote};
use crate::core::session::QuoteSession;
use crate::core::{Catalog, ConfigProvider, LoadedCatalog, Pipeline, QuoteOutcome, Storage};
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::sync::Arc;

/// Reads the catalog CSVs through `Storage`, prices the configured selection
/// and writes the CSV report back through the same storage.
pub struct QuotePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    store: Arc<CatalogStore>,
    strict_catalog: bool,
    export_date: NaiveDate,
}

impl<S: Storage, C: ConfigProvider> QuotePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            store: Arc::new(CatalogStore::new()),
            strict_catalog: false,
            export_date: chrono::Local::now().date_naive(),
        }
    }

    /// Shares an already populated (or still empty) catalog store.
    pub fn with_store(mut self, store: Arc<CatalogStore>) -> Self {
        self.store = store;
        self
    }

    /// Fail on any broken catalog table instead of degrading it.
    pub fn with_strict_catalog(mut self, strict: bool) -> Self {
        self.strict_catalog = strict;
        self
    }

    /// Date used in the report file name.
    pub fn with_export_date(mut self, date: NaiveDate) -> Self {
        self.export_date = date;
        self
    }

    fn join(dir: &str, file: &str) -> String {
        if dir.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", dir.trim_end_matches('/'), file)
        }
    }

    async fn read_table(&self, file: &str) -> Result<Vec<u8>> {
        let path = Self::join(self.config.catalog_path(), file);
        let data = self.storage.read_file(&path).await;
        match &data {
            Ok(bytes) => tracing::debug!("Read {} bytes from {}", bytes.len(), path),
            Err(e) => tracing::warn!("⚠️ Cannot read {}: {}", path, e),
        }
        data
    }

    async fn read_tables(&self) -> CatalogTables {
        CatalogTables {
            services: self.read_table(SERVICE_FILE).await,
            group_multipliers: self.read_table(GROUP_FILE).await,
            scale_multipliers: self.read_table(SCALE_FILE).await,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for QuotePipeline<S, C> {
    async fn extract(&self) -> Result<LoadedCatalog> {
        if let Some(catalog) = self.store.get() {
            tracing::debug!("Using cached catalog");
            if self.strict_catalog {
                self.store.ensure_complete()?;
            }
            return Ok(LoadedCatalog {
                catalog,
                warnings: Vec::new(),
            });
        }

        let tables = self.read_tables().await;
        if !self.strict_catalog {
            return Ok(self.store.get_or_load(|| load_catalog(&tables)));
        }

        // 嚴格模式：不完整的目錄不進快取
        let catalog = load_catalog(&tables).into_strict()?;
        let loaded = self.store.get_or_load(|| LoadedCatalog {
            catalog,
            warnings: Vec::new(),
        });
        self.store.ensure_complete()?;
        Ok(LoadedCatalog {
            catalog: loaded.catalog,
            warnings: Vec::new(),
        })
    }

    async fn transform(&self, catalog: Arc<Catalog>) -> Result<QuoteOutcome> {
        let mut session = QuoteSession::new(catalog, self.config.inputs().clone());

        let toggles = self.config.toggles();
        let applied = toggles.iter().filter(|t| session.toggle(t)).count();
        tracing::debug!("Applied {}/{} selection changes", applied, toggles.len());

        Ok(session.recompute())
    }

    async fn load(&self, outcome: &QuoteOutcome) -> Result<Option<String>> {
        if outcome.as_priced().is_none() {
            return Ok(None);
        }

        let inputs = self.config.inputs();
        let data = export_quote(outcome, inputs)?;
        let file_name = export_file_name(self.export_date, &inputs.company_name);
        let output_path = Self::join(self.config.output_path(), &file_name);

        tracing::debug!("Writing {} bytes to {}", data.len(), output_path);
        self.storage.write_file(&output_path, &data).await?;

        Ok(Some(output_path))
    }
}
