use crate::core::Pipeline;
use crate::domain::model::QuoteOutcome;
use crate::utils::error::Result;
use serde::Serialize;

/// What one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteReport {
    pub outcome: QuoteOutcome,
    /// Written report, `None` for dry runs and manual quotes.
    pub output_path: Option<String>,
    /// Catalog tables that degraded to empty ones.
    pub warnings: Vec<String>,
}

impl QuoteReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct QuoteEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> QuoteEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Load the catalog, price the quote and write the report.
    pub async fn run(&self) -> Result<QuoteReport> {
        let mut report = self.preview().await?;

        tracing::info!("💾 Writing report...");
        report.output_path = self.pipeline.load(&report.outcome).await?;
        match &report.output_path {
            Some(path) => tracing::info!("✅ Report saved to: {}", path),
            None => tracing::info!("🧑‍💼 No report written, quote needs manual pricing"),
        }

        Ok(report)
    }

    /// Same as `run` without writing anything.
    pub async fn preview(&self) -> Result<QuoteReport> {
        tracing::info!("📚 Loading catalog...");
        let loaded = self.pipeline.extract().await?;
        let warnings: Vec<String> = loaded.warnings.iter().map(|e| e.to_string()).collect();
        if !warnings.is_empty() {
            tracing::warn!("⚠️ {} catalog tables degraded", warnings.len());
        }

        tracing::info!("🧮 Computing quote...");
        let outcome = self.pipeline.transform(loaded.catalog).await?;
        match outcome.as_priced() {
            Some(result) => tracing::info!(
                "Priced {} lines, {:.1}h adjusted",
                result.line_items.len(),
                result.adjusted_hours
            ),
            None => tracing::info!("Quote routed to manual pricing"),
        }

        Ok(QuoteReport {
            outcome,
            output_path: None,
            warnings,
        })
    }
}
