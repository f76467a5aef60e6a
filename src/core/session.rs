use crate::core::aggregation::compute_quote;
use crate::core::export::{export_file_name, export_quote};
use crate::core::selection::{CategoryStatus, SelectionState};
use crate::domain::model::{Catalog, Group, QuoteInputs, QuoteOutcome, Toggle};
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::sync::Arc;

/// One operator's quote: shared catalog, owned selection and inputs.
///
/// Every change is synchronous; call [`QuoteSession::recompute`] afterwards to
/// get the new outcome.
#[derive(Debug, Clone)]
pub struct QuoteSession {
    catalog: Arc<Catalog>,
    selection: SelectionState,
    inputs: QuoteInputs,
}

impl QuoteSession {
    pub fn new(catalog: Arc<Catalog>, inputs: QuoteInputs) -> Self {
        let mut selection = SelectionState::new();
        selection.sync(&catalog);
        Self {
            catalog,
            selection,
            inputs,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn inputs(&self) -> &QuoteInputs {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut QuoteInputs {
        &mut self.inputs
    }

    /// Applies a toggle. Keys the catalog no longer has are logged and ignored.
    pub fn toggle(&mut self, toggle: &Toggle) -> bool {
        match self.selection.apply(&self.catalog, toggle) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("⚠️ Ignoring selection change: {}", e);
                false
            }
        }
    }

    /// Swaps in a reloaded catalog. Flags of known tasks survive; new tasks get their defaults.
    pub fn replace_catalog(&mut self, catalog: Arc<Catalog>) {
        self.catalog = catalog;
        let added = self.selection.sync(&self.catalog);
        tracing::debug!("Catalog replaced, {} new tasks registered", added);
    }

    pub fn category_status(&self, category: &str) -> CategoryStatus {
        self.selection.category_status(&self.catalog, category)
    }

    pub fn group_all_selected(&self, group: Group) -> bool {
        self.selection.group_all_selected(&self.catalog, group)
    }

    pub fn recompute(&self) -> QuoteOutcome {
        compute_quote(&self.catalog, &self.selection, &self.inputs)
    }

    /// File name and report bytes for the current state.
    pub fn export(&self, today: NaiveDate) -> Result<(String, Vec<u8>)> {
        let outcome = self.recompute();
        let bytes = export_quote(&outcome, &self.inputs)?;
        Ok((export_file_name(today, &self.inputs.company_name), bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        EscalationState, GroupMultipliers, Region, ScaleMultipliers, ServiceItem,
        DEFAULT_SCALE_LABEL,
    };
    use crate::utils::error::QuoteError;
    use std::collections::BTreeMap;

    fn catalog(tasks: &[(&str, &str)]) -> Arc<Catalog> {
        let items = tasks
            .iter()
            .map(|(category, task)| ServiceItem {
                group: Group::Upstream,
                category: category.to_string(),
                task: task.to_string(),
                hours: 10.0,
                required: false,
                description: None,
            })
            .collect();
        let groups: BTreeMap<u32, f64> = (0..=6).map(|n| (n, 1.0 + 0.5 * n as f64)).collect();
        Arc::new(Catalog::new(
            items,
            ScaleMultipliers::default(),
            GroupMultipliers::new(groups),
        ))
    }

    fn inputs() -> QuoteInputs {
        QuoteInputs {
            company_name: "Acme".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            hourly_rate: 10_000,
            scale_label: DEFAULT_SCALE_LABEL.to_string(),
            group_company_count: 0,
            region: Region::DomesticOnly,
            language_support: false,
            duration_months: 1,
            meeting_frequency: 1,
            workshop_count: 0,
            kickoff_hours: 1.0,
        }
    }

    #[test]
    fn test_sessions_share_catalog_but_not_selection() {
        let catalog = catalog(&[("C1 Goods", "Spend"), ("C1 Goods", "Factors")]);
        let mut first = QuoteSession::new(catalog.clone(), inputs());
        let second = QuoteSession::new(catalog.clone(), inputs());

        assert!(first.toggle(&Toggle::Category {
            category: "C1 Goods".to_string(),
            selected: true,
        }));
        assert_eq!(first.category_status("C1 Goods"), CategoryStatus::All);
        assert_eq!(second.category_status("C1 Goods"), CategoryStatus::None);
        assert_eq!(Arc::strong_count(&catalog), 3);
    }

    #[test]
    fn test_recompute_reflects_input_changes() {
        let mut session = QuoteSession::new(catalog(&[("C1 Goods", "Spend")]), inputs());
        session.toggle(&Toggle::Group {
            group: Group::Upstream,
            selected: true,
        });
        let before = session.recompute().as_priced().unwrap().total_base_hours;

        session.inputs_mut().group_company_count = 2;
        let after = session.recompute().as_priced().unwrap().total_base_hours;
        // 1h kickoff + 1h meeting + 10h × 2.0
        assert_eq!(before, 12.0);
        assert_eq!(after, 22.0);

        session.inputs_mut().group_company_count = 6;
        assert_eq!(session.recompute().state(), EscalationState::RequiresManualQuote);
        assert!(matches!(
            session.export(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()),
            Err(QuoteError::EscalationRequired { .. })
        ));
    }

    #[test]
    fn test_reloaded_catalog_keeps_flags_and_ignores_stale_keys() {
        let mut session = QuoteSession::new(
            catalog(&[("C1 Goods", "Spend"), ("C2 Capital", "Assets")]),
            inputs(),
        );
        session.toggle(&Toggle::Category {
            category: "C1 Goods".to_string(),
            selected: true,
        });

        session.replace_catalog(catalog(&[("C1 Goods", "Spend"), ("C3 Fuel", "Energy")]));
        assert_eq!(session.category_status("C1 Goods"), CategoryStatus::All);
        assert!(!session.toggle(&Toggle::Category {
            category: "C2 Capital".to_string(),
            selected: true,
        }));

        let (name, bytes) = session
            .export(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap())
            .unwrap();
        assert_eq!(name, "20261017_Scope3-quote_Acme.csv");
        assert!(!bytes.is_empty());
    }
}
