use crate::domain::model::{Catalog, EscalationState, SPECIAL_CASE_THRESHOLD};

/// Routes group company counts above the threshold to manual quoting.
///
/// Without a group multiplier table there is nothing to price against, and
/// the rule stays in `Priced` with a neutral multiplier.
pub fn evaluate(catalog: &Catalog, group_company_count: u32) -> EscalationState {
    if group_company_count > SPECIAL_CASE_THRESHOLD && !catalog.group_multipliers().is_empty() {
        tracing::info!(
            "🧑‍💼 {} group companies: individual quote required",
            group_company_count
        );
        EscalationState::RequiresManualQuote
    } else {
        EscalationState::Priced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{GroupMultipliers, ScaleMultipliers};
    use std::collections::BTreeMap;

    fn catalog_with_group_table() -> Catalog {
        let rows: BTreeMap<u32, f64> = (0..=6).map(|n| (n, 1.0 + n as f64 * 0.1)).collect();
        Catalog::new(Vec::new(), ScaleMultipliers::default(), GroupMultipliers::new(rows))
    }

    #[test]
    fn test_boundary_at_five() {
        let catalog = catalog_with_group_table();
        assert_eq!(evaluate(&catalog, 0), EscalationState::Priced);
        assert_eq!(evaluate(&catalog, 5), EscalationState::Priced);
        assert_eq!(evaluate(&catalog, 6), EscalationState::RequiresManualQuote);
    }

    #[test]
    fn test_missing_group_table_never_escalates() {
        let catalog = Catalog::default();
        assert_eq!(evaluate(&catalog, 6), EscalationState::Priced);
    }
}
