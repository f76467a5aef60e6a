//! Hours and price aggregation.
//!
//! `compute_quote` is a pure function of the catalog, the selection and the
//! scalar inputs. The host calls it after every change and gets a fresh
//! `QuoteOutcome` each time.

use crate::core::escalation;
use crate::core::selection::SelectionState;
use crate::domain::model::{
    Catalog, EscalationState, Group, LineItem, QuoteInputs, QuoteOutcome, QuoteResult, ServiceItem,
    OTHER_CATEGORY, TAX_RATE,
};

pub const MEETING_HOURS: f64 = 1.0;
pub const WORKSHOP_HOURS: f64 = 5.0;
pub const LANGUAGE_SUPPORT_HOURS: f64 = 10.0;

pub const KICKOFF_TASK: &str = "Kickoff";
pub const MEETING_TASK: &str = "Regular meetings";
pub const WORKSHOP_TASK: &str = "Workshops";
pub const LANGUAGE_SUPPORT_TASK: &str = "English deliverables";

/// Catalog categories follow the `C<n> ...` naming; anything else is shown as "Other".
pub fn display_category(category: &str) -> &str {
    if category.starts_with('0') || !category.starts_with('C') {
        OTHER_CATEGORY
    } else {
        category
    }
}

pub fn fixed_line_items(inputs: &QuoteInputs) -> Vec<LineItem> {
    let fixed = |task: &str, hours: f64| LineItem {
        category: OTHER_CATEGORY.to_string(),
        task: task.to_string(),
        hours,
        description: None,
    };

    let mut items = vec![
        fixed(KICKOFF_TASK, inputs.kickoff_hours),
        fixed(
            MEETING_TASK,
            inputs.duration_months as f64 * inputs.meeting_frequency as f64 * MEETING_HOURS,
        ),
    ];
    if inputs.workshop_count > 0 {
        items.push(fixed(WORKSHOP_TASK, inputs.workshop_count as f64 * WORKSHOP_HOURS));
    }
    if inputs.language_support_effective() {
        items.push(fixed(LANGUAGE_SUPPORT_TASK, LANGUAGE_SUPPORT_HOURS));
    }
    items
}

pub fn scale_multiplier(catalog: &Catalog, label: &str) -> f64 {
    catalog.scale().lookup(label).unwrap_or_else(|| {
        tracing::warn!("⚠️ Unknown scale '{}', using multiplier 1.0", label);
        1.0
    })
}

pub fn group_multiplier(catalog: &Catalog, group_company_count: u32) -> f64 {
    let table = catalog.group_multipliers();
    match table.lookup(group_company_count) {
        Some(multiplier) => multiplier,
        None => {
            if !table.is_empty() {
                tracing::warn!(
                    "⚠️ No multiplier row for {} group companies, using 1.0",
                    group_company_count
                );
            }
            1.0
        }
    }
}

/// Hours of one catalog item after the group-size rule.
pub fn adjusted_hours(item: &ServiceItem, group_company_count: u32, group_multiplier: f64) -> f64 {
    if group_company_count > 0 && item.group.uses_group_multiplier() {
        item.hours * group_multiplier
    } else {
        item.hours
    }
}

/// Selected catalog items as line items, in group → category → task order.
pub fn selected_line_items(
    catalog: &Catalog,
    selection: &SelectionState,
    group_company_count: u32,
    group_multiplier: f64,
) -> Vec<LineItem> {
    let mut items = Vec::new();
    for group in Group::ALL {
        for category in catalog.categories_in_group(group) {
            for item in catalog.items_in_category(category) {
                if !selection.is_selected(item) {
                    continue;
                }
                items.push(LineItem {
                    category: display_category(&item.category).to_string(),
                    task: item.task.clone(),
                    hours: adjusted_hours(item, group_company_count, group_multiplier),
                    description: item.description.clone(),
                });
            }
        }
    }
    items
}

pub fn compute_quote(
    catalog: &Catalog,
    selection: &SelectionState,
    inputs: &QuoteInputs,
) -> QuoteOutcome {
    if escalation::evaluate(catalog, inputs.group_company_count)
        == EscalationState::RequiresManualQuote
    {
        return QuoteOutcome::RequiresManualQuote {
            group_company_count: inputs.group_company_count,
        };
    }

    let group_multiplier = group_multiplier(catalog, inputs.group_company_count);
    let scale_multiplier = scale_multiplier(catalog, &inputs.scale_label);

    let mut line_items = fixed_line_items(inputs);
    line_items.extend(selected_line_items(
        catalog,
        selection,
        inputs.group_company_count,
        group_multiplier,
    ));

    let total_base_hours: f64 = line_items.iter().map(|item| item.hours).sum();
    let adjusted_hours = total_base_hours * scale_multiplier;
    let net_price = adjusted_hours * inputs.hourly_rate as f64;
    let tax_price = net_price * (1.0 + TAX_RATE);

    tracing::debug!(
        "Quote: {} lines, {:.1}h base, {:.1}h adjusted, net {:.0}",
        line_items.len(),
        total_base_hours,
        adjusted_hours,
        net_price
    );

    QuoteOutcome::Priced(QuoteResult {
        total_base_hours,
        adjusted_hours,
        scale_multiplier,
        group_multiplier,
        net_price,
        tax_price,
        line_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        GroupMultipliers, Region, ScaleMultipliers, TaskKey, DEFAULT_SCALE_LABEL,
    };
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    // 原始資料沒有定義 kickoff 工時，測試中明確給定
    const KICKOFF_HOURS: f64 = 3.0;

    fn item(group: Group, category: &str, task: &str, hours: f64) -> ServiceItem {
        ServiceItem {
            group,
            category: category.to_string(),
            task: task.to_string(),
            hours,
            required: false,
            description: Some(format!("{} details", task)),
        }
    }

    fn catalog() -> Catalog {
        let groups: BTreeMap<u32, f64> = [(0, 1.0), (1, 1.2), (2, 1.4), (3, 1.6), (4, 1.8), (5, 2.0), (6, 2.0)]
            .into_iter()
            .collect();
        Catalog::new(
            vec![
                item(Group::Common, "C0 Baseline", "Boundary", 8.0),
                item(Group::Common, "Kickoff prep", "Agenda", 2.0),
                item(Group::Upstream, "C1 Goods", "Spend data", 10.0),
                item(Group::Downstream, "C11 Use phase", "Scenarios", 5.0),
            ],
            ScaleMultipliers::new(vec![
                (DEFAULT_SCALE_LABEL.to_string(), 1.0),
                ("Large enterprise".to_string(), 1.5),
            ]),
            GroupMultipliers::new(groups),
        )
    }

    fn inputs() -> QuoteInputs {
        QuoteInputs {
            company_name: "Acme".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            hourly_rate: 40_000,
            scale_label: DEFAULT_SCALE_LABEL.to_string(),
            group_company_count: 0,
            region: Region::DomesticOnly,
            language_support: false,
            duration_months: 6,
            meeting_frequency: 2,
            workshop_count: 1,
            kickoff_hours: KICKOFF_HOURS,
        }
    }

    fn select_all(catalog: &Catalog) -> SelectionState {
        let mut state = SelectionState::new();
        for group in Group::ALL {
            state.set_group(catalog, group, true);
        }
        state
    }

    fn priced(outcome: QuoteOutcome) -> QuoteResult {
        match outcome {
            QuoteOutcome::Priced(result) => result,
            other => panic!("expected a priced quote, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_scenario_fixed_hours_only() {
        let catalog = catalog();
        let result = priced(compute_quote(&catalog, &SelectionState::new(), &inputs()));

        // kickoff + 6 × 2 meetings + 1 workshop
        assert_eq!(result.total_base_hours, KICKOFF_HOURS + 17.0);
        assert_eq!(result.adjusted_hours, KICKOFF_HOURS + 17.0);
        assert_eq!(result.net_price, (KICKOFF_HOURS + 17.0) * 40_000.0);
        assert!((result.tax_price - result.net_price * 1.10).abs() < 1e-6);
        let tasks: Vec<&str> = result.line_items.iter().map(|i| i.task.as_str()).collect();
        assert_eq!(tasks, vec![KICKOFF_TASK, MEETING_TASK, WORKSHOP_TASK]);
    }

    #[test]
    fn test_language_support_needs_overseas_region() {
        let catalog = catalog();
        let mut inputs = inputs();
        inputs.language_support = true;
        let domestic = priced(compute_quote(&catalog, &SelectionState::new(), &inputs));

        inputs.region = Region::IncludesOverseas;
        let overseas = priced(compute_quote(&catalog, &SelectionState::new(), &inputs));

        assert_eq!(
            overseas.total_base_hours - domestic.total_base_hours,
            LANGUAGE_SUPPORT_HOURS
        );
        assert_eq!(
            overseas.line_items.last().map(|i| i.task.as_str()),
            Some(LANGUAGE_SUPPORT_TASK)
        );
    }

    #[test]
    fn test_no_workshop_line_when_count_is_zero() {
        let mut inputs = inputs();
        inputs.workshop_count = 0;
        let items = fixed_line_items(&inputs);
        assert!(items.iter().all(|i| i.task != WORKSHOP_TASK));
    }

    #[test]
    fn test_common_items_ignore_group_multiplier() {
        let catalog = catalog();
        let selection = select_all(&catalog);
        let mut inputs = inputs();

        for count in 0..=5 {
            inputs.group_company_count = count;
            let result = priced(compute_quote(&catalog, &selection, &inputs));
            let hours = |task: &str| {
                result
                    .line_items
                    .iter()
                    .find(|i| i.task == task)
                    .map(|i| i.hours)
                    .unwrap()
            };

            assert_eq!(hours("Boundary"), 8.0);
            let expected = if count == 0 {
                1.0
            } else {
                catalog.group_multipliers().lookup(count).unwrap()
            };
            assert!((hours("Spend data") - 10.0 * expected).abs() < 1e-9);
            assert!((hours("Scenarios") - 5.0 * expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_scale_multiplier_applies_to_total() {
        let catalog = catalog();
        let mut inputs = inputs();
        inputs.scale_label = "Large enterprise".to_string();
        let result = priced(compute_quote(&catalog, &select_all(&catalog), &inputs));

        assert_eq!(result.scale_multiplier, 1.5);
        assert!((result.adjusted_hours - result.total_base_hours * 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_scale_defaults_to_one() {
        let catalog = catalog();
        let mut inputs = inputs();
        inputs.scale_label = "Galactic".to_string();
        let result = priced(compute_quote(&catalog, &SelectionState::new(), &inputs));
        assert_eq!(result.scale_multiplier, 1.0);
    }

    #[test]
    fn test_non_standard_categories_collapse_to_other() {
        assert_eq!(display_category("C1 Goods"), "C1 Goods");
        assert_eq!(display_category("Kickoff prep"), OTHER_CATEGORY);
        assert_eq!(display_category("01 Intro"), OTHER_CATEGORY);
    }

    #[test]
    fn test_total_hours_monotone_in_selection() {
        let catalog = catalog();
        let inputs = inputs();
        let mut state = SelectionState::new();
        let mut previous = priced(compute_quote(&catalog, &state, &inputs)).total_base_hours;
        assert!(previous >= 0.0);

        for item in catalog.items() {
            let key: TaskKey = item.key();
            state.set_task(&catalog, &key, true).unwrap();
            let total = priced(compute_quote(&catalog, &state, &inputs)).total_base_hours;
            assert!(total >= previous);
            previous = total;
        }
    }

    #[test]
    fn test_escalation_produces_no_price() {
        let catalog = catalog();
        let mut inputs = inputs();
        inputs.group_company_count = 5;
        assert_eq!(
            compute_quote(&catalog, &select_all(&catalog), &inputs).state(),
            EscalationState::Priced
        );

        inputs.group_company_count = 6;
        let outcome = compute_quote(&catalog, &select_all(&catalog), &inputs);
        assert_eq!(outcome.state(), EscalationState::RequiresManualQuote);
        assert!(outcome.as_priced().is_none());
    }

    #[test]
    fn test_line_order_follows_groups() {
        let catalog = catalog();
        let result = priced(compute_quote(&catalog, &select_all(&catalog), &inputs()));
        let catalog_lines: Vec<&str> = result.line_items[3..]
            .iter()
            .map(|i| i.task.as_str())
            .collect();
        assert_eq!(catalog_lines, vec!["Boundary", "Agenda", "Spend data", "Scenarios"]);
        assert_eq!(result.line_items[4].category, OTHER_CATEGORY);
    }
}
