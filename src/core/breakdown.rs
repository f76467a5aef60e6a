//! Per-category totals for charts and the selected-task summary.

use crate::domain::model::{QuoteResult, OTHER_CATEGORY};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static CATEGORY_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"C\d+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownOrder {
    /// Numeric category order, "Other" last.
    Summary,
    /// Numeric category order, "Other" first.
    Price,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    /// Short chart label, e.g. "C1" for "C1 Purchased goods".
    pub label: String,
    pub hours: f64,
    pub price: f64,
    pub share_percent: f64,
}

pub fn sort_key(category: &str, order: BreakdownOrder) -> i64 {
    let (other, no_digits) = match order {
        BreakdownOrder::Summary => (999, 998),
        BreakdownOrder::Price => (-1, 999),
    };
    if category == OTHER_CATEGORY {
        return other;
    }
    DIGITS
        .find(category)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(no_digits)
}

pub fn short_label(category: &str) -> String {
    CATEGORY_CODE
        .find(category)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| category.to_string())
}

fn sort_categories(categories: &mut [String], order: BreakdownOrder) {
    categories.sort_by(|a, b| {
        sort_key(a, order)
            .cmp(&sort_key(b, order))
            .then_with(|| a.cmp(b))
    });
}

/// Sums hours and price (hours × scale × rate) per line-item category.
pub fn category_breakdown(
    result: &QuoteResult,
    hourly_rate: u64,
    order: BreakdownOrder,
) -> Vec<CategoryTotal> {
    let mut sums: HashMap<&str, (f64, f64)> = HashMap::new();
    for item in &result.line_items {
        let price = item.hours * result.scale_multiplier * hourly_rate as f64;
        let entry = sums.entry(item.category.as_str()).or_insert((0.0, 0.0));
        entry.0 += item.hours;
        entry.1 += price;
    }

    let total_price: f64 = sums.values().map(|(_, price)| price).sum();
    let mut categories: Vec<String> = sums.keys().map(|c| c.to_string()).collect();
    sort_categories(&mut categories, order);

    categories
        .into_iter()
        .map(|category| {
            let (hours, price) = sums[category.as_str()];
            let share_percent = if total_price > 0.0 {
                (price / total_price * 1000.0).round() / 10.0
            } else {
                0.0
            };
            CategoryTotal {
                label: short_label(&category),
                category,
                hours,
                price,
                share_percent,
            }
        })
        .collect()
}

/// Task names grouped by category, in summary order.
pub fn task_summary(result: &QuoteResult) -> Vec<(String, Vec<String>)> {
    let mut grouped: HashMap<&str, Vec<String>> = HashMap::new();
    for item in &result.line_items {
        grouped
            .entry(item.category.as_str())
            .or_default()
            .push(item.task.clone());
    }

    let mut categories: Vec<String> = grouped.keys().map(|c| c.to_string()).collect();
    sort_categories(&mut categories, BreakdownOrder::Summary);

    categories
        .into_iter()
        .map(|category| {
            let tasks = grouped.remove(category.as_str()).unwrap_or_default();
            (category, tasks)
        })
        .collect()
}
