use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Display bucket for fixed items and non-standard catalog categories.
pub const OTHER_CATEGORY: &str = "Other";

/// Group company counts above this are routed to manual quoting.
pub const SPECIAL_CASE_THRESHOLD: u32 = 5;

pub const TAX_RATE: f64 = 0.10;

/// Scale label offered when the scale table is empty.
pub const DEFAULT_SCALE_LABEL: &str = "SME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Group {
    Common,
    Upstream,
    Downstream,
}

impl Group {
    /// Display and aggregation order.
    pub const ALL: [Group; 3] = [Group::Common, Group::Upstream, Group::Downstream];

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Common => "Common",
            Group::Upstream => "Upstream",
            Group::Downstream => "Downstream",
        }
    }

    /// Accepts the English labels and the master workbook's Japanese ones.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "共通" => Some(Group::Common),
            "上流" => Some(Group::Upstream),
            "下流" => Some(Group::Downstream),
            other => match other.to_ascii_lowercase().as_str() {
                "common" => Some(Group::Common),
                "upstream" => Some(Group::Upstream),
                "downstream" => Some(Group::Downstream),
                _ => None,
            },
        }
    }

    /// Cross-company coordination overhead never applies to the shared baseline.
    pub fn uses_group_multiplier(&self) -> bool {
        !matches!(self, Group::Common)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskKey {
    pub group: Group,
    pub category: String,
    pub task: String,
}

impl TaskKey {
    pub fn new(group: Group, category: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            group,
            category: category.into(),
            task: task.into(),
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.category, self.task)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceItem {
    pub group: Group,
    pub category: String,
    pub task: String,
    pub hours: f64,
    pub required: bool,
    pub description: Option<String>,
}

impl ServiceItem {
    pub fn key(&self) -> TaskKey {
        TaskKey::new(self.group, self.category.clone(), self.task.clone())
    }
}

/// Scale label → multiplier, in table order (the first row is the default choice).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScaleMultipliers {
    entries: Vec<(String, f64)>,
}

impl ScaleMultipliers {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self { entries }
    }

    pub fn lookup(&self, label: &str) -> Option<f64> {
        if self.entries.is_empty() && label == DEFAULT_SCALE_LABEL {
            return Some(1.0);
        }
        self.entries
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, multiplier)| *multiplier)
    }

    /// Selectable labels; never empty.
    pub fn labels(&self) -> Vec<&str> {
        if self.entries.is_empty() {
            return vec![DEFAULT_SCALE_LABEL];
        }
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Group company count → multiplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupMultipliers {
    rows: BTreeMap<u32, f64>,
}

impl GroupMultipliers {
    pub fn new(rows: BTreeMap<u32, f64>) -> Self {
        Self { rows }
    }

    pub fn lookup(&self, company_count: u32) -> Option<f64> {
        self.rows.get(&company_count).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read-only catalog: service items plus both multiplier tables.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<ServiceItem>,
    scale: ScaleMultipliers,
    group_multipliers: GroupMultipliers,
}

impl Catalog {
    pub fn new(
        items: Vec<ServiceItem>,
        scale: ScaleMultipliers,
        group_multipliers: GroupMultipliers,
    ) -> Self {
        Self {
            items,
            scale,
            group_multipliers,
        }
    }

    pub fn items(&self) -> &[ServiceItem] {
        &self.items
    }

    pub fn scale(&self) -> &ScaleMultipliers {
        &self.scale
    }

    pub fn group_multipliers(&self) -> &GroupMultipliers {
        &self.group_multipliers
    }

    pub fn items_in_group(&self, group: Group) -> impl Iterator<Item = &ServiceItem> {
        self.items.iter().filter(move |item| item.group == group)
    }

    pub fn items_in_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a ServiceItem> + 'a {
        self.items.iter().filter(move |item| item.category == category)
    }

    /// Categories of a group in first-appearance order.
    pub fn categories_in_group(&self, group: Group) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for item in self.items_in_group(group) {
            if !categories.contains(&item.category.as_str()) {
                categories.push(&item.category);
            }
        }
        categories
    }

    pub fn find(&self, key: &TaskKey) -> Option<&ServiceItem> {
        self.items.iter().find(|item| {
            item.group == key.group && item.category == key.category && item.task == key.task
        })
    }

    pub fn find_task(&self, category: &str, task: &str) -> Option<&ServiceItem> {
        self.items
            .iter()
            .find(|item| item.category == category && item.task == task)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    #[default]
    #[serde(alias = "domestic")]
    DomesticOnly,
    #[serde(alias = "overseas")]
    IncludesOverseas,
}

impl Region {
    pub fn label(&self) -> &'static str {
        match self {
            Region::DomesticOnly => "Domestic only",
            Region::IncludesOverseas => "Includes overseas",
        }
    }
}

/// Scalar inputs of one quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteInputs {
    pub company_name: String,
    pub start_date: NaiveDate,
    pub hourly_rate: u64,
    pub scale_label: String,
    pub group_company_count: u32,
    #[serde(default)]
    pub region: Region,
    #[serde(default)]
    pub language_support: bool,
    pub duration_months: u32,
    pub meeting_frequency: u32,
    pub workshop_count: u32,
    /// No reliable default exists; always supplied by configuration.
    pub kickoff_hours: f64,
}

impl QuoteInputs {
    /// Language support can only be chosen when the region includes overseas sites.
    pub fn language_support_effective(&self) -> bool {
        self.language_support && self.region == Region::IncludesOverseas
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.start_date
            .checked_add_months(Months::new(self.duration_months))
    }

    pub fn max_workshops(&self) -> u32 {
        if self.group_company_count > 0 {
            2
        } else {
            5
        }
    }

    pub fn is_special_case(&self) -> bool {
        self.group_company_count > SPECIAL_CASE_THRESHOLD
    }
}

/// One contributing line of a quote. `hours` are group-adjusted, before the scale multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub category: String,
    pub task: String,
    pub hours: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteResult {
    pub total_base_hours: f64,
    pub adjusted_hours: f64,
    pub scale_multiplier: f64,
    pub group_multiplier: f64,
    pub net_price: f64,
    pub tax_price: f64,
    pub line_items: Vec<LineItem>,
}

impl QuoteResult {
    /// Price of one line in the report: hours × scale × rate, rounded down.
    pub fn line_price(&self, item: &LineItem, hourly_rate: u64) -> u64 {
        (item.hours * self.scale_multiplier * hourly_rate as f64).floor() as u64
    }

    pub fn net_price_truncated(&self) -> u64 {
        self.net_price.trunc() as u64
    }

    pub fn tax_price_truncated(&self) -> u64 {
        self.tax_price.trunc() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EscalationState {
    Priced,
    RequiresManualQuote,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuoteOutcome {
    Priced(QuoteResult),
    RequiresManualQuote { group_company_count: u32 },
}

impl QuoteOutcome {
    pub fn state(&self) -> EscalationState {
        match self {
            QuoteOutcome::Priced(_) => EscalationState::Priced,
            QuoteOutcome::RequiresManualQuote { .. } => EscalationState::RequiresManualQuote,
        }
    }

    pub fn as_priced(&self) -> Option<&QuoteResult> {
        match self {
            QuoteOutcome::Priced(result) => Some(result),
            QuoteOutcome::RequiresManualQuote { .. } => None,
        }
    }
}

/// A selection change requested by the operator or the quote file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Toggle {
    Group {
        group: Group,
        selected: bool,
    },
    Category {
        category: String,
        selected: bool,
    },
    Task {
        category: String,
        task: String,
        selected: bool,
    },
}
