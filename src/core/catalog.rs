//! Catalog loading from the three master tables.
//!
//! Each table is a CSV export of one sheet of the master workbook. Headers are
//! checked against a fixed schema before any row is read. A table that fails
//! to load is replaced by an empty one and reported as a warning, so quoting
//! keeps working with default multipliers.

use crate::domain::model::{Catalog, Group, GroupMultipliers, ScaleMultipliers, ServiceItem};
use crate::domain::ports::LoadedCatalog;
use crate::utils::error::{QuoteError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, OnceLock};

pub const SERVICE_TABLE: &str = "service_master";
pub const GROUP_TABLE: &str = "group_multipliers";
pub const SCALE_TABLE: &str = "scale_multipliers";

pub const SERVICE_FILE: &str = "service_master.csv";
pub const GROUP_FILE: &str = "group_multipliers.csv";
pub const SCALE_FILE: &str = "scale_multipliers.csv";

const SERVICE_COLUMNS: &[&str] = &["Group", "Category", "Task", "Hours", "Required"];
const SERVICE_OPTIONAL_COLUMNS: &[&str] = &["Description"];
const GROUP_COLUMNS: &[&str] = &["CompanyCount", "Multiplier"];
const SCALE_COLUMNS: &[&str] = &["ScaleName", "Multiplier"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Raw table contents, or the error hit while reading each one.
#[derive(Debug)]
pub struct CatalogTables {
    pub services: Result<Vec<u8>>,
    pub group_multipliers: Result<Vec<u8>>,
    pub scale_multipliers: Result<Vec<u8>>,
}

impl Default for CatalogTables {
    /// All three tables absent.
    fn default() -> Self {
        let missing = |table: &str| Err(QuoteError::data_load(table, "table is missing"));
        Self {
            services: missing(SERVICE_TABLE),
            group_multipliers: missing(GROUP_TABLE),
            scale_multipliers: missing(SCALE_TABLE),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceRow {
    #[serde(rename = "Group")]
    group: String,
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Task")]
    task: String,
    #[serde(rename = "Hours")]
    hours: f64,
    #[serde(rename = "Required", deserialize_with = "deserialize_flag")]
    required: bool,
    #[serde(rename = "Description", default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroupRow {
    #[serde(rename = "CompanyCount")]
    company_count: u32,
    #[serde(rename = "Multiplier")]
    multiplier: f64,
}

#[derive(Debug, Deserialize)]
struct ScaleRow {
    #[serde(rename = "ScaleName")]
    scale_name: String,
    #[serde(rename = "Multiplier")]
    multiplier: f64,
}

/// Spreadsheet booleans: TRUE/FALSE, 1/0, yes/no; blank means false.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let value = raw.unwrap_or_default().trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "1.0" | "yes" | "y" => Ok(true),
        "" | "false" | "0" | "0.0" | "no" | "n" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid Required flag '{}'",
            other
        ))),
    }
}

fn reader(data: &[u8]) -> csv::Reader<&[u8]> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(data)
}

fn check_headers(
    table: &str,
    headers: &StringRecord,
    required: &[&str],
    optional: &[&str],
) -> Result<()> {
    let present: Vec<&str> = headers.iter().collect();

    let missing: Vec<String> = required
        .iter()
        .filter(|column| !present.contains(*column))
        .map(|column| column.to_string())
        .collect();

    let unexpected: Vec<String> = present
        .iter()
        .enumerate()
        .filter(|(_, column)| !required.contains(*column) && !optional.contains(*column))
        .map(|(idx, column)| {
            if column.is_empty() {
                format!("<blank column {}>", idx + 1)
            } else {
                column.to_string()
            }
        })
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(QuoteError::SchemaError {
            table: table.to_string(),
            missing,
            unexpected,
        })
    }
}

fn clean_description(raw: Option<String>) -> Option<String> {
    raw.map(|text| text.trim().to_string())
        // 試算表匯出的空儲存格常變成 "nan"
        .filter(|text| !text.is_empty() && text != "nan")
}

fn row_error(table: &str, line: usize, reason: impl std::fmt::Display) -> QuoteError {
    QuoteError::data_load(table, format!("row {}: {}", line, reason))
}

pub fn parse_service_items(data: &[u8]) -> Result<Vec<ServiceItem>> {
    let mut rdr = reader(data);
    let headers = rdr
        .headers()
        .map_err(|e| QuoteError::data_load(SERVICE_TABLE, e.to_string()))?
        .clone();
    check_headers(SERVICE_TABLE, &headers, SERVICE_COLUMNS, SERVICE_OPTIONAL_COLUMNS)?;

    let mut items = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut category_groups: HashMap<String, Group> = HashMap::new();

    for (idx, row) in rdr.deserialize::<ServiceRow>().enumerate() {
        // 標題列是第 1 列
        let line = idx + 2;
        let row = row.map_err(|e| row_error(SERVICE_TABLE, line, e))?;

        let group = Group::parse(&row.group)
            .ok_or_else(|| row_error(SERVICE_TABLE, line, format!("unknown group '{}'", row.group)))?;
        if row.category.is_empty() || row.task.is_empty() {
            return Err(row_error(SERVICE_TABLE, line, "Category and Task are required"));
        }
        if !row.hours.is_finite() || row.hours < 0.0 {
            return Err(row_error(
                SERVICE_TABLE,
                line,
                format!("Hours must be non-negative, got {}", row.hours),
            ));
        }
        if !seen.insert((row.category.clone(), row.task.clone())) {
            return Err(row_error(
                SERVICE_TABLE,
                line,
                format!("duplicate task '{}' in category '{}'", row.task, row.category),
            ));
        }
        match category_groups.get(&row.category) {
            Some(existing) if *existing != group => {
                return Err(row_error(
                    SERVICE_TABLE,
                    line,
                    format!(
                        "category '{}' listed under both {} and {}",
                        row.category, existing, group
                    ),
                ));
            }
            Some(_) => {}
            None => {
                category_groups.insert(row.category.clone(), group);
            }
        }

        items.push(ServiceItem {
            group,
            category: row.category,
            task: row.task,
            hours: row.hours,
            required: row.required,
            description: clean_description(row.description),
        });
    }

    tracing::debug!("Parsed {} service items", items.len());
    Ok(items)
}

pub fn parse_group_multipliers(data: &[u8]) -> Result<GroupMultipliers> {
    let mut rdr = reader(data);
    let headers = rdr
        .headers()
        .map_err(|e| QuoteError::data_load(GROUP_TABLE, e.to_string()))?
        .clone();
    check_headers(GROUP_TABLE, &headers, GROUP_COLUMNS, &[])?;

    let mut rows = BTreeMap::new();
    for (idx, row) in rdr.deserialize::<GroupRow>().enumerate() {
        let line = idx + 2;
        let row = row.map_err(|e| row_error(GROUP_TABLE, line, e))?;
        if !row.multiplier.is_finite() || row.multiplier <= 0.0 {
            return Err(row_error(
                GROUP_TABLE,
                line,
                format!("Multiplier must be positive, got {}", row.multiplier),
            ));
        }
        if rows.insert(row.company_count, row.multiplier).is_some() {
            return Err(row_error(
                GROUP_TABLE,
                line,
                format!("duplicate CompanyCount {}", row.company_count),
            ));
        }
    }

    Ok(GroupMultipliers::new(rows))
}

pub fn parse_scale_multipliers(data: &[u8]) -> Result<ScaleMultipliers> {
    let mut rdr = reader(data);
    let headers = rdr
        .headers()
        .map_err(|e| QuoteError::data_load(SCALE_TABLE, e.to_string()))?
        .clone();
    check_headers(SCALE_TABLE, &headers, SCALE_COLUMNS, &[])?;

    let mut entries: Vec<(String, f64)> = Vec::new();
    for (idx, row) in rdr.deserialize::<ScaleRow>().enumerate() {
        let line = idx + 2;
        let row = row.map_err(|e| row_error(SCALE_TABLE, line, e))?;
        if row.scale_name.is_empty() {
            return Err(row_error(SCALE_TABLE, line, "ScaleName is required"));
        }
        if !row.multiplier.is_finite() || row.multiplier <= 0.0 {
            return Err(row_error(
                SCALE_TABLE,
                line,
                format!("Multiplier must be positive, got {}", row.multiplier),
            ));
        }
        if entries.iter().any(|(name, _)| *name == row.scale_name) {
            return Err(row_error(
                SCALE_TABLE,
                line,
                format!("duplicate ScaleName '{}'", row.scale_name),
            ));
        }
        entries.push((row.scale_name, row.multiplier));
    }

    Ok(ScaleMultipliers::new(entries))
}

fn load_table<T: Default>(
    table: &str,
    data: &Result<Vec<u8>>,
    parse: fn(&[u8]) -> Result<T>,
    warnings: &mut Vec<QuoteError>,
) -> T {
    let parsed = match data {
        Ok(bytes) => parse(bytes),
        Err(QuoteError::DataLoadError { reason, .. }) => {
            Err(QuoteError::data_load(table, reason.clone()))
        }
        Err(e) => Err(QuoteError::data_load(table, format!("cannot read table: {}", e))),
    };

    parsed.unwrap_or_else(|e| {
        tracing::warn!("⚠️ {} (falling back to an empty table)", e);
        warnings.push(e);
        T::default()
    })
}

/// Builds the catalog, degrading each broken table to an empty one.
pub fn load_catalog(tables: &CatalogTables) -> LoadedCatalog {
    let mut warnings = Vec::new();

    let items = load_table(
        SERVICE_TABLE,
        &tables.services,
        parse_service_items,
        &mut warnings,
    );
    let group_multipliers = load_table(
        GROUP_TABLE,
        &tables.group_multipliers,
        parse_group_multipliers,
        &mut warnings,
    );
    let scale = load_table(
        SCALE_TABLE,
        &tables.scale_multipliers,
        parse_scale_multipliers,
        &mut warnings,
    );

    tracing::info!(
        "📚 Catalog loaded: {} items, {} scale labels, {} group rows ({} warnings)",
        items.len(),
        scale.len(),
        group_multipliers.len(),
        warnings.len()
    );

    LoadedCatalog {
        catalog: Arc::new(Catalog::new(items, scale, group_multipliers)),
        warnings,
    }
}

impl LoadedCatalog {
    /// Fails with the first table error instead of degrading.
    pub fn into_strict(mut self) -> Result<Arc<Catalog>> {
        if self.warnings.is_empty() {
            Ok(self.catalog)
        } else {
            Err(self.warnings.remove(0))
        }
    }
}

#[derive(Debug)]
struct CachedCatalog {
    catalog: Arc<Catalog>,
    /// Messages of the tables that degraded when this catalog was loaded.
    degraded: Vec<String>,
}

/// Process-wide, load-once catalog holder. Sessions share the `Arc<Catalog>`.
#[derive(Debug, Default)]
pub struct CatalogStore {
    cell: OnceLock<CachedCatalog>,
}

impl CatalogStore {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Option<Arc<Catalog>> {
        self.cell.get().map(|cached| cached.catalog.clone())
    }

    /// Load warnings of the cached catalog, `None` before the first load.
    pub fn load_warnings(&self) -> Option<&[String]> {
        self.cell.get().map(|cached| cached.degraded.as_slice())
    }

    /// Fails when the cached catalog was built from degraded tables.
    pub fn ensure_complete(&self) -> Result<()> {
        match self.load_warnings() {
            Some(degraded) if !degraded.is_empty() => Err(QuoteError::data_load(
                "catalog",
                format!("cached catalog has degraded tables: {}", degraded.join("; ")),
            )),
            _ => Ok(()),
        }
    }

    /// Runs `load` on first use only; later calls get the cached catalog and no warnings.
    pub fn get_or_load<F>(&self, load: F) -> LoadedCatalog
    where
        F: FnOnce() -> LoadedCatalog,
    {
        let mut warnings = Vec::new();
        let cached = self.cell.get_or_init(|| {
            let loaded = load();
            let degraded = loaded.warnings.iter().map(|e| e.to_string()).collect();
            warnings = loaded.warnings;
            CachedCatalog {
                catalog: loaded.catalog,
                degraded,
            }
        });
        LoadedCatalog {
            catalog: cached.catalog.clone(),
            warnings,
        }
    }
}
