//! Quote report as a spreadsheet-friendly CSV.
//!
//! Block A is a key/value header describing the inputs and totals, Block B
//! lists one row per line item. The file starts with a UTF-8 BOM so that
//! spreadsheet tools detect the encoding.

use crate::domain::model::{QuoteInputs, QuoteOutcome, QuoteResult, SPECIAL_CASE_THRESHOLD};
use crate::utils::error::{QuoteError, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const LINE_ITEMS_MARKER: &str = "[Line items]";

const LINE_ITEM_COLUMNS: [&str; 6] = [
    "Category",
    "Task",
    "Hours (scale applied)",
    "Hourly rate",
    "Line price",
    "Description",
];

/// One Block B row as read back from a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedLine {
    pub category: String,
    pub task: String,
    pub hours: f64,
    pub hourly_rate: u64,
    pub price: u64,
    pub description: Option<String>,
}

pub fn format_yen(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("¥{}", out)
}

pub fn group_count_label(group_company_count: u32) -> String {
    if group_company_count > SPECIAL_CASE_THRESHOLD {
        format!("More than {}", SPECIAL_CASE_THRESHOLD)
    } else {
        group_company_count.to_string()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `{YYYYMMDD}_Scope3-quote_{company}.csv`, with characters illegal in file names replaced.
pub fn export_file_name(date: NaiveDate, company_name: &str) -> String {
    let company: String = company_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let company = if company.is_empty() {
        "company".to_string()
    } else {
        company
    };
    format!("{}_Scope3-quote_{}.csv", date.format("%Y%m%d"), company)
}

fn header_rows(result: &QuoteResult, inputs: &QuoteInputs) -> Vec<[String; 2]> {
    let end_month = inputs
        .end_date()
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default();

    vec![
        ["Item".into(), "Value".into()],
        ["Company name".into(), inputs.company_name.clone()],
        ["Start month".into(), inputs.start_date.format("%Y-%m").to_string()],
        ["End month".into(), end_month],
        ["Duration".into(), format!("{} months", inputs.duration_months)],
        ["Company scale".into(), inputs.scale_label.clone()],
        ["Scale multiplier".into(), format!("x {}", result.scale_multiplier)],
        ["Group companies".into(), group_count_label(inputs.group_company_count)],
        ["Region".into(), inputs.region.label().to_string()],
        [
            "Language support".into(),
            if inputs.language_support_effective() { "Yes" } else { "No" }.to_string(),
        ],
        ["Hourly rate".into(), format_yen(inputs.hourly_rate)],
        ["Total hours (raw)".into(), format!("{:.1}h", result.total_base_hours)],
        ["Total hours (adjusted)".into(), format!("{:.1}h", result.adjusted_hours)],
        ["Net price".into(), format_yen(result.net_price_truncated())],
        ["Price incl. tax".into(), format_yen(result.tax_price_truncated())],
        [String::new(), String::new()],
        [LINE_ITEMS_MARKER.into(), String::new()],
    ]
}

fn render(result: &QuoteResult, inputs: &QuoteInputs) -> Result<Vec<u8>> {
    let mut buffer = UTF8_BOM.to_vec();
    {
        // 兩個區塊欄數不同
        let mut wtr = WriterBuilder::new().flexible(true).from_writer(&mut buffer);

        for row in header_rows(result, inputs) {
            wtr.write_record(&row)?;
        }
        wtr.write_record(LINE_ITEM_COLUMNS)?;

        for item in &result.line_items {
            let hours = round2(item.hours * result.scale_multiplier);
            wtr.write_record([
                item.category.clone(),
                item.task.clone(),
                format!("{:.2}", hours),
                inputs.hourly_rate.to_string(),
                result.line_price(item, inputs.hourly_rate).to_string(),
                item.description.clone().unwrap_or_default(),
            ])?;
        }
        wtr.flush()?;
    }
    Ok(buffer)
}

/// Serializes a priced quote. A manual-quote outcome has no report.
pub fn export_quote(outcome: &QuoteOutcome, inputs: &QuoteInputs) -> Result<Vec<u8>> {
    match outcome {
        QuoteOutcome::Priced(result) => render(result, inputs),
        QuoteOutcome::RequiresManualQuote {
            group_company_count,
        } => Err(QuoteError::EscalationRequired {
            group_company_count: *group_company_count,
        }),
    }
}

/// Reads Block B of a report produced by `export_quote`.
pub fn parse_line_items(data: &[u8]) -> Result<Vec<ExportedLine>> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut records = rdr.records();
    loop {
        match records.next() {
            Some(record) => {
                if record?.get(0) == Some(LINE_ITEMS_MARKER) {
                    break;
                }
            }
            None => {
                return Err(QuoteError::data_load(
                    "export",
                    format!("'{}' marker not found", LINE_ITEMS_MARKER),
                ))
            }
        }
    }
    // 欄位標題列
    records.next().transpose()?;

    let mut lines = Vec::new();
    for record in records {
        let record = record?;
        if record.len() != LINE_ITEM_COLUMNS.len() {
            return Err(QuoteError::data_load(
                "export",
                format!("line item row has {} fields", record.len()),
            ));
        }
        let invalid = |field: &str, raw: &str| {
            QuoteError::data_load("export", format!("invalid {} '{}'", field, raw))
        };

        let description = &record[5];
        lines.push(ExportedLine {
            category: record[0].to_string(),
            task: record[1].to_string(),
            hours: record[2].parse().map_err(|_| invalid("hours", &record[2]))?,
            hourly_rate: record[3]
                .parse()
                .map_err(|_| invalid("hourly rate", &record[3]))?,
            price: record[4].parse().map_err(|_| invalid("price", &record[4]))?,
            description: (!description.is_empty()).then(|| description.to_string()),
        });
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{LineItem, Region, OTHER_CATEGORY};

    fn inputs() -> QuoteInputs {
        QuoteInputs {
            company_name: "Acme, Inc.".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            hourly_rate: 40_000,
            scale_label: "Large enterprise".to_string(),
            group_company_count: 2,
            region: Region::IncludesOverseas,
            language_support: true,
            duration_months: 6,
            meeting_frequency: 2,
            workshop_count: 1,
            kickoff_hours: 2.0,
        }
    }

    fn result() -> QuoteResult {
        QuoteResult {
            total_base_hours: 31.5,
            adjusted_hours: 47.25,
            scale_multiplier: 1.5,
            group_multiplier: 1.2,
            net_price: 1_890_000.0,
            tax_price: 2_079_000.0,
            line_items: vec![
                LineItem {
                    category: OTHER_CATEGORY.to_string(),
                    task: "Kickoff".to_string(),
                    hours: 2.0,
                    description: None,
                },
                LineItem {
                    category: "C1 Purchased goods".to_string(),
                    task: "Spend data, by supplier".to_string(),
                    hours: 29.5,
                    description: Some("Collect \"spend\" data".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_report_starts_with_bom_and_header_block() {
        let bytes = export_quote(&QuoteOutcome::Priced(result()), &inputs()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Item,Value");
        assert_eq!(lines[1], "Company name,\"Acme, Inc.\"");
        assert_eq!(lines[2], "Start month,2026-10");
        assert_eq!(lines[3], "End month,2027-04");
        assert!(text.contains("Scale multiplier,x 1.5"));
        assert!(text.contains("Language support,Yes"));
        assert!(text.contains("Hourly rate,\"¥40,000\""));
        // 47.25 為二進位可精確表示的中點，格式化取偶數
        assert!(lines.contains(&"Total hours (adjusted),47.2h"));
        assert!(text.contains("Price incl. tax,\"¥2,079,000\""));
    }

    #[test]
    fn test_line_rows_round_trip() {
        let result = result();
        let bytes = export_quote(&QuoteOutcome::Priced(result.clone()), &inputs()).unwrap();
        let lines = parse_line_items(&bytes).unwrap();

        assert_eq!(lines.len(), result.line_items.len());
        for (parsed, item) in lines.iter().zip(&result.line_items) {
            assert_eq!(parsed.category, item.category);
            assert_eq!(parsed.task, item.task);
            assert!((parsed.hours - item.hours * result.scale_multiplier).abs() < 0.005);
            assert_eq!(parsed.price, result.line_price(item, 40_000));
            assert_eq!(parsed.description, item.description);
        }
        // 29.5h × 1.5 × 40,000
        assert_eq!(lines[1].price, 1_770_000);
    }

    #[test]
    fn test_manual_quote_is_not_exported() {
        let outcome = QuoteOutcome::RequiresManualQuote {
            group_company_count: 6,
        };
        assert!(matches!(
            export_quote(&outcome, &inputs()),
            Err(QuoteError::EscalationRequired { .. })
        ));
    }

    #[test]
    fn test_format_yen() {
        assert_eq!(format_yen(0), "¥0");
        assert_eq!(format_yen(999), "¥999");
        assert_eq!(format_yen(40_000), "¥40,000");
        assert_eq!(format_yen(1_234_567), "¥1,234,567");
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(
            export_file_name(date, "Acme/Japan"),
            "20261017_Scope3-quote_Acme_Japan.csv"
        );
        assert_eq!(export_file_name(date, "  "), "20261017_Scope3-quote_company.csv");
    }

    #[test]
    fn test_group_count_label() {
        assert_eq!(group_count_label(5), "5");
        assert_eq!(group_count_label(6), "More than 5");
    }
}
