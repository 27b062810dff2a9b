use crate::error::{ConsolidationError, Result};
use crate::schema::{Entity, FinancialRecord, Person};
use serde::{Deserialize, Serialize};
use std::io::Write;

pub const UNKNOWN_LABEL: &str = "Unknown";

/// One spreadsheet row per record. Field renames are the column headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Sales")]
    pub sales: f64,
    #[serde(rename = "Purchases")]
    pub purchases: f64,
    #[serde(rename = "Gross Profit")]
    pub gross_profit: f64,
    #[serde(rename = "Net Profit")]
    pub net_profit: f64,
    #[serde(rename = "Assets")]
    pub assets: f64,
    #[serde(rename = "Liabilities")]
    pub liabilities: f64,
    #[serde(rename = "Cash & Bank")]
    pub cash_and_bank: f64,
    #[serde(rename = "Stock")]
    pub stock: f64,
    #[serde(rename = "Entered By")]
    pub entered_by: String,
    #[serde(rename = "Last Modified By")]
    pub last_modified_by: String,
    #[serde(rename = "Last Modified")]
    pub last_modified: String,
}

pub const EXPORT_COLUMNS: [&str; 12] = [
    "Company",
    "Sales",
    "Purchases",
    "Gross Profit",
    "Net Profit",
    "Assets",
    "Liabilities",
    "Cash & Bank",
    "Stock",
    "Entered By",
    "Last Modified By",
    "Last Modified",
];

pub fn resolve_person_name(persons: &[Person], person_id: &str) -> String {
    persons
        .iter()
        .find(|p| p.id == person_id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

pub fn resolve_entity_name(entities: &[Entity], entity_id: &str) -> String {
    entities
        .iter()
        .find(|e| e.id == entity_id)
        .map(|e| e.name.clone())
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

pub fn export_rows(
    records: &[FinancialRecord],
    entities: &[Entity],
    persons: &[Person],
) -> Vec<ExportRow> {
    records
        .iter()
        .map(|record| ExportRow {
            company: resolve_entity_name(entities, &record.entity_id),
            sales: record.sales,
            purchases: record.purchases,
            gross_profit: record.gross_profit,
            net_profit: record.net_profit,
            assets: record.total_assets(),
            liabilities: record.current_liabilities,
            cash_and_bank: record.total_cash(),
            stock: record.stock_in_hand,
            entered_by: resolve_person_name(persons, &record.entered_by),
            last_modified_by: resolve_person_name(persons, &record.last_modified_by),
            last_modified: record.last_modified.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect()
}

/// Writes a header row followed by one row per record. The header is written
/// even when there are no rows.
pub fn write_csv<W: Write>(rows: &[ExportRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(EXPORT_COLUMNS)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;

    Ok(())
}

pub fn to_csv(rows: &[ExportRow]) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(rows, &mut buffer)?;

    String::from_utf8(buffer).map_err(|e| {
        ConsolidationError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}
