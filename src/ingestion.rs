use crate::consistency::derive_profits;
use crate::error::{ConsolidationError, Result};
use crate::schema::{ConsolidationConfig, FinancialRecord};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub fn load_config_from_str(json: &str) -> Result<ConsolidationConfig> {
    let config: ConsolidationConfig = serde_json::from_str(json)?;
    validate_config(&config)?;

    info!(
        "Loaded consolidation config: {} entities, {} persons, {} records",
        config.entities.len(),
        config.persons.len(),
        config.records.len()
    );

    Ok(config)
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<ConsolidationConfig> {
    let json = std::fs::read_to_string(path.as_ref())?;
    load_config_from_str(&json)
}

/// Entity and person ids must be unique. Records pointing at unknown entities
/// are allowed; access resolution simply never admits them.
pub fn validate_config(config: &ConsolidationConfig) -> Result<()> {
    let mut entity_ids = HashSet::new();
    for entity in &config.entities {
        if !entity_ids.insert(entity.id.as_str()) {
            return Err(ConsolidationError::DuplicateEntity(entity.id.clone()));
        }
    }

    let mut person_ids = HashSet::new();
    for person in &config.persons {
        if !person_ids.insert(person.id.as_str()) {
            return Err(ConsolidationError::DuplicatePerson(person.id.clone()));
        }
    }

    let orphaned = config
        .records
        .iter()
        .filter(|r| !entity_ids.contains(r.entity_id.as_str()))
        .count();
    if orphaned > 0 {
        debug!("{} records reference entities outside the configured universe", orphaned);
    }

    Ok(())
}

/// Ledger head a posted amount belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LedgerHead {
    Sales,
    Purchases,
    DirectExpenses,
    IndirectExpenses,
    StockInHand,
    CashInHand,
    BankBalance,
    SundryDebtors,
    SundryCreditors,
    CurrentAssets,
    FixedAssets,
    CurrentLiabilities,
    Investments,
    Loans,
    Provisions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRow {
    pub entity_id: String,
    pub head: LedgerHead,
    pub amount: f64,
    pub posted_by: String,
    pub posted_at: DateTime<Utc>,
}

fn slot_for(record: &mut FinancialRecord, head: LedgerHead) -> &mut f64 {
    match head {
        LedgerHead::Sales => &mut record.sales,
        LedgerHead::Purchases => &mut record.purchases,
        LedgerHead::DirectExpenses => &mut record.direct_expenses,
        LedgerHead::IndirectExpenses => &mut record.indirect_expenses,
        LedgerHead::StockInHand => &mut record.stock_in_hand,
        LedgerHead::CashInHand => &mut record.cash_in_hand,
        LedgerHead::BankBalance => &mut record.bank_balance,
        LedgerHead::SundryDebtors => &mut record.sundry_debtors,
        LedgerHead::SundryCreditors => &mut record.sundry_creditors,
        LedgerHead::CurrentAssets => &mut record.current_assets,
        LedgerHead::FixedAssets => &mut record.fixed_assets,
        LedgerHead::CurrentLiabilities => &mut record.current_liabilities,
        LedgerHead::Investments => &mut record.investments,
        LedgerHead::Loans => &mut record.loans,
        LedgerHead::Provisions => &mut record.provisions,
    }
}

/// Rolls ledger postings up into one record per entity, in order of each
/// entity's first posting. Profits are derived from the summed heads. The
/// earliest poster becomes `entered_by`; the latest posting sets
/// `last_modified_by` and `last_modified`.
pub fn convert_ledger_to_records(rows: &[LedgerRow]) -> Vec<FinancialRecord> {
    let mut records: Vec<FinancialRecord> = Vec::new();
    let mut first_posted: Vec<DateTime<Utc>> = Vec::new();

    for row in rows {
        let idx = match records.iter().position(|r| r.entity_id == row.entity_id) {
            Some(idx) => idx,
            None => {
                let mut record = FinancialRecord::new(row.entity_id.clone(), row.posted_at);
                record.entered_by = row.posted_by.clone();
                record.last_modified_by = row.posted_by.clone();
                records.push(record);
                first_posted.push(row.posted_at);
                records.len() - 1
            }
        };

        let record = &mut records[idx];
        *slot_for(record, row.head) += row.amount;

        if row.posted_at < first_posted[idx] {
            first_posted[idx] = row.posted_at;
            record.entered_by = row.posted_by.clone();
        }
        if row.posted_at >= record.last_modified {
            record.last_modified = row.posted_at;
            record.last_modified_by = row.posted_by.clone();
        }
    }

    for record in &mut records {
        derive_profits(record);
    }

    debug!(
        "Converted {} ledger rows into {} records",
        rows.len(),
        records.len()
    );

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(entity_id: &str, head: LedgerHead, amount: f64, by: &str, day: u32) -> LedgerRow {
        LedgerRow {
            entity_id: entity_id.to_string(),
            head,
            amount,
            posted_by: by.to_string(),
            posted_at: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_ledger_rows_roll_up_per_entity() {
        let rows = vec![
            row("COMP002", LedgerHead::Sales, 5_000.0, "EMP002", 5),
            row("COMP001", LedgerHead::Sales, 1_000.0, "EMP001", 3),
            row("COMP002", LedgerHead::Sales, 2_500.0, "EMP003", 9),
            row("COMP002", LedgerHead::Purchases, 4_000.0, "EMP002", 2),
            row("COMP002", LedgerHead::IndirectExpenses, 500.0, "EMP002", 6),
        ];

        let records = convert_ledger_to_records(&rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].entity_id, "COMP002");
        assert_eq!(records[1].entity_id, "COMP001");

        let comp2 = &records[0];
        assert_eq!(comp2.sales, 7_500.0);
        assert_eq!(comp2.gross_profit, 3_500.0);
        assert_eq!(comp2.net_profit, 3_000.0);
        assert_eq!(comp2.entered_by, "EMP002");
        assert_eq!(comp2.last_modified_by, "EMP003");
        assert_eq!(comp2.last_modified, Utc.with_ymd_and_hms(2024, 3, 9, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_load_config_rejects_duplicate_entities() {
        let json = r#"{
            "entities": [
                {"id": "COMP001", "name": "A", "code": "A", "category": "trading", "gstin": "", "fiscalYear": "2024-25"},
                {"id": "COMP001", "name": "B", "code": "B", "category": "service", "gstin": "", "fiscalYear": "2024-25"}
            ],
            "persons": [],
            "records": []
        }"#;

        let result = load_config_from_str(json);
        assert!(matches!(
            result,
            Err(ConsolidationError::DuplicateEntity(ref id)) if id == "COMP001"
        ));
    }

    #[test]
    fn test_load_config_reports_malformed_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConsolidationError::SerializationError(_))));
    }
}
