use crate::error::{ConsolidationError, Result};
use crate::schema::FinancialRecord;
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationResult {
    pub records_checked: usize,
    pub warnings: Vec<String>,
}

impl VerificationResult {
    pub fn is_consistent(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub fn expected_gross_profit(record: &FinancialRecord) -> f64 {
    record.sales - record.purchases - record.direct_expenses
}

pub fn expected_net_profit(record: &FinancialRecord) -> f64 {
    expected_gross_profit(record) - record.indirect_expenses
}

/// Overwrites gross and net profit with the values implied by the other figures.
pub fn derive_profits(record: &mut FinancialRecord) {
    record.gross_profit = expected_gross_profit(record);
    record.net_profit = expected_net_profit(record);
}

fn first_violation(record: &FinancialRecord, tolerance: f64) -> Option<ConsolidationError> {
    let gross = expected_gross_profit(record);
    if (record.gross_profit - gross).abs() > tolerance {
        return Some(ConsolidationError::ProfitIdentityViolation {
            entity_id: record.entity_id.clone(),
            field: "grossProfit".to_string(),
            actual: record.gross_profit,
            expected: gross,
        });
    }

    let net = record.gross_profit - record.indirect_expenses;
    if (record.net_profit - net).abs() > tolerance {
        return Some(ConsolidationError::ProfitIdentityViolation {
            entity_id: record.entity_id.clone(),
            field: "netProfit".to_string(),
            actual: record.net_profit,
            expected: net,
        });
    }

    None
}

/// Reports every record whose stored profits disagree with its inputs. This
/// is advisory: aggregation uses the stored figures either way.
pub fn check_profit_identities(records: &[FinancialRecord], tolerance: f64) -> VerificationResult {
    let warnings: Vec<String> = records
        .iter()
        .filter_map(|r| first_violation(r, tolerance))
        .map(|e| e.to_string())
        .collect();

    for warning in &warnings {
        warn!("{}", warning);
    }

    VerificationResult {
        records_checked: records.len(),
        warnings,
    }
}

pub fn verify_profit_identities(records: &[FinancialRecord], tolerance: f64) -> Result<()> {
    match records.iter().find_map(|r| first_violation(r, tolerance)) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(gross_profit: f64, net_profit: f64) -> FinancialRecord {
        FinancialRecord {
            sales: 10_000.0,
            purchases: 6_000.0,
            direct_expenses: 1_000.0,
            indirect_expenses: 500.0,
            gross_profit,
            net_profit,
            ..FinancialRecord::new("COMP001", Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap())
        }
    }

    #[test]
    fn test_derive_profits() {
        let mut r = record(0.0, 0.0);
        derive_profits(&mut r);
        assert_eq!(r.gross_profit, 3_000.0);
        assert_eq!(r.net_profit, 2_500.0);
        assert!(verify_profit_identities(&[r], 0.01).is_ok());
    }

    #[test]
    fn test_gross_profit_violation() {
        let result = verify_profit_identities(&[record(2_000.0, 1_500.0)], 0.01);
        match result {
            Err(ConsolidationError::ProfitIdentityViolation { field, expected, .. }) => {
                assert_eq!(field, "grossProfit");
                assert_eq!(expected, 3_000.0);
            }
            other => panic!("expected a violation, got {:?}", other),
        }
    }

    #[test]
    fn test_net_profit_checked_against_stored_gross() {
        let result = verify_profit_identities(&[record(3_000.0, 2_000.0)], 0.01);
        match result {
            Err(ConsolidationError::ProfitIdentityViolation { field, .. }) => {
                assert_eq!(field, "netProfit");
            }
            other => panic!("expected a violation, got {:?}", other),
        }
    }

    #[test]
    fn test_check_collects_warnings_without_failing() {
        let records = vec![record(3_000.0, 2_500.0), record(1.0, 1.0)];
        let result = check_profit_identities(&records, 0.01);
        assert_eq!(result.records_checked, 2);
        assert_eq!(result.warnings.len(), 1);
        assert!(!result.is_consistent());
    }
}
