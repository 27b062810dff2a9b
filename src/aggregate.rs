use crate::export::resolve_person_name;
use crate::schema::{ConsolidationType, Entity, FinancialRecord, Person};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Consolidated sums over a set of records.
///
/// Ratios are not stored. The methods below derive them and return `None`
/// when the denominator is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_sales: f64,
    pub total_purchases: f64,
    pub total_gross_profit: f64,
    pub total_net_profit: f64,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub total_cash: f64,
    pub total_stock: f64,
    pub companies_count: usize,
    /// Distinct persons who entered or last modified any record.
    pub active_users: usize,
}

impl Totals {
    /// Net profit as a percentage of sales.
    pub fn profit_margin(&self) -> Option<f64> {
        safe_ratio(self.total_net_profit, self.total_sales).map(|r| r * 100.0)
    }

    /// Gross profit as a percentage of sales.
    pub fn gross_margin(&self) -> Option<f64> {
        safe_ratio(self.total_gross_profit, self.total_sales).map(|r| r * 100.0)
    }

    pub fn current_ratio(&self) -> Option<f64> {
        safe_ratio(self.total_assets, self.total_liabilities)
    }

    pub fn asset_turnover(&self) -> Option<f64> {
        safe_ratio(self.total_sales, self.total_assets)
    }
}

/// `numerator / denominator`, or `None` when the result would not be finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    let ratio = numerator / denominator;
    ratio.is_finite().then_some(ratio)
}

pub fn aggregate(records: &[FinancialRecord]) -> Totals {
    let mut totals = Totals::default();
    let mut contributors: HashSet<&str> = HashSet::new();

    for record in records {
        totals.total_sales += record.sales;
        totals.total_purchases += record.purchases;
        totals.total_gross_profit += record.gross_profit;
        totals.total_net_profit += record.net_profit;
        totals.total_assets += record.total_assets();
        totals.total_liabilities += record.current_liabilities;
        totals.total_cash += record.total_cash();
        totals.total_stock += record.stock_in_hand;

        contributors.extend(record.contributors());
    }

    totals.companies_count = records.len();
    totals.active_users = contributors.len();
    totals
}

/// One presentation group of the consolidation view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTotals {
    pub key: String,
    pub label: String,
    pub entity_ids: Vec<String>,
    pub totals: Totals,
}

/// Groups records for display. The grouping never changes the sums: each
/// group is just [`aggregate`] over its members.
pub fn group_totals(
    records: &[FinancialRecord],
    consolidation_type: ConsolidationType,
    entities: &[Entity],
    persons: &[Person],
) -> Vec<GroupTotals> {
    match consolidation_type {
        ConsolidationType::All => vec![build_group(
            "all".to_string(),
            "All Companies".to_string(),
            records.iter().collect(),
        )],
        ConsolidationType::ByCompany => {
            let mut seen = BTreeSet::new();
            let mut groups = Vec::new();
            for record in records {
                if !seen.insert(record.entity_id.as_str()) {
                    continue;
                }
                let members: Vec<&FinancialRecord> = records
                    .iter()
                    .filter(|r| r.entity_id == record.entity_id)
                    .collect();
                let label = entities
                    .iter()
                    .find(|e| e.id == record.entity_id)
                    .map(|e| e.name.clone())
                    .unwrap_or_else(|| record.entity_id.clone());
                groups.push(build_group(record.entity_id.clone(), label, members));
            }
            groups
        }
        ConsolidationType::ByUser => {
            let mut order: Vec<&str> = Vec::new();
            for record in records {
                for id in record.contributors() {
                    if !order.contains(&id) {
                        order.push(id);
                    }
                }
            }

            order
                .into_iter()
                .map(|person_id| {
                    let members: Vec<&FinancialRecord> = records
                        .iter()
                        .filter(|r| r.contributors().any(|c| c == person_id))
                        .collect();
                    build_group(
                        person_id.to_string(),
                        resolve_person_name(persons, person_id),
                        members,
                    )
                })
                .collect()
        }
    }
}

fn build_group(key: String, label: String, members: Vec<&FinancialRecord>) -> GroupTotals {
    let owned: Vec<FinancialRecord> = members.into_iter().cloned().collect();
    GroupTotals {
        key,
        label,
        entity_ids: owned.iter().map(|r| r.entity_id.clone()).collect(),
        totals: aggregate(&owned),
    }
}
