//! Display-side masking of figures the viewer may not see.
//!
//! This is a presentation rule, not a confidentiality boundary: masked values
//! are still in memory, they are only kept out of rendered output. Records for
//! entities outside a viewer's grant should not reach this layer at all.

use crate::schema::FinancialRecord;
use crate::utils::format_inr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const MASK_TOKEN: &str = "***";
pub const RESTRICTED_TOKEN: &str = "Restricted";
pub const ACCESS_RESTRICTED_TOKEN: &str = "Access Restricted";

/// A rendered figure. Consumers must treat `Masked` and `Restricted` as opaque
/// strings, never as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum DisplayValue {
    Amount(f64),
    Masked,
    Restricted,
}

impl DisplayValue {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DisplayValue::Amount(_))
    }

    pub fn amount(&self) -> Option<f64> {
        match self {
            DisplayValue::Amount(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Amount(v) => f.write_str(&format_inr(*v)),
            DisplayValue::Masked => f.write_str(MASK_TOKEN),
            DisplayValue::Restricted => f.write_str(RESTRICTED_TOKEN),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordField {
    Sales,
    Purchases,
    DirectExpenses,
    IndirectExpenses,
    GrossProfit,
    NetProfit,
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

impl RecordField {
    /// The rows of the side-by-side comparison table.
    pub const COMPARISON: [RecordField; 8] = [
        RecordField::Sales,
        RecordField::Purchases,
        RecordField::GrossProfit,
        RecordField::NetProfit,
        RecordField::CurrentAssets,
        RecordField::FixedAssets,
        RecordField::CurrentLiabilities,
        RecordField::StockInHand,
    ];

    pub fn value_of(&self, record: &FinancialRecord) -> f64 {
        match self {
            RecordField::Sales => record.sales,
            RecordField::Purchases => record.purchases,
            RecordField::DirectExpenses => record.direct_expenses,
            RecordField::IndirectExpenses => record.indirect_expenses,
            RecordField::GrossProfit => record.gross_profit,
            RecordField::NetProfit => record.net_profit,
            RecordField::StockInHand => record.stock_in_hand,
            RecordField::CashInHand => record.cash_in_hand,
            RecordField::BankBalance => record.bank_balance,
            RecordField::SundryDebtors => record.sundry_debtors,
            RecordField::SundryCreditors => record.sundry_creditors,
            RecordField::CurrentAssets => record.current_assets,
            RecordField::FixedAssets => record.fixed_assets,
            RecordField::CurrentLiabilities => record.current_liabilities,
            RecordField::Investments => record.investments,
            RecordField::Loans => record.loans,
            RecordField::Provisions => record.provisions,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordField::Sales => "Sales",
            RecordField::Purchases => "Purchases",
            RecordField::DirectExpenses => "Direct Expenses",
            RecordField::IndirectExpenses => "Indirect Expenses",
            RecordField::GrossProfit => "Gross Profit",
            RecordField::NetProfit => "Net Profit",
            RecordField::StockInHand => "Stock in Hand",
            RecordField::CashInHand => "Cash in Hand",
            RecordField::BankBalance => "Bank Balance",
            RecordField::SundryDebtors => "Sundry Debtors",
            RecordField::SundryCreditors => "Sundry Creditors",
            RecordField::CurrentAssets => "Current Assets",
            RecordField::FixedAssets => "Fixed Assets",
            RecordField::CurrentLiabilities => "Current Liabilities",
            RecordField::Investments => "Investments",
            RecordField::Loans => "Loans",
            RecordField::Provisions => "Provisions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedRow {
    pub field: RecordField,
    /// One cell per column, in column order.
    pub cells: Vec<DisplayValue>,
    pub total: DisplayValue,
}

/// Fields down, entities across, with a cross-entity total per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedTable {
    pub entity_ids: Vec<String>,
    pub rows: Vec<MaskedRow>,
}

pub struct MaskedPresenter<'a> {
    accessible: &'a BTreeSet<String>,
}

impl<'a> MaskedPresenter<'a> {
    pub fn new(accessible: &'a BTreeSet<String>) -> Self {
        Self { accessible }
    }

    pub fn present(&self, value: f64, entity_id: &str) -> DisplayValue {
        if self.accessible.contains(entity_id) {
            DisplayValue::Amount(value)
        } else {
            DisplayValue::Masked
        }
    }

    /// Notice shown in place of a whole per-entity section the viewer may not see.
    pub fn section_notice(&self, entity_id: &str) -> Option<&'static str> {
        (!self.accessible.contains(entity_id)).then_some(ACCESS_RESTRICTED_TOKEN)
    }

    pub fn present_field(&self, record: &FinancialRecord, field: RecordField) -> DisplayValue {
        self.present(field.value_of(record), &record.entity_id)
    }

    /// The sum of `values`, unless any of `entity_ids` is hidden from the
    /// viewer, in which case the whole total is `Restricted`. A partial total is
    /// never produced. `values[i]` belongs to `entity_ids[i]`; a length
    /// mismatch leaves values unattributed and is also `Restricted`.
    pub fn present_cross_entity_total<S: AsRef<str>>(
        &self,
        values: &[f64],
        entity_ids: &[S],
    ) -> DisplayValue {
        if values.len() != entity_ids.len()
            || entity_ids.iter().any(|id| !self.accessible.contains(id.as_ref()))
        {
            return DisplayValue::Restricted;
        }

        DisplayValue::Amount(values.iter().sum())
    }

    pub fn masked_view(&self, records: &[FinancialRecord], fields: &[RecordField]) -> MaskedTable {
        let entity_ids: Vec<String> = records.iter().map(|r| r.entity_id.clone()).collect();

        let rows = fields
            .iter()
            .map(|&field| {
                let values: Vec<f64> = records.iter().map(|r| field.value_of(r)).collect();
                MaskedRow {
                    field,
                    cells: records.iter().map(|r| self.present_field(r, field)).collect(),
                    total: self.present_cross_entity_total(&values, &entity_ids),
                }
            })
            .collect();

        MaskedTable { entity_ids, rows }
    }
}
