use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{ConsolidationError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntityCategory {
    #[schemars(description = "Converts raw materials into finished goods")]
    Manufacturing,

    #[schemars(description = "Buys and resells goods without transformation")]
    Trading,

    #[schemars(description = "Sells services rather than goods")]
    Service,

    #[schemars(description = "Holds investments in other group companies")]
    Holding,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Inactive,
}

impl Default for RecordStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[schemars(description = "Stable company identifier, e.g. 'COMP001'")]
    pub id: String,

    #[schemars(description = "Legal or display name of the company")]
    pub name: String,

    #[schemars(description = "Short code used in compact tables")]
    pub code: String,

    pub category: EntityCategory,

    #[schemars(description = "GST registration number (GSTIN)")]
    pub gstin: String,

    #[serde(default)]
    pub status: RecordStatus,

    #[schemars(description = "Fiscal year label, e.g. '2024-25'")]
    pub fiscal_year: String,

    #[serde(default)]
    #[schemars(description = "Person ids explicitly listed against this company")]
    pub access_users: Vec<String>,
}

/// The three levels of the role hierarchy.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
pub enum RoleName {
    #[serde(rename = "Super Admin")]
    SuperAdmin,
    #[serde(rename = "Admin")]
    Admin,
    #[serde(rename = "Employee")]
    Employee,
}

impl RoleName {
    /// Parses the free-text role label carried on a person. Anything that is
    /// not recognisably Super Admin or Admin is treated as Employee.
    pub fn parse_lenient(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();

        match normalized.as_str() {
            "superadmin" => Self::SuperAdmin,
            "admin" => Self::Admin,
            _ => Self::Employee,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Admin",
            Self::Admin => "Admin",
            Self::Employee => "Employee",
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[schemars(description = "Stable person identifier, e.g. 'EMP001'")]
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub phone: String,

    #[schemars(
        description = "Free-text role label. Conventionally 'Super Admin', 'Admin' or 'Employee'."
    )]
    pub role: String,

    #[serde(default)]
    pub department: String,

    #[serde(default)]
    pub status: RecordStatus,

    #[serde(default)]
    #[schemars(description = "Company ids this person has been explicitly granted")]
    pub accessible_companies: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Free-text capability strings attached to the person")]
    pub permissions: Vec<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub last_access: Option<DateTime<Utc>>,
}

impl Person {
    pub fn role_name(&self) -> RoleName {
        RoleName::parse_lenient(&self.role)
    }
}

/// One company's figures for one reporting period.
///
/// `gross_profit = sales - purchases - direct_expenses` and
/// `net_profit = gross_profit - indirect_expenses` hold for consistent data,
/// but nothing here enforces them. See [`crate::consistency`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialRecord {
    pub entity_id: String,

    #[serde(default)]
    pub sales: f64,
    #[serde(default)]
    pub purchases: f64,
    #[serde(default)]
    pub direct_expenses: f64,
    #[serde(default)]
    pub indirect_expenses: f64,
    #[serde(default)]
    pub gross_profit: f64,
    #[serde(default)]
    pub net_profit: f64,
    #[serde(default)]
    pub stock_in_hand: f64,
    #[serde(default)]
    pub cash_in_hand: f64,
    #[serde(default)]
    pub bank_balance: f64,
    #[serde(default)]
    pub sundry_debtors: f64,
    #[serde(default)]
    pub sundry_creditors: f64,
    #[serde(default)]
    pub current_assets: f64,
    #[serde(default)]
    pub fixed_assets: f64,
    #[serde(default)]
    pub current_liabilities: f64,
    #[serde(default)]
    pub investments: f64,
    #[serde(default)]
    pub loans: f64,
    #[serde(default)]
    pub provisions: f64,

    #[serde(default)]
    #[schemars(description = "Person id that first entered the record; may be empty")]
    pub entered_by: String,

    #[serde(default)]
    #[schemars(description = "Person id that last modified the record; may be empty")]
    pub last_modified_by: String,

    pub last_modified: DateTime<Utc>,
}

impl FinancialRecord {
    /// A record with every figure at zero and no provenance.
    pub fn new(entity_id: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            entity_id: entity_id.into(),
            sales: 0.0,
            purchases: 0.0,
            direct_expenses: 0.0,
            indirect_expenses: 0.0,
            gross_profit: 0.0,
            net_profit: 0.0,
            stock_in_hand: 0.0,
            cash_in_hand: 0.0,
            bank_balance: 0.0,
            sundry_debtors: 0.0,
            sundry_creditors: 0.0,
            current_assets: 0.0,
            fixed_assets: 0.0,
            current_liabilities: 0.0,
            investments: 0.0,
            loans: 0.0,
            provisions: 0.0,
            entered_by: String::new(),
            last_modified_by: String::new(),
            last_modified,
        }
    }

    pub fn total_assets(&self) -> f64 {
        self.current_assets + self.fixed_assets
    }

    pub fn total_cash(&self) -> f64 {
        self.cash_in_hand + self.bank_balance
    }

    /// Non-empty person ids among `entered_by` and `last_modified_by`.
    pub fn contributors(&self) -> impl Iterator<Item = &str> {
        [self.entered_by.as_str(), self.last_modified_by.as_str()]
            .into_iter()
            .filter(|id| !id.is_empty())
    }

    pub fn touched_by_any(&self, person_ids: &BTreeSet<String>) -> bool {
        self.contributors().any(|id| person_ids.contains(id))
    }
}

/// Selects presentation grouping only; the totals math is the same for all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ConsolidationType {
    #[default]
    All,
    ByUser,
    ByCompany,
}

/// Inclusive on both ends. Deserialization goes through [`DateRange::new`], so
/// an inverted range is rejected on load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = ConsolidationError;

    fn try_from(raw: RawDateRange) -> Result<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(ConsolidationError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// The April-to-March range named by a label such as `2024-25`.
    pub fn for_fiscal_year(label: &str) -> Result<Self> {
        let (start, end) = crate::utils::parse_fiscal_year_label(label)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The viewer's own narrowing on top of their access grant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default)]
    pub selected_entities: BTreeSet<String>,

    #[serde(default)]
    pub selected_persons: BTreeSet<String>,

    #[serde(default)]
    pub date_range: Option<DateRange>,

    #[serde(default)]
    pub consolidation_type: ConsolidationType,
}

/// Everything the consolidation view loads once at mount time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationConfig {
    #[schemars(description = "The entity universe: every company known to the system")]
    pub entities: Vec<Entity>,

    #[schemars(description = "The person roster used for access resolution and name lookups")]
    pub persons: Vec<Person>,

    #[schemars(description = "One financial record per company for the reporting period")]
    pub records: Vec<FinancialRecord>,
}

impl ConsolidationConfig {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ConsolidationConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn person(&self, id: &str) -> Option<&Person> {
        self.persons.iter().find(|p| p.id == id)
    }

    pub fn entity_ids(&self) -> BTreeSet<String> {
        self.entities.iter().map(|e| e.id.clone()).collect()
    }
}
