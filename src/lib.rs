//! # Consolidation Engine
//!
//! Role-scoped multi-company financial consolidation: decide which companies a
//! viewer may see, narrow the record set to those, roll it up into consolidated
//! totals, rank companies against each other, and mask any figure the viewer is
//! not authorised to see.
//!
//! ## Core Concepts
//!
//! - **Access Grant**: a person's role plus the set of companies it unlocks,
//!   recomputed on every query from an [`IdentityProvider`] and an [`AccessPolicy`]
//! - **Entity Filter**: access containment first, then the viewer's own selections
//! - **Totals**: element-wise sums; ratios are derived on demand and are `None`
//!   for a zero denominator
//! - **Ranking**: stable descending sort, ties within a tolerance all highlighted
//! - **Masking**: hidden figures render as `***`; cross-company totals touching a
//!   hidden company render as `Restricted`
//!
//! Every step is a pure function of its inputs. Nothing is cached between calls,
//! so a changed filter or grant is always reflected in the next report.
//!
//! ## Example
//!
//! ```rust,ignore
//! use consolidation_engine::*;
//!
//! let config = load_config_from_path("consolidation.json")?;
//! let engine = ConsolidationEngine::new(config);
//!
//! let report = engine.report("EMP002", &FilterState::default());
//! println!("Sales: {}", format_inr(report.totals.total_sales));
//! println!("Margin: {}", format_percent(report.totals.profit_margin()));
//! ```

pub mod access;
pub mod aggregate;
pub mod consistency;
pub mod error;
pub mod export;
pub mod filter;
pub mod ingestion;
pub mod mask;
pub mod ranking;
pub mod schema;
pub mod utils;

pub use access::{
    AccessGrant, AccessPolicy, AccessResolver, AccessScope, IdentityProvider, RoleHierarchy,
    RosterIdentityProvider,
};
pub use aggregate::{aggregate, group_totals, safe_ratio, GroupTotals, Totals};
pub use consistency::{
    check_profit_identities, derive_profits, verify_profit_identities, VerificationResult,
};
pub use error::{ConsolidationError, Result};
pub use export::{export_rows, to_csv, write_csv, ExportRow};
pub use filter::{apply_filter_state, filter_records};
pub use ingestion::*;
pub use mask::{
    DisplayValue, MaskedPresenter, MaskedTable, RecordField, ACCESS_RESTRICTED_TOKEN, MASK_TOKEN,
    RESTRICTED_TOKEN,
};
pub use ranking::{metric_value, ComparativeRanker, Metric, RankedEntry};
pub use schema::*;
pub use utils::*;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the consolidation view renders for one viewer and filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedReport {
    pub grant: AccessGrant,
    pub records: Vec<FinancialRecord>,
    pub totals: Totals,
    pub groups: Vec<GroupTotals>,
    pub rankings: BTreeMap<Metric, Vec<RankedEntry>>,
    pub best_performers: BTreeMap<Metric, Option<String>>,
    /// Positions in `records` within tolerance of each metric's best value.
    pub highlighted: BTreeMap<Metric, Vec<usize>>,
    pub comparison: MaskedTable,
}

pub struct ConsolidationEngine<P: AccessPolicy = RoleHierarchy> {
    config: ConsolidationConfig,
    policy: P,
    ranker: ComparativeRanker,
}

impl ConsolidationEngine<RoleHierarchy> {
    pub fn new(config: ConsolidationConfig) -> Self {
        Self::with_policy(config, RoleHierarchy::default())
    }
}

impl<P: AccessPolicy> ConsolidationEngine<P> {
    pub fn with_policy(config: ConsolidationConfig, policy: P) -> Self {
        Self {
            config,
            policy,
            ranker: ComparativeRanker::default(),
        }
    }

    pub fn with_ranker(mut self, ranker: ComparativeRanker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    /// Resolves the viewer's grant against the configured roster.
    pub fn grant(&self, viewer_id: &str) -> AccessGrant {
        self.grant_with(viewer_id, &RosterIdentityProvider::new(&self.config.persons))
    }

    /// Resolves the viewer's grant through an external identity provider.
    pub fn grant_with(&self, viewer_id: &str, identity: &dyn IdentityProvider) -> AccessGrant {
        AccessResolver::new(&self.config.entities, identity, &self.policy).grant(viewer_id)
    }

    pub fn report(&self, viewer_id: &str, state: &FilterState) -> ConsolidatedReport {
        let grant = self.grant(viewer_id);
        self.report_for_grant(grant, state)
    }

    pub fn report_for_grant(&self, grant: AccessGrant, state: &FilterState) -> ConsolidatedReport {
        info!(
            "Building consolidated report for {} ({})",
            grant.person_id, grant.role
        );

        let records = apply_filter_state(&self.config.records, &grant, state);
        let totals = aggregate(&records);
        let groups = group_totals(
            &records,
            state.consolidation_type,
            &self.config.entities,
            &self.config.persons,
        );

        let mut rankings = BTreeMap::new();
        let mut highlighted = BTreeMap::new();
        for metric in Metric::ALL {
            rankings.insert(metric, self.ranker.ranking(&records, metric));
            highlighted.insert(metric, self.ranker.highlighted(&records, metric));
        }
        let best_performers = self.ranker.best_performers(&records);

        let comparison =
            MaskedPresenter::new(&grant.entity_ids).masked_view(&records, &RecordField::COMPARISON);

        debug!(
            "Report covers {} companies and {} active users",
            totals.companies_count, totals.active_users
        );

        ConsolidatedReport {
            grant,
            records,
            totals,
            groups,
            rankings,
            best_performers,
            highlighted,
            comparison,
        }
    }

    /// Export rows for exactly the records the viewer's report contains.
    pub fn export_rows(&self, viewer_id: &str, state: &FilterState) -> Vec<ExportRow> {
        let grant = self.grant(viewer_id);
        let records = apply_filter_state(&self.config.records, &grant, state);
        export_rows(&records, &self.config.entities, &self.config.persons)
    }

    pub fn export_csv(&self, viewer_id: &str, state: &FilterState) -> Result<String> {
        to_csv(&self.export_rows(viewer_id, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn config() -> ConsolidationConfig {
        let ts = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let entity = |id: &str| Entity {
            id: id.to_string(),
            name: id.to_string(),
            code: id.to_string(),
            category: EntityCategory::Service,
            gstin: String::new(),
            status: RecordStatus::Active,
            fiscal_year: "2023-24".to_string(),
            access_users: vec![],
        };
        let person = |id: &str, role: &str, companies: &[&str]| Person {
            id: id.to_string(),
            name: id.to_string(),
            email: String::new(),
            phone: String::new(),
            role: role.to_string(),
            department: String::new(),
            status: RecordStatus::Active,
            accessible_companies: companies.iter().map(|c| c.to_string()).collect(),
            permissions: vec![],
            created_at: ts,
            last_access: None,
        };
        let record = |id: &str, sales: f64, by: &str| FinancialRecord {
            sales,
            net_profit: sales / 10.0,
            entered_by: by.to_string(),
            ..FinancialRecord::new(id, ts)
        };

        ConsolidationConfig {
            entities: vec![entity("A"), entity("B")],
            persons: vec![
                person("ROOT", "Super Admin", &[]),
                person("OPS", "Employee", &["B"]),
            ],
            records: vec![record("A", 100.0, "ROOT"), record("B", 300.0, "OPS")],
        }
    }

    #[test]
    fn test_report_respects_grant() {
        let engine = ConsolidationEngine::new(config());

        let full = engine.report("ROOT", &FilterState::default());
        assert_eq!(full.totals.total_sales, 400.0);
        assert_eq!(full.totals.active_users, 2);
        assert_eq!(full.best_performers[&Metric::Sales], Some("B".to_string()));

        let narrow = engine.report("OPS", &FilterState::default());
        assert_eq!(narrow.records.len(), 1);
        assert_eq!(narrow.totals.total_sales, 300.0);
        assert_eq!(narrow.rankings[&Metric::Sales].len(), 1);
    }

    #[test]
    fn test_unknown_viewer_gets_empty_report() {
        let engine = ConsolidationEngine::new(config());
        let report = engine.report("GHOST", &FilterState::default());

        assert_eq!(report.grant.role, RoleName::Employee);
        assert!(report.records.is_empty());
        assert_eq!(report.totals.companies_count, 0);
        assert_eq!(report.totals.profit_margin(), None);
        assert!(report.best_performers.values().all(Option::is_none));
    }

    #[test]
    fn test_reports_are_recomputed_per_call() {
        let engine = ConsolidationEngine::new(config());

        let all = engine.report("ROOT", &FilterState::default());
        let narrowed = engine.report(
            "ROOT",
            &FilterState {
                selected_entities: ["A".to_string()].into_iter().collect(),
                ..FilterState::default()
            },
        );
        let again = engine.report("ROOT", &FilterState::default());

        assert_eq!(narrowed.totals.total_sales, 100.0);
        assert_eq!(all.totals, again.totals);
    }
}
