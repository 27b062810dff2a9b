use crate::aggregate::safe_ratio;
use crate::schema::FinancialRecord;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_TIE_TOLERANCE: f64 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Sales,
    NetProfit,
    ProfitMargin,
    CurrentRatio,
    AssetTurnover,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Sales,
        Metric::NetProfit,
        Metric::ProfitMargin,
        Metric::CurrentRatio,
        Metric::AssetTurnover,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Sales => "Highest Sales",
            Metric::NetProfit => "Highest Net Profit",
            Metric::ProfitMargin => "Best Profit Margin",
            Metric::CurrentRatio => "Best Current Ratio",
            Metric::AssetTurnover => "Best Asset Efficiency",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Sales => "Sales",
            Metric::NetProfit => "Net Profit",
            Metric::ProfitMargin => "Profit Margin",
            Metric::CurrentRatio => "Current Ratio",
            Metric::AssetTurnover => "Asset Turnover",
        };
        f.write_str(name)
    }
}

/// The metric for one record, or `None` when a ratio's denominator is zero.
pub fn metric_value(record: &FinancialRecord, metric: Metric) -> Option<f64> {
    match metric {
        Metric::Sales => Some(record.sales).filter(|v| v.is_finite()),
        Metric::NetProfit => Some(record.net_profit).filter(|v| v.is_finite()),
        Metric::ProfitMargin => safe_ratio(record.net_profit, record.sales),
        Metric::CurrentRatio => safe_ratio(record.current_assets, record.current_liabilities),
        Metric::AssetTurnover => safe_ratio(record.sales, record.total_assets()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    /// 1-based.
    pub position: usize,
    pub entity_id: String,
    pub value: Option<f64>,
    /// Within tolerance of the best value; several entries can carry this.
    pub is_best: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ComparativeRanker {
    tolerance: f64,
}

impl ComparativeRanker {
    pub fn new() -> Self {
        Self {
            tolerance: DEFAULT_TIE_TOLERANCE,
        }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Descending by metric. Equal values keep input order; records with no
    /// value go last, also in input order.
    pub fn rank(&self, records: &[FinancialRecord], metric: Metric) -> Vec<FinancialRecord> {
        let mut ranked: Vec<FinancialRecord> = records.to_vec();
        ranked.sort_by(|a, b| compare_desc(metric_value(a, metric), metric_value(b, metric)));
        ranked
    }

    /// The first record in input order within tolerance of the maximum.
    pub fn best_performer(&self, records: &[FinancialRecord], metric: Metric) -> Option<String> {
        let max = self.max_value(records, metric)?;
        records
            .iter()
            .find(|r| self.is_within_tolerance(metric_value(r, metric), max))
            .map(|r| r.entity_id.clone())
    }

    /// Input positions of every record within tolerance of the maximum; all of
    /// them get highlighted. Positions rather than entity ids, since one entity
    /// may contribute several records.
    pub fn highlighted(&self, records: &[FinancialRecord], metric: Metric) -> Vec<usize> {
        let Some(max) = self.max_value(records, metric) else {
            return Vec::new();
        };

        records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.is_within_tolerance(metric_value(r, metric), max))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn ranking(&self, records: &[FinancialRecord], metric: Metric) -> Vec<RankedEntry> {
        let max = self.max_value(records, metric);

        self.rank(records, metric)
            .into_iter()
            .enumerate()
            .map(|(idx, record)| {
                let value = metric_value(&record, metric);
                RankedEntry {
                    position: idx + 1,
                    is_best: max.is_some_and(|m| self.is_within_tolerance(value, m)),
                    value,
                    entity_id: record.entity_id,
                }
            })
            .collect()
    }

    pub fn best_performers(&self, records: &[FinancialRecord]) -> BTreeMap<Metric, Option<String>> {
        let winners: BTreeMap<Metric, Option<String>> = Metric::ALL
            .iter()
            .map(|&metric| (metric, self.best_performer(records, metric)))
            .collect();

        for (metric, winner) in &winners {
            debug!(
                "{}: {}",
                metric.label(),
                winner.as_deref().unwrap_or("no defined value")
            );
        }

        winners
    }

    fn max_value(&self, records: &[FinancialRecord], metric: Metric) -> Option<f64> {
        records
            .iter()
            .filter_map(|r| metric_value(r, metric))
            .fold(None, |acc: Option<f64>, v| match acc {
                Some(current) if current >= v => Some(current),
                _ => Some(v),
            })
    }

    fn is_within_tolerance(&self, value: Option<f64>, max: f64) -> bool {
        value.is_some_and(|v| v == max || (max - v).abs() < self.tolerance)
    }
}

impl Default for ComparativeRanker {
    fn default() -> Self {
        Self::new()
    }
}

fn compare_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
