//! Summary statistics behind each dashboard tab. Every view is a pure
//! function of a filtered row set and never yields NaN: empty input gives
//! zeroed figures and empty lists.

mod claims;
mod drivers;
mod explorer;
mod overview;
mod predictions;
pub(crate) mod stats;
mod vehicles;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::domain::Dimension;
use super::filter::FilteredView;
use super::metrics::MetricKind;
use super::pivot::{aggregate_rows, PivotTable};
use super::request::RequestError;

pub use claims::ClaimsView;
pub use drivers::DriversView;
pub use explorer::{CorrelationMatrix, ExplorerView, CORRELATION_FIELDS, SAMPLE_ROWS};
pub use overview::{ClaimCountBucket, OverviewView};
pub use predictions::{ActualVsPredicted, PredictionsView, SplitPremiumSummary};
pub use vehicles::VehiclesView;

/// Number of groups kept in "top N" rankings.
pub const TOP_GROUPS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Overview,
    Predictions,
    Claims,
    Vehicles,
    Drivers,
    Explorer,
}

impl ViewKind {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Overview,
            Self::Predictions,
            Self::Claims,
            Self::Vehicles,
            Self::Drivers,
            Self::Explorer,
        ]
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Predictions => "predictions",
            Self::Claims => "claims",
            Self::Vehicles => "vehicles",
            Self::Drivers => "drivers",
            Self::Explorer => "explorer",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Predictions => "GLM Predictions",
            Self::Claims => "Claims Analysis",
            Self::Vehicles => "Vehicle Features",
            Self::Drivers => "Driver Demographics",
            Self::Explorer => "Data Explorer",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ViewKind {
    type Err = RequestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.slug() == wanted)
            .ok_or_else(|| RequestError::UnknownView(value.trim().to_string()))
    }
}

/// Headline figure with its display string, like a dashboard metric card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub key: &'static str,
    pub label: &'static str,
    pub value: f64,
    pub display: String,
}

impl Kpi {
    pub(crate) fn new(key: &'static str, label: &'static str, value: f64, display: String) -> Self {
        Self {
            key,
            label,
            value,
            display,
        }
    }

    pub(crate) fn metric(key: &'static str, kind: MetricKind, value: f64) -> Self {
        Self::new(key, kind.label(), value, kind.format(value))
    }
}

/// Policies per label of one dimension, with their share of the view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub policies: usize,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum AnalysisView {
    Overview(OverviewView),
    Predictions(PredictionsView),
    Claims(ClaimsView),
    Vehicles(VehiclesView),
    Drivers(DriversView),
    Explorer(ExplorerView),
}

pub fn compute(kind: ViewKind, view: &FilteredView<'_>) -> AnalysisView {
    match kind {
        ViewKind::Overview => AnalysisView::Overview(OverviewView::compute(view)),
        ViewKind::Predictions => AnalysisView::Predictions(PredictionsView::compute(view)),
        ViewKind::Claims => AnalysisView::Claims(ClaimsView::compute(view)),
        ViewKind::Vehicles => AnalysisView::Vehicles(VehiclesView::compute(view)),
        ViewKind::Drivers => AnalysisView::Drivers(DriversView::compute(view)),
        ViewKind::Explorer => AnalysisView::Explorer(ExplorerView::compute(view)),
    }
}

/// Label counts in descending order of policies; ties keep vocabulary order.
pub(crate) fn category_counts(view: &FilteredView<'_>, dimension: Dimension) -> Vec<CategoryCount> {
    let mut table = aggregate_rows(view, dimension, &[MetricKind::PolicyCount.into()]);
    table.sort_by_key();
    table.sort_by_metric(&MetricKind::PolicyCount.into(), true);

    let total = view.len();
    table
        .rows
        .into_iter()
        .map(|row| {
            let policies = row.values[0] as usize;
            CategoryCount {
                label: row.key,
                policies,
                share_pct: stats::share_pct(policies, total),
            }
        })
        .collect()
}

/// Ranks groups of `dimension` by the first metric, keeping the top [`TOP_GROUPS`].
pub(crate) fn ranked(
    view: &FilteredView<'_>,
    dimension: Dimension,
    metrics: &[MetricKind],
) -> PivotTable {
    let metrics: Vec<_> = metrics.iter().copied().map(Into::into).collect();
    let mut table = aggregate_rows(view, dimension, &metrics);
    table.sort_by_key();
    if let Some(first) = metrics.first() {
        table.sort_by_metric(first, true);
    }
    table.top(TOP_GROUPS);
    table
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::analytics::dataset::fixtures::record;
    use crate::analytics::dataset::{Dataset, PolicyRecord};

    /// Six policies across two regions, two fuels and three splits.
    pub(crate) fn portfolio() -> Dataset {
        let rows: Vec<PolicyRecord> = vec![
            ("R11", "A", "Diesel", "Train", 22.0, 1.0, 1, 1200.0, 150.0),
            ("R11", "B", "Regular", "Train", 31.0, 0.5, 0, 0.0, 90.0),
            ("R11", "A", "Regular", "Valid", 47.0, 1.0, 0, 0.0, 80.0),
            ("R24", "C", "Diesel", "Test", 52.0, 0.25, 2, 800.0, 110.0),
            ("R24", "C", "Diesel", "Train", 68.0, 1.0, 0, 0.0, 70.0),
            ("R24", "A", "Regular", "Train", 40.0, 0.25, 0, 0.0, 100.0),
        ]
        .into_iter()
        .enumerate()
        .map(
            |(index, (region, area, gas, split, age, exposure, claims, amount, premium))| {
                let mut row = record(region, exposure, claims, amount);
                row.policy_id = index as u64 + 1;
                row.area = area.to_string();
                row.veh_gas = gas.to_string();
                row.data_major = split.to_string();
                row.driv_age = age;
                row.veh_age = index as f64;
                row.veh_brand = if index % 2 == 0 { "B1" } else { "B2" }.to_string();
                row.bonus_malus = 50.0 + index as f64 * 10.0;
                row.predicted_premium = premium;
                row
            },
        )
        .collect();
        Dataset::from_records(rows)
    }
}
