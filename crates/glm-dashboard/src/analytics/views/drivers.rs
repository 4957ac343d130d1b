use serde::Serialize;

use super::{stats, Kpi};
use crate::analytics::domain::{Dimension, NumericField};
use crate::analytics::filter::FilteredView;
use crate::analytics::metrics::MetricKind;
use crate::analytics::pivot::{aggregate_rows, PivotTableView};

#[derive(Debug, Clone, Serialize)]
pub struct DriversView {
    pub kpis: Vec<Kpi>,
    /// Policy count and average predicted premium per age band, youngest first.
    pub premium_by_age_band: PivotTableView,
}

impl DriversView {
    pub fn compute(view: &FilteredView<'_>) -> Self {
        let ages: Vec<f64> = view.values(NumericField::DrivAge).collect();
        let bonus_malus: Vec<f64> = view.values(NumericField::BonusMalus).collect();
        let (avg_age, youngest, oldest) = (stats::mean(&ages), stats::min(&ages), stats::max(&ages));
        let avg_bonus_malus = stats::mean(&bonus_malus);

        let mut by_band = aggregate_rows(
            view,
            Dimension::AgeBand,
            &[MetricKind::PolicyCount.into(), MetricKind::AvgPremium.into()],
        );
        by_band.sort_by_key();

        Self {
            kpis: vec![
                Kpi::new("avg_driver_age", "Avg Driver Age", avg_age, format!("{avg_age:.1} years")),
                Kpi::new("youngest_driver", "Youngest Driver", youngest, format!("{youngest:.0}")),
                Kpi::new("oldest_driver", "Oldest Driver", oldest, format!("{oldest:.0}")),
                Kpi::new(
                    "avg_bonus_malus",
                    "Avg Bonus-Malus",
                    avg_bonus_malus,
                    format!("{avg_bonus_malus:.1}"),
                ),
            ],
            premium_by_age_band: by_band.to_view(),
        }
    }
}
