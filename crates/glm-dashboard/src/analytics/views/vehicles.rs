use serde::Serialize;

use super::{category_counts, ranked, stats, CategoryCount, Kpi};
use crate::analytics::domain::{Dimension, NumericField};
use crate::analytics::filter::FilteredView;
use crate::analytics::metrics::MetricKind;
use crate::analytics::pivot::PivotTableView;

const DIESEL: &str = "Diesel";

#[derive(Debug, Clone, Serialize)]
pub struct VehiclesView {
    pub kpis: Vec<Kpi>,
    pub top_brands: PivotTableView,
    pub fuel_distribution: Vec<CategoryCount>,
}

impl VehiclesView {
    pub fn compute(view: &FilteredView<'_>) -> Self {
        let fuel_distribution = category_counts(view, Dimension::VehGas);
        let top_brands = ranked(view, Dimension::VehBrand, &[MetricKind::PolicyCount]);

        let brand_count = distinct_brands(view);
        let diesel = fuel_distribution
            .iter()
            .find(|count| count.label == DIESEL)
            .map(|count| count.policies)
            .unwrap_or(0);
        let diesel_pct = stats::share_pct(diesel, view.len());
        let vehicle_ages: Vec<f64> = view.values(NumericField::VehAge).collect();
        let avg_vehicle_age = stats::mean(&vehicle_ages);

        Self {
            kpis: vec![
                Kpi::new(
                    "vehicle_brands",
                    "Vehicle Brands",
                    brand_count as f64,
                    brand_count.to_string(),
                ),
                Kpi::new(
                    "diesel_share",
                    "Diesel Vehicles",
                    diesel_pct,
                    format!("{diesel_pct:.1}%"),
                ),
                Kpi::new(
                    "avg_vehicle_age",
                    "Avg Vehicle Age",
                    avg_vehicle_age,
                    format!("{avg_vehicle_age:.1} years"),
                ),
            ],
            top_brands: top_brands.to_view(),
            fuel_distribution,
        }
    }
}

fn distinct_brands(view: &FilteredView<'_>) -> usize {
    let dataset = view.dataset();
    let mut seen = vec![false; dataset.vocabulary(Dimension::VehBrand).len()];
    for &row in view.rows() {
        seen[dataset.code(Dimension::VehBrand, row) as usize] = true;
    }
    seen.into_iter().filter(|present| *present).count()
}
