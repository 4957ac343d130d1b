use serde::Serialize;
use std::collections::BTreeMap;

use super::{stats, Kpi};
use crate::analytics::domain::{Dimension, NumericField};
use crate::analytics::filter::FilteredView;
use crate::analytics::metrics::format_currency;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitPremiumSummary {
    pub split: String,
    pub policies: usize,
    pub mean_premium: f64,
    pub median_premium: f64,
}

/// Residuals of the GLM prediction against observed pure premium, over
/// policies with a positive observed premium.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActualVsPredicted {
    pub compared_policies: usize,
    pub mean_residual_pct: f64,
    pub median_residual_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionsView {
    pub kpis: Vec<Kpi>,
    pub premium_by_split: Vec<SplitPremiumSummary>,
    pub actual_vs_predicted: ActualVsPredicted,
}

impl PredictionsView {
    pub fn compute(view: &FilteredView<'_>) -> Self {
        let dataset = view.dataset();
        let premiums: Vec<f64> = view.values(NumericField::PredGlm).collect();

        let kpis = [
            ("mean_premium", "Mean Premium", stats::mean(&premiums)),
            ("median_premium", "Median Premium", stats::median(&premiums)),
            ("std_premium", "Std Premium", stats::std_dev(&premiums)),
            ("max_premium", "Max Premium", stats::max(&premiums)),
        ]
        .into_iter()
        .map(|(key, label, value)| Kpi::new(key, label, value, format_currency(value)))
        .collect();

        let mut by_split: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for (&row, &premium) in view.rows().iter().zip(&premiums) {
            by_split
                .entry(dataset.code(Dimension::DataMajor, row))
                .or_default()
                .push(premium);
        }
        let vocabulary = dataset.vocabulary(Dimension::DataMajor);
        let premium_by_split = by_split
            .into_iter()
            .map(|(code, values)| SplitPremiumSummary {
                split: vocabulary.label(code).unwrap_or_default().to_string(),
                policies: values.len(),
                mean_premium: stats::mean(&values),
                median_premium: stats::median(&values),
            })
            .collect();

        let residuals: Vec<f64> = view
            .values(NumericField::PurePremium)
            .zip(&premiums)
            .filter(|(actual, _)| *actual > 0.0)
            .map(|(actual, predicted)| (actual - predicted) / actual * 100.0)
            .collect();

        Self {
            kpis,
            premium_by_split,
            actual_vs_predicted: ActualVsPredicted {
                compared_policies: residuals.len(),
                mean_residual_pct: stats::mean(&residuals),
                median_residual_pct: stats::median(&residuals),
            },
        }
    }
}
