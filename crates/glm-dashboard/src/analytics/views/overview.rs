use serde::Serialize;
use std::collections::BTreeMap;

use super::{category_counts, ranked, CategoryCount, Kpi};
use crate::analytics::domain::{Dimension, NumericField};
use crate::analytics::filter::FilteredView;
use crate::analytics::metrics::{MetricKind, RowGroup};
use crate::analytics::pivot::PivotTableView;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimCountBucket {
    pub claims: u32,
    pub policies: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewView {
    pub kpis: Vec<Kpi>,
    pub split_distribution: Vec<CategoryCount>,
    pub claim_count_distribution: Vec<ClaimCountBucket>,
    pub top_regions: PivotTableView,
}

impl OverviewView {
    pub fn compute(view: &FilteredView<'_>) -> Self {
        let group = RowGroup::new(view.dataset(), view.rows());
        let kpis = [
            ("total_policies", MetricKind::PolicyCount),
            ("total_claims", MetricKind::TotalClaims),
            ("total_exposure", MetricKind::TotalExposure),
            ("claim_frequency", MetricKind::Frequency),
            ("avg_predicted_premium", MetricKind::AvgPremium),
        ]
        .into_iter()
        .map(|(key, kind)| Kpi::metric(key, kind, kind.evaluate(&group)))
        .collect();

        let mut buckets: BTreeMap<u32, usize> = BTreeMap::new();
        for claims in view.values(NumericField::ClaimNb) {
            *buckets.entry(claims as u32).or_default() += 1;
        }
        let claim_count_distribution = buckets
            .into_iter()
            .map(|(claims, policies)| ClaimCountBucket { claims, policies })
            .collect();

        Self {
            kpis,
            split_distribution: category_counts(view, Dimension::DataMajor),
            claim_count_distribution,
            top_regions: ranked(
                view,
                Dimension::Region,
                &[MetricKind::PolicyCount, MetricKind::AvgPremium],
            )
            .to_view(),
        }
    }
}
