use serde::Serialize;

use super::{ranked, stats, Kpi};
use crate::analytics::domain::{Dimension, NumericField};
use crate::analytics::filter::FilteredView;
use crate::analytics::metrics::{format_currency, format_grouped, MetricKind, RowGroup};
use crate::analytics::pivot::{aggregate_rows, PivotTableView};

#[derive(Debug, Clone, Serialize)]
pub struct ClaimsView {
    pub kpis: Vec<Kpi>,
    pub frequency_by_region: PivotTableView,
    pub frequency_by_area: PivotTableView,
}

impl ClaimsView {
    pub fn compute(view: &FilteredView<'_>) -> Self {
        let group = RowGroup::new(view.dataset(), view.rows());
        let total_claims = MetricKind::TotalClaims.evaluate(&group);
        let with_claims = group.count_where(NumericField::ClaimNb, |claims| claims > 0.0) as f64;
        let total_amount = MetricKind::TotalClaimAmount.evaluate(&group);
        let severities: Vec<f64> = view
            .values(NumericField::ClaimAmount)
            .filter(|amount| *amount > 0.0)
            .collect();
        let avg_severity = stats::mean(&severities);

        let kpis = vec![
            Kpi::metric("total_claims", MetricKind::TotalClaims, total_claims),
            Kpi::new(
                "policies_with_claims",
                "Policies with Claims",
                with_claims,
                format_grouped(with_claims, 0),
            ),
            Kpi::metric("total_claim_amount", MetricKind::TotalClaimAmount, total_amount),
            Kpi::new(
                "avg_claim_severity",
                "Avg Claim Severity",
                avg_severity,
                format_currency(avg_severity),
            ),
        ];

        let mut by_area = aggregate_rows(view, Dimension::Area, &[MetricKind::Frequency.into()]);
        by_area.sort_by_key();

        Self {
            kpis,
            frequency_by_region: ranked(view, Dimension::Region, &[MetricKind::Frequency])
                .to_view(),
            frequency_by_area: by_area.to_view(),
        }
    }
}
