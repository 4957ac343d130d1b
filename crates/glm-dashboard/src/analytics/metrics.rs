//! Fixed menu of actuarial metrics evaluated over a group of rows.
//!
//! Every metric degrades to `0.0` instead of failing: empty groups, zero
//! denominators and any non-finite intermediate all collapse to zero so a
//! table cell always has something to show. Unrecognized metric names are
//! carried through as [`MetricRef::Unrecognized`] and evaluate to zero as
//! well, matching the dashboard's historical leniency.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::dataset::Dataset;
use super::domain::NumericField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    Frequency,
    AvgClaimAmount,
    AvgPremium,
    TotalExposure,
    TotalClaims,
    TotalClaimAmount,
    PolicyCount,
    ClaimRate,
}

impl MetricKind {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Frequency,
            Self::AvgClaimAmount,
            Self::AvgPremium,
            Self::TotalExposure,
            Self::TotalClaims,
            Self::TotalClaimAmount,
            Self::PolicyCount,
            Self::ClaimRate,
        ]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Frequency => "Frequency",
            Self::AvgClaimAmount => "AvgClaimAmount",
            Self::AvgPremium => "AvgPremium",
            Self::TotalExposure => "TotalExposure",
            Self::TotalClaims => "TotalClaims",
            Self::TotalClaimAmount => "TotalClaimAmount",
            Self::PolicyCount => "PolicyCount",
            Self::ClaimRate => "ClaimRate",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Frequency => "Claim Frequency",
            Self::AvgClaimAmount => "Average Claim Amount",
            Self::AvgPremium => "Average Predicted Premium",
            Self::TotalExposure => "Total Exposure",
            Self::TotalClaims => "Total Claims",
            Self::TotalClaimAmount => "Total Claim Amount",
            Self::PolicyCount => "Policies",
            Self::ClaimRate => "Claim Rate",
        }
    }

    pub fn evaluate(self, group: &RowGroup<'_>) -> f64 {
        let value = match self {
            Self::Frequency => ratio(
                group.sum(NumericField::ClaimNb),
                group.sum(NumericField::Exposure),
            ),
            Self::AvgClaimAmount => ratio(
                group.sum(NumericField::ClaimAmount),
                group.sum(NumericField::ClaimNb),
            ),
            Self::AvgPremium => ratio(group.sum(NumericField::PredGlm), group.count() as f64),
            Self::TotalExposure => group.sum(NumericField::Exposure),
            Self::TotalClaims => group.sum(NumericField::ClaimNb),
            Self::TotalClaimAmount => group.sum(NumericField::ClaimAmount),
            Self::PolicyCount => group.count() as f64,
            Self::ClaimRate => ratio(
                group.count_where(NumericField::ClaimNb, |claims| claims > 0.0) as f64,
                group.count() as f64,
            ),
        };
        zero_if_not_finite(value)
    }

    pub fn format(self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        match self {
            Self::Frequency => format!("{value:.4}"),
            Self::AvgClaimAmount | Self::AvgPremium | Self::TotalClaimAmount => {
                format_currency(value)
            }
            Self::TotalExposure => format_grouped(value, 2),
            Self::TotalClaims | Self::PolicyCount => format_grouped(value, 0),
            Self::ClaimRate => format_percent(value),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric '{0}'")]
pub struct UnknownMetric(pub String);

impl FromStr for MetricKind {
    type Err = UnknownMetric;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|kind| kind.name() == value)
            .ok_or_else(|| UnknownMetric(value.to_string()))
    }
}

/// A requested metric. Names outside the fixed menu are kept rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MetricRef {
    Known(MetricKind),
    Unrecognized(String),
}

impl MetricRef {
    pub fn parse(name: &str) -> Self {
        match name.parse::<MetricKind>() {
            Ok(kind) => Self::Known(kind),
            Err(UnknownMetric(name)) => Self::Unrecognized(name),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Known(kind) => kind.name(),
            Self::Unrecognized(name) => name,
        }
    }

    pub fn kind(&self) -> Option<MetricKind> {
        match self {
            Self::Known(kind) => Some(*kind),
            Self::Unrecognized(_) => None,
        }
    }

    /// Unrecognized metrics always evaluate to `0.0`.
    pub fn evaluate(&self, group: &RowGroup<'_>) -> f64 {
        match self {
            Self::Known(kind) => kind.evaluate(group),
            Self::Unrecognized(_) => 0.0,
        }
    }

    pub fn format(&self, value: f64) -> String {
        match self {
            Self::Known(kind) => kind.format(value),
            Self::Unrecognized(_) if value.is_finite() => format!("{value:.2}"),
            Self::Unrecognized(_) => value.to_string(),
        }
    }
}

impl From<MetricKind> for MetricRef {
    fn from(value: MetricKind) -> Self {
        Self::Known(value)
    }
}

impl From<String> for MetricRef {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<MetricRef> for String {
    fn from(value: MetricRef) -> Self {
        match value {
            MetricRef::Known(kind) => kind.name().to_string(),
            MetricRef::Unrecognized(name) => name,
        }
    }
}

impl fmt::Display for MetricRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Borrowed set of dataset rows that a metric reduces to one value.
#[derive(Debug, Clone, Copy)]
pub struct RowGroup<'a> {
    dataset: &'a Dataset,
    rows: &'a [usize],
}

impl<'a> RowGroup<'a> {
    pub fn new(dataset: &'a Dataset, rows: &'a [usize]) -> Self {
        Self { dataset, rows }
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn sum(&self, field: NumericField) -> f64 {
        let column = self.dataset.numeric(field);
        self.rows.iter().map(|&row| column[row]).sum()
    }

    pub fn count_where<F>(&self, field: NumericField, predicate: F) -> usize
    where
        F: Fn(f64) -> bool,
    {
        let column = self.dataset.numeric(field);
        self.rows
            .iter()
            .filter(|&&row| predicate(column[row]))
            .count()
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn zero_if_not_finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// `€` prefix, thousands separators, two decimals.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    format!("€{}", format_grouped(value, 2))
}

/// Fraction rendered as a percentage with two decimals (`0.1234` → `12.34%`).
pub fn format_percent(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    format!("{:.2}%", value * 100.0)
}

/// Fixed decimals with `,` between thousands.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.*}", decimals, value);
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(fixed.len() + integer.len() / 3);
    for (position, digit) in integer.chars().enumerate() {
        if position > 0 && (integer.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dataset::fixtures::{record, three_rows};

    fn group_of<'a>(dataset: &'a Dataset, rows: &'a [usize]) -> RowGroup<'a> {
        RowGroup::new(dataset, rows)
    }

    #[test]
    fn frequency_and_severity_follow_definitions() {
        let dataset = Dataset::from_records(three_rows());
        let region_a = [0, 1];
        let group = group_of(&dataset, &region_a);

        assert_eq!(MetricKind::Frequency.evaluate(&group), 0.5);
        assert_eq!(MetricKind::AvgClaimAmount.evaluate(&group), 100.0);
        assert_eq!(MetricKind::AvgPremium.evaluate(&group), 100.0);
        assert_eq!(MetricKind::TotalExposure.evaluate(&group), 2.0);
        assert_eq!(MetricKind::TotalClaims.evaluate(&group), 1.0);
        assert_eq!(MetricKind::TotalClaimAmount.evaluate(&group), 100.0);
        assert_eq!(MetricKind::PolicyCount.evaluate(&group), 2.0);
        assert_eq!(MetricKind::ClaimRate.evaluate(&group), 0.5);
    }

    #[test]
    fn zero_exposure_yields_zero_frequency() {
        let dataset = Dataset::from_records(vec![record("A", 0.0, 2, 50.0)]);
        let rows = [0];
        let group = group_of(&dataset, &rows);
        assert_eq!(MetricKind::Frequency.evaluate(&group), 0.0);
        assert_eq!(MetricKind::AvgClaimAmount.evaluate(&group), 25.0);
    }

    #[test]
    fn empty_groups_degrade_to_zero() {
        let dataset = Dataset::from_records(three_rows());
        let group = group_of(&dataset, &[]);
        for kind in MetricKind::ordered() {
            assert_eq!(kind.evaluate(&group), 0.0, "{kind} on empty group");
        }
    }

    #[test]
    fn unrecognized_metrics_evaluate_to_zero() {
        let dataset = Dataset::from_records(three_rows());
        let rows = [0, 1, 2];
        let metric = MetricRef::parse("LossRatio");
        assert_eq!(metric, MetricRef::Unrecognized("LossRatio".to_string()));
        assert_eq!(metric.evaluate(&group_of(&dataset, &rows)), 0.0);
        assert_eq!(metric.format(0.0), "0.00");
    }

    #[test]
    fn metric_names_must_match_exactly() {
        assert_eq!(
            MetricRef::parse("ClaimRate"),
            MetricRef::Known(MetricKind::ClaimRate)
        );
        assert!("Severity".parse::<MetricKind>().is_err());

        let dataset = Dataset::from_records(three_rows());
        let rows = [0, 1, 2];
        for name in ["claimrate", "FREQUENCY", " Frequency "] {
            let metric = MetricRef::parse(name);
            assert_eq!(metric, MetricRef::Unrecognized(name.to_string()));
            assert_eq!(metric.evaluate(&group_of(&dataset, &rows)), 0.0, "{name}");
        }
    }

    #[test]
    fn formats_match_dashboard_conventions() {
        assert_eq!(MetricKind::Frequency.format(0.123456), "0.1235");
        assert_eq!(MetricKind::AvgPremium.format(1234.5), "€1,234.50");
        assert_eq!(MetricKind::TotalClaimAmount.format(1234567.891), "€1,234,567.89");
        assert_eq!(MetricKind::TotalExposure.format(999.999), "1,000.00");
        assert_eq!(MetricKind::PolicyCount.format(678013.0), "678,013");
        assert_eq!(MetricKind::TotalClaims.format(12.0), "12");
        assert_eq!(MetricKind::ClaimRate.format(0.0512), "5.12%");
        assert_eq!(MetricKind::Frequency.format(f64::NAN), "NaN");
    }

    #[test]
    fn grouping_handles_signs_and_short_numbers() {
        assert_eq!(format_grouped(-1234567.0, 0), "-1,234,567");
        assert_eq!(format_grouped(123.0, 1), "123.0");
        assert_eq!(format_grouped(0.0, 2), "0.00");
        assert_eq!(format_currency(-42.0), "€-42.00");
        assert_eq!(format_currency(-1234.5), "€-1,234.50");
        assert_eq!(format_currency(-0.0), "€-0.00");
    }

    #[test]
    fn metric_refs_serialize_as_names() {
        let metrics = vec![
            MetricRef::Known(MetricKind::Frequency),
            MetricRef::Unrecognized("Custom".to_string()),
        ];
        let json = serde_json::to_string(&metrics).expect("serializes");
        assert_eq!(json, r#"["Frequency","Custom"]"#);
        let parsed: Vec<MetricRef> = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(parsed, metrics);
    }
}
