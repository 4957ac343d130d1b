use serde::{Deserialize, Serialize};

use super::domain::Dimension;
use super::metrics::MetricRef;

/// Rejections raised while turning caller input into filters and pivot requests.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("select at least one metric to build a pivot table")]
    NoMetrics,
    #[error("unknown dimension '{0}'")]
    UnknownDimension(String),
    #[error("unknown numeric field '{0}'")]
    UnknownField(String),
    #[error("unknown analysis view '{0}'")]
    UnknownView(String),
    #[error("invalid range {lo}..{hi}: lower bound exceeds upper bound")]
    InvalidRange { lo: f64, hi: f64 },
    #[error("could not parse range '{0}', expected MIN..MAX")]
    MalformedRange(String),
}

/// Row dimension, optional column dimension, and the metrics to compute per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAggregationRequest")]
pub struct AggregationRequest {
    rows: Dimension,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    columns: Option<Dimension>,
    metrics: Vec<MetricRef>,
}

#[derive(Deserialize)]
struct RawAggregationRequest {
    rows: Dimension,
    #[serde(default)]
    columns: Option<Dimension>,
    metrics: Vec<MetricRef>,
}

impl TryFrom<RawAggregationRequest> for AggregationRequest {
    type Error = RequestError;

    fn try_from(raw: RawAggregationRequest) -> Result<Self, Self::Error> {
        Self::new(raw.rows, raw.columns, raw.metrics)
    }
}

impl AggregationRequest {
    /// Repeated metrics collapse onto their first occurrence.
    pub fn new(
        rows: Dimension,
        columns: Option<Dimension>,
        metrics: Vec<MetricRef>,
    ) -> Result<Self, RequestError> {
        if metrics.is_empty() {
            return Err(RequestError::NoMetrics);
        }

        let mut unique: Vec<MetricRef> = Vec::with_capacity(metrics.len());
        for metric in metrics {
            if !unique.contains(&metric) {
                unique.push(metric);
            }
        }

        Ok(Self {
            rows,
            columns,
            metrics: unique,
        })
    }

    /// Builds a request from metric names, keeping unrecognized names as zero-valued metrics.
    pub fn from_names<I, S>(
        rows: Dimension,
        columns: Option<Dimension>,
        metric_names: I,
    ) -> Result<Self, RequestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let metrics = metric_names
            .into_iter()
            .map(|name| MetricRef::parse(name.as_ref()))
            .collect();
        Self::new(rows, columns, metrics)
    }

    pub fn rows(&self) -> Dimension {
        self.rows
    }

    pub fn columns(&self) -> Option<Dimension> {
        self.columns
    }

    pub fn metrics(&self) -> &[MetricRef] {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::metrics::MetricKind;

    #[test]
    fn rejects_empty_metric_selection() {
        let error = AggregationRequest::new(Dimension::Region, None, Vec::new())
            .expect_err("empty metrics rejected");
        assert_eq!(error, RequestError::NoMetrics);
    }

    #[test]
    fn keeps_metric_order_and_unrecognized_names() {
        let request = AggregationRequest::from_names(
            Dimension::Area,
            Some(Dimension::VehGas),
            ["PolicyCount", "Mystery", "Frequency"],
        )
        .expect("request builds");

        assert_eq!(
            request.metrics(),
            &[
                MetricRef::Known(MetricKind::PolicyCount),
                MetricRef::Unrecognized("Mystery".to_string()),
                MetricRef::Known(MetricKind::Frequency),
            ]
        );
        assert_eq!(request.columns(), Some(Dimension::VehGas));
    }

    #[test]
    fn repeated_metrics_collapse_to_one_column() {
        let request = AggregationRequest::from_names(
            Dimension::Region,
            None,
            ["Frequency", "PolicyCount", "Frequency", "Mystery", "Mystery"],
        )
        .expect("request builds");

        assert_eq!(
            request.metrics(),
            &[
                MetricRef::Known(MetricKind::Frequency),
                MetricRef::Known(MetricKind::PolicyCount),
                MetricRef::Unrecognized("Mystery".to_string()),
            ]
        );
    }

    #[test]
    fn deserialization_goes_through_validation() {
        let error = serde_json::from_str::<AggregationRequest>(r#"{"rows":"Region","metrics":[]}"#)
            .expect_err("empty metrics rejected");
        assert!(error.to_string().contains("select at least one metric"));

        let request: AggregationRequest = serde_json::from_str(
            r#"{"rows":"Region","columns":"VehGas","metrics":["Frequency","Frequency"]}"#,
        )
        .expect("valid request");
        assert_eq!(request.columns(), Some(Dimension::VehGas));
        assert_eq!(request.metrics(), &[MetricRef::Known(MetricKind::Frequency)]);
    }
}
