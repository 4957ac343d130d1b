use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::dataset::{Dataset, DatasetVersion};
use super::domain::{Dimension, NumericField};
use super::export::{self, ExportError, ValueStyle};
use super::filter::FilterSpec;
use super::metrics::MetricRef;
use super::pivot::{aggregate, AggregationResult, CacheStats, PivotCache};
use super::request::{AggregationRequest, RequestError};
use super::views::{self, AnalysisView, ViewKind};

/// Column-dimension names that mean "no column dimension".
const NO_COLUMNS: [&str; 2] = ["", "none"];

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsServiceError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Body shared by the view and raw-export endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub filters: FilterSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SortOrder {
    pub metric: String,
    #[serde(default = "descending_by_default")]
    pub descending: bool,
}

fn descending_by_default() -> bool {
    true
}

/// Pivot request as sent by clients, before names are resolved.
#[derive(Debug, Clone, Deserialize)]
pub struct PivotQuery {
    #[serde(default)]
    pub filters: FilterSpec,
    pub rows: String,
    #[serde(default)]
    pub columns: Option<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
    #[serde(default)]
    pub top: Option<usize>,
    #[serde(default)]
    pub formatted: bool,
}

impl PivotQuery {
    pub fn new<S: Into<String>>(rows: S, metrics: Vec<String>) -> Self {
        Self {
            filters: FilterSpec::default(),
            rows: rows.into(),
            columns: None,
            metrics,
            sort: None,
            top: None,
            formatted: false,
        }
    }

    pub fn request(&self) -> Result<AggregationRequest, RequestError> {
        let rows: Dimension = self.rows.parse()?;
        let columns = match self.columns.as_deref().map(str::trim) {
            Some(name) if !NO_COLUMNS.contains(&name.to_ascii_lowercase().as_str()) => {
                Some(name.parse::<Dimension>()?)
            }
            _ => None,
        };
        AggregationRequest::from_names(rows, columns, &self.metrics)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionSummary {
    pub dimension: Dimension,
    pub label: &'static str,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldBounds {
    pub field: NumericField,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
}

/// What a client needs to build its filter widgets.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub version: DatasetVersion,
    pub dimensions: Vec<DimensionSummary>,
    pub numeric_bounds: Vec<FieldBounds>,
    pub cache: CacheStats,
}

/// Shared entry point for HTTP and CLI callers: one loaded dataset plus the pivot cache.
#[derive(Debug)]
pub struct AnalyticsService {
    dataset: Arc<Dataset>,
    cache: PivotCache,
}

impl AnalyticsService {
    pub fn new(dataset: Arc<Dataset>, cache_capacity: usize) -> Self {
        Self {
            dataset,
            cache: PivotCache::new(cache_capacity),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn summary(&self) -> DatasetSummary {
        let dimensions = Dimension::ordered()
            .into_iter()
            .map(|dimension| DimensionSummary {
                dimension,
                label: dimension.label(),
                values: self.dataset.vocabulary(dimension).labels().to_vec(),
            })
            .collect();

        let numeric_bounds = NumericField::ordered()
            .into_iter()
            .filter_map(|field| {
                self.dataset
                    .numeric_bounds(field)
                    .map(|(min, max)| FieldBounds {
                        field,
                        label: field.label(),
                        min,
                        max,
                    })
            })
            .collect();

        DatasetSummary {
            rows: self.dataset.len(),
            version: self.dataset.version(),
            dimensions,
            numeric_bounds,
            cache: self.cache.stats(),
        }
    }

    /// Cached aggregation, then the query's sort and top-N applied to a copy.
    /// Sorting and truncation only touch 1-D tables.
    pub fn pivot(&self, query: &PivotQuery) -> Result<AggregationResult, AnalyticsServiceError> {
        let request = query.request()?;
        let cached = self
            .cache
            .get_or_compute(self.dataset.version(), &query.filters, &request, || {
                let view = query.filters.apply(&self.dataset);
                debug!(rows = view.len(), dimension = %request.rows(), "aggregating pivot");
                aggregate(&view, &request)
            });

        let mut result = AggregationResult::clone(&cached);
        if let AggregationResult::Table(table) = &mut result {
            if let Some(sort) = &query.sort {
                table.sort_by_metric(&MetricRef::parse(&sort.metric), sort.descending);
            }
            if let Some(limit) = query.top {
                table.top(limit);
            }
        }
        Ok(result)
    }

    pub fn pivot_csv(&self, query: &PivotQuery) -> Result<String, AnalyticsServiceError> {
        let result = self.pivot(query)?;
        let csv = export::aggregation_csv(&result, ValueStyle::from_formatted(query.formatted))?;
        Ok(csv)
    }

    /// Wide CSV of one metric: cross-tab row keys down, column keys across.
    /// One-dimensional pivots are already wide and export as usual.
    pub fn pivot_matrix_csv(
        &self,
        query: &PivotQuery,
        metric: &str,
    ) -> Result<String, AnalyticsServiceError> {
        let style = ValueStyle::from_formatted(query.formatted);
        let csv = match self.pivot(query)? {
            AggregationResult::CrossTab(cross_tab) => {
                export::matrix_csv(&cross_tab, &MetricRef::parse(metric), style)?
            }
            table @ AggregationResult::Table(_) => export::aggregation_csv(&table, style)?,
        };
        Ok(csv)
    }

    pub fn view(&self, kind: ViewKind, filters: &FilterSpec) -> AnalysisView {
        let view = filters.apply(&self.dataset);
        debug!(view = %kind, rows = view.len(), "computing analysis view");
        views::compute(kind, &view)
    }

    pub fn export_rows(&self, filters: &FilterSpec) -> Result<String, AnalyticsServiceError> {
        let view = filters.apply(&self.dataset);
        Ok(export::records_csv(&view)?)
    }
}
