//! Filtering, pivot aggregation and analysis views over the GLM policy table.
//!
//! The flow is one-way: a [`dataset::Dataset`] is loaded once, a
//! [`filter::FilterSpec`] narrows it to a [`filter::FilteredView`], and the
//! pivot engine or a view reduces that to display-ready figures.

pub mod dataset;
pub mod domain;
pub mod export;
pub mod filter;
pub mod metrics;
pub mod pivot;
pub mod request;
pub mod router;
pub mod service;
pub mod views;

pub use dataset::{Dataset, DatasetError, DatasetLoader, DatasetVersion, PolicyRecord};
pub use domain::{AgeBand, Dimension, NumericField};
pub use filter::{CategoricalSelection, FilterSpec, FilteredView, RangeConstraint};
pub use metrics::{MetricKind, MetricRef};
pub use pivot::{aggregate, AggregationResult, CrossTab, PivotCache, PivotTable};
pub use request::{AggregationRequest, RequestError};
pub use router::analytics_router;
pub use service::{AnalyticsService, AnalyticsServiceError, FilterQuery, PivotQuery, SortOrder};
pub use views::{AnalysisView, ViewKind};
