mod cache;
mod engine;
mod table;

pub use cache::{CacheStats, PivotCache, DEFAULT_CACHE_CAPACITY};
pub use engine::{aggregate, aggregate_rows, cross_tabulate};
pub use table::{
    AggregationResult, AggregationView, CrossTab, CrossTabView, MetricCell, MetricMatrix,
    MetricMatrixView, PivotRow, PivotRowView, PivotTable, PivotTableView,
};
