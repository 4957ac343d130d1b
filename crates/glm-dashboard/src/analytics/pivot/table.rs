use serde::Serialize;
use std::cmp::Ordering;

use crate::analytics::domain::Dimension;
use crate::analytics::metrics::MetricRef;

/// One group of a 1-D pivot: its key and one value per requested metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub key: String,
    #[serde(skip)]
    pub(crate) code: u32,
    pub values: Vec<f64>,
}

/// Grouped metrics over a single dimension. Only observed keys are present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub dimension: Dimension,
    pub metrics: Vec<MetricRef>,
    pub rows: Vec<PivotRow>,
}

impl PivotTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn metric_index(&self, metric: &MetricRef) -> Option<usize> {
        self.metrics.iter().position(|candidate| candidate == metric)
    }

    pub fn value(&self, key: &str, metric: &MetricRef) -> Option<f64> {
        let index = self.metric_index(metric)?;
        self.rows
            .iter()
            .find(|row| row.key == key)
            .map(|row| row.values[index])
    }

    /// Stable sort on one metric; unknown metrics leave the order untouched.
    pub fn sort_by_metric(&mut self, metric: &MetricRef, descending: bool) -> &mut Self {
        if let Some(index) = self.metric_index(metric) {
            self.rows.sort_by(|left, right| {
                let ordering = left.values[index]
                    .partial_cmp(&right.values[index])
                    .unwrap_or(Ordering::Equal);
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        self
    }

    /// Orders rows by the dimension's vocabulary: sorted labels, or band order for age bands.
    pub fn sort_by_key(&mut self) -> &mut Self {
        self.rows.sort_by_key(|row| row.code);
        self
    }

    pub fn top(&mut self, limit: usize) -> &mut Self {
        self.rows.truncate(limit);
        self
    }

    pub fn to_view(&self) -> PivotTableView {
        let rows = self
            .rows
            .iter()
            .map(|row| PivotRowView {
                key: row.key.clone(),
                cells: self
                    .metrics
                    .iter()
                    .zip(&row.values)
                    .map(|(metric, value)| MetricCell {
                        metric: metric.name().to_string(),
                        value: *value,
                        display: metric.format(*value),
                    })
                    .collect(),
            })
            .collect();

        PivotTableView {
            dimension: self.dimension,
            dimension_label: self.dimension.label(),
            metrics: self.metrics.clone(),
            rows,
        }
    }
}

/// One metric's dense matrix in a cross-tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricMatrix {
    pub metric: MetricRef,
    pub cells: Vec<Vec<f64>>,
}

/// Two-dimensional aggregation. Every observed row key × observed column key
/// has a cell in every matrix; pairs with no rows hold `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab {
    pub row_dimension: Dimension,
    pub column_dimension: Dimension,
    pub row_keys: Vec<String>,
    pub column_keys: Vec<String>,
    pub matrices: Vec<MetricMatrix>,
}

impl CrossTab {
    pub fn matrix(&self, metric: &MetricRef) -> Option<&MetricMatrix> {
        self.matrices.iter().find(|matrix| &matrix.metric == metric)
    }

    pub fn cell(&self, metric: &MetricRef, row_key: &str, column_key: &str) -> Option<f64> {
        let row = self.row_keys.iter().position(|key| key == row_key)?;
        let column = self.column_keys.iter().position(|key| key == column_key)?;
        self.matrix(metric).map(|matrix| matrix.cells[row][column])
    }

    /// Cells per matrix.
    pub fn cell_count(&self) -> usize {
        self.row_keys.len() * self.column_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_keys.is_empty()
    }

    pub fn to_view(&self) -> CrossTabView {
        let matrices = self
            .matrices
            .iter()
            .map(|matrix| MetricMatrixView {
                metric: matrix.metric.name().to_string(),
                values: matrix.cells.clone(),
                display: matrix
                    .cells
                    .iter()
                    .map(|row| row.iter().map(|value| matrix.metric.format(*value)).collect())
                    .collect(),
            })
            .collect();

        CrossTabView {
            row_dimension: self.row_dimension,
            column_dimension: self.column_dimension,
            row_keys: self.row_keys.clone(),
            column_keys: self.column_keys.clone(),
            matrices,
        }
    }
}

/// Output of the aggregation engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AggregationResult {
    Table(PivotTable),
    CrossTab(CrossTab),
}

impl AggregationResult {
    pub fn as_table(&self) -> Option<&PivotTable> {
        match self {
            Self::Table(table) => Some(table),
            Self::CrossTab(_) => None,
        }
    }

    pub fn as_cross_tab(&self) -> Option<&CrossTab> {
        match self {
            Self::Table(_) => None,
            Self::CrossTab(cross_tab) => Some(cross_tab),
        }
    }

    pub fn to_view(&self) -> AggregationView {
        match self {
            Self::Table(table) => AggregationView::Table(table.to_view()),
            Self::CrossTab(cross_tab) => AggregationView::CrossTab(cross_tab.to_view()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricCell {
    pub metric: String,
    pub value: f64,
    pub display: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PivotRowView {
    pub key: String,
    pub cells: Vec<MetricCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PivotTableView {
    pub dimension: Dimension,
    pub dimension_label: &'static str,
    pub metrics: Vec<MetricRef>,
    pub rows: Vec<PivotRowView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricMatrixView {
    pub metric: String,
    pub values: Vec<Vec<f64>>,
    pub display: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossTabView {
    pub row_dimension: Dimension,
    pub column_dimension: Dimension,
    pub row_keys: Vec<String>,
    pub column_keys: Vec<String>,
    pub matrices: Vec<MetricMatrixView>,
}

/// Display-ready aggregation with raw and formatted values side by side.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AggregationView {
    Table(PivotTableView),
    CrossTab(CrossTabView),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::metrics::MetricKind;

    fn table() -> PivotTable {
        PivotTable {
            dimension: Dimension::Region,
            metrics: vec![
                MetricKind::PolicyCount.into(),
                MetricKind::Frequency.into(),
            ],
            rows: vec![
                PivotRow {
                    key: "R24".to_string(),
                    code: 1,
                    values: vec![10.0, 0.05],
                },
                PivotRow {
                    key: "R11".to_string(),
                    code: 0,
                    values: vec![30.0, 0.02],
                },
                PivotRow {
                    key: "R93".to_string(),
                    code: 2,
                    values: vec![20.0, 0.09],
                },
            ],
        }
    }

    fn keys(table: &PivotTable) -> Vec<&str> {
        table.rows.iter().map(|row| row.key.as_str()).collect()
    }

    #[test]
    fn sorts_descending_and_truncates() {
        let mut table = table();
        table
            .sort_by_metric(&MetricKind::Frequency.into(), true)
            .top(2);
        assert_eq!(keys(&table), ["R93", "R24"]);
    }

    #[test]
    fn sorting_by_missing_metric_keeps_order() {
        let mut table = table();
        table.sort_by_metric(&MetricKind::ClaimRate.into(), true);
        assert_eq!(keys(&table), ["R24", "R11", "R93"]);

        table.sort_by_key();
        assert_eq!(keys(&table), ["R11", "R24", "R93"]);
    }

    #[test]
    fn view_carries_formatted_cells() {
        let view = table().to_view();
        assert_eq!(view.rows[1].cells[0].display, "30");
        assert_eq!(view.rows[1].cells[1].display, "0.0200");
        assert_eq!(view.dimension_label, "Region");
    }

    #[test]
    fn value_lookup_by_key_and_metric() {
        let table = table();
        assert_eq!(table.value("R11", &MetricKind::PolicyCount.into()), Some(30.0));
        assert_eq!(table.value("R00", &MetricKind::PolicyCount.into()), None);
        assert_eq!(table.value("R11", &MetricKind::ClaimRate.into()), None);
    }
}
