use std::collections::HashMap;
use std::hash::Hash;

use super::table::{AggregationResult, CrossTab, MetricMatrix, PivotRow, PivotTable};
use crate::analytics::dataset::Dataset;
use crate::analytics::domain::Dimension;
use crate::analytics::filter::FilteredView;
use crate::analytics::metrics::{MetricRef, RowGroup};
use crate::analytics::request::AggregationRequest;

/// Groups `view` by the requested dimension(s) and evaluates every requested metric per group.
pub fn aggregate(view: &FilteredView<'_>, request: &AggregationRequest) -> AggregationResult {
    match request.columns() {
        None => AggregationResult::Table(aggregate_rows(view, request.rows(), request.metrics())),
        Some(columns) => AggregationResult::CrossTab(cross_tabulate(
            view,
            request.rows(),
            columns,
            request.metrics(),
        )),
    }
}

/// 1-D path: one row per observed key, in first-occurrence order.
pub fn aggregate_rows(
    view: &FilteredView<'_>,
    dimension: Dimension,
    metrics: &[MetricRef],
) -> PivotTable {
    let dataset = view.dataset();
    let groups = group_by(view.rows(), |row| dataset.code(dimension, row));

    let rows = groups
        .into_iter()
        .map(|(code, members)| {
            let group = RowGroup::new(dataset, &members);
            PivotRow {
                key: key_label(dataset, dimension, code),
                code,
                values: metrics.iter().map(|metric| metric.evaluate(&group)).collect(),
            }
        })
        .collect();

    PivotTable {
        dimension,
        metrics: metrics.to_vec(),
        rows,
    }
}

/// 2-D path: dense matrices over observed row keys × observed column keys.
pub fn cross_tabulate(
    view: &FilteredView<'_>,
    row_dimension: Dimension,
    column_dimension: Dimension,
    metrics: &[MetricRef],
) -> CrossTab {
    let dataset = view.dataset();
    let pairs = group_by(view.rows(), |row| {
        (
            dataset.code(row_dimension, row),
            dataset.code(column_dimension, row),
        )
    });

    let mut row_slots = KeySlots::default();
    let mut column_slots = KeySlots::default();
    let placed: Vec<(usize, usize, Vec<usize>)> = pairs
        .into_iter()
        .map(|((row_code, column_code), members)| {
            (
                row_slots.slot(row_code),
                column_slots.slot(column_code),
                members,
            )
        })
        .collect();

    let matrices = metrics
        .iter()
        .map(|metric| {
            let mut cells = vec![vec![0.0; column_slots.len()]; row_slots.len()];
            for (row, column, members) in &placed {
                cells[*row][*column] = metric.evaluate(&RowGroup::new(dataset, members));
            }
            MetricMatrix {
                metric: metric.clone(),
                cells,
            }
        })
        .collect();

    CrossTab {
        row_dimension,
        column_dimension,
        row_keys: row_slots.labels(dataset, row_dimension),
        column_keys: column_slots.labels(dataset, column_dimension),
        matrices,
    }
}

/// Materializes key → member rows, keeping keys in order of first appearance.
fn group_by<K, F>(rows: &[usize], key_of: F) -> Vec<(K, Vec<usize>)>
where
    K: Copy + Eq + Hash,
    F: Fn(usize) -> K,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<usize>)> = Vec::new();

    for &row in rows {
        let key = key_of(row);
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }

    groups
}

#[derive(Default)]
struct KeySlots {
    slots: HashMap<u32, usize>,
    codes: Vec<u32>,
}

impl KeySlots {
    fn slot(&mut self, code: u32) -> usize {
        let codes = &mut self.codes;
        *self.slots.entry(code).or_insert_with(|| {
            codes.push(code);
            codes.len() - 1
        })
    }

    fn len(&self) -> usize {
        self.codes.len()
    }

    fn labels(&self, dataset: &Dataset, dimension: Dimension) -> Vec<String> {
        self.codes
            .iter()
            .map(|&code| key_label(dataset, dimension, code))
            .collect()
    }
}

fn key_label(dataset: &Dataset, dimension: Dimension, code: u32) -> String {
    dataset
        .vocabulary(dimension)
        .label(code)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dataset::fixtures::{record, three_rows};
    use crate::analytics::filter::FilterSpec;
    use crate::analytics::metrics::MetricKind;

    fn request(rows: Dimension, columns: Option<Dimension>, metrics: &[MetricKind]) -> AggregationRequest {
        AggregationRequest::new(
            rows,
            columns,
            metrics.iter().copied().map(MetricRef::from).collect(),
        )
        .expect("request builds")
    }

    fn gas_dataset() -> Dataset {
        let mut rows = three_rows();
        rows[0].veh_gas = "Diesel".to_string();
        rows[1].veh_gas = "Regular".to_string();
        rows[2].veh_gas = "Regular".to_string();
        Dataset::from_records(rows)
    }

    #[test]
    fn groups_in_first_occurrence_order() {
        let dataset = Dataset::from_records(vec![
            record("R93", 1.0, 0, 0.0),
            record("R11", 1.0, 0, 0.0),
            record("R93", 1.0, 0, 0.0),
        ]);
        let result = aggregate(
            &FilteredView::all(&dataset),
            &request(Dimension::Region, None, &[MetricKind::PolicyCount]),
        );
        let table = result.as_table().expect("1-D result");
        let keys: Vec<&str> = table.rows.iter().map(|row| row.key.as_str()).collect();
        assert_eq!(keys, ["R93", "R11"]);
        assert_eq!(table.rows[0].values, vec![2.0]);
    }

    #[test]
    fn cross_tab_fills_unobserved_pairs_with_zero() {
        let dataset = gas_dataset();
        let result = aggregate(
            &FilteredView::all(&dataset),
            &request(
                Dimension::Region,
                Some(Dimension::VehGas),
                &[MetricKind::PolicyCount, MetricKind::Frequency],
            ),
        );
        let cross_tab = result.as_cross_tab().expect("2-D result");

        assert_eq!(cross_tab.row_keys, ["A", "B"]);
        assert_eq!(cross_tab.column_keys, ["Diesel", "Regular"]);
        assert_eq!(cross_tab.matrices.len(), 2);
        let policies = MetricKind::PolicyCount.into();
        assert_eq!(cross_tab.cell(&policies, "B", "Diesel"), Some(0.0));
        assert_eq!(cross_tab.cell(&policies, "A", "Regular"), Some(1.0));
        assert_eq!(
            cross_tab.cell(&MetricKind::Frequency.into(), "A", "Diesel"),
            Some(1.0)
        );
        for matrix in &cross_tab.matrices {
            assert_eq!(matrix.cells.len(), cross_tab.row_keys.len());
            assert!(matrix
                .cells
                .iter()
                .all(|row| row.len() == cross_tab.column_keys.len()));
        }
    }

    #[test]
    fn empty_views_produce_empty_results() {
        let dataset = gas_dataset();
        let empty = FilterSpec::new()
            .with_labels(Dimension::Region, ["Z"])
            .apply(&dataset);

        let table = aggregate(&empty, &request(Dimension::Region, None, &[MetricKind::Frequency]));
        assert!(table.as_table().expect("1-D").is_empty());

        let cross = aggregate(
            &empty,
            &request(Dimension::Region, Some(Dimension::VehGas), &[MetricKind::Frequency]),
        );
        let cross = cross.as_cross_tab().expect("2-D");
        assert!(cross.is_empty());
        assert_eq!(cross.cell_count(), 0);
        assert_eq!(cross.matrices.len(), 1);
    }

    #[test]
    fn unrecognized_metric_fills_zero_column() {
        let dataset = Dataset::from_records(three_rows());
        let request = AggregationRequest::from_names(Dimension::Region, None, ["Frequency", "Bogus"])
            .expect("request builds");
        let result = aggregate(&FilteredView::all(&dataset), &request);
        let table = result.as_table().expect("1-D");
        assert!(table.rows.iter().all(|row| row.values[1] == 0.0));
    }
}
