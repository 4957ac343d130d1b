use serde::Serialize;

use super::{category_counts, stats, CategoryCount};
use crate::analytics::dataset::PolicyRecord;
use crate::analytics::domain::{Dimension, NumericField};
use crate::analytics::filter::FilteredView;

/// Rows shown in the raw-data preview.
pub const SAMPLE_ROWS: usize = 100;

/// Numeric columns entering the correlation matrix, in display order.
pub const CORRELATION_FIELDS: [NumericField; 7] = [
    NumericField::VehPower,
    NumericField::VehAge,
    NumericField::DrivAge,
    NumericField::BonusMalus,
    NumericField::Density,
    NumericField::ClaimNb,
    NumericField::PredGlm,
];

/// Square Pearson matrix; `values[i][j]` pairs `fields[i]` with `fields[j]`.
/// A column without variance correlates as `0.0` with everything, itself included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub fields: Vec<NumericField>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn compute(view: &FilteredView<'_>, fields: &[NumericField]) -> Self {
        let columns: Vec<Vec<f64>> = fields
            .iter()
            .map(|&field| view.values(field).collect())
            .collect();

        let values = columns
            .iter()
            .map(|left| columns.iter().map(|right| stats::pearson(left, right)).collect())
            .collect();

        Self {
            fields: fields.to_vec(),
            values,
        }
    }

    pub fn get(&self, left: NumericField, right: NumericField) -> Option<f64> {
        let row = self.fields.iter().position(|field| *field == left)?;
        let column = self.fields.iter().position(|field| *field == right)?;
        Some(self.values[row][column])
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplorerView {
    pub row_count: usize,
    pub column_count: usize,
    pub split_shares: Vec<CategoryCount>,
    pub sample: Vec<PolicyRecord>,
    pub correlation: CorrelationMatrix,
}

impl ExplorerView {
    pub fn compute(view: &FilteredView<'_>) -> Self {
        let dataset = view.dataset();
        let sample = view
            .rows()
            .iter()
            .take(SAMPLE_ROWS)
            .map(|&row| dataset.record(row))
            .collect();

        Self {
            row_count: view.len(),
            column_count: PolicyRecord::COLUMN_COUNT,
            split_shares: category_counts(view, Dimension::DataMajor),
            sample,
            correlation: CorrelationMatrix::compute(view, &CORRELATION_FIELDS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::views::fixtures::portfolio;

    #[test]
    fn preview_and_shape() {
        let dataset = portfolio();
        let explorer = ExplorerView::compute(&FilteredView::all(&dataset));

        assert_eq!(explorer.row_count, 6);
        assert_eq!(explorer.column_count, 16);
        assert_eq!(explorer.sample.len(), 6);
        assert_eq!(explorer.sample[3].region, "R24");
        assert_eq!(explorer.correlation.values.len(), CORRELATION_FIELDS.len());
    }

    #[test]
    fn correlation_is_symmetric_with_unit_diagonal() {
        let dataset = portfolio();
        let matrix = CorrelationMatrix::compute(&FilteredView::all(&dataset), &CORRELATION_FIELDS);

        let age = matrix
            .get(NumericField::DrivAge, NumericField::DrivAge)
            .expect("field present");
        assert!((age - 1.0).abs() < 1e-12);
        assert_eq!(
            matrix.get(NumericField::VehAge, NumericField::BonusMalus),
            matrix.get(NumericField::BonusMalus, NumericField::VehAge)
        );
        // veh_age and bonus_malus are both linear in the row index
        let linear = matrix
            .get(NumericField::VehAge, NumericField::BonusMalus)
            .expect("field present");
        assert!((linear - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_columns_correlate_as_zero() {
        let dataset = portfolio();
        let matrix = CorrelationMatrix::compute(&FilteredView::all(&dataset), &CORRELATION_FIELDS);
        // every fixture vehicle has the same power
        assert_eq!(matrix.get(NumericField::VehPower, NumericField::VehPower), Some(0.0));
        assert_eq!(matrix.get(NumericField::VehPower, NumericField::DrivAge), Some(0.0));
    }
}
