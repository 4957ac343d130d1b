//! Delimited-text export of pivot results and filtered rows.

use serde::Deserialize;
use std::io::Write;

use super::filter::FilteredView;
use super::metrics::MetricRef;
use super::pivot::{AggregationResult, CrossTab, PivotTable};

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingMetric(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(err) => write!(f, "failed to write export: {}", err),
            ExportError::Csv(err) => write!(f, "failed to encode CSV export: {}", err),
            ExportError::MissingMetric(name) => {
                write!(f, "metric '{}' is not part of this cross-tab", name)
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            ExportError::Csv(err) => Some(err),
            ExportError::MissingMetric(_) => None,
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// How metric values are rendered in exported cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueStyle {
    #[default]
    Raw,
    Formatted,
}

impl ValueStyle {
    pub fn from_formatted(formatted: bool) -> Self {
        if formatted {
            Self::Formatted
        } else {
            Self::Raw
        }
    }

    fn render(self, metric: &MetricRef, value: f64) -> String {
        match self {
            Self::Raw => value.to_string(),
            Self::Formatted => metric.format(value),
        }
    }
}

/// Header is the dimension column name followed by metric names.
pub fn write_pivot_csv<W: Write>(
    table: &PivotTable,
    style: ValueStyle,
    writer: W,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec![table.dimension.column_name().to_string()];
    header.extend(table.metrics.iter().map(|metric| metric.name().to_string()));
    csv_writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.key.clone());
        record.extend(
            table
                .metrics
                .iter()
                .zip(&row.values)
                .map(|(metric, value)| style.render(metric, *value)),
        );
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Long form: one line per (row key, column key) cell, one column per metric.
pub fn write_cross_tab_csv<W: Write>(
    cross_tab: &CrossTab,
    style: ValueStyle,
    writer: W,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec![
        cross_tab.row_dimension.column_name().to_string(),
        cross_tab.column_dimension.column_name().to_string(),
    ];
    header.extend(
        cross_tab
            .matrices
            .iter()
            .map(|matrix| matrix.metric.name().to_string()),
    );
    csv_writer.write_record(&header)?;

    for (row, row_key) in cross_tab.row_keys.iter().enumerate() {
        for (column, column_key) in cross_tab.column_keys.iter().enumerate() {
            let mut record = vec![row_key.clone(), column_key.clone()];
            record.extend(
                cross_tab
                    .matrices
                    .iter()
                    .map(|matrix| style.render(&matrix.metric, matrix.cells[row][column])),
            );
            csv_writer.write_record(&record)?;
        }
    }

    csv_writer.flush()?;
    Ok(())
}

/// Wide form of a single metric: row keys down, column keys across.
pub fn write_matrix_csv<W: Write>(
    cross_tab: &CrossTab,
    metric: &MetricRef,
    style: ValueStyle,
    writer: W,
) -> Result<(), ExportError> {
    let matrix = cross_tab
        .matrix(metric)
        .ok_or_else(|| ExportError::MissingMetric(metric.name().to_string()))?;
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec![cross_tab.row_dimension.column_name().to_string()];
    header.extend(cross_tab.column_keys.iter().cloned());
    csv_writer.write_record(&header)?;

    for (row_key, cells) in cross_tab.row_keys.iter().zip(&matrix.cells) {
        let mut record = vec![row_key.clone()];
        record.extend(cells.iter().map(|value| style.render(metric, *value)));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Every source column of the selected rows, in source order.
pub fn write_records_csv<W: Write>(view: &FilteredView<'_>, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let dataset = view.dataset();
    for &row in view.rows() {
        csv_writer.serialize(dataset.record(row))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn aggregation_csv(result: &AggregationResult, style: ValueStyle) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    match result {
        AggregationResult::Table(table) => write_pivot_csv(table, style, &mut buffer)?,
        AggregationResult::CrossTab(cross_tab) => {
            write_cross_tab_csv(cross_tab, style, &mut buffer)?
        }
    }
    Ok(into_text(buffer))
}

pub fn matrix_csv(
    cross_tab: &CrossTab,
    metric: &MetricRef,
    style: ValueStyle,
) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_matrix_csv(cross_tab, metric, style, &mut buffer)?;
    Ok(into_text(buffer))
}

pub fn records_csv(view: &FilteredView<'_>) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_records_csv(view, &mut buffer)?;
    Ok(into_text(buffer))
}

fn into_text(buffer: Vec<u8>) -> String {
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dataset::fixtures::three_rows;
    use crate::analytics::dataset::Dataset;
    use crate::analytics::domain::Dimension;
    use crate::analytics::filter::FilterSpec;
    use crate::analytics::metrics::MetricKind;
    use crate::analytics::pivot::{aggregate_rows, cross_tabulate};

    fn metrics() -> Vec<MetricRef> {
        vec![MetricKind::Frequency.into(), MetricKind::TotalClaimAmount.into()]
    }

    #[test]
    fn pivot_table_raw_and_formatted() {
        let dataset = Dataset::from_records(three_rows());
        let table = aggregate_rows(&FilteredView::all(&dataset), Dimension::Region, &metrics());

        let mut raw = Vec::new();
        write_pivot_csv(&table, ValueStyle::Raw, &mut raw).unwrap();
        assert_eq!(
            String::from_utf8(raw).unwrap(),
            "Region,Frequency,TotalClaimAmount\nA,0.5,100\nB,0,0\n"
        );

        let formatted = aggregation_csv(&AggregationResult::Table(table), ValueStyle::Formatted).unwrap();
        assert_eq!(
            formatted,
            "Region,Frequency,TotalClaimAmount\nA,0.5000,€100.00\nB,0.0000,€0.00\n"
        );
    }

    #[test]
    fn cross_tab_long_and_wide() {
        let mut rows = three_rows();
        rows[1].veh_gas = "Diesel".to_string();
        let dataset = Dataset::from_records(rows);
        let cross_tab = cross_tabulate(
            &FilteredView::all(&dataset),
            Dimension::Region,
            Dimension::VehGas,
            &[MetricKind::PolicyCount.into()],
        );

        let long = aggregation_csv(&AggregationResult::CrossTab(cross_tab.clone()), ValueStyle::Raw)
            .unwrap();
        assert_eq!(
            long,
            "Region,VehGas,PolicyCount\nA,Regular,1\nA,Diesel,1\nB,Regular,1\nB,Diesel,0\n"
        );

        let mut wide = Vec::new();
        write_matrix_csv(
            &cross_tab,
            &MetricKind::PolicyCount.into(),
            ValueStyle::Raw,
            &mut wide,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(wide).unwrap(),
            "Region,Regular,Diesel\nA,1,1\nB,1,0\n"
        );

        let missing = write_matrix_csv(
            &cross_tab,
            &MetricKind::Frequency.into(),
            ValueStyle::Raw,
            Vec::new(),
        );
        assert!(matches!(missing, Err(ExportError::MissingMetric(name)) if name == "Frequency"));
    }

    #[test]
    fn filtered_rows_keep_source_columns() {
        let dataset = Dataset::from_records(three_rows());
        let view = FilterSpec::new()
            .with_labels(Dimension::Region, ["B"])
            .apply(&dataset);

        let text = records_csv(&view).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "IDpol,ClaimNb,Exposure,Area,VehPower,VehAge,DrivAge,BonusMalus,VehBrand,\
                 VehGas,Density,Region,ClaimAmount,PurePremium,Pred_GLMs,DataMajor"
            )
        );
        assert_eq!(
            lines.next(),
            Some("3,0,2.0,C,6.0,4.0,40.0,50.0,B12,Regular,1200.0,B,0.0,0.0,100.0,Train")
        );
        assert_eq!(lines.next(), None);
    }
}
