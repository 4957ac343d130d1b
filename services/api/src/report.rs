use crate::cli::{PivotArgs, ViewArgs};
use crate::infra::{build_service, load_dataset};
use chrono::SecondsFormat;
use glm_dashboard::analytics::pivot::{CrossTab, PivotTable};
use glm_dashboard::analytics::{AggregationResult, PivotQuery, SortOrder, ViewKind};
use glm_dashboard::config::AppConfig;
use glm_dashboard::error::AppError;

pub(crate) fn run_pivot(args: PivotArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config, load_dataset(&config, &args.data)?);

    let query = PivotQuery {
        filters: args.filters.to_filter_spec(service.dataset()),
        rows: args.rows,
        columns: args.columns,
        metrics: args.metrics,
        sort: args.sort.map(|metric| SortOrder {
            metric,
            descending: !args.ascending,
        }),
        top: args.top,
        formatted: args.formatted,
    };

    if args.csv {
        let csv = match &args.matrix {
            Some(metric) => service.pivot_matrix_csv(&query, metric)?,
            None => service.pivot_csv(&query)?,
        };
        print!("{csv}");
        return Ok(());
    }

    let result = service.pivot(&query)?;
    let version = service.dataset().version();
    println!(
        "Dataset #{} loaded {} | {} policies",
        version.id,
        version.loaded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        service.dataset().len()
    );
    println!();
    for line in render_result(&result) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn run_view(args: ViewArgs) -> Result<(), AppError> {
    let kind: ViewKind = args.name.parse()?;
    let config = AppConfig::load()?;
    let service = build_service(&config, load_dataset(&config, &args.data)?);

    let view = service.view(kind, &args.filters.to_filter_spec(service.dataset()));
    let rendered = serde_json::to_string_pretty(&view).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn render_result(result: &AggregationResult) -> Vec<String> {
    match result {
        AggregationResult::Table(table) => render_table(table),
        AggregationResult::CrossTab(cross_tab) => render_cross_tab(cross_tab),
    }
}

fn render_table(table: &PivotTable) -> Vec<String> {
    let mut header = vec![table.dimension.column_name().to_string()];
    header.extend(table.metrics.iter().map(|metric| metric.name().to_string()));

    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![row.key.clone()];
            cells.extend(
                table
                    .metrics
                    .iter()
                    .zip(&row.values)
                    .map(|(metric, value)| metric.format(*value)),
            );
            cells
        })
        .collect::<Vec<_>>();

    align(header, rows)
}

/// One block per metric, row keys down and column keys across.
fn render_cross_tab(cross_tab: &CrossTab) -> Vec<String> {
    let mut lines = Vec::new();
    for matrix in &cross_tab.matrices {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!(
            "{} by {} x {}",
            matrix.metric, cross_tab.row_dimension, cross_tab.column_dimension
        ));

        let mut header = vec![cross_tab.row_dimension.column_name().to_string()];
        header.extend(cross_tab.column_keys.iter().cloned());
        let rows = cross_tab
            .row_keys
            .iter()
            .zip(&matrix.cells)
            .map(|(key, cells)| {
                let mut line = vec![key.clone()];
                line.extend(cells.iter().map(|value| matrix.metric.format(*value)));
                line
            })
            .collect();
        lines.extend(align(header, rows));
    }
    lines
}

/// Left-aligns the first column, right-aligns the rest.
fn align(header: Vec<String>, rows: Vec<Vec<String>>) -> Vec<String> {
    let mut widths: Vec<usize> = header.iter().map(|cell| cell.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    std::iter::once(header)
        .chain(rows)
        .map(|cells| {
            cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(index, (cell, width))| {
                    if index == 0 {
                        format!("{cell:<width$}")
                    } else {
                        format!("{cell:>width$}")
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect()
}
