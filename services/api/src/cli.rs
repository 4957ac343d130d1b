use crate::infra::{DataArgs, FilterArgs};
use crate::report::{run_pivot, run_view};
use crate::server;
use clap::{Args, Parser, Subcommand};
use glm_dashboard::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "GLM Dashboard",
    about = "Serve or query the motor-insurance GLM analytics dashboard",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Aggregate metrics by one or two dimensions and print the table
    Pivot(PivotArgs),
    /// Print one dashboard tab as JSON
    View(ViewArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

#[derive(Args, Debug)]
pub(crate) struct PivotArgs {
    /// Row dimension: Region, Area, VehBrand, VehGas, DataMajor or AgeGroup
    #[arg(long)]
    pub(crate) rows: String,
    /// Optional column dimension for a cross-tab
    #[arg(long)]
    pub(crate) columns: Option<String>,
    /// Metric to compute (repeatable), e.g. Frequency or AvgPremium
    #[arg(long = "metric", value_name = "METRIC", required = true)]
    pub(crate) metrics: Vec<String>,
    /// Sort table rows by this metric, largest first
    #[arg(long, value_name = "METRIC")]
    pub(crate) sort: Option<String>,
    /// Sort ascending instead
    #[arg(long, requires = "sort")]
    pub(crate) ascending: bool,
    /// Keep only the first N table rows
    #[arg(long, value_name = "N")]
    pub(crate) top: Option<usize>,
    /// Emit CSV instead of an aligned table
    #[arg(long)]
    pub(crate) csv: bool,
    /// Use display formatting (currency, percentages) in CSV output
    #[arg(long, requires = "csv")]
    pub(crate) formatted: bool,
    /// Write a cross-tab as one wide matrix of this metric instead of long form
    #[arg(long, value_name = "METRIC", requires = "csv")]
    pub(crate) matrix: Option<String>,
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

#[derive(Args, Debug)]
pub(crate) struct ViewArgs {
    /// overview, predictions, claims, vehicles, drivers or explorer
    pub(crate) name: String,
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Pivot(args) => run_pivot(args),
        Command::View(args) => run_view(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn pivot_flags_parse() {
        let cli = Cli::try_parse_from([
            "glm-dashboard-api",
            "pivot",
            "--rows",
            "Region",
            "--metric",
            "Frequency",
            "--metric",
            "AvgPremium",
            "--region",
            "R11",
            "--age",
            "25..60",
            "--top",
            "5",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Pivot(args)) => {
                assert_eq!(args.metrics, ["Frequency", "AvgPremium"]);
                assert_eq!(args.filters.regions, ["R11"]);
                assert_eq!(args.filters.age.map(|range| range.lo), Some(25.0));
                assert_eq!(args.top, Some(5));
                assert!(!args.csv);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn matrix_output_needs_csv() {
        let base = [
            "glm-dashboard-api",
            "pivot",
            "--rows",
            "Region",
            "--columns",
            "VehGas",
            "--metric",
            "Frequency",
            "--matrix",
            "Frequency",
        ];
        assert!(Cli::try_parse_from(base).is_err());

        let cli = Cli::try_parse_from(base.into_iter().chain(["--csv"])).expect("arguments parse");
        match cli.command {
            Some(Command::Pivot(args)) => assert_eq!(args.matrix.as_deref(), Some("Frequency")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn malformed_ranges_are_rejected() {
        let parsed = Cli::try_parse_from([
            "glm-dashboard-api",
            "view",
            "overview",
            "--power",
            "high",
        ]);
        assert!(parsed.is_err());
    }
}
