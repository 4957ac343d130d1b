use clap::Args;
use glm_dashboard::analytics::{
    AnalyticsService, Dataset, DatasetLoader, Dimension, FilterSpec, NumericField,
    RangeConstraint,
};
use glm_dashboard::config::AppConfig;
use glm_dashboard::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct DataArgs {
    /// Override APP_DATASET_PATH for this run
    #[arg(long, value_name = "PATH")]
    pub(crate) dataset: Option<PathBuf>,
}

/// Dashboard sidebar filters. Omitted flags leave a column unconstrained.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct FilterArgs {
    /// Keep only this region (repeatable, "All" disables the filter)
    #[arg(long = "region", value_name = "REGION")]
    pub(crate) regions: Vec<String>,
    /// Keep only this area code (repeatable)
    #[arg(long = "area", value_name = "AREA")]
    pub(crate) areas: Vec<String>,
    /// Keep only this vehicle brand (repeatable)
    #[arg(long = "brand", value_name = "BRAND")]
    pub(crate) brands: Vec<String>,
    /// Keep only this fuel type (repeatable)
    #[arg(long = "fuel", value_name = "FUEL")]
    pub(crate) fuels: Vec<String>,
    /// Keep only this data split: Train, Valid or Test (repeatable)
    #[arg(long = "split", value_name = "SPLIT")]
    pub(crate) splits: Vec<String>,
    /// Driver age range, MIN..MAX (either side may be left open)
    #[arg(long, value_name = "MIN..MAX", value_parser = RangeConstraint::parse)]
    pub(crate) age: Option<RangeConstraint>,
    /// Vehicle power range, MIN..MAX
    #[arg(long, value_name = "MIN..MAX", value_parser = RangeConstraint::parse)]
    pub(crate) power: Option<RangeConstraint>,
}

impl FilterArgs {
    /// Open-ended ranges are narrowed to what the dataset actually contains.
    pub(crate) fn to_filter_spec(&self, dataset: &Dataset) -> FilterSpec {
        let selections = [
            (Dimension::Region, &self.regions),
            (Dimension::Area, &self.areas),
            (Dimension::VehBrand, &self.brands),
            (Dimension::VehGas, &self.fuels),
            (Dimension::DataMajor, &self.splits),
        ];

        let mut spec = FilterSpec::new();
        for (dimension, labels) in selections {
            if !labels.is_empty() {
                spec = spec.with_labels(dimension, labels.iter().cloned());
            }
        }
        let ranges = [
            (NumericField::DrivAge, self.age),
            (NumericField::VehPower, self.power),
        ];
        for (field, range) in ranges {
            if let Some(range) = range {
                let range = match dataset.numeric_bounds(field) {
                    Some(bounds) => range.clamped_to(bounds),
                    None => range,
                };
                spec = spec.with_range(field, range);
            }
        }
        spec
    }
}

pub(crate) fn load_dataset(config: &AppConfig, data: &DataArgs) -> Result<Dataset, AppError> {
    let path = data
        .dataset
        .clone()
        .unwrap_or_else(|| config.data.dataset_path.clone());
    Ok(DatasetLoader::from_path(path)?)
}

pub(crate) fn build_service(config: &AppConfig, dataset: Dataset) -> Arc<AnalyticsService> {
    Arc::new(AnalyticsService::new(
        Arc::new(dataset),
        config.data.cache_capacity,
    ))
}
