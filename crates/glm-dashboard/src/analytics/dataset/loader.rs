use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{Dataset, DatasetBuilder, PolicyRecord};

const REQUIRED_COLUMNS: [&str; 15] = [
    "IDpol",
    "ClaimNb",
    "Exposure",
    "Area",
    "VehPower",
    "VehAge",
    "DrivAge",
    "BonusMalus",
    "VehBrand",
    "VehGas",
    "Density",
    "Region",
    "ClaimAmount",
    "Pred_GLMs",
    "DataMajor",
];

/// Fatal problems with the dataset source. Surfaced at startup, never mid-request.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error(
        "dataset file not found at {}; point APP_DATASET_PATH (or --dataset) at the GLM predictions CSV export",
        path.display()
    )]
    NotFound { path: PathBuf },
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid dataset CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset is missing required column '{0}'; regenerate the export with all model columns")]
    MissingColumn(&'static str),
    #[error("row {row}: invalid {column} ({reason})")]
    InvalidValue {
        row: u64,
        column: &'static str,
        reason: String,
    },
    #[error("dataset contains no policy rows")]
    Empty,
}

/// Reads the GLM predictions export into a [`Dataset`].
pub struct DatasetLoader;

impl DatasetLoader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Dataset, DatasetError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => DatasetError::NotFound {
                path: path.to_path_buf(),
            },
            _ => DatasetError::Io(err),
        })?;

        let dataset = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            version = dataset.version().id,
            "policy dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Dataset, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if let Some(missing) = REQUIRED_COLUMNS
            .into_iter()
            .find(|column| !headers.iter().any(|header| header == *column))
        {
            return Err(DatasetError::MissingColumn(missing));
        }

        let mut builder = DatasetBuilder::default();
        for (index, result) in csv_reader.records().enumerate() {
            let record = result?;
            let line = record
                .position()
                .map(|position| position.line())
                .unwrap_or(index as u64 + 2);
            let row: SourceRow = record.deserialize(Some(&headers))?;
            builder.push(row.into_record(line)?);
        }

        if builder.is_empty() {
            return Err(DatasetError::Empty);
        }

        debug!(rows = builder.len(), "interning categorical columns");
        Ok(builder.build())
    }
}

#[derive(Debug, Deserialize)]
struct SourceRow {
    #[serde(rename = "IDpol")]
    policy_id: f64,
    #[serde(rename = "ClaimNb")]
    claim_nb: f64,
    #[serde(rename = "Exposure")]
    exposure: f64,
    #[serde(rename = "Area")]
    area: String,
    #[serde(rename = "VehPower")]
    veh_power: f64,
    #[serde(rename = "VehAge")]
    veh_age: f64,
    #[serde(rename = "DrivAge")]
    driv_age: f64,
    #[serde(rename = "BonusMalus")]
    bonus_malus: f64,
    #[serde(rename = "VehBrand")]
    veh_brand: String,
    #[serde(rename = "VehGas")]
    veh_gas: String,
    #[serde(rename = "Density")]
    density: f64,
    #[serde(rename = "Region")]
    region: String,
    #[serde(rename = "ClaimAmount")]
    claim_amount: f64,
    #[serde(rename = "PurePremium", default)]
    pure_premium: Option<f64>,
    #[serde(rename = "Pred_GLMs")]
    predicted_premium: f64,
    #[serde(rename = "DataMajor")]
    data_major: String,
}

impl SourceRow {
    fn into_record(self, row: u64) -> Result<PolicyRecord, DatasetError> {
        let policy_id = non_negative(row, "IDpol", self.policy_id)? as u64;
        let claim_nb = non_negative(row, "ClaimNb", self.claim_nb)?;
        if claim_nb.fract() != 0.0 || claim_nb > f64::from(u32::MAX) {
            return Err(DatasetError::InvalidValue {
                row,
                column: "ClaimNb",
                reason: format!("{claim_nb} is not a whole claim count"),
            });
        }
        let exposure = non_negative(row, "Exposure", self.exposure)?;
        let claim_amount = non_negative(row, "ClaimAmount", self.claim_amount)?;
        let pure_premium = match self.pure_premium {
            Some(value) => finite(row, "PurePremium", value)?,
            None if exposure > 0.0 => claim_amount / exposure,
            None => 0.0,
        };

        Ok(PolicyRecord {
            policy_id,
            claim_nb: claim_nb as u32,
            exposure,
            area: self.area,
            veh_power: finite(row, "VehPower", self.veh_power)?,
            veh_age: finite(row, "VehAge", self.veh_age)?,
            driv_age: finite(row, "DrivAge", self.driv_age)?,
            bonus_malus: finite(row, "BonusMalus", self.bonus_malus)?,
            veh_brand: self.veh_brand,
            veh_gas: self.veh_gas,
            density: finite(row, "Density", self.density)?,
            region: self.region,
            claim_amount,
            pure_premium,
            predicted_premium: finite(row, "Pred_GLMs", self.predicted_premium)?,
            data_major: self.data_major,
        })
    }
}

fn finite(row: u64, column: &'static str, value: f64) -> Result<f64, DatasetError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DatasetError::InvalidValue {
            row,
            column,
            reason: "value must be a finite number".to_string(),
        })
    }
}

fn non_negative(row: u64, column: &'static str, value: f64) -> Result<f64, DatasetError> {
    let value = finite(row, column, value)?;
    if value < 0.0 {
        return Err(DatasetError::InvalidValue {
            row,
            column,
            reason: format!("{value} is negative"),
        });
    }
    Ok(value)
}
