//! Immutable, columnar in-memory table of policy records.
//!
//! Categorical columns are interned into closed vocabularies when the table
//! is built, so every stored code maps to exactly one label. Filtering and
//! aggregation only ever read from a [`Dataset`]; derived row sets are index
//! lists over it (see [`crate::analytics::filter::FilteredView`]).

mod loader;
mod vocabulary;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use super::domain::{AgeBand, Dimension, NumericField};

pub use loader::{DatasetError, DatasetLoader};
pub use vocabulary::Vocabulary;

static DATASET_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Identity of a loaded dataset; pivot results cached against one version are
/// never served for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetVersion {
    pub id: u64,
    pub loaded_at: DateTime<Utc>,
}

impl DatasetVersion {
    fn next() -> Self {
        Self {
            id: DATASET_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            loaded_at: Utc::now(),
        }
    }
}

/// One policy row, in source column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    #[serde(rename = "IDpol")]
    pub policy_id: u64,
    #[serde(rename = "ClaimNb")]
    pub claim_nb: u32,
    #[serde(rename = "Exposure")]
    pub exposure: f64,
    #[serde(rename = "Area")]
    pub area: String,
    #[serde(rename = "VehPower")]
    pub veh_power: f64,
    #[serde(rename = "VehAge")]
    pub veh_age: f64,
    #[serde(rename = "DrivAge")]
    pub driv_age: f64,
    #[serde(rename = "BonusMalus")]
    pub bonus_malus: f64,
    #[serde(rename = "VehBrand")]
    pub veh_brand: String,
    #[serde(rename = "VehGas")]
    pub veh_gas: String,
    #[serde(rename = "Density")]
    pub density: f64,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "ClaimAmount")]
    pub claim_amount: f64,
    #[serde(rename = "PurePremium")]
    pub pure_premium: f64,
    #[serde(rename = "Pred_GLMs")]
    pub predicted_premium: f64,
    #[serde(rename = "DataMajor")]
    pub data_major: String,
}

impl PolicyRecord {
    /// Number of source columns carried by a record.
    pub const COLUMN_COUNT: usize = 16;

    fn label(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Region => &self.region,
            Dimension::Area => &self.area,
            Dimension::VehBrand => &self.veh_brand,
            Dimension::VehGas => &self.veh_gas,
            Dimension::DataMajor => &self.data_major,
            Dimension::AgeBand => AgeBand::from_age(self.driv_age).label(),
        }
    }

    fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::Exposure => self.exposure,
            NumericField::ClaimNb => f64::from(self.claim_nb),
            NumericField::ClaimAmount => self.claim_amount,
            NumericField::PurePremium => self.pure_premium,
            NumericField::PredGlm => self.predicted_premium,
            NumericField::DrivAge => self.driv_age,
            NumericField::VehAge => self.veh_age,
            NumericField::VehPower => self.veh_power,
            NumericField::BonusMalus => self.bonus_malus,
            NumericField::Density => self.density,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CategoricalColumn {
    vocabulary: Vocabulary,
    codes: Vec<u32>,
}

impl CategoricalColumn {
    pub(crate) fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub(crate) fn codes(&self) -> &[u32] {
        &self.codes
    }
}

/// The full policy table. Immutable once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    version: DatasetVersion,
    policy_ids: Vec<u64>,
    numeric: Vec<Vec<f64>>,
    categorical: Vec<CategoricalColumn>,
}

impl Dataset {
    pub fn from_records(records: Vec<PolicyRecord>) -> Self {
        let mut builder = DatasetBuilder::with_capacity(records.len());
        for record in records {
            builder.push(record);
        }
        builder.build()
    }

    pub fn version(&self) -> DatasetVersion {
        self.version
    }

    pub fn len(&self) -> usize {
        self.policy_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policy_ids.is_empty()
    }

    pub fn numeric(&self, field: NumericField) -> &[f64] {
        &self.numeric[field.index()]
    }

    pub fn value(&self, field: NumericField, row: usize) -> f64 {
        self.numeric[field.index()][row]
    }

    pub fn vocabulary(&self, dimension: Dimension) -> &Vocabulary {
        self.categorical[dimension.index()].vocabulary()
    }

    pub(crate) fn column(&self, dimension: Dimension) -> &CategoricalColumn {
        &self.categorical[dimension.index()]
    }

    pub fn code(&self, dimension: Dimension, row: usize) -> u32 {
        self.categorical[dimension.index()].codes[row]
    }

    pub fn label(&self, dimension: Dimension, row: usize) -> &str {
        let column = &self.categorical[dimension.index()];
        column.vocabulary.label(column.codes[row]).unwrap_or_default()
    }

    /// Observed `(min, max)` of a numeric column, `None` for an empty table.
    pub fn numeric_bounds(&self, field: NumericField) -> Option<(f64, f64)> {
        self.numeric(field)
            .iter()
            .copied()
            .filter(|value| value.is_finite())
            .fold(None, |bounds, value| match bounds {
                None => Some((value, value)),
                Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
            })
    }

    /// Rebuilds the source row at `row`.
    pub fn record(&self, row: usize) -> PolicyRecord {
        PolicyRecord {
            policy_id: self.policy_ids[row],
            claim_nb: self.value(NumericField::ClaimNb, row) as u32,
            exposure: self.value(NumericField::Exposure, row),
            area: self.label(Dimension::Area, row).to_string(),
            veh_power: self.value(NumericField::VehPower, row),
            veh_age: self.value(NumericField::VehAge, row),
            driv_age: self.value(NumericField::DrivAge, row),
            bonus_malus: self.value(NumericField::BonusMalus, row),
            veh_brand: self.label(Dimension::VehBrand, row).to_string(),
            veh_gas: self.label(Dimension::VehGas, row).to_string(),
            density: self.value(NumericField::Density, row),
            region: self.label(Dimension::Region, row).to_string(),
            claim_amount: self.value(NumericField::ClaimAmount, row),
            pure_premium: self.value(NumericField::PurePremium, row),
            predicted_premium: self.value(NumericField::PredGlm, row),
            data_major: self.label(Dimension::DataMajor, row).to_string(),
        }
    }
}

/// Accumulates records and interns categorical labels into sorted vocabularies.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    records: Vec<PolicyRecord>,
}

impl DatasetBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: PolicyRecord) -> &mut Self {
        self.records.push(record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn build(self) -> Dataset {
        let categorical = Dimension::ordered()
            .into_iter()
            .map(|dimension| self.intern(dimension))
            .collect();

        let numeric = NumericField::ordered()
            .into_iter()
            .map(|field| {
                self.records
                    .iter()
                    .map(|record| record.numeric(field))
                    .collect()
            })
            .collect();

        let policy_ids = self
            .records
            .iter()
            .map(|record| record.policy_id)
            .collect();

        Dataset {
            version: DatasetVersion::next(),
            policy_ids,
            numeric,
            categorical,
        }
    }

    fn intern(&self, dimension: Dimension) -> CategoricalColumn {
        let vocabulary = if dimension == Dimension::AgeBand {
            Vocabulary::new(AgeBand::ordered().into_iter().map(AgeBand::label))
        } else {
            let labels: BTreeSet<&str> = self
                .records
                .iter()
                .map(|record| record.label(dimension))
                .collect();
            Vocabulary::new(labels)
        };

        let codes = self
            .records
            .iter()
            .filter_map(|record| vocabulary.code(record.label(dimension)))
            .collect();

        CategoricalColumn { vocabulary, codes }
    }
}
