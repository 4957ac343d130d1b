use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::request::RequestError;

/// Categorical columns the dashboard can filter and group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dimension {
    Region,
    Area,
    VehBrand,
    VehGas,
    DataMajor,
    AgeBand,
}

impl Dimension {
    pub const COUNT: usize = 6;

    pub const fn ordered() -> [Self; Self::COUNT] {
        [
            Self::Region,
            Self::Area,
            Self::VehBrand,
            Self::VehGas,
            Self::DataMajor,
            Self::AgeBand,
        ]
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Region => 0,
            Self::Area => 1,
            Self::VehBrand => 2,
            Self::VehGas => 3,
            Self::DataMajor => 4,
            Self::AgeBand => 5,
        }
    }

    pub const fn column_name(self) -> &'static str {
        match self {
            Self::Region => "Region",
            Self::Area => "Area",
            Self::VehBrand => "VehBrand",
            Self::VehGas => "VehGas",
            Self::DataMajor => "DataMajor",
            Self::AgeBand => "AgeBand",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Region => "Region",
            Self::Area => "Area",
            Self::VehBrand => "Vehicle Brand",
            Self::VehGas => "Fuel Type",
            Self::DataMajor => "Data Split",
            Self::AgeBand => "Driver Age Band",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Dimension {
    type Err = RequestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_identifier(value);
        Self::ordered()
            .into_iter()
            .find(|dimension| normalize_identifier(dimension.column_name()) == wanted)
            .or(match wanted.as_str() {
                "agegroup" => Some(Self::AgeBand),
                "split" => Some(Self::DataMajor),
                "fuel" | "vehgasoline" => Some(Self::VehGas),
                "brand" => Some(Self::VehBrand),
                _ => None,
            })
            .ok_or_else(|| RequestError::UnknownDimension(value.trim().to_string()))
    }
}

impl TryFrom<String> for Dimension {
    type Error = RequestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dimension> for String {
    fn from(value: Dimension) -> Self {
        value.column_name().to_string()
    }
}

/// Numeric columns held by the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NumericField {
    Exposure,
    ClaimNb,
    ClaimAmount,
    PurePremium,
    PredGlm,
    DrivAge,
    VehAge,
    VehPower,
    BonusMalus,
    Density,
}

impl NumericField {
    pub const COUNT: usize = 10;

    pub const fn ordered() -> [Self; Self::COUNT] {
        [
            Self::Exposure,
            Self::ClaimNb,
            Self::ClaimAmount,
            Self::PurePremium,
            Self::PredGlm,
            Self::DrivAge,
            Self::VehAge,
            Self::VehPower,
            Self::BonusMalus,
            Self::Density,
        ]
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Exposure => 0,
            Self::ClaimNb => 1,
            Self::ClaimAmount => 2,
            Self::PurePremium => 3,
            Self::PredGlm => 4,
            Self::DrivAge => 5,
            Self::VehAge => 6,
            Self::VehPower => 7,
            Self::BonusMalus => 8,
            Self::Density => 9,
        }
    }

    pub const fn column_name(self) -> &'static str {
        match self {
            Self::Exposure => "Exposure",
            Self::ClaimNb => "ClaimNb",
            Self::ClaimAmount => "ClaimAmount",
            Self::PurePremium => "PurePremium",
            Self::PredGlm => "Pred_GLMs",
            Self::DrivAge => "DrivAge",
            Self::VehAge => "VehAge",
            Self::VehPower => "VehPower",
            Self::BonusMalus => "BonusMalus",
            Self::Density => "Density",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Exposure => "Exposure (years)",
            Self::ClaimNb => "Claim Count",
            Self::ClaimAmount => "Claim Amount",
            Self::PurePremium => "Observed Pure Premium",
            Self::PredGlm => "Predicted Premium",
            Self::DrivAge => "Driver Age",
            Self::VehAge => "Vehicle Age",
            Self::VehPower => "Vehicle Power",
            Self::BonusMalus => "Bonus-Malus",
            Self::Density => "Population Density",
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for NumericField {
    type Err = RequestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_identifier(value);
        Self::ordered()
            .into_iter()
            .find(|field| normalize_identifier(field.column_name()) == wanted)
            .or(match wanted.as_str() {
                "predglm" | "predictedpremium" => Some(Self::PredGlm),
                "age" | "driverage" => Some(Self::DrivAge),
                "power" | "vehiclepower" => Some(Self::VehPower),
                _ => None,
            })
            .ok_or_else(|| RequestError::UnknownField(value.trim().to_string()))
    }
}

impl TryFrom<String> for NumericField {
    type Error = RequestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NumericField> for String {
    fn from(value: NumericField) -> Self {
        value.column_name().to_string()
    }
}

/// Fixed driver-age bands. Bounds are right-closed: 25 falls in `<25`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBand {
    Under25,
    From25To35,
    From35To45,
    From45To55,
    From55To65,
    Over65,
}

impl AgeBand {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Under25,
            Self::From25To35,
            Self::From35To45,
            Self::From45To55,
            Self::From55To65,
            Self::Over65,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Under25 => "<25",
            Self::From25To35 => "25-35",
            Self::From35To45 => "35-45",
            Self::From45To55 => "45-55",
            Self::From55To65 => "55-65",
            Self::Over65 => "65+",
        }
    }

    pub fn from_age(age: f64) -> Self {
        if age <= 25.0 {
            Self::Under25
        } else if age <= 35.0 {
            Self::From25To35
        } else if age <= 45.0 {
            Self::From35To45
        } else if age <= 55.0 {
            Self::From45To55
        } else if age <= 65.0 {
            Self::From55To65
        } else {
            Self::Over65
        }
    }
}

fn normalize_identifier(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}
