use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::dataset::{CategoricalColumn, Dataset};
use super::domain::{Dimension, NumericField};
use super::request::RequestError;

/// Label that switches a categorical constraint off.
pub const ALL_SENTINEL: &str = "All";

/// Which labels of one categorical column are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalSelection {
    Any,
    Exact(String),
    OneOf(BTreeSet<String>),
}

impl CategoricalSelection {
    /// Mirrors a multi-select widget: any `All` entry disables the constraint,
    /// a single label is an exact match, and an empty selection keeps nothing.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        if labels.contains(ALL_SENTINEL) {
            return Self::Any;
        }
        if labels.len() == 1 {
            if let Some(label) = labels.into_iter().next() {
                return Self::Exact(label);
            }
            return Self::OneOf(BTreeSet::new());
        }
        Self::OneOf(labels)
    }

    fn resolve(&self, column: &CategoricalColumn) -> Option<Vec<bool>> {
        let vocabulary = column.vocabulary();
        let mut allowed = vec![false; vocabulary.len()];
        let labels: Box<dyn Iterator<Item = &String>> = match self {
            Self::Any => return None,
            Self::Exact(label) if label == ALL_SENTINEL => return None,
            Self::Exact(label) => Box::new(std::iter::once(label)),
            Self::OneOf(labels) if labels.contains(ALL_SENTINEL) => return None,
            Self::OneOf(labels) => Box::new(labels.iter()),
        };
        for code in labels.filter_map(|label| vocabulary.code(label)) {
            allowed[code as usize] = true;
        }
        Some(allowed)
    }
}

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeConstraint {
    pub lo: f64,
    pub hi: f64,
}

impl RangeConstraint {
    pub fn new(lo: f64, hi: f64) -> Result<Self, RequestError> {
        if lo > hi || lo.is_nan() || hi.is_nan() {
            return Err(RequestError::InvalidRange { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    /// Parses `MIN..MAX`; either side may be omitted (`..60`, `18..`).
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let malformed = || RequestError::MalformedRange(raw.to_string());
        let (lo, hi) = raw.trim().split_once("..").ok_or_else(malformed)?;
        let bound = |value: &str, open: f64| -> Result<f64, RequestError> {
            let value = value.trim();
            if value.is_empty() {
                Ok(open)
            } else {
                value.parse::<f64>().map_err(|_| malformed())
            }
        };
        Self::new(bound(lo, f64::NEG_INFINITY)?, bound(hi, f64::INFINITY)?)
    }

    /// Narrows the range to the observed `(min, max)` of a column.
    pub fn clamped_to(self, bounds: (f64, f64)) -> Self {
        let (min, max) = bounds;
        Self {
            lo: self.lo.max(min),
            hi: self.hi.min(max),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalConstraint {
    pub dimension: Dimension,
    pub selection: CategoricalSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericConstraint {
    pub field: NumericField,
    #[serde(flatten)]
    pub range: RangeConstraint,
}

/// Conjunction of per-column constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categorical: Vec<CategoricalConstraint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<NumericConstraint>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection(mut self, dimension: Dimension, selection: CategoricalSelection) -> Self {
        self.categorical.push(CategoricalConstraint {
            dimension,
            selection,
        });
        self
    }

    pub fn with_labels<I, S>(self, dimension: Dimension, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_selection(dimension, CategoricalSelection::from_labels(labels))
    }

    pub fn with_range(mut self, field: NumericField, range: RangeConstraint) -> Self {
        self.ranges.push(NumericConstraint { field, range });
        self
    }

    /// Both filters must hold.
    pub fn and(mut self, other: FilterSpec) -> Self {
        self.categorical.extend(other.categorical);
        self.ranges.extend(other.ranges);
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.categorical
            .iter()
            .all(|constraint| constraint.selection == CategoricalSelection::Any)
            && self.ranges.is_empty()
    }

    pub fn apply<'a>(&self, dataset: &'a Dataset) -> FilteredView<'a> {
        FilteredView::all(dataset).refine(self)
    }

    fn compile<'a>(&self, dataset: &'a Dataset) -> CompiledFilter<'a> {
        let categorical = self
            .categorical
            .iter()
            .filter_map(|constraint| {
                let column = dataset.column(constraint.dimension);
                constraint
                    .selection
                    .resolve(column)
                    .map(|allowed| (column.codes(), allowed))
            })
            .collect();

        let ranges = self
            .ranges
            .iter()
            .map(|constraint| (dataset.numeric(constraint.field), constraint.range))
            .collect();

        CompiledFilter {
            categorical,
            ranges,
        }
    }
}

struct CompiledFilter<'a> {
    categorical: Vec<(&'a [u32], Vec<bool>)>,
    ranges: Vec<(&'a [f64], RangeConstraint)>,
}

impl CompiledFilter<'_> {
    fn matches(&self, row: usize) -> bool {
        self.categorical
            .iter()
            .all(|(codes, allowed)| allowed[codes[row] as usize])
            && self
                .ranges
                .iter()
                .all(|(values, range)| range.contains(values[row]))
    }
}

/// Row subset of a [`Dataset`], kept as ascending row indices.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    rows: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    pub fn all(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            rows: (0..dataset.len()).collect(),
        }
    }

    /// Applies a further filter to this view.
    pub fn refine(&self, spec: &FilterSpec) -> FilteredView<'a> {
        let compiled = spec.compile(self.dataset);
        let rows = self
            .rows
            .iter()
            .copied()
            .filter(|&row| compiled.matches(row))
            .collect();

        FilteredView {
            dataset: self.dataset,
            rows,
        }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn values(&self, field: NumericField) -> impl Iterator<Item = f64> + '_ {
        let column = self.dataset.numeric(field);
        self.rows.iter().map(move |&row| column[row])
    }
}
