//! Categorical feature encoding
//!
//! Each categorical column gets a dense code table built from the values
//! seen at training time. Values are sorted before numbering, so the same
//! training data always yields the same codes. Tables never grow after
//! fitting: an unseen value at inference time is an error.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::dataset::{distinct_years, Record, SalaryDataset};
use crate::errors::{CoreError, Result};
use crate::schema::{categorical_features, FeatureKind, FEATURE_COUNT, FEATURE_SCHEMA};

/// Anything that can supply one value per schema column
pub trait FeatureSource {
    fn categorical(&self, feature: &str) -> Option<&str>;
    fn numeric(&self, feature: &str) -> Option<f64>;
}

impl FeatureSource for Record {
    fn categorical(&self, feature: &str) -> Option<&str> {
        Record::categorical(self, feature)
    }

    fn numeric(&self, feature: &str) -> Option<f64> {
        Record::numeric(self, feature)
    }
}

/// Bidirectional value <-> code mapping for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCodes {
    /// Sorted distinct values; a value's code is its index
    values: Vec<String>,
}

impl CategoryCodes {
    fn from_values<'a, I: IntoIterator<Item = &'a str>>(values: I) -> Self {
        let sorted: BTreeSet<&str> = values.into_iter().collect();
        Self {
            values: sorted.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn encode(&self, value: &str) -> Option<u32> {
        self.values
            .binary_search_by(|v| v.as_str().cmp(value))
            .ok()
            .map(|idx| idx as u32)
    }

    pub fn decode(&self, code: u32) -> Option<&str> {
        self.values.get(code as usize).map(String::as_str)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Code tables for every categorical column of the schema, plus the
/// work years seen in training
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderTable {
    tables: BTreeMap<String, CategoryCodes>,
    years: Vec<i32>,
}

impl EncoderTable {
    /// Build code tables from the given records
    pub fn fit(records: &[Record]) -> Self {
        let tables = categorical_features()
            .map(|spec| {
                let codes =
                    CategoryCodes::from_values(records.iter().filter_map(|r| r.categorical(spec.name)));
                debug!("Encoded {} with {} categories", spec.name, codes.len());
                (spec.name.to_string(), codes)
            })
            .collect();
        let years = distinct_years(records);
        debug!("Training covers work years {:?}", years);
        Self { tables, years }
    }

    /// Sorted distinct work years of the training records
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Reject a work year that never occurred in training
    pub fn check_year(&self, year: i32) -> Result<()> {
        if self.years.binary_search(&year).is_err() {
            return Err(CoreError::InvalidRequest(format!(
                "work_year must be one of {:?}, got {}",
                self.years, year
            )));
        }
        Ok(())
    }

    pub fn codes(&self, feature: &str) -> Option<&CategoryCodes> {
        self.tables.get(feature)
    }

    /// Code for a value, or an unknown-category error naming both
    pub fn encode(&self, feature: &str, value: &str) -> Result<u32> {
        self.tables
            .get(feature)
            .and_then(|codes| codes.encode(value))
            .ok_or_else(|| CoreError::UnknownCategory {
                feature: feature.to_string(),
                value: value.to_string(),
            })
    }

    pub fn decode(&self, feature: &str, code: u32) -> Option<&str> {
        self.tables.get(feature).and_then(|codes| codes.decode(code))
    }

    /// Assemble one feature vector in schema order
    pub fn encode_row<S: FeatureSource + ?Sized>(&self, source: &S) -> Result<Vec<f64>> {
        let mut row = Vec::with_capacity(FEATURE_COUNT);
        for spec in FEATURE_SCHEMA.iter() {
            let value = match spec.kind {
                FeatureKind::Categorical => {
                    let raw = source.categorical(spec.name).ok_or_else(|| {
                        CoreError::InvalidRequest(format!("missing value for {}", spec.name))
                    })?;
                    self.encode(spec.name, raw)? as f64
                }
                FeatureKind::Numeric => source.numeric(spec.name).ok_or_else(|| {
                    CoreError::InvalidRequest(format!("missing value for {}", spec.name))
                })?,
            };
            row.push(value);
        }
        Ok(row)
    }
}

/// Numeric feature matrix and target vector
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedDataset {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl EncodedDataset {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Fit the encoder table on the whole dataset and encode every record
pub fn encode_dataset(dataset: &SalaryDataset) -> Result<(EncoderTable, EncodedDataset)> {
    if dataset.is_empty() {
        return Err(CoreError::EmptyDataset);
    }

    let table = EncoderTable::fit(dataset.records());
    let features = dataset
        .records()
        .iter()
        .map(|record| table.encode_row(record))
        .collect::<Result<Vec<_>>>()?;
    let targets = dataset.records().iter().map(|r| r.salary_in_usd).collect();

    Ok((table, EncodedDataset { features, targets }))
}
