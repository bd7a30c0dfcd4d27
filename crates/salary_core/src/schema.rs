//! Ordered feature schema shared by encoding, training and inference
//!
//! Column order here is the column order of every feature vector the
//! crate produces. Encoder, trainers and predictor all iterate this list.

use serde::{Deserialize, Serialize};

/// How a feature column is turned into a number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// String column mapped through the encoder table
    Categorical,
    /// Integer column passed through unchanged
    Numeric,
}

/// One schema entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub kind: FeatureKind,
}

impl FeatureSpec {
    const fn categorical(name: &'static str) -> Self {
        Self {
            name,
            kind: FeatureKind::Categorical,
        }
    }

    const fn numeric(name: &'static str) -> Self {
        Self {
            name,
            kind: FeatureKind::Numeric,
        }
    }

    pub fn is_categorical(&self) -> bool {
        self.kind == FeatureKind::Categorical
    }
}

pub const WORK_YEAR: &str = "work_year";
pub const EXPERIENCE_LEVEL: &str = "experience_level";
pub const EMPLOYMENT_TYPE: &str = "employment_type";
pub const JOB_TITLE: &str = "job_title";
pub const EMPLOYEE_RESIDENCE: &str = "employee_residence";
pub const COMPANY_LOCATION: &str = "company_location";
pub const COMPANY_SIZE: &str = "company_size";
pub const REMOTE_RATIO: &str = "remote_ratio";

/// Target column
pub const TARGET_COLUMN: &str = "salary_in_usd";

/// Model input columns, in vector order
pub const FEATURE_SCHEMA: [FeatureSpec; 7] = [
    FeatureSpec::numeric(WORK_YEAR),
    FeatureSpec::categorical(EXPERIENCE_LEVEL),
    FeatureSpec::categorical(EMPLOYMENT_TYPE),
    FeatureSpec::categorical(JOB_TITLE),
    FeatureSpec::categorical(COMPANY_LOCATION),
    FeatureSpec::categorical(COMPANY_SIZE),
    FeatureSpec::numeric(REMOTE_RATIO),
];

/// Number of columns in a feature vector
pub const FEATURE_COUNT: usize = FEATURE_SCHEMA.len();

/// Columns an input table must carry
pub const REQUIRED_COLUMNS: [&str; 9] = [
    WORK_YEAR,
    EXPERIENCE_LEVEL,
    EMPLOYMENT_TYPE,
    JOB_TITLE,
    EMPLOYEE_RESIDENCE,
    REMOTE_RATIO,
    COMPANY_LOCATION,
    COMPANY_SIZE,
    TARGET_COLUMN,
];

/// Accepted remote_ratio values
pub const REMOTE_RATIOS: [u8; 3] = [0, 50, 100];

/// Feature names in vector order
pub fn feature_names() -> Vec<&'static str> {
    FEATURE_SCHEMA.iter().map(|spec| spec.name).collect()
}

/// Position of a feature in the vector
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_SCHEMA.iter().position(|spec| spec.name == name)
}

/// Categorical features, in vector order
pub fn categorical_features() -> impl Iterator<Item = &'static FeatureSpec> {
    FEATURE_SCHEMA.iter().filter(|spec| spec.is_categorical())
}
