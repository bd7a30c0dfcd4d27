//! Historical salary records and CSV loading
//!
//! Reads the salary table, checks that every schema column is present,
//! and drops rows whose salary is missing, negative, or above the
//! configured ceiling (800,000 USD by default).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::{CoreError, Result};
use crate::fingerprint::content_hash_hex;
use crate::schema::{self, REMOTE_RATIOS, REQUIRED_COLUMNS};

/// Default upper bound for salary_in_usd
pub const DEFAULT_MAX_SALARY: f64 = 800_000.0;

/// One historical salary observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub work_year: i32,
    pub experience_level: String,
    pub employment_type: String,
    pub job_title: String,
    pub employee_residence: String,
    pub company_location: String,
    pub company_size: String,
    pub remote_ratio: u8,
    pub salary_in_usd: f64,
}

impl Record {
    /// Value of a categorical schema column
    pub fn categorical(&self, feature: &str) -> Option<&str> {
        match feature {
            schema::EXPERIENCE_LEVEL => Some(&self.experience_level),
            schema::EMPLOYMENT_TYPE => Some(&self.employment_type),
            schema::JOB_TITLE => Some(&self.job_title),
            schema::COMPANY_LOCATION => Some(&self.company_location),
            schema::COMPANY_SIZE => Some(&self.company_size),
            schema::EMPLOYEE_RESIDENCE => Some(&self.employee_residence),
            _ => None,
        }
    }

    /// Value of a numeric schema column
    pub fn numeric(&self, feature: &str) -> Option<f64> {
        match feature {
            schema::WORK_YEAR => Some(self.work_year as f64),
            schema::REMOTE_RATIO => Some(self.remote_ratio as f64),
            schema::TARGET_COLUMN => Some(self.salary_in_usd),
            _ => None,
        }
    }
}

/// Row as it appears in the CSV; salary is coerced separately
#[derive(Debug, Deserialize)]
struct RawRecord {
    work_year: i32,
    experience_level: String,
    employment_type: String,
    job_title: String,
    employee_residence: String,
    company_location: String,
    company_size: String,
    remote_ratio: u8,
    salary_in_usd: String,
}

impl RawRecord {
    fn check_remote_ratio(&self, line: u64) -> Result<()> {
        if REMOTE_RATIOS.contains(&self.remote_ratio) {
            return Ok(());
        }
        Err(CoreError::InvalidValue {
            column: schema::REMOTE_RATIO.to_string(),
            line,
            message: format!(
                "expected one of {:?}, got {}",
                REMOTE_RATIOS, self.remote_ratio
            ),
        })
    }

    fn into_record(self) -> Option<Record> {
        let salary = self.salary_in_usd.trim().parse::<f64>().ok()?;
        Some(Record {
            work_year: self.work_year,
            experience_level: self.experience_level,
            employment_type: self.employment_type,
            job_title: self.job_title,
            employee_residence: self.employee_residence,
            company_location: self.company_location,
            company_size: self.company_size,
            remote_ratio: self.remote_ratio,
            salary_in_usd: salary,
        })
    }
}

/// Cleaned, immutable set of historical records
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SalaryDataset {
    records: Vec<Record>,
}

impl SalaryDataset {
    /// Load a dataset from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P, max_salary: f64) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading salary records from: {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, max_salary)
    }

    /// Load a dataset from any CSV source with a header row
    pub fn from_reader<R: Read>(reader: R, max_salary: f64) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(CoreError::MissingColumn(column.to_string()));
            }
        }

        let mut raw_rows = 0usize;
        let mut records = Vec::new();
        let mut row = csv::StringRecord::new();
        while rdr.read_record(&mut row)? {
            let line = row.position().map_or(0, |p| p.line());
            let raw: RawRecord = row
                .deserialize(Some(&headers))
                .map_err(|err| schema_error(err, &headers, line))?;
            raw.check_remote_ratio(line)?;
            raw_rows += 1;
            if let Some(record) = raw.into_record() {
                records.push(record);
            }
        }

        let dataset = Self::filtered(records, max_salary);
        info!(
            "Loaded {} records ({} dropped by salary coercion or ceiling)",
            dataset.len(),
            raw_rows - dataset.len()
        );
        Ok(dataset)
    }

    /// Build a dataset from in-memory records, applying the salary filter
    pub fn from_records(records: Vec<Record>, max_salary: f64) -> Self {
        Self::filtered(records, max_salary)
    }

    fn filtered(records: Vec<Record>, max_salary: f64) -> Self {
        let before = records.len();
        let records: Vec<Record> = records
            .into_iter()
            .filter(|r| {
                r.salary_in_usd.is_finite() && r.salary_in_usd >= 0.0 && r.salary_in_usd <= max_salary
            })
            .collect();
        if records.len() < before {
            debug!(
                "Dropped {} records outside [0, {}]",
                before - records.len(),
                max_salary
            );
        }
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Get number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Content key of the dataset; equal records give equal keys
    pub fn fingerprint(&self) -> Result<String> {
        content_hash_hex(&self.records)
    }

    /// Sorted distinct values of a categorical column
    pub fn distinct(&self, feature: &str) -> Vec<String> {
        let values: BTreeSet<&str> = self
            .records
            .iter()
            .filter_map(|r| r.categorical(feature))
            .collect();
        values.into_iter().map(str::to_string).collect()
    }

    /// Sorted distinct work years
    pub fn years(&self) -> Vec<i32> {
        distinct_years(&self.records)
    }
}

pub(crate) fn distinct_years(records: &[Record]) -> Vec<i32> {
    let years: BTreeSet<i32> = records.iter().map(|r| r.work_year).collect();
    years.into_iter().collect()
}

fn schema_error(err: csv::Error, headers: &csv::StringRecord, line: u64) -> CoreError {
    let detail = match err.kind() {
        csv::ErrorKind::Deserialize { err: de, .. } => {
            let column = de
                .field()
                .and_then(|idx| headers.get(idx as usize))
                .unwrap_or("unknown")
                .to_string();
            Some((column, de.kind().to_string()))
        }
        _ => None,
    };

    match detail {
        Some((column, message)) => CoreError::InvalidValue {
            column,
            line,
            message,
        },
        None => CoreError::Csv(err),
    }
}
