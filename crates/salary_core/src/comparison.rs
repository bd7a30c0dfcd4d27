//! Market comparison against historical records
//!
//! Records are comparable when experience level, job title and company
//! location all match the request exactly.

use serde::{Deserialize, Serialize};

use crate::dataset::Record;
use crate::predictor::PredictionRequest;

/// Descriptive statistics of a salary sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalarySummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; 0 for a single record
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p25: f64,
    pub p75: f64,
    pub iqr: f64,
}

impl SalarySummary {
    pub fn from_salaries(salaries: &[f64]) -> Option<Self> {
        if salaries.is_empty() {
            return None;
        }

        let mut sorted = salaries.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let std_dev = if sorted.len() > 1 {
            let ss: f64 = sorted.iter().map(|s| (s - mean) * (s - mean)).sum();
            (ss / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let p25 = quantile_sorted(&sorted, 0.25);
        let p75 = quantile_sorted(&sorted, 0.75);

        Some(Self {
            count: sorted.len(),
            mean,
            median: quantile_sorted(&sorted, 0.5),
            std_dev,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p25,
            p75,
            iqr: p75 - p25,
        })
    }
}

/// Quantile of an ascending, non-empty slice with linear interpolation
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Share of salaries strictly below `predicted`, in [0, 100].
///
/// `None` for an empty sample.
pub fn percentile_rank(salaries: &[f64], predicted: f64) -> Option<f64> {
    if salaries.is_empty() {
        return None;
    }
    let below = salaries.iter().filter(|&&s| s < predicted).count();
    Some(below as f64 / salaries.len() as f64 * 100.0)
}

/// Statistics of the comparable records
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketComparison {
    pub mean_salary: f64,
    pub percentile: f64,
    pub sample_count: usize,
    pub summary: SalarySummary,
}

/// Outcome of a market comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Comparable(MarketComparison),
    /// No historical record shares the request's profile
    NoComparableData,
}

impl ComparisonOutcome {
    pub fn comparison(&self) -> Option<&MarketComparison> {
        match self {
            ComparisonOutcome::Comparable(c) => Some(c),
            ComparisonOutcome::NoComparableData => None,
        }
    }
}

/// Whether a record shares the request's comparison profile
pub fn is_comparable(record: &Record, request: &PredictionRequest) -> bool {
    record.experience_level == request.experience_level
        && record.job_title == request.job_title
        && record.company_location == request.company_location
}

/// Compare a predicted salary with the matching historical records
pub fn compare_to_market(
    records: &[Record],
    request: &PredictionRequest,
    predicted: f64,
) -> ComparisonOutcome {
    let salaries: Vec<f64> = records
        .iter()
        .filter(|r| is_comparable(r, request))
        .map(|r| r.salary_in_usd)
        .collect();

    match (
        SalarySummary::from_salaries(&salaries),
        percentile_rank(&salaries, predicted),
    ) {
        (Some(summary), Some(percentile)) => ComparisonOutcome::Comparable(MarketComparison {
            mean_salary: summary.mean,
            percentile,
            sample_count: summary.count,
            summary,
        }),
        _ => ComparisonOutcome::NoComparableData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelKind;
    use proptest::prelude::*;

    fn record(exp: &str, job: &str, loc: &str, salary: f64) -> Record {
        Record {
            work_year: 2023,
            experience_level: exp.to_string(),
            employment_type: "FT".to_string(),
            job_title: job.to_string(),
            employee_residence: loc.to_string(),
            company_location: loc.to_string(),
            company_size: "M".to_string(),
            remote_ratio: 0,
            salary_in_usd: salary,
        }
    }

    fn request(exp: &str, job: &str, loc: &str) -> PredictionRequest {
        PredictionRequest {
            work_year: 2023,
            experience_level: exp.to_string(),
            employment_type: "FT".to_string(),
            job_title: job.to_string(),
            company_location: loc.to_string(),
            company_size: "L".to_string(),
            remote_ratio: 100,
            model: ModelKind::LinearRegression,
        }
    }

    #[test]
    fn test_comparison_filters_on_profile() {
        let records = vec![
            record("EN", "Data Analyst", "US", 70_000.0),
            record("EN", "Data Analyst", "US", 75_000.0),
            record("EN", "Data Analyst", "US", 80_000.0),
            record("SE", "Data Analyst", "US", 150_000.0),
            record("EN", "Data Analyst", "GB", 40_000.0),
        ];
        let outcome = compare_to_market(&records, &request("EN", "Data Analyst", "US"), 76_000.0);
        let cmp = outcome.comparison().unwrap();

        assert_eq!(cmp.mean_salary, 75_000.0);
        assert_eq!(cmp.sample_count, 3);
        assert!((cmp.percentile - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(cmp.summary.min, 70_000.0);
        assert_eq!(cmp.summary.max, 80_000.0);
    }

    #[test]
    fn test_no_comparable_data() {
        let records = vec![record("EN", "Data Analyst", "US", 70_000.0)];
        let outcome = compare_to_market(&records, &request("EX", "Data Analyst", "US"), 1.0);
        assert_eq!(outcome, ComparisonOutcome::NoComparableData);
        assert_eq!(percentile_rank(&[], 10.0), None);
    }

    #[test]
    fn test_percentile_uses_strict_inequality() {
        assert_eq!(percentile_rank(&[10.0, 20.0, 30.0, 40.0], 20.0), Some(25.0));
        assert_eq!(percentile_rank(&[10.0, 20.0], 5.0), Some(0.0));
        assert_eq!(percentile_rank(&[10.0, 20.0], 50.0), Some(100.0));
    }

    #[test]
    fn test_summary_statistics() {
        let summary = SalarySummary::from_salaries(&[40.0, 10.0, 30.0, 20.0]).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 25.0);
        assert_eq!(summary.median, 25.0);
        assert_eq!(summary.p25, 17.5);
        assert_eq!(summary.p75, 32.5);
        assert_eq!(summary.iqr, 15.0);
        assert!((summary.std_dev - (500.0f64 / 3.0).sqrt()).abs() < 1e-12);

        let single = SalarySummary::from_salaries(&[5.0]).unwrap();
        assert_eq!(single.std_dev, 0.0);
        assert_eq!(single.median, 5.0);
        assert!(SalarySummary::from_salaries(&[]).is_none());
    }

    proptest! {
        #[test]
        fn percentile_matches_definition(
            salaries in prop::collection::vec(0.0f64..800_000.0, 1..50),
            predicted in 0.0f64..900_000.0,
        ) {
            let expected = salaries.iter().filter(|&&s| s < predicted).count() as f64
                / salaries.len() as f64 * 100.0;
            let actual = percentile_rank(&salaries, predicted).unwrap();
            prop_assert_eq!(actual, expected);
            prop_assert!((0.0..=100.0).contains(&actual));
        }
    }
}
