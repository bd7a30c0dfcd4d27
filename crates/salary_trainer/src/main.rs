//! Salarium CLI
//!
//! Trains the salary regressors on a CSV dataset and serves single
//! predictions with market context.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use salarium_core::labels::{
    company_size_label, country_display, employment_type_label, experience_level_label,
    remote_ratio_label,
};
use salarium_core::{
    ModelKind, PredictionRequest, SalariumConfig, SalaryDataset, TrainedArtifacts,
};
use salarium_trainer::{
    ArtifactCache, PredictionResponse, SalaryInsights, TrainerError, TrainingPipeline,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const ARTIFACTS_FILE: &str = "artifacts.json";
const HASH_FILE: &str = "artifacts.hash";

#[derive(Parser, Debug)]
#[command(name = "salarium")]
#[command(author = "Salarium Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic salary prediction from historical records", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train all models and report held-out metrics
    Train {
        /// Input CSV dataset path
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to write artifacts and their hash into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Predict a salary and compare it with the market
    Predict {
        /// Input CSV dataset path
        #[arg(short, long)]
        input: PathBuf,

        /// Directory with previously written artifacts; trains when absent
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        #[command(flatten)]
        profile: ProfileArgs,
    },
}

#[derive(Args, Debug)]
struct ProfileArgs {
    #[arg(long, default_value = "random-forest")]
    model: ModelKind,

    #[arg(long)]
    work_year: i32,

    /// EN, MI, SE or EX
    #[arg(long)]
    experience_level: String,

    /// FT, PT, CT or FL
    #[arg(long, default_value = "FT")]
    employment_type: String,

    #[arg(long)]
    job_title: String,

    /// ISO country code of the employer
    #[arg(long)]
    company_location: String,

    /// S, M or L
    #[arg(long, default_value = "M")]
    company_size: String,

    /// 0, 50 or 100
    #[arg(long, default_value = "0")]
    remote_ratio: u8,
}

impl ProfileArgs {
    fn into_request(self) -> PredictionRequest {
        PredictionRequest {
            work_year: self.work_year,
            experience_level: self.experience_level,
            employment_type: self.employment_type,
            job_title: self.job_title,
            company_location: self.company_location,
            company_size: self.company_size,
            remote_ratio: self.remote_ratio,
            model: self.model,
        }
    }
}

/// Human-readable view of the request
#[derive(Serialize)]
struct ProfileLabels {
    experience_level: String,
    employment_type: String,
    company_size: String,
    remote_work: String,
    company_location: String,
}

impl ProfileLabels {
    fn from_request(request: &PredictionRequest) -> Self {
        let label = |code: &str, found: Option<&str>| found.unwrap_or(code).to_string();
        Self {
            experience_level: label(
                &request.experience_level,
                experience_level_label(&request.experience_level),
            ),
            employment_type: label(
                &request.employment_type,
                employment_type_label(&request.employment_type),
            ),
            company_size: label(&request.company_size, company_size_label(&request.company_size)),
            remote_work: remote_ratio_label(request.remote_ratio)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}%", request.remote_ratio)),
            company_location: country_display(&request.company_location),
        }
    }
}

#[derive(Serialize)]
struct PredictOutput<'a> {
    profile: ProfileLabels,
    #[serde(flatten)]
    response: &'a PredictionResponse,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config, cli.verbose);

    info!("Salarium v{}", env!("CARGO_PKG_VERSION"));

    let dataset_path = match &cli.command {
        Command::Train { input, .. } | Command::Predict { input, .. } => input.clone(),
    };
    let dataset = SalaryDataset::from_csv(&dataset_path, config.dataset.max_salary)
        .with_context(|| format!("Failed to load dataset {}", dataset_path.display()))?;

    let pipeline = TrainingPipeline::new(config).context("Invalid configuration")?;

    match cli.command {
        Command::Train { output, .. } => run_train(pipeline, &dataset, output.as_deref()),
        Command::Predict {
            artifacts, profile, ..
        } => run_predict(pipeline, dataset, artifacts.as_deref(), profile.into_request()),
    }
}

fn load_config(path: Option<&Path>) -> Result<SalariumConfig> {
    let mut config = match path {
        Some(path) => SalariumConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SalariumConfig::default(),
    };
    config
        .load_from_env()
        .context("Invalid SALARIUM_* environment override")?;
    Ok(config)
}

fn init_logging(config: &SalariumConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run_train(
    pipeline: TrainingPipeline,
    dataset: &SalaryDataset,
    output: Option<&Path>,
) -> Result<()> {
    let artifacts = pipeline.train(dataset).context("Training failed")?;

    println!("{:<30} {:>12} {:>12} {:>8}", "Model", "MAE", "RMSE", "R²");
    for (kind, metrics) in &artifacts.metrics {
        println!(
            "{:<30} {:>12.2} {:>12.2} {:>8.4}",
            kind.display_name(),
            metrics.mae,
            metrics.rmse,
            metrics.r2
        );
    }
    if let Some(best) = artifacts.best_model() {
        println!("Best model by R²: {}", best.display_name());
    }

    if let Some(dir) = output {
        write_artifacts(&artifacts, dir)?;
    }

    Ok(())
}

fn run_predict(
    pipeline: TrainingPipeline,
    dataset: SalaryDataset,
    artifacts_dir: Option<&Path>,
    request: PredictionRequest,
) -> Result<()> {
    let dataset = Arc::new(dataset);

    let insights = match artifacts_dir {
        Some(dir) => {
            let artifacts = read_artifacts(dir)?;
            let fingerprint = dataset.fingerprint()?;
            if artifacts.metadata.dataset_fingerprint != fingerprint {
                bail!(
                    "Artifacts in {} were trained on different data ({} != {})",
                    dir.display(),
                    artifacts.metadata.dataset_fingerprint,
                    fingerprint
                );
            }
            SalaryInsights::new(dataset, Arc::new(artifacts))
        }
        None => {
            let cache = ArtifactCache::new(pipeline);
            SalaryInsights::from_cache(&cache, dataset)?
        }
    };

    let response = match insights.predict(&request) {
        Ok(response) => response,
        Err(TrainerError::Core(err)) if err.is_recoverable() => {
            bail!("Request rejected: {err}")
        }
        Err(err) => return Err(err).context("Prediction failed"),
    };
    let output = PredictOutput {
        profile: ProfileLabels::from_request(&request),
        response: &response,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Write canonical JSON artifacts plus their BLAKE3 hash
fn write_artifacts(artifacts: &TrainedArtifacts, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).context("Failed to create output directory")?;

    let canonical_json = artifacts
        .to_canonical_json()
        .context("Failed to serialize artifacts")?;
    let hash_hex = hex::encode(blake3::hash(canonical_json.as_bytes()).as_bytes());

    let artifacts_path = dir.join(ARTIFACTS_FILE);
    let hash_path = dir.join(HASH_FILE);
    std::fs::write(&artifacts_path, &canonical_json).context("Failed to write artifacts file")?;
    std::fs::write(&hash_path, &hash_hex).context("Failed to write hash file")?;

    info!("Artifacts: {}", artifacts_path.display());
    info!("Hash: {} ({})", hash_path.display(), hash_hex);
    Ok(())
}

/// Read artifacts, checking them against the stored hash when present
fn read_artifacts(dir: &Path) -> Result<TrainedArtifacts> {
    let artifacts_path = dir.join(ARTIFACTS_FILE);
    let content = std::fs::read_to_string(&artifacts_path)
        .with_context(|| format!("Failed to read {}", artifacts_path.display()))?;

    match std::fs::read_to_string(dir.join(HASH_FILE)) {
        Ok(expected) => {
            let actual = hex::encode(blake3::hash(content.as_bytes()).as_bytes());
            if actual != expected.trim() {
                bail!("Artifact hash mismatch: expected {}, got {}", expected.trim(), actual);
            }
        }
        Err(_) => warn!("No {} next to artifacts; skipping integrity check", HASH_FILE),
    }

    let artifacts: TrainedArtifacts =
        serde_json::from_str(&content).context("Failed to parse artifacts")?;
    artifacts.validate()?;
    Ok(artifacts)
}
