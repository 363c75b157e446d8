//! CLI entry point for training and prediction.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use price_learning::{
    Algorithm, MissingColumnPolicy, PredictionDriver, TrainingConfig, TrainingDriver, read_csv,
    write_predictions,
};
use price_processing::DomainEncoding;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// CLI-compatible algorithm enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAlgorithm {
    /// Bootstrap-aggregated regression trees
    RandomForest,
    /// Least-squares boosting of shallow trees
    GradientBoosting,
}

impl From<CliAlgorithm> for Algorithm {
    fn from(cli: CliAlgorithm) -> Self {
        match cli {
            CliAlgorithm::RandomForest => Algorithm::RandomForest,
            CliAlgorithm::GradientBoosting => Algorithm::GradientBoosting,
        }
    }
}

/// CLI-compatible domain encoding enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDomainEncoding {
    /// Map building state and EPC labels to ordered integers
    Ordinal,
    /// Normalise the labels and one-hot encode them
    Indicator,
}

impl From<CliDomainEncoding> for DomainEncoding {
    fn from(cli: CliDomainEncoding) -> Self {
        match cli {
            CliDomainEncoding::Ordinal => DomainEncoding::Ordinal,
            CliDomainEncoding::Indicator => DomainEncoding::Indicator,
        }
    }
}

/// CLI-compatible missing column policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMissingColumns {
    /// Fail when a column a cleaning rule needs is absent
    Fail,
    /// Warn and skip the rule
    Skip,
}

impl From<CliMissingColumns> for MissingColumnPolicy {
    fn from(cli: CliMissingColumns) -> Self {
        match cli {
            CliMissingColumns::Fail => MissingColumnPolicy::Fail,
            CliMissingColumns::Skip => MissingColumnPolicy::Skip,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Property price regression: train a model and predict on new data",
    long_about = "Trains a random forest or gradient boosting model on property listings and \
                  applies it to new listings with exactly the preprocessing used at training time.\n\n\
                  EXAMPLES:\n  \
                  # Train a random forest on the default dataset\n  \
                  price-learning train\n\n  \
                  # Train gradient boosting with indicator-encoded building state and EPC\n  \
                  price-learning train -a gradient-boosting --domain-encoding indicator\n\n  \
                  # Predict with a saved model\n  \
                  price-learning predict -i input_data/newdata.csv -m gradient_boosting_model"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train, evaluate and save a model with its preprocessing artifacts
    Train {
        /// Training CSV with a `price` column
        #[arg(short, long, default_value = "input_data/properties.csv")]
        input: PathBuf,

        /// Estimator to train
        #[arg(short, long, value_enum)]
        algorithm: Option<CliAlgorithm>,

        /// How building state and EPC labels are encoded
        #[arg(long, value_enum)]
        domain_encoding: Option<CliDomainEncoding>,

        /// Directory for preprocessing artifacts
        #[arg(long)]
        preprocessing_dir: Option<PathBuf>,

        /// Directory for the model artifact
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// JSON training configuration; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Predict prices for new listings with saved artifacts
    Predict {
        /// CSV of listings to price
        #[arg(short, long, default_value = "input_data/newdata.csv")]
        input: PathBuf,

        /// Saved model name (e.g. random_forest_model, gradient_boosting_model)
        #[arg(short, long, default_value = "random_forest_model")]
        model: String,

        /// Output CSV with a single PredictedPrice column
        #[arg(short, long, default_value = "output_data/predictions.csv")]
        output: PathBuf,

        /// Directory holding preprocessing artifacts
        #[arg(long)]
        preprocessing_dir: Option<PathBuf>,

        /// Directory holding model artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// What to do when a column a cleaning rule needs is absent
        #[arg(long, value_enum)]
        missing_columns: Option<CliMissingColumns>,

        /// JSON training configuration to take directories and policy from
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<TrainingConfig> {
    let Some(path) = path else {
        return Ok(TrainingConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let config: TrainingConfig = serde_json::from_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn main() {
    // Load environment variables from .env file before RUST_LOG is read
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet);

    if let Err(e) = run(args.command) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Train {
            input,
            algorithm,
            domain_encoding,
            preprocessing_dir,
            models_dir,
            config,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(algorithm) = algorithm {
                config.algorithm = algorithm.into();
            }
            if let Some(encoding) = domain_encoding {
                config.preprocessing.domain_encoding = encoding.into();
            }
            if let Some(dir) = preprocessing_dir {
                config.preprocessing_dir = dir;
            }
            if let Some(dir) = models_dir {
                config.models_dir = dir;
            }
            train(&input, config)
        }
        Command::Predict {
            input,
            model,
            output,
            preprocessing_dir,
            models_dir,
            missing_columns,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let policy = missing_columns
                .map(MissingColumnPolicy::from)
                .unwrap_or(config.preprocessing.missing_column_policy);
            let driver = PredictionDriver::new(
                preprocessing_dir.unwrap_or(config.preprocessing_dir),
                models_dir.unwrap_or(config.models_dir),
                model,
            )
            .missing_column_policy(policy);
            predict(&input, &output, &driver)
        }
    }
}

fn train(input: &Path, config: TrainingConfig) -> Result<()> {
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", input.display()));
    }

    let df = read_csv(input)?;
    let report = TrainingDriver::new(config).run(&df)?;

    println!();
    println!("Model:     {} ({})", report.model_name, report.algorithm);
    println!("Features:  {}", report.features.len());
    println!("Rows:      {} train / {} holdout", report.n_train, report.n_test);
    println!("MSE:       {:.4}", report.metrics.mse);
    println!("RMSE:      {:.4}", report.metrics.rmse);
    println!("MAE:       {:.4}", report.metrics.mae);
    println!("R²:        {:.4}", report.metrics.r2);
    println!("Time:      {:.2}s", report.training_time_seconds);
    for path in &report.artifacts {
        println!("Saved:     {}", path.display());
    }
    Ok(())
}

fn predict(input: &Path, output: &Path, driver: &PredictionDriver) -> Result<()> {
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", input.display()));
    }

    let df = read_csv(input)?;
    let predictions = driver.run(&df)?;
    write_predictions(output, &predictions)?;

    println!(
        "Predictions for {} saved to {}",
        driver.model_name(),
        output.display()
    );
    Ok(())
}
