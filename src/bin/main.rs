//! IRWLS SVM Command Line Interface
//!
//! Train full or budgeted models on LibSVM data, predict, evaluate and
//! inspect saved models.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use irwls_svm::api::{self, EvaluationMetrics, SVM};
use irwls_svm::core::{Result, SVMError};
use irwls_svm::persistence::SerializableModel;
use irwls_svm::{
    CenterSelection, Classifier, KernelConfig, LibSVMDataset, PredictionEngine, RBFKernel,
};
use log::{error, info};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "irwls")]
#[command(about = "Kernel SVM training by iteratively re-weighted least squares")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new SVM model
    Train(TrainArgs),
    /// Make predictions using a trained model
    Predict(PredictArgs),
    /// Evaluate a model on labeled test data
    Evaluate(EvaluateArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (LibSVM format)
    #[arg(long)]
    data: PathBuf,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,

    /// Kernel function
    #[arg(short, long, default_value = "rbf")]
    kernel: CliKernel,

    /// RBF gamma (defaults to 1 / number of features)
    #[arg(short, long)]
    gamma: Option<f64>,

    /// Regularization parameter C
    #[arg(short = 'C', long, default_value = "1.0")]
    c: f64,

    /// Worker threads
    #[arg(short, long, default_value = "1")]
    threads: usize,

    /// Convergence tolerance on the squared relative coefficient change
    #[arg(long, default_value = "1e-6")]
    tolerance: f64,

    /// Maximum iterations
    #[arg(short, long, default_value = "500")]
    max_iterations: usize,

    /// Stop after this many iterations without a new smallest relative change
    #[arg(long, default_value = "5")]
    patience: usize,

    /// Ridge added to the diagonal of every system
    #[arg(long, default_value = "1e-6")]
    ridge: f64,

    /// Number of centers; trains the budgeted solver when given
    #[arg(short, long)]
    budget: Option<usize>,

    /// Center selection strategy for budgeted training
    #[arg(long, default_value = "random")]
    selection: CliSelection,

    /// Candidates scored per incremental selection step
    #[arg(long, default_value = "64")]
    candidates: usize,

    /// Seed for center sampling
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Kernel column cache size in MB for incremental selection
    #[arg(long, default_value = "64")]
    cache_size: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliKernel {
    /// K(x, y) = x·y
    Linear,
    /// K(x, y) = exp(-gamma ||x - y||²)
    Rbf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliSelection {
    /// Uniform random subsample
    Random,
    /// Greedy approximation-error descent
    Incremental,
}

impl From<CliSelection> for CenterSelection {
    fn from(selection: CliSelection) -> Self {
        match selection {
            CliSelection::Random => CenterSelection::Random,
            CliSelection::Incremental => CenterSelection::Incremental,
        }
    }
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file, labeled or unlabeled
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write decision values
    #[arg(long)]
    margins: bool,

    /// Worker threads
    #[arg(short, long, default_value = "1")]
    threads: usize,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Test data file
    #[arg(long)]
    data: PathBuf,

    /// Worker threads
    #[arg(short, long, default_value = "1")]
    threads: usize,

    /// Show detailed metrics
    #[arg(long)]
    detailed: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    info!("Training SVM model...");
    info!("Data file: {:?}", args.data);

    let dataset = LibSVMDataset::from_file(&args.data)?.to_dataset(None)?;
    let (positives, negatives) = dataset.class_counts();
    info!(
        "Loaded {} samples with {} dimensions ({positives} positive, {negatives} negative)",
        dataset.len(),
        dataset.dim()
    );

    let kernel = match args.kernel {
        CliKernel::Linear => KernelConfig::linear(),
        CliKernel::Rbf => match args.gamma {
            Some(gamma) => KernelConfig::rbf(gamma),
            None => KernelConfig::rbf(RBFKernel::with_auto_gamma(dataset.dim())?.gamma()),
        },
    };
    info!(
        "Parameters: kernel={kernel:?}, C={}, tolerance={}, max_iter={}, threads={}",
        args.c, args.tolerance, args.max_iterations, args.threads
    );

    let mut svm = SVM::new()
        .with_kernel(kernel)
        .with_c(args.c)
        .with_threads(args.threads)
        .with_tolerance(args.tolerance)
        .with_max_iterations(args.max_iterations)
        .with_patience(args.patience)
        .with_ridge(args.ridge);

    if let Some(size) = args.budget {
        info!("Budgeted training with {size} centers ({:?})", args.selection);
        svm = svm
            .with_budget(size, args.selection.into())
            .with_seed(args.seed)
            .with_candidates(args.candidates)
            .with_cache_size(args.cache_size * 1024 * 1024); // Convert MB to bytes
    }

    let model = svm.train(&dataset)?;

    let summary = model.summary();
    info!(
        "Training finished: {:?} after {} iterations",
        summary.status, summary.iterations
    );
    info!("Support vectors: {}", model.n_support_vectors());
    info!("Bias: {:.6}", model.bias());

    // Save model
    SerializableModel::from_model(&model).save_to_file(&args.output)?;
    info!("Model saved to: {:?}", args.output);

    // Quick evaluation on training data
    let metrics = api::evaluate(&model, &dataset, args.threads)?;
    info!("Training accuracy: {:.2}%", metrics.accuracy() * 100.0);

    Ok(())
}

fn predict_command(args: PredictArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let model = SerializableModel::load_from_file(&args.model)?.to_model()?;

    info!("Loading prediction data from: {:?}", args.data);
    let data = LibSVMDataset::from_file(&args.data)?;
    let queries = data.to_features(Some(model.dim()))?;

    info!(
        "Making predictions using model with {} support vectors",
        model.n_support_vectors()
    );
    let predictions = PredictionEngine::new(&model, args.threads)?.predict(&queries)?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(SVMError::IoError)?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    writeln!(writer, "# Predictions for {} samples", predictions.len())?;
    writeln!(
        writer,
        "# Format: sample_index predicted_label{}",
        if args.margins { " decision_value" } else { "" }
    )?;
    for (i, pred) in predictions.iter().enumerate() {
        if args.margins {
            writeln!(writer, "{} {:.0} {:.6}", i, pred.label, pred.decision_value)?;
        } else {
            writeln!(writer, "{} {:.0}", i, pred.label)?;
        }
    }
    writer.flush()?;

    if let Some(output_path) = &args.output {
        info!("Predictions saved to: {output_path:?}");
    }

    if let Some(labels) = data.labels() {
        let metrics = EvaluationMetrics::from_predictions(&predictions, labels);
        println!(
            "Accuracy: {:.2}% ({}/{})",
            metrics.accuracy() * 100.0,
            metrics.true_positives + metrics.true_negatives,
            metrics.total()
        );
    }

    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let serializable_model = SerializableModel::load_from_file(&args.model)?;
    let model = serializable_model.to_model()?;

    info!("Loading test data from: {:?}", args.data);
    let metrics = api::evaluate_file(&model, &args.data, args.threads)?;

    // Show evaluation results
    println!("=== Model Evaluation ===");
    serializable_model.print_summary();

    println!("\nTest Results:");
    println!("  Samples:  {}", metrics.total());
    println!("  Accuracy: {:.2}%", metrics.accuracy() * 100.0);

    if args.detailed {
        println!("\nDetailed Metrics:");
        println!("  True Positives:  {}", metrics.true_positives);
        println!("  True Negatives:  {}", metrics.true_negatives);
        println!("  False Positives: {}", metrics.false_positives);
        println!("  False Negatives: {}", metrics.false_negatives);
        println!("  Precision:       {:.4}", metrics.precision());
        println!("  Recall:          {:.4}", metrics.recall());
        println!("  F1 Score:        {:.4}", metrics.f1_score());
        println!("  Specificity:     {:.4}", metrics.specificity());
    }

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let serializable_model = SerializableModel::load_from_file(&args.model)?;

    serializable_model.print_summary();

    println!("\nCoefficients:");
    let coefficients = &serializable_model.coefficients;
    let n_show = coefficients.len().min(10);
    for (i, &value) in coefficients.iter().enumerate().take(n_show) {
        println!("  β{i}: {value:.6}");
    }
    if coefficients.len() > n_show {
        println!("  ... ({} more)", coefficients.len() - n_show);
    }

    Ok(())
}
