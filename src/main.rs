use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tabula::{Float, TrainConfig, run};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Train a regularized logistic regression model on a CSV file.
#[derive(Parser, Debug, Clone)]
#[command(name = "tabula")]
#[command(version)]
#[command(about = "Regularized logistic regression on CSV data")]
struct Args {
    /// CSV file with the training data
    #[arg(value_name = "FILE")]
    data: Option<PathBuf>,

    /// JSON config file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Name of the label column (positional index without --header)
    #[arg(short, long)]
    label: Option<String>,

    /// Treat the first line as column names
    #[arg(long)]
    header: bool,

    /// Learning rate
    #[arg(short, long)]
    alpha: Option<Float>,

    /// L2 regularization strength
    #[arg(long)]
    lambda: Option<Float>,

    /// Maximum gradient-descent iterations
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,

    /// Stop once the cost falls below this value
    #[arg(short, long)]
    epsilon: Option<Float>,

    /// Add polynomial features up to this degree
    #[arg(short, long)]
    degree: Option<usize>,

    /// Where to write the coefficients (`.csv` is appended if missing)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> tabula::Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::load(path)?,
            None => TrainConfig::default(),
        };

        if self.data.is_some() {
            config.data = self.data;
        }
        if self.label.is_some() {
            config.label = self.label;
        }
        if self.header {
            config.has_header = true;
        }
        if self.degree.is_some() {
            config.degree = self.degree;
        }
        if self.output.is_some() {
            config.output = self.output;
        }

        let hyperparameters = &mut config.hyperparameters;
        if let Some(alpha) = self.alpha {
            hyperparameters.set_alpha(alpha)?;
        }
        if let Some(lambda) = self.lambda {
            hyperparameters.set_lambda(lambda)?;
        }
        if let Some(max_iterations) = self.max_iterations {
            hyperparameters.set_max_iterations(max_iterations)?;
        }
        if let Some(epsilon) = self.epsilon {
            hyperparameters.set_epsilon(epsilon)?;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match (args.quiet, args.verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitCode::FAILURE;
    }

    let report = match args.into_config().and_then(|config| run(&config)) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Iterations: {}", report.summary.iterations);
    println!("Cost after descending: {}", report.summary.final_cost);
    println!("Status: {:?}", report.summary.status);
    println!("Training accuracy: {:.4}", report.accuracy);
    for (name, value) in report.coefficients.iter() {
        println!("{} : {}", name, value);
    }
    if let Some(path) = &report.saved_to {
        println!("Coefficients written to {}", path.display());
    }
    ExitCode::SUCCESS
}
