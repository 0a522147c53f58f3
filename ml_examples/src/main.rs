// ml_examples/src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dendritic_gated::{
    fit, generate_binary_data, generate_linear_data, load_csv, print_model_summary, print_summary_table,
    standardize, train_test_split, Dgn, DgnConfig, LossKind, TrainConfig,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Task {
    /// Square loss on a real-valued target
    Regression,
    /// Bernoulli log loss on a 0/1 target
    Classification,
}

/// Train a dendritic gated network on a CSV file or on synthetic data.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, value_enum, default_value_t = Task::Regression)]
    task: Task,
    /// Numeric CSV with a header row; synthetic data when omitted
    #[arg(long)]
    data: Option<PathBuf>,
    /// Target column name (defaults to the last column)
    #[arg(long)]
    target: Option<String>,
    /// Network configuration as JSON
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 3)]
    epochs: usize,
    #[arg(long, default_value_t = 1e-3)]
    learning_rate: f64,
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Where to save the trained model (.pere)
    #[arg(long)]
    model_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let loss = match args.task {
        Task::Regression => LossKind::Square,
        Task::Classification => LossKind::Bernoulli,
    };
    let mut config = match &args.config {
        Some(path) => DgnConfig::from_json_file(path).with_context(|| format!("reading {}", path.display()))?,
        None => DgnConfig::default(),
    };
    config.loss = loss;

    let data = match &args.data {
        Some(path) => load_csv(path, args.target.as_deref()).with_context(|| format!("loading {}", path.display()))?,
        None => match loss {
            LossKind::Square => generate_linear_data(500, 8, args.seed),
            LossKind::Bernoulli => generate_binary_data(500, 8, args.seed),
        },
    };
    let (mut train, mut test) = train_test_split(data, args.test_fraction, args.seed)?;
    standardize(&mut train, &mut test)?;
    info!(train = train.len(), test = test.len(), ?loss, "prepared data");

    let input_size = train.first().map(|(x, _)| x.len()).context("training split is empty")?;
    let mut net = Dgn::new(input_size, &config)?;
    print_model_summary(&net);

    let train_config = TrainConfig {
        epochs: args.epochs,
        learning_rate: args.learning_rate,
    };
    let reports = fit(&mut net, &train, &test, &train_config)?;
    print_summary_table(&reports, "Training");

    if let Some(path) = &args.model_out {
        net.save_pere(path)?;
        let reloaded = Dgn::load_pere(path)?;
        if let Some((x, _)) = test.first().or(train.first()) {
            info!(
                path = %path.display(),
                prediction = reloaded.predict(x)?,
                "saved and reloaded model"
            );
        }
    }

    Ok(())
}
