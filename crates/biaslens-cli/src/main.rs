//! BiasLens CLI
//!
//! Scores job postings for biased and exclusionary language. Results are
//! printed as JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use biaslens_core::BatchJob;
use biaslens_engine::{describe_metrics, BiasAnalyzer, PhraseDictionary};
use biaslens_nli_candle::{CandleNliLoader, NliArchitecture};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

mod config;

use config::{AppConfig, Overrides};

#[derive(Parser, Debug)]
#[command(name = "biaslens")]
#[command(author, version, about = "Job posting bias analysis", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "biaslens.yaml", global = true)]
    config: PathBuf,

    /// Phrase dictionary YAML replacing the built-in one
    #[arg(short, long, global = true)]
    dictionary: Option<PathBuf>,

    /// HuggingFace repository of the NLI model
    #[arg(long, env = "BIASLENS_MODEL_REPO", global = true)]
    model_repo: Option<String>,

    /// Local directory holding the NLI model
    #[arg(long, global = true, conflicts_with = "model_repo")]
    model_path: Option<PathBuf>,

    /// Architecture of the model given by --model-repo or --model-path
    #[arg(long, value_enum, global = true)]
    architecture: Option<Architecture>,

    /// Inference timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Architecture {
    DebertaV2,
    XlmRoberta,
}

impl From<Architecture> for NliArchitecture {
    fn from(arch: Architecture) -> Self {
        match arch {
            Architecture::DebertaV2 => NliArchitecture::DebertaV2,
            Architecture::XlmRoberta => NliArchitecture::XlmRoberta,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Full analysis of one posting
    Analyze {
        /// Posting file, or - for stdin
        #[arg(default_value = "-")]
        input: String,

        /// Run the entailment model in addition to keywords
        #[arg(long)]
        nlp: bool,
    },

    /// Keyword detection only
    Detect {
        /// Posting file, or - for stdin
        #[arg(default_value = "-")]
        input: String,
    },

    /// Zero-shot classification only
    Classify {
        /// Posting file, or - for stdin
        #[arg(default_value = "-")]
        input: String,
    },

    /// Analyze a JSON array of {id, text, use_nlp} jobs
    Batch {
        /// Jobs file, or - for stdin
        #[arg(default_value = "-")]
        input: String,
    },

    /// List phrases with suggested inclusive replacements
    Replacements,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);
    describe_metrics();

    let config = AppConfig::load(
        &cli.config,
        Overrides {
            model_repo: cli.model_repo.clone(),
            model_path: cli.model_path.clone(),
            architecture: cli.architecture.map(NliArchitecture::from),
            timeout_ms: cli.timeout_ms,
            dictionary: cli.dictionary.clone(),
        },
    )?;
    info!("Configuration loaded");
    info!("Model: {}", config.model.source);

    let dictionary = match &config.dictionary {
        Some(path) => Arc::new(
            PhraseDictionary::from_file(path)
                .with_context(|| format!("Failed to load dictionary {}", path.display()))?,
        ),
        None => PhraseDictionary::builtin(),
    };

    let analyzer = Arc::new(
        BiasAnalyzer::builder()
            .config(config.engine.clone())
            .dictionary(Arc::clone(&dictionary))
            .loader(CandleNliLoader::new(config.model.clone()))
            .build()?,
    );

    match cli.command {
        Commands::Analyze { input, nlp } => {
            let text = read_input(&input)?;
            let result = analyzer.analyze_async(text, nlp).await;
            info!(
                bias_score = result.bias_score,
                international = result.international_student_bias_score,
                analysis_type = ?result.analysis_type,
                "Analysis complete"
            );
            print_json(&result, cli.pretty)?;
        }
        Commands::Detect { input } => {
            let text = read_input(&input)?;
            print_json(&analyzer.detect(&text), cli.pretty)?;
        }
        Commands::Classify { input } => {
            let text = read_input(&input)?;
            let this = Arc::clone(&analyzer);
            let result = tokio::task::spawn_blocking(move || this.classify(&text, true)).await?;
            print_json(&result, cli.pretty)?;
        }
        Commands::Batch { input } => {
            let raw = read_input(&input)?;
            let jobs: Vec<BatchJob> =
                serde_json::from_str(&raw).context("Batch input must be a JSON array of jobs")?;
            let results = analyzer.analyze_batch(jobs).await;
            print_json(&results, cli.pretty)?;
        }
        Commands::Replacements => {
            print_json(&dictionary.replacements(), cli.pretty)?;
        }
    }

    Ok(())
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    let path = Path::new(input);
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

/// Initialize tracing/logging on stderr
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("biaslens=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("biaslens=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
