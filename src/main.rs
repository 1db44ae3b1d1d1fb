//! Entropy Assessment CLI
//!
//! `ea-tool assess` runs one SP 800-90B track over a file or stdin and
//! prints a text or JSON report. `ea-tool serve` starts the HTTP service.
//!
//! Exit codes: 0 success, 1 assessment or I/O failure, 2 usage error.

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use sp800_90b_assess::{
    config::FileConfig,
    estimators::{EstimatorSuite, LibraryError, MockSuite, Mode, NativeSuite},
    AssessmentCoordinator, AssessmentReport, AssessmentRequest,
};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "ea-tool",
    version,
    about = "Entropy Assessment Tool for NIST SP 800-90B"
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assess a sample file (or stdin) in one mode.
    Assess(AssessArgs),
    /// Run the HTTP assessment service.
    #[cfg(feature = "server")]
    Serve(SuiteArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Args)]
struct SuiteArgs {
    /// Native estimator library (overrides configuration).
    #[arg(long, conflicts_with = "mock")]
    library: Option<PathBuf>,

    /// Use the deterministic mock suite instead of a native library.
    #[arg(long)]
    mock: bool,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["iid", "non_iid"])))]
struct AssessArgs {
    /// Run the IID track.
    #[arg(long)]
    iid: bool,

    /// Run the Non-IID track.
    #[arg(long = "non-iid")]
    non_iid: bool,

    /// Bits per symbol (1-8), 0 to auto-detect.
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=8))]
    bits: u32,

    /// Verbosity (0=quiet, 1=normal, 2=verbose, 3=very verbose).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=3))]
    verbose: Option<u8>,

    /// Write the JSON report to this file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Output format when no output file is given.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(flatten)]
    suite: SuiteArgs,

    /// Sample file; reads stdin when omitted.
    file: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error("failed to read {source_name}: {source}")]
    Input {
        source_name: String,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Report(#[from] serde_json::Error),
    #[cfg(feature = "server")]
    #[error(transparent)]
    Server(#[from] sp800_90b_assess::server::ServerError),
    #[cfg(feature = "server")]
    #[error(transparent)]
    Metrics(#[from] sp800_90b_assess::metrics::MetricsError),
    #[cfg(feature = "server")]
    #[error("failed to start runtime: {0}")]
    Runtime(std::io::Error),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Usage(_) => ExitCode::from(2),
            _ => ExitCode::from(1),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match FileConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    init_logging(&config.logging.level);

    let outcome = match cli.command {
        Command::Assess(args) => run_assess(args, &config),
        #[cfg(feature = "server")]
        Command::Serve(args) => run_serve(args, &config).map(|()| ExitCode::SUCCESS),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn init_logging(level: &str) {
    // Logs go to stderr so JSON on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_suite(
    args: &SuiteArgs,
    config: &FileConfig,
    verbose: u8,
) -> Result<Arc<dyn EstimatorSuite>, CliError> {
    if args.mock {
        warn!("Using the mock estimator suite; results are NOT entropy assessments");
        return Ok(Arc::new(MockSuite::new()));
    }

    let library = args
        .library
        .clone()
        .or_else(|| config.estimators.library.clone())
        .ok_or_else(|| {
            CliError::Usage(
                "no estimator library configured (use --library, EA_ESTIMATOR_LIBRARY or --mock)"
                    .to_string(),
            )
        })?;

    Ok(Arc::new(NativeSuite::load(library, verbose)?))
}

fn read_samples(file: Option<&PathBuf>) -> Result<(String, Vec<u8>), CliError> {
    match file {
        Some(path) => {
            let data = std::fs::read(path).map_err(|source| CliError::Input {
                source_name: path.display().to_string(),
                source,
            })?;
            Ok((path.display().to_string(), data))
        }
        None => {
            let mut data = Vec::new();
            std::io::stdin()
                .read_to_end(&mut data)
                .map_err(|source| CliError::Input {
                    source_name: "stdin".to_string(),
                    source,
                })?;
            Ok(("-".to_string(), data))
        }
    }
}

fn run_assess(args: AssessArgs, config: &FileConfig) -> Result<ExitCode, CliError> {
    let verbose = args
        .verbose
        .unwrap_or_else(|| config.estimators.verbosity());
    let suite = build_suite(&args.suite, config, verbose)?;
    let (filename, data) = read_samples(args.file.as_ref())?;

    let recommended = config.estimators.min_recommended_samples;
    if data.len() < recommended {
        warn!(
            samples = data.len(),
            recommended,
            "Sample count below recommended minimum; estimates may be unreliable"
        );
    }

    let mode = if args.iid { Mode::Iid } else { Mode::NonIid };
    info!(
        file = %filename,
        mode = %mode,
        bits = args.bits,
        suite = suite.name(),
        "Starting assessment"
    );

    let coordinator = AssessmentCoordinator::new(suite);
    let outcome = coordinator.assess(&AssessmentRequest {
        data: &data,
        word_size: args.bits,
        run_iid: args.iid,
        run_non_iid: args.non_iid,
    });

    let report = AssessmentReport::new(filename, mode, args.bits, &data);
    let report = match &outcome {
        Ok(result) => report.with_result(result),
        Err(e) => report.with_error(e),
    };

    if let Some(path) = &args.output {
        std::fs::write(path, report.to_json()?).map_err(|source| CliError::Output {
            path: path.clone(),
            source,
        })?;
        if report.is_success() && verbose > 0 {
            println!("Results written to {}", path.display());
        }
    } else if let Err(e) = &outcome {
        eprintln!("Error: {}", e);
    } else if args.format == Format::Json {
        println!("{}", report.to_json()?);
    } else if verbose >= 1 {
        print!("{}", report.render_text(verbose));
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

#[cfg(feature = "server")]
fn run_serve(args: SuiteArgs, config: &FileConfig) -> Result<(), CliError> {
    use sp800_90b_assess::metrics::MetricsRegistry;
    use sp800_90b_assess::server::{shutdown_signal, AssessmentServer};

    let suite = build_suite(&args, config, config.estimators.verbosity())?;

    let metrics = if config.server.metrics_enabled {
        Some(Arc::new(MetricsRegistry::new()?))
    } else {
        None
    };

    let mut coordinator = AssessmentCoordinator::new(suite);
    if let Some(registry) = &metrics {
        coordinator = coordinator.with_observer(registry.clone());
    }

    let server = AssessmentServer::new(&config.server, coordinator, metrics)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(async move {
        let shutdown = shutdown_signal()?;
        server.run(shutdown).await
    })?;

    Ok(())
}
