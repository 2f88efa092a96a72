// std imports
use std::path::{Path, PathBuf};

// 3rd party imports
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn, Level};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// internal imports
use msgf_runner::dta_refinery::step::DtaRefineryStep;
use msgf_runner::job::configuration::{JobFile, StepConfiguration};
use msgf_runner::job::parameters::{DTA_REFINERY_POST_RESULTS_TO_DB, MSGF_POST_RESULTS_TO_DB};
use msgf_runner::job::step::MsgfStep;
use msgf_runner::summary::reporter::PostgresSummaryStore;
use msgf_runner::synthesis::synthesizer::SynthesisSession;

/// Target for tracing
///
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum TracingTarget {
    File,
    Terminal,
    All,
}

/// Log rotation values for CLI
///
#[derive(clap::ValueEnum, Clone, Debug)]
enum TracingLogRotation {
    Minutely,
    Hourly,
    Daily,
    Never,
}

impl From<TracingLogRotation> for Rotation {
    fn from(rotation: TracingLogRotation) -> Self {
        match rotation {
            TracingLogRotation::Minutely => Rotation::MINUTELY,
            TracingLogRotation::Hourly => Rotation::HOURLY,
            TracingLogRotation::Daily => Rotation::DAILY,
            TracingLogRotation::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Prints a new runner configuration to stdout
    Config {},
    /// Rescores the results of an upstream search with MSGF
    Msgf {
        /// Job file with `context`- & `parameters`-section
        job_file_path: PathBuf,
        /// Runner configuration
        config_file_path: PathBuf,
    },
    /// Refines parent ion masses of the dataset's DTA file with DTA-Refinery
    DtaRefinery {
        /// Job file with `context`- & `parameters`-section
        job_file_path: PathBuf,
        /// Runner configuration
        config_file_path: PathBuf,
    },
    /// Stores the summary of already normalized MSGF results
    Summarize {
        /// Job file with `context`- & `parameters`-section
        job_file_path: PathBuf,
        /// Runner configuration
        config_file_path: PathBuf,
    },
    /// Writes the MSGF input file only, for debugging
    Synthesize {
        /// Job file with `context`- & `parameters`-section
        job_file_path: PathBuf,
        /// Runner configuration
        config_file_path: PathBuf,
    },
}

#[derive(Debug, Parser)]
#[command(name = "msgf-runner")]
struct Cli {
    /// Verbosity level
    /// 0 - Error
    /// 1 - Warn
    /// 2 - Info
    /// 3 - Debug
    /// > 3 - Trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// How to log tracing. Can be used multiple times
    #[arg(short, long, value_enum, action = clap::ArgAction::Append)]
    tracing_target: Vec<TracingTarget>,
    /// Tracing log file. Only used if `file` is set in `tracing_target`.
    #[arg(short, long, default_value = "./logs/msgf-runner.log")]
    file: PathBuf,
    /// Tracing log rotation. Only used if `file` is set in `tracing_target`.
    #[arg(short, long, value_enum, default_value = "never")]
    rotation: TracingLogRotation,
    #[command(subcommand)]
    command: Commands,
}

/// Reads job and runner configuration
///
fn load(job_file_path: &Path, config_file_path: &Path) -> Result<(JobFile, StepConfiguration)> {
    let job_file = JobFile::from_file(job_file_path)?;
    let config = StepConfiguration::from_file(config_file_path)?;
    Ok((job_file, config))
}

/// Connects to the summary database if results are posted and a connection is configured.
/// Connection errors only abort the step if reporting failures are fatal.
///
/// # Arguments
/// * `config` - Runner configuration
/// * `requested` - True if the job wants its results posted
///
async fn connect_store(
    config: &StepConfiguration,
    requested: bool,
) -> Result<Option<PostgresSummaryStore>> {
    let connection_string = match config.summary.connection_string.as_ref() {
        Some(connection_string) if requested => connection_string,
        _ => return Ok(None),
    };
    match PostgresSummaryStore::connect(connection_string).await {
        Ok(store) => Ok(Some(store)),
        Err(err) if !config.summary.reporting_failure_is_fatal => {
            warn!("Unable to connect to the summary database: {}", err);
            Ok(None)
        }
        Err(err) => Err(err).context("Connecting to the summary database"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Cli::parse();

    //// Set up tracing
    let verbosity = match args.verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(verbosity.into())
        .add_directive("sqlx=warn".parse()?);

    // Tracing layers
    let mut tracing_indicatif_layer = None;
    let mut tracing_terminal_layer = None;
    let mut tracing_file_layer = None;

    // Tracing guards
    let mut _tracing_log_writer_guard = None;

    if args.tracing_target.contains(&TracingTarget::Terminal)
        || args.tracing_target.contains(&TracingTarget::All)
    {
        let layer = IndicatifLayer::new()
            .with_span_child_prefix_symbol("\t")
            .with_span_child_prefix_indent("")
            .with_max_progress_bars(5, None);
        tracing_terminal_layer =
            Some(tracing_subscriber::fmt::layer().with_writer(layer.get_stderr_writer()));
        tracing_indicatif_layer = Some(layer);
    }

    if args.tracing_target.contains(&TracingTarget::File)
        || args.tracing_target.contains(&TracingTarget::All)
    {
        let log_dir = args
            .file
            .parent()
            .context("Log file has no parent directory")?;
        let log_file_name = args.file.file_name().context("Log file has no name")?;
        let file_appender = RollingFileAppender::new(args.rotation.into(), log_dir, log_file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_file_layer = Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        );
        _tracing_log_writer_guard = Some(guard);
    }

    tracing_subscriber::registry()
        .with(tracing_terminal_layer)
        .with(tracing_indicatif_layer)
        .with(tracing_file_layer)
        .with(filter)
        .init();

    match args.command {
        Commands::Config {} => {
            let new_config = StepConfiguration::new();
            println!("{}", toml::to_string_pretty(&new_config)?);
        }
        Commands::Msgf {
            job_file_path,
            config_file_path,
        } => {
            let (job, config) = load(&job_file_path, &config_file_path)?;
            let store = connect_store(
                &config,
                job.parameters.get_bool(MSGF_POST_RESULTS_TO_DB, false),
            )
            .await?;
            let step = MsgfStep::new(&job.context, &job.parameters, &config);
            let outcome = step.run(store.as_ref()).await?;
            info!(
                "{} MSGF step finished, {} results in `{}`",
                job.context.log_prefix(),
                outcome.reconciled.synopsis_rows,
                outcome.reconciled.synopsis_path.display()
            );
        }
        Commands::DtaRefinery {
            job_file_path,
            config_file_path,
        } => {
            let (job, config) = load(&job_file_path, &config_file_path)?;
            let store = connect_store(
                &config,
                job.parameters
                    .get_bool(DTA_REFINERY_POST_RESULTS_TO_DB, false),
            )
            .await?;
            let step = DtaRefineryStep::new(&job.context, &job.parameters, &config);
            step.run(store.as_ref()).await?;
            info!(
                "{} DTA-Refinery finished, refined spectra in `{}`",
                job.context.log_prefix(),
                step.fixed_dta_path().display()
            );
        }
        Commands::Summarize {
            job_file_path,
            config_file_path,
        } => {
            let (job, config) = load(&job_file_path, &config_file_path)?;
            let connection_string = config
                .summary
                .connection_string
                .as_ref()
                .context("No `connection_string` in the summary configuration")?;
            let store = PostgresSummaryStore::connect(connection_string).await?;
            let step = MsgfStep::new(&job.context, &job.parameters, &config);
            let statistics = step.summarize(&store).await?;
            println!("{}", serde_json::to_string_pretty(&statistics)?);
        }
        Commands::Synthesize {
            job_file_path,
            config_file_path,
        } => {
            let (job, config) = load(&job_file_path, &config_file_path)?;
            let step = MsgfStep::new(&job.context, &job.parameters, &config);
            let mut session = SynthesisSession::new(step.result_format()?);
            let (input_path, line_count) = step.synthesize(&mut session)?;
            info!(
                "{} Wrote {} lines to `{}`, {} duplicates skipped",
                job.context.log_prefix(),
                line_count,
                input_path.display(),
                session.skip_record_count()
            );
        }
    }

    Ok(())
}
