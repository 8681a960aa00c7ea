//! dm-core - driver matrix report processing CLI.
//!
//! Resolves per-version configuration profiles and post-processes JUnit
//! reports produced by driver test runs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dm_config::ProfileStore;
use dm_core::config::{load_settings, Settings};
use dm_core::exit_codes::ExitCode;
use dm_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel, Stage};
use dm_core::matrix::{MatrixOptions, MatrixRunner};
use dm_core::output::{summary_lines, OutputFormat};
use dm_core::{Error, Result};
use dm_report::JunitReport;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "dm-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Settings file (TOML); must exist when given
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root of the per-flavor version profile directories
    #[arg(long, global = true)]
    versions_dir: Option<PathBuf>,

    /// Root of the per-version result directories
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    /// Database flavor, selects `<versions-dir>/<flavor>`
    #[arg(long, global = true)]
    flavor: Option<String>,

    /// Driver type recorded in metadata
    #[arg(long, global = true)]
    driver_type: Option<String>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the configuration profile selected for a driver version
    Resolve {
        /// Driver version
        #[arg(id = "driver_version", value_name = "VERSION")]
        version: String,
    },

    /// Prefix every testcase classname in a report with a tag
    Tag {
        /// JUnit report to rewrite
        report: PathBuf,

        #[arg(long)]
        tag: String,
    },

    /// Aggregate a report, reclassify ignored failures and write the results
    Process(ProcessArgs),

    /// Process the reports of several driver versions
    Matrix {
        /// Comma-separated driver versions
        #[arg(long, value_delimiter = ',', required = true)]
        versions: Vec<String>,

        /// Tag classnames with the version before processing
        #[arg(long)]
        tag_classnames: bool,
    },

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// JUnit report to process
    report: PathBuf,

    /// Driver version the report belongs to
    #[arg(long)]
    tag: String,

    /// Profile version to resolve (defaults to the tag)
    #[arg(long)]
    profile_version: Option<String>,

    /// Tag classnames before processing
    #[arg(long)]
    tag_classnames: bool,
}

fn main() {
    let cli = Cli::parse();

    let cli_level = cli.global.log_level.or(if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    });
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let run_id = generate_run_id();
    info!(
        target: "run.started",
        run_id = %run_id,
        stage = %Stage::Init,
        version = env!("CARGO_PKG_VERSION"),
        "dm-core starting"
    );

    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            error!(target: "run.failed", run_id = %run_id, error = %err, "Command failed");
            eprintln!("error: {err}");
            err.exit_code()
        }
    };

    std::process::exit(exit_code.as_i32());
}

fn run(cli: &Cli) -> Result<ExitCode> {
    if let Commands::Version = cli.command {
        println!("dm-core {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::Clean);
    }

    let settings = settings(&cli.global)?;
    match &cli.command {
        Commands::Resolve { version } => run_resolve(&cli.global, &settings, version),
        Commands::Tag { report, tag } => run_tag(&cli.global, report, tag),
        Commands::Process(args) => run_process(&cli.global, &settings, args),
        Commands::Matrix {
            versions,
            tag_classnames,
        } => run_matrix(&cli.global, &settings, versions, *tag_classnames),
        Commands::Version => Ok(ExitCode::Clean),
    }
}

/// Settings file and environment first, then explicit flags.
fn settings(global: &GlobalOpts) -> Result<Settings> {
    let mut settings = load_settings(global.config.as_deref())?.settings;
    if let Some(dir) = &global.versions_dir {
        settings.versions_dir = dir.clone();
    }
    if let Some(dir) = &global.results_dir {
        settings.results_dir = dir.clone();
    }
    if let Some(flavor) = &global.flavor {
        settings.flavor = flavor.clone();
    }
    if let Some(driver_type) = &global.driver_type {
        settings.driver_type = driver_type.clone();
    }
    Ok(settings)
}

fn profile_store(settings: &Settings) -> ProfileStore {
    ProfileStore::new(settings.profile_root()).with_default_profile(settings.default_profile.clone())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_resolve(global: &GlobalOpts, settings: &Settings, version: &str) -> Result<ExitCode> {
    let profile = profile_store(settings).resolve(version)?;
    match global.format {
        OutputFormat::Json => print_json(&json!({
            "version": version,
            "profile": profile.id,
            "dir": profile.dir,
            "patches": profile.patches,
            "ignore": profile.ignore.ignore.len(),
            "flaky": profile.ignore.flaky.len(),
            "test_filter": profile.ignore.test_filter(),
        }))?,
        OutputFormat::Summary => {
            println!("{version} -> {}", profile.id);
            for patch in &profile.patches {
                println!("patch: {patch}");
            }
            println!(
                "ignore: {}, flaky: {}",
                profile.ignore.ignore.len(),
                profile.ignore.flaky.len()
            );
        }
    }
    Ok(ExitCode::Clean)
}

fn run_tag(global: &GlobalOpts, report: &std::path::Path, tag: &str) -> Result<ExitCode> {
    let tagged = dm_report::tag_classnames(report, tag)?;
    match global.format {
        OutputFormat::Json => print_json(&json!({
            "report": report,
            "tag": tag,
            "tagged": tagged,
        }))?,
        OutputFormat::Summary => println!("tagged {tagged} classnames in {}", report.display()),
    }
    Ok(ExitCode::Clean)
}

fn run_process(global: &GlobalOpts, settings: &Settings, args: &ProcessArgs) -> Result<ExitCode> {
    if args.tag.is_empty() {
        return Err(Error::Args("--tag must not be empty".to_string()));
    }
    let profile_version = args.profile_version.as_deref().unwrap_or(&args.tag);
    let profile = profile_store(settings).resolve(profile_version)?;

    let report = JunitReport::new(&args.report, args.tag.as_str(), profile.ignore.clone());
    if args.tag_classnames {
        report.tag_classnames()?;
    }
    let summary = report.summary()?;

    match global.format {
        OutputFormat::Json => print_json(&json!({
            "report": report.path(),
            "summary_file": report.summary_path(),
            "profile": profile.id,
            "failed": summary.is_failed(),
            "summary": summary.flatten(),
            "reclassified": summary.reclassified,
        }))?,
        OutputFormat::Summary => {
            for line in summary_lines(&summary) {
                println!("{line}");
            }
        }
    }

    Ok(if summary.is_failed() {
        ExitCode::TestsFailed
    } else {
        ExitCode::Clean
    })
}

fn run_matrix(
    global: &GlobalOpts,
    settings: &Settings,
    versions: &[String],
    tag_classnames: bool,
) -> Result<ExitCode> {
    let runner = MatrixRunner::new(settings, MatrixOptions { tag_classnames });
    let report = runner.run(versions);

    match global.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Summary => {
            for (version, outcome) in &report.results {
                println!("{version}: {}", serde_json::to_string(outcome)?);
            }
            println!("status: {}", report.status);
        }
    }
    Ok(report.exit_code())
}
