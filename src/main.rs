/*!
 * Command-line interface for dirsnap
 */

use std::io;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dirsnap::config::{Args, CheckArgs, Command, OutputFormat, ScanConfig};
use dirsnap::{Comparator, ReportFormat, Reporter, Scanner, Snapshot, XmlReader, XmlWriter};

fn main() -> io::Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Take {
            directory,
            output,
            name,
            checks,
        } => {
            let mut config = ScanConfig::from_args(directory, &checks)?;
            config.output_file = Some(output.clone());
            let name = name.unwrap_or_else(|| default_name(&config.target_dir));

            let start_time = Instant::now();
            let snapshot = scan_with_progress(config, &name)?;
            XmlWriter::new().write_to_path(&snapshot, &output)?;

            eprintln!(
                "📸 Captured {} files into {} in {:.2?}",
                snapshot.len(),
                output.display(),
                start_time.elapsed()
            );
        }
        Command::Compare {
            left,
            right,
            format,
            checks,
        } => {
            let config = ScanConfig::from_args(left.clone(), &checks)?;
            let left_snapshot = load_side(&left, &checks)?;
            let right_snapshot = load_side(&right, &checks)?;

            let comparator = Comparator::new(config.snapshot, config.rules);
            let report = comparator.compare_snapshots(&left_snapshot, &right_snapshot);

            let report_format = match format {
                OutputFormat::Table => ReportFormat::ConsoleTable,
                OutputFormat::Json => ReportFormat::Json,
            };
            Reporter::new(report_format).print_report(&report)?;

            if !report.is_equal() {
                process::exit(1);
            }
        }
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Args::command(), "dirsnap", &mut io::stdout());
        }
    }

    Ok(())
}

/// Install a stderr subscriber filtered by RUST_LOG
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
}

/// A saved snapshot file, or a live capture when `path` is a directory
fn load_side(path: &Path, checks: &CheckArgs) -> io::Result<Snapshot> {
    if path.is_dir() {
        let config = ScanConfig::from_args(path.to_path_buf(), checks)?;
        return scan_with_progress(config, &path.display().to_string());
    }

    let mut snapshot = XmlReader::new().read_from_path(path)?;
    if snapshot.name.is_empty() {
        snapshot.name = path.display().to_string();
    }
    Ok(snapshot)
}

fn scan_with_progress(config: ScanConfig, name: &str) -> io::Result<Snapshot> {
    config.validate()?;

    // Create progress bar
    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} {wide_msg:.dim.white} {pos}/{len} ({percent}%) ⏱️  Elapsed: {elapsed_precise}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress.set_prefix("📸 Capturing");
    progress.set_message(format!("📂 {}", config.target_dir.display()));

    let scanner = Scanner::new(config, Arc::new(progress.clone()));
    let result = scanner.scan(name);
    progress.finish_and_clear();

    let snapshot = result?;
    let stats = scanner.get_statistics();
    if !stats.failures.is_empty() {
        eprintln!(
            "⚠️ {} files could not be captured and were skipped",
            stats.failures.len()
        );
    }
    info!(files = stats.files_captured, "Scan finished");

    Ok(snapshot)
}

fn default_name(dir: &Path) -> String {
    std::fs::canonicalize(dir)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| dir.display().to_string())
}
