//! Split command - route pages to per-producer PDFs.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use dslip_core::assembly::{OutputFile, SummaryRow};
use dslip_core::batch::{BatchObserver, BatchOrchestrator, BatchOutput, LogEntry, LogLevel};
use dslip_core::models::association::ManualAssignments;

use super::config::load_config;
use super::{expand_inputs, read_batch_input};

/// Arguments for the split command.
#[derive(Args)]
pub struct SplitArgs {
    /// Input PDF files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Producer directory (xlsx, xls, ods or csv)
    #[arg(short, long)]
    directory: PathBuf,

    /// Manual page assignments (JSON)
    #[arg(short, long)]
    assignments: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "dslip_output")]
    output_dir: PathBuf,

    /// Also pack every output file into this ZIP archive
    #[arg(long)]
    zip: Option<PathBuf>,

    /// Write the per-producer summary as CSV
    #[arg(long)]
    summary: bool,

    /// Write the run log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

/// Drives an indicatif bar from batch progress events.
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new(hidden: bool) -> anyhow::Result<Self> {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(100)
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")?
                .progress_chars("=>-"),
        );
        Ok(Self { bar })
    }
}

impl BatchObserver for ProgressObserver {
    fn on_progress(&self, percent: u8, stage: &str) {
        self.bar.set_position(percent as u64);
        self.bar.set_message(stage.to_string());
    }

    fn on_log(&self, entry: &LogEntry) {
        if entry.level == LogLevel::Error {
            self.bar
                .println(format!("{} {}", style("✗").red(), entry.message));
        }
    }
}

pub fn run(args: SplitArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files = expand_inputs(&args.inputs)?;
    println!(
        "{} Found {} PDF files to split",
        style("ℹ").blue(),
        files.len()
    );

    let assignments = match &args.assignments {
        Some(path) => {
            let assignments = ManualAssignments::from_file(path).map_err(|e| {
                anyhow::anyhow!("Failed to load assignments {}: {}", path.display(), e)
            })?;
            debug!("Loaded {} manual assignments", assignments.len());
            assignments
        }
        None => ManualAssignments::new(),
    };

    let input = read_batch_input(&files, &args.directory, assignments)?;
    let observer = ProgressObserver::new(args.quiet)?;
    let result = BatchOrchestrator::new(config).run(&input, &observer);
    observer.bar.finish_and_clear();
    let output = result?;

    fs::create_dir_all(&args.output_dir)?;
    for file in &output.files {
        let path = args.output_dir.join(&file.name);
        fs::write(&path, &file.data)?;
        debug!("Wrote {}", path.display());
    }

    if let Some(zip_path) = &args.zip {
        write_zip(zip_path, &output.files)?;
        println!(
            "{} Archive written to {}",
            style("✓").green(),
            zip_path.display()
        );
    }

    if args.summary {
        let summary_path = args.output_dir.join("summary.csv");
        write_summary(&summary_path, &output.summary)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    if let Some(log_path) = &args.log_file {
        write_log(log_path, &output.log)?;
    }

    print_report(&output, &args.output_dir);
    println!(
        "{} Split {} pages in {:?}",
        style("✓").green(),
        output.stats.total_pages,
        start.elapsed()
    );

    Ok(())
}

fn print_report(output: &BatchOutput, output_dir: &Path) {
    let stats = &output.stats;
    println!();
    println!("   Documents:        {}", stats.documents_processed);
    println!("   Total pages:      {}", stats.total_pages);
    println!("   Matched pages:    {}", style(stats.matched_pages).green());
    println!("   Without producer: {}", style(stats.unmatched_pages).yellow());
    println!("   Producers:        {}", stats.producer_count);

    if !output.summary.is_empty() {
        println!();
        println!("{:<40} {:>6}  {}", "Producer", "Pages", "File");
        for row in &output.summary {
            println!("{:<40} {:>6}  {}", row.producer, row.page_count, row.filename);
        }
    }

    let warnings = output
        .log
        .iter()
        .filter(|e| e.level == LogLevel::Warning)
        .count();
    if warnings > 0 {
        println!();
        println!(
            "{} {} warnings (use --log-file or -v for details)",
            style("⚠").yellow(),
            warnings
        );
    }

    println!();
    println!(
        "{} {} files written to {}",
        style("✓").green(),
        output.files.len(),
        output_dir.display()
    );
}

fn write_zip(path: &Path, files: &[OutputFile]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut zip = ZipWriter::new(fs::File::create(path)?);
    for (idx, file) in files.iter().enumerate() {
        // Same as on disk: a later file with the same name wins
        if files[idx + 1..].iter().any(|f| f.name == file.name) {
            warn!("Skipping {} in archive, name reused by a later file", file.name);
            continue;
        }
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(file.name.as_str(), options)?;
        zip.write_all(&file.data)?;
    }
    zip.finish()?;
    Ok(())
}

fn write_summary(path: &Path, summary: &[SummaryRow]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["producer", "page_count", "filename"])?;
    for row in summary {
        wtr.write_record([
            row.producer.as_str(),
            row.page_count.to_string().as_str(),
            row.filename.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_log(path: &Path, log: &[LogEntry]) -> anyhow::Result<()> {
    let mut out = String::new();
    for entry in log {
        out.push_str(&format!(
            "{} [{}] {}\n",
            entry.timestamp.format("%H:%M:%S"),
            entry.level,
            entry.message
        ));
    }
    fs::write(path, out)?;
    Ok(())
}
