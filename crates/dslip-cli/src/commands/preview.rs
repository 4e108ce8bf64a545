//! Preview command - show extraction and matching results.

use std::fs;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use console::style;

use dslip_core::batch::{BatchOrchestrator, NoopObserver, PreviewReport};
use dslip_core::models::association::{AssignmentEntry, ManualAssignments};

use super::config::load_config;
use super::{expand_inputs, read_batch_input};

/// Output format for the preview.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum PreviewFormat {
    /// Aligned table
    #[default]
    Table,
    /// JSON rows
    Json,
    /// CSV rows
    Csv,
}

/// Arguments for the preview command.
#[derive(Args)]
pub struct PreviewArgs {
    /// Input PDF files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Producer directory (xlsx, xls, ods or csv)
    #[arg(short, long)]
    directory: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: PreviewFormat,

    /// Write a manual assignment template for pages without producer
    #[arg(long)]
    write_template: Option<PathBuf>,
}

pub fn run(args: PreviewArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let files = expand_inputs(&args.inputs)?;
    let input = read_batch_input(&files, &args.directory, ManualAssignments::new())?;

    let report = BatchOrchestrator::new(config).preview(&input, &NoopObserver)?;

    match args.format {
        PreviewFormat::Table => print_table(&report),
        PreviewFormat::Json => println!("{}", serde_json::to_string_pretty(&report.rows)?),
        PreviewFormat::Csv => print_csv(&report)?,
    }

    if let Some(path) = &args.write_template {
        let template: Vec<AssignmentEntry> = report
            .unmatched_pages()
            .into_iter()
            .map(|key| AssignmentEntry {
                document: key.document.clone(),
                page: key.page,
                producer: String::new(),
            })
            .collect();
        fs::write(path, serde_json::to_string_pretty(&template)?)?;
        eprintln!(
            "{} Wrote {} unassigned pages to {}",
            style("✓").green(),
            template.len(),
            path.display()
        );
    }

    Ok(())
}

fn print_table(report: &PreviewReport) {
    println!(
        "{:<30} {:>5}  {:<16} {:<30} {}",
        "Document", "Page", "Identifier", "Customer", "Producer"
    );
    for row in &report.rows {
        let producer = match &row.producer {
            Some(p) => style(p.clone()).green(),
            None => style("-".to_string()).red(),
        };
        println!(
            "{:<30} {:>5}  {:<16} {:<30} {}",
            row.key.document,
            row.key.page,
            row.identifier.as_deref().unwrap_or("-"),
            row.customer_name.as_deref().unwrap_or("-"),
            producer
        );
    }

    let unmatched = report.unmatched_pages();
    println!();
    println!(
        "   Pages: {} total, {} with identifier, {} without",
        report.pages_with_identifier + report.pages_without_identifier,
        style(report.pages_with_identifier).green(),
        style(report.pages_without_identifier).red()
    );
    if !unmatched.is_empty() {
        println!(
            "{} {} pages without producer. Known producers: {}",
            style("⚠").yellow(),
            unmatched.len(),
            report.producers.join(", ")
        );
    }
}

fn print_csv(report: &PreviewReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());

    wtr.write_record(["document", "page", "identifier", "customer", "producer"])?;
    for row in &report.rows {
        wtr.write_record([
            row.key.document.as_str(),
            row.key.page.to_string().as_str(),
            row.identifier.as_deref().unwrap_or(""),
            row.customer_name.as_deref().unwrap_or(""),
            row.producer.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
