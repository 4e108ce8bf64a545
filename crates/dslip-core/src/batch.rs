//! Batch pipeline: directory, documents, matching, overrides, assembly.
//!
//! A run is synchronous and all-or-nothing. Progress and log events are sent
//! to a [`BatchObserver`]; the log of a run is also kept in its [`RunContext`]
//! and returned with the output.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::assembly::{plan_bundles, AssemblyPlan, DocumentAssembler, OutputFile, SummaryRow};
use crate::directory::{DirectoryFormat, ProducerDirectory};
use crate::error::{PdfError, Result};
use crate::extract::PageFieldExtractor;
use crate::matching::match_pages;
use crate::models::association::{ManualAssignments, PageAssociation};
use crate::models::config::DslipConfig;
use crate::models::page::{text_preview, PageKey, PageRecord};
use crate::overrides::apply_overrides;
use crate::pdf::SourceDocument;

/// Severity of a run log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// One line of the run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

/// Receives progress and log events while a batch runs.
pub trait BatchObserver {
    /// Called after each stage with a non-decreasing percentage.
    fn on_progress(&self, _percent: u8, _stage: &str) {}

    /// Called for every run log entry.
    fn on_log(&self, _entry: &LogEntry) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// State owned by a single run.
pub struct RunContext<'a> {
    log: Vec<LogEntry>,
    progress: u8,
    observer: &'a dyn BatchObserver,
}

impl<'a> RunContext<'a> {
    pub fn new(observer: &'a dyn BatchObserver) -> Self {
        Self {
            log: Vec::new(),
            progress: 0,
            observer,
        }
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info | LogLevel::Success => info!("{}", message),
            LogLevel::Warning => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
        }
        let entry = LogEntry {
            timestamp: Local::now(),
            level,
            message,
        };
        self.observer.on_log(&entry);
        self.log.push(entry);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Report progress. Values lower than the last reported one are raised
    /// to it.
    pub fn progress(&mut self, percent: u8, stage: &str) {
        self.progress = self.progress.max(percent.min(100));
        self.observer.on_progress(self.progress, stage);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.log
    }
}

/// A named source PDF.
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub name: String,
    pub data: Vec<u8>,
}

impl InputDocument {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Everything a run needs besides the configuration.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub directory: Vec<u8>,
    pub directory_format: DirectoryFormat,
    pub documents: Vec<InputDocument>,
    pub assignments: ManualAssignments,
}

/// Counters describing a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_pages: usize,
    pub matched_pages: usize,
    pub unmatched_pages: usize,
    pub producer_count: usize,
    pub documents_processed: usize,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// Producer PDFs in producer order, then the unmatched PDF and report.
    pub files: Vec<OutputFile>,
    pub summary: Vec<SummaryRow>,
    pub stats: BatchStats,
    /// Extracted fields of the pages routed to no producer.
    pub unmatched: Vec<PageRecord>,
    pub log: Vec<LogEntry>,
}

/// Result of an extraction preview.
#[derive(Debug, Clone)]
pub struct PreviewReport {
    /// One row per association, before manual assignments.
    pub rows: Vec<PageAssociation>,
    pub pages_with_identifier: usize,
    pub pages_without_identifier: usize,
    /// Producers known to the directory, sorted.
    pub producers: Vec<String>,
    pub log: Vec<LogEntry>,
}

impl PreviewReport {
    /// Distinct pages the automatic match left without producer.
    pub fn unmatched_pages(&self) -> Vec<&PageKey> {
        let matched: HashSet<&PageKey> = self
            .rows
            .iter()
            .filter(|r| r.producer.is_some())
            .map(|r| &r.key)
            .collect();
        let unmatched: BTreeSet<&PageKey> = self
            .rows
            .iter()
            .map(|r| &r.key)
            .filter(|key| !matched.contains(key))
            .collect();
        unmatched.into_iter().collect()
    }
}

/// Sequences the pipeline stages over one batch.
pub struct BatchOrchestrator {
    config: DslipConfig,
    extractor: PageFieldExtractor,
}

impl BatchOrchestrator {
    pub fn new(config: DslipConfig) -> Self {
        let extractor = PageFieldExtractor::from_config(&config.extraction);
        Self { config, extractor }
    }

    pub fn config(&self) -> &DslipConfig {
        &self.config
    }

    /// Run the full batch and produce every output file.
    pub fn run(&self, input: &BatchInput, observer: &dyn BatchObserver) -> Result<BatchOutput> {
        let mut ctx = RunContext::new(observer);
        ctx.info("Batch started");

        let directory = self.load_directory(input, &mut ctx)?;
        let (sources, pages) = self.read_documents(&input.documents, &directory, &mut ctx)?;

        let mut associations = match_pages(&pages, &directory);
        let report = apply_overrides(&mut associations, &input.assignments);
        for (key, producer) in &report.applied {
            ctx.info(format!("Manual assignment: {} -> {}", key, producer));
        }
        for key in &report.unknown {
            ctx.warning(format!("Manual assignment for unknown page {} ignored", key));
        }
        ctx.progress(30, "matching");

        let all_pages: BTreeSet<PageKey> = pages.iter().map(|p| p.key.clone()).collect();
        let plan = plan_bundles(&associations, &all_pages, &self.config.output);
        ctx.progress(40, "grouping");
        ctx.info(format!("Found {} producers with assigned pages", plan.bundles.len()));
        for (filename, producers) in plan.filename_collisions() {
            ctx.warning(format!(
                "Producers {} share the output file name {}",
                producers.join(", "),
                filename
            ));
        }

        let files = self.assemble(&plan, &sources, &pages, &mut ctx)?;

        let unmatched_keys: HashSet<&PageKey> = plan.unmatched.iter().collect();
        let unmatched: Vec<PageRecord> = pages
            .iter()
            .filter(|p| unmatched_keys.contains(&p.key))
            .cloned()
            .collect();

        let stats = BatchStats {
            total_pages: all_pages.len(),
            matched_pages: plan.matched_pages,
            unmatched_pages: plan.unmatched.len(),
            producer_count: plan.bundles.len(),
            documents_processed: sources.len(),
        };
        ctx.progress(100, "done");
        ctx.success("Batch completed");

        Ok(BatchOutput {
            files,
            summary: plan.summary(),
            stats,
            unmatched,
            log: ctx.into_entries(),
        })
    }

    /// Extract and match without manual assignments and without building
    /// any document.
    pub fn preview(
        &self,
        input: &BatchInput,
        observer: &dyn BatchObserver,
    ) -> Result<PreviewReport> {
        let mut ctx = RunContext::new(observer);
        ctx.info("Extraction preview started");

        let directory = self.load_directory(input, &mut ctx)?;
        let (_, pages) = self.read_documents(&input.documents, &directory, &mut ctx)?;
        let rows = match_pages(&pages, &directory);
        ctx.progress(100, "done");

        let pages_with_identifier = pages.iter().filter(|p| p.identifier.is_some()).count();
        ctx.success(format!(
            "Preview completed: {} pages, {} with identifier",
            pages.len(),
            pages_with_identifier
        ));

        Ok(PreviewReport {
            rows,
            pages_with_identifier,
            pages_without_identifier: pages.len() - pages_with_identifier,
            producers: directory.producers().into_iter().map(str::to_string).collect(),
            log: ctx.into_entries(),
        })
    }

    fn load_directory(
        &self,
        input: &BatchInput,
        ctx: &mut RunContext<'_>,
    ) -> Result<ProducerDirectory> {
        let directory = ProducerDirectory::from_bytes(
            &input.directory,
            input.directory_format,
            &self.config.directory,
        )
        .inspect_err(|e| ctx.error(format!("Directory not loaded: {}", e)))?;
        ctx.info(format!(
            "Directory loaded: {} rows, {} distinct identifiers",
            directory.len(),
            directory.known_identifiers().len()
        ));
        ctx.progress(5, "directory");
        Ok(directory)
    }

    fn read_documents(
        &self,
        documents: &[InputDocument],
        directory: &ProducerDirectory,
        ctx: &mut RunContext<'_>,
    ) -> Result<(Vec<SourceDocument>, Vec<PageRecord>)> {
        let mut names = HashSet::new();
        if let Some(duplicate) = documents.iter().find(|d| !names.insert(d.name.as_str())) {
            ctx.error(format!("PDF '{}' given more than once", duplicate.name));
            return Err(PdfError::DuplicateDocument(duplicate.name.clone()).into());
        }

        let known = directory.known_identifiers();
        let mut sources = Vec::with_capacity(documents.len());
        let mut pages = Vec::new();

        for (idx, input) in documents.iter().enumerate() {
            ctx.info(format!("Reading PDF '{}'", input.name));
            let source = SourceDocument::load(input.name.as_str(), &input.data)
                .inspect_err(|e| ctx.error(format!("PDF '{}' not read: {}", input.name, e)))?;
            ctx.info(format!("PDF '{}': {} pages", source.name(), source.page_count()));

            pages.extend(self.extract_records(&source, &known, ctx));
            sources.push(source);

            let done = ((idx + 1) * 20 / documents.len()) as u8;
            ctx.progress(5 + done, "documents");
        }

        Ok((sources, pages))
    }

    fn extract_records(
        &self,
        source: &SourceDocument,
        known: &HashSet<String>,
        ctx: &mut RunContext<'_>,
    ) -> Vec<PageRecord> {
        source
            .pages()
            .iter()
            .map(|page| {
                let key = PageKey::new(source.name(), page.number);
                if let Some(reason) = &page.text_error {
                    ctx.warning(format!("{}: text not extracted ({})", key, reason));
                }

                let fields = self.extractor.extract(&page.text, known);
                match &fields.identifier {
                    Some(identifier) => {
                        ctx.success(format!("{}: found identifier '{}'", key, identifier))
                    }
                    None => ctx.warning(format!("{}: no identifier found", key)),
                }
                if !fields.has_customer() {
                    debug!("{}: no customer name found", key);
                }

                PageRecord {
                    key,
                    identifier: fields.identifier,
                    customer_name: fields.customer_name,
                    text_preview: text_preview(&page.text, self.config.extraction.preview_chars),
                }
            })
            .collect()
    }

    fn assemble(
        &self,
        plan: &AssemblyPlan,
        sources: &[SourceDocument],
        pages: &[PageRecord],
        ctx: &mut RunContext<'_>,
    ) -> Result<Vec<OutputFile>> {
        let assembler = DocumentAssembler::new(sources, &self.config.output);
        let mut files = Vec::with_capacity(plan.bundles.len() + 2);

        for (idx, bundle) in plan.bundles.iter().enumerate() {
            let file = assembler
                .assemble_bundle(bundle)
                .inspect_err(|e| ctx.error(format!("{} not built: {}", bundle.filename, e)))?;
            ctx.success(format!("Built {}: {} pages", file.name, bundle.pages.len()));
            files.push(file);

            let done = ((idx + 1) * 40 / plan.bundles.len()) as u8;
            ctx.progress(40 + done, "assembly");
        }

        let unmatched = assembler
            .assemble_unmatched(&plan.unmatched, pages)
            .inspect_err(|e| ctx.error(format!("Unmatched pages not built: {}", e)))?;
        if !plan.unmatched.is_empty() {
            ctx.warning(format!("Pages without producer: {}", plan.unmatched.len()));
        }
        files.extend(unmatched);
        ctx.progress(85, "unmatched");

        Ok(files)
    }
}
