//! Core library for splitting policy PDFs by producer.
//!
//! This crate provides:
//! - PDF loading, per-page text extraction and page copying
//! - Identifier and customer name extraction from page text
//! - Producer directory loading from workbooks and CSV files
//! - Matching, manual assignments and per-producer document assembly
//! - The batch pipeline tying the stages together

pub mod assembly;
pub mod batch;
pub mod directory;
pub mod error;
pub mod export;
pub mod extract;
pub mod matching;
pub mod models;
pub mod overrides;
pub mod pdf;

pub use assembly::{
    output_filename, AssemblyPlan, DocumentAssembler, OutputFile, ProducerBundle, SummaryRow,
};
pub use batch::{
    BatchInput, BatchObserver, BatchOrchestrator, BatchOutput, BatchStats, InputDocument, LogEntry,
    LogLevel, NoopObserver, PreviewReport, RunContext,
};
pub use directory::{DirectoryFormat, ProducerDirectory, ProducerRecord};
pub use error::{DslipError, Result};
pub use extract::{PageFieldExtractor, PageFields};
pub use matching::match_pages;
pub use models::association::{ManualAssignments, Origin, PageAssociation};
pub use models::config::DslipConfig;
pub use models::page::{PageKey, PageRecord};
pub use overrides::{apply_overrides, OverrideReport};
pub use pdf::{PageCopier, PdfProcessor, SourceDocument};
