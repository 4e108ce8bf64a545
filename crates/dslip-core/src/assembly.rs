//! Grouping associations into per-producer bundles and building the outputs.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::export::{write_xlsx, Cell};
use crate::models::association::PageAssociation;
use crate::models::config::OutputConfig;
use crate::models::page::{PageKey, PageRecord};
use crate::pdf::{PageCopier, SourceDocument};

/// Column headers of the unmatched page report.
pub const UNMATCHED_REPORT_COLUMNS: [&str; 4] =
    ["documentName", "pageIndex", "identifier", "customerName"];

/// Pages routed to one producer, in output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerBundle {
    pub producer: String,
    pub filename: String,
    pub pages: Vec<PageKey>,
}

/// What every page turns into: producer bundles plus the unmatched rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyPlan {
    /// Bundles sorted by producer name.
    pub bundles: Vec<ProducerBundle>,
    /// Pages without any producer, sorted.
    pub unmatched: Vec<PageKey>,
    /// Number of distinct pages with at least one producer.
    pub matched_pages: usize,
}

/// One row of the per-producer summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub producer: String,
    pub page_count: usize,
    pub filename: String,
}

/// A generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// Derive the output file name for a producer.
///
/// Spaces become underscores, periods are dropped and ampersands become `E`.
/// Distinct producers can map to the same name ("A.B" and "AB").
pub fn output_filename(producer: &str, prefix: &str) -> String {
    let safe_name = producer.replace(' ', "_").replace('.', "").replace('&', "E");
    format!("{}{}.pdf", prefix, safe_name)
}

/// Drop associations repeating the same (document, page, producer) triple,
/// keeping the first.
pub fn deduplicate(associations: &[PageAssociation]) -> Vec<&PageAssociation> {
    let mut seen: HashSet<(&PageKey, Option<&str>)> = HashSet::new();
    associations
        .iter()
        .filter(|a| seen.insert((&a.key, a.producer.as_deref())))
        .collect()
}

/// Group associations by producer and work out the unmatched pages.
///
/// `all_pages` must hold every page of every input document; pages that end
/// up in no producer bundle go to `unmatched`.
pub fn plan_bundles(
    associations: &[PageAssociation],
    all_pages: &BTreeSet<PageKey>,
    output: &OutputConfig,
) -> AssemblyPlan {
    let mut groups: BTreeMap<&str, BTreeSet<&PageKey>> = BTreeMap::new();
    for association in deduplicate(associations) {
        if let Some(producer) = association.producer.as_deref() {
            groups.entry(producer).or_default().insert(&association.key);
        }
    }

    let matched: HashSet<&PageKey> = groups.values().flatten().copied().collect();
    let unmatched: Vec<PageKey> = all_pages
        .iter()
        .filter(|key| !matched.contains(key))
        .cloned()
        .collect();

    let bundles = groups
        .into_iter()
        .map(|(producer, pages)| ProducerBundle {
            producer: producer.to_string(),
            filename: output_filename(producer, &output.file_prefix),
            pages: pages.into_iter().cloned().collect(),
        })
        .collect();

    AssemblyPlan {
        bundles,
        unmatched,
        matched_pages: matched.len(),
    }
}

impl AssemblyPlan {
    /// The per-producer summary, sorted by producer.
    pub fn summary(&self) -> Vec<SummaryRow> {
        self.bundles
            .iter()
            .map(|b| SummaryRow {
                producer: b.producer.clone(),
                page_count: b.pages.len(),
                filename: b.filename.clone(),
            })
            .collect()
    }

    /// File names shared by more than one producer.
    pub fn filename_collisions(&self) -> Vec<(&str, Vec<&str>)> {
        let mut by_name: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for bundle in &self.bundles {
            by_name
                .entry(bundle.filename.as_str())
                .or_default()
                .push(bundle.producer.as_str());
        }
        by_name
            .into_iter()
            .filter(|(_, producers)| producers.len() > 1)
            .collect()
    }
}

/// Builds output documents from a plan.
pub struct DocumentAssembler<'a> {
    copier: PageCopier<'a>,
    output: &'a OutputConfig,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(sources: &'a [SourceDocument], output: &'a OutputConfig) -> Self {
        Self {
            copier: PageCopier::new(sources),
            output,
        }
    }

    /// Build the PDF of one producer bundle.
    pub fn assemble_bundle(&self, bundle: &ProducerBundle) -> Result<OutputFile> {
        let data = self.copier.assemble(&bundle.pages)?;
        debug!("Built {} ({} pages)", bundle.filename, bundle.pages.len());
        Ok(OutputFile {
            name: bundle.filename.clone(),
            data,
        })
    }

    /// Build the unmatched PDF and its report. Returns nothing when every
    /// page found a producer.
    pub fn assemble_unmatched(
        &self,
        unmatched: &[PageKey],
        pages: &[PageRecord],
    ) -> Result<Vec<OutputFile>> {
        if unmatched.is_empty() {
            return Ok(Vec::new());
        }

        let pdf = OutputFile {
            name: self.output.unmatched_pdf_name(),
            data: self.copier.assemble(unmatched)?,
        };

        let records: HashMap<&PageKey, &PageRecord> = pages.iter().map(|p| (&p.key, p)).collect();
        let rows: Vec<Vec<Cell>> = unmatched
            .iter()
            .map(|key| {
                let record = records.get(key);
                vec![
                    Cell::from(key.document.as_str()),
                    Cell::from(key.page),
                    Cell::from(record.and_then(|r| r.identifier.as_deref())),
                    Cell::from(record.and_then(|r| r.customer_name.as_deref())),
                ]
            })
            .collect();
        let report = OutputFile {
            name: self.output.unmatched_report_name(),
            data: write_xlsx(&self.output.unmatched_stem, &UNMATCHED_REPORT_COLUMNS, &rows)?,
        };

        Ok(vec![pdf, report])
    }
}
