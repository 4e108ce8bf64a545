//! Producer directory: the identifier → producer → customer reference table.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigurationError, DirectoryError, DslipError, Result};
use crate::models::config::DirectoryConfig;
use crate::models::page::normalize;

/// One directory row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerRecord {
    /// Normalized policy identifier.
    pub identifier: String,
    /// Producer the identifier belongs to. A blank producer cell keeps the
    /// identifier known while leaving its pages unmatched.
    pub producer: Option<String>,
    /// Normalized customer name.
    pub customer_name: Option<String>,
}

/// Format of the raw directory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryFormat {
    /// Excel or OpenDocument workbook.
    Workbook,
    /// Delimited text.
    Csv,
}

impl DirectoryFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> std::result::Result<Self, DirectoryError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Workbook),
            "csv" | "txt" => Ok(Self::Csv),
            _ => Err(DirectoryError::UnsupportedFormat(extension)),
        }
    }
}

/// The loaded producer directory.
///
/// Identifiers are not unique: several records may share one identifier and
/// all of them take part in matching.
#[derive(Debug, Clone, Default)]
pub struct ProducerDirectory {
    records: Vec<ProducerRecord>,
    by_identifier: HashMap<String, Vec<usize>>,
}

impl ProducerDirectory {
    /// Build a directory from already normalized records.
    pub fn from_records(records: Vec<ProducerRecord>) -> Self {
        let mut by_identifier: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_identifier
                .entry(record.identifier.clone())
                .or_default()
                .push(idx);
        }
        Self {
            records,
            by_identifier,
        }
    }

    /// Load a directory from raw table bytes.
    pub fn from_bytes(
        data: &[u8],
        format: DirectoryFormat,
        config: &DirectoryConfig,
    ) -> Result<Self> {
        let rows = match format {
            DirectoryFormat::Workbook => read_workbook_rows(data, config.sheet.as_deref())?,
            DirectoryFormat::Csv => read_csv_rows(data, config.csv_delimiter)?,
        };
        Self::from_rows(rows, config)
    }

    /// Build a directory from a raw grid of cells.
    ///
    /// Blank rows are ignored. Of the remaining rows, the first
    /// `config.skip_rows` are dropped, the next one is the header and the
    /// rest are data. Every configured column must be in the header.
    pub fn from_rows(rows: Vec<Vec<String>>, config: &DirectoryConfig) -> Result<Self> {
        let mut rows = rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .skip(config.skip_rows);

        let header: Vec<String> = rows
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|cell| cell.trim().to_string())
            .collect();

        let producer_idx = column_index(&header, &config.producer_column, "producer")?;
        let identifier_idx = column_index(&header, &config.identifier_column, "identifier")?;
        let customer_idx = column_index(&header, &config.customer_column, "customer")?;

        let mut records = Vec::new();
        let mut skipped = 0;
        for row in rows {
            let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");

            let Some(identifier) = normalize(cell(identifier_idx)) else {
                debug!("Skipping directory row without identifier: {:?}", row);
                skipped += 1;
                continue;
            };
            let producer = Some(cell(producer_idx).trim())
                .filter(|p| !p.is_empty())
                .map(str::to_string);
            if producer.is_none() {
                debug!("Directory row for '{}' has no producer", identifier);
            }
            records.push(ProducerRecord {
                identifier,
                producer,
                customer_name: normalize(cell(customer_idx)),
            });
        }

        let directory = Self::from_records(records);
        debug!(
            "Parsed directory: {} rows, {} unique identifiers, {} skipped",
            directory.len(),
            directory.by_identifier.len(),
            skipped
        );
        Ok(directory)
    }

    pub fn records(&self) -> &[ProducerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records carrying an identifier, in directory order.
    pub fn lookup<'a>(
        &'a self,
        identifier: &str,
    ) -> impl Iterator<Item = &'a ProducerRecord> + use<'a> {
        self.by_identifier
            .get(identifier)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.records[idx])
    }

    /// The distinct identifiers in the directory.
    pub fn known_identifiers(&self) -> HashSet<String> {
        self.by_identifier.keys().cloned().collect()
    }

    /// The distinct producer names, sorted.
    pub fn producers(&self) -> BTreeSet<&str> {
        self.records.iter().filter_map(|r| r.producer.as_deref()).collect()
    }
}

fn column_index(
    header: &[String],
    column: &str,
    role: &'static str,
) -> std::result::Result<usize, ConfigurationError> {
    header
        .iter()
        .position(|h| h == column.trim())
        .ok_or_else(|| ConfigurationError {
            column: column.to_string(),
            role,
            header: header.to_vec(),
        })
}

fn read_workbook_rows(
    data: &[u8],
    sheet: Option<&str>,
) -> std::result::Result<Vec<Vec<String>>, DslipError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data))
        .map_err(|e| DirectoryError::Workbook(e.to_string()))?;

    let sheet_name = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(DirectoryError::SheetNotFound(name.to_string()).into());
            }
            name.to_string()
        }
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(DirectoryError::NoSheets)?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| DirectoryError::Workbook(e.to_string()))?;
    debug!("Reading sheet '{}' ({:?})", sheet_name, range.get_size());

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

/// Render a cell the way it reads in the spreadsheet.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.0}", f),
        other => other.to_string(),
    }
}

fn read_csv_rows(
    data: &[u8],
    delimiter: char,
) -> std::result::Result<Vec<Vec<String>>, DirectoryError> {
    if !delimiter.is_ascii() {
        return Err(DirectoryError::InvalidDelimiter(delimiter));
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(data);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}
