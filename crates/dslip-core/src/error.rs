//! Error types for the dslip-core library.

use thiserror::Error;

/// Main error type for the dslip library.
///
/// Only configuration problems and unreadable inputs abort a batch. Pages
/// without an identifier or without a producer are reported as data, not
/// as errors.
#[derive(Error, Debug)]
pub enum DslipError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// The producer directory could not be read.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// The producer directory does not match the configured column names.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Writing a tabular export failed.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DslipError {
    /// Whether this error was caused by a configuration mismatch rather than
    /// by unreadable input.
    pub fn is_configuration(&self) -> bool {
        matches!(self, DslipError::Configuration(_))
    }
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF '{name}': {reason}")]
    Parse { name: String, reason: String },

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF '{0}' is encrypted")]
    Encrypted(String),

    /// The PDF is empty or has no pages.
    #[error("PDF '{0}' has no pages")]
    NoPages(String),

    /// A page reference points outside the source document.
    #[error("invalid page {page} in '{document}'")]
    InvalidPage { document: String, page: u32 },

    /// A page reference names a document that was never loaded.
    #[error("unknown source document '{0}'")]
    UnknownDocument(String),

    /// Two input documents share a name, so their pages cannot be told apart.
    #[error("duplicate document name '{0}'")]
    DuplicateDocument(String),

    /// Serializing an assembled document failed.
    #[error("failed to write PDF: {0}")]
    Write(String),
}

/// Errors raised while reading the producer directory.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The workbook could not be opened or a sheet could not be read.
    #[error("failed to read workbook: {0}")]
    Workbook(String),

    /// The requested sheet does not exist.
    #[error("sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    /// The workbook contains no sheets.
    #[error("workbook has no sheets")]
    NoSheets,

    /// The CSV file could not be parsed.
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The configured CSV delimiter is not a single ASCII character.
    #[error("invalid CSV delimiter {0:?}: must be ASCII")]
    InvalidDelimiter(char),

    /// The file extension does not name a supported table format.
    #[error("unsupported directory format: {0}")]
    UnsupportedFormat(String),
}

/// A configured directory column is not present in the header row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("column '{column}' ({role}) not found in directory header [{}]", .header.join(", "))]
pub struct ConfigurationError {
    /// The configured column name that was looked up.
    pub column: String,
    /// Which field the column was meant to supply.
    pub role: &'static str,
    /// The header row that was actually found.
    pub header: Vec<String>,
}

/// Errors raised while writing tabular exports.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Building the workbook archive failed.
    #[error("failed to build workbook: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error while writing an export.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the dslip library.
pub type Result<T> = std::result::Result<T, DslipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_message() {
        let err = ConfigurationError {
            column: "NUMERO".to_string(),
            role: "identifier",
            header: vec!["PRODUTTORE".to_string(), "CLIENTE".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "column 'NUMERO' (identifier) not found in directory header [PRODUTTORE, CLIENTE]"
        );

        let err: DslipError = err.into();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_pdf_error_is_not_configuration() {
        let err: DslipError = PdfError::NoPages("a.pdf".to_string()).into();
        assert!(!err.is_configuration());
        assert_eq!(err.to_string(), "PDF error: PDF 'a.pdf' has no pages");
    }
}
