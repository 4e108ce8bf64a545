//! Configuration structures for the splitting pipeline.

use serde::{Deserialize, Serialize};

/// Main configuration for the dslip pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DslipConfig {
    /// Producer directory loading.
    pub directory: DirectoryConfig,

    /// Page field extraction.
    pub extraction: ExtractionConfig,

    /// Output naming.
    pub output: OutputConfig,
}

/// Producer directory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Column holding the producer name.
    pub producer_column: String,

    /// Column holding the policy identifier.
    pub identifier_column: String,

    /// Column holding the customer name.
    pub customer_column: String,

    /// Non-blank rows dropped before the header row.
    ///
    /// The directory workbooks carry a title row and a spacer row above the
    /// real header, so the header is the third non-blank row by default.
    pub skip_rows: usize,

    /// Worksheet to read (default: first sheet).
    pub sheet: Option<String>,

    /// Field delimiter for CSV directories.
    pub csv_delimiter: char,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            producer_column: "PRODUTTORE".to_string(),
            identifier_column: "NUMERO".to_string(),
            customer_column: "CLIENTE".to_string(),
            skip_rows: 2,
            sheet: None,
            csv_delimiter: ',',
        }
    }
}

/// Page field extraction configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Token that starts the line carrying the policy identifier.
    pub identifier_marker: String,

    /// Keyword that precedes the customer name.
    pub customer_marker: String,

    /// Number of characters kept in the diagnostic text preview.
    pub preview_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            identifier_marker: "COMPAGNIA".to_string(),
            customer_marker: "CLIENTE".to_string(),
            preview_chars: 200,
        }
    }
}

/// Output naming configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Prefix of every generated file.
    pub file_prefix: String,

    /// Stem used for the unmatched bundle and its report.
    pub unmatched_stem: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_prefix: "dslip_".to_string(),
            unmatched_stem: "SENZA_PRODUTTORE".to_string(),
        }
    }
}

impl OutputConfig {
    /// File name of the aggregate PDF holding unmatched pages.
    pub fn unmatched_pdf_name(&self) -> String {
        format!("{}{}.pdf", self.file_prefix, self.unmatched_stem)
    }

    /// File name of the unmatched page report.
    pub fn unmatched_report_name(&self) -> String {
        format!("{}{}_elenco.xlsx", self.file_prefix, self.unmatched_stem)
    }
}

impl DslipConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
