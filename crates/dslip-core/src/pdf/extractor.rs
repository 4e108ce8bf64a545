//! PDF loading and per-page text extraction using lopdf and pdf-extract.

use std::panic::{catch_unwind, AssertUnwindSafe};

use lopdf::Document;
use tracing::{debug, trace, warn};

use super::{PdfProcessor, Result};
use crate::error::PdfError;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    name: String,
    document: Option<Document>,
    raw_data: Vec<u8>,
}

/// Content from a single PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPage {
    /// Page number (1-indexed).
    pub number: u32,
    /// Extracted text from this page (empty if none could be read).
    pub text: String,
    /// Why text extraction failed, if it did.
    pub text_error: Option<String>,
}

impl PdfExtractor {
    /// Create a new PDF extractor for a named document.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document: None,
            raw_data: Vec::new(),
        }
    }

    /// Name of the document being processed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hand over the parsed document.
    pub fn into_document(self) -> Option<Document> {
        self.document
    }

    fn loaded(&self) -> Result<&Document> {
        self.document.as_ref().ok_or_else(|| PdfError::Parse {
            name: self.name.clone(),
            reason: "no document loaded".to_string(),
        })
    }

    /// Run pdf-extract over the whole file, one string per page.
    ///
    /// pdf-extract can panic on malformed input, so the call is isolated.
    fn extract_with_pdf_extract(&self) -> std::result::Result<Vec<String>, String> {
        let data = &self.raw_data;
        match catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(data)
        })) {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("pdf-extract panicked (malformed PDF)".to_string()),
        }
    }

    /// Per-page extraction through lopdf's own text decoder.
    fn extract_with_lopdf(&self, page: u32) -> Result<String> {
        let doc = self.loaded()?;
        doc.extract_text(&[page])
            .map_err(|e| PdfError::Parse {
                name: self.name.clone(),
                reason: format!("page {}: {}", page, e),
            })
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse {
            name: self.name.clone(),
            reason: e.to_string(),
        })?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted(self.name.clone()));
            }
            debug!("Decrypted '{}' with empty password", self.name);

            // pdf-extract reads raw bytes, so hand it the decrypted file
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data).map_err(|e| PdfError::Parse {
                name: self.name.clone(),
                reason: format!("failed to save decrypted PDF: {}", e),
            })?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages(self.name.clone()));
        }

        debug!("Loaded '{}' with {} pages", self.name, page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_pages(&self) -> Vec<PdfPage> {
        let page_count = self.page_count();

        match self.extract_with_pdf_extract() {
            Ok(texts) if texts.len() == page_count as usize => {
                trace!("pdf-extract returned {} pages for '{}'", texts.len(), self.name);
                return texts
                    .into_iter()
                    .zip(1..)
                    .map(|(text, number)| PdfPage {
                        number,
                        text,
                        text_error: None,
                    })
                    .collect();
            }
            Ok(texts) => {
                debug!(
                    "pdf-extract returned {} pages for '{}' ({} expected), falling back to lopdf",
                    texts.len(),
                    self.name,
                    page_count
                );
            }
            Err(e) => {
                debug!("pdf-extract failed on '{}': {}, falling back to lopdf", self.name, e);
            }
        }

        (1..=page_count)
            .map(|number| match self.extract_with_lopdf(number) {
                Ok(text) => PdfPage {
                    number,
                    text,
                    text_error: None,
                },
                Err(e) => {
                    warn!("No text for '{}' page {}: {}", self.name, number, e);
                    PdfPage {
                        number,
                        text: String::new(),
                        text_error: Some(e.to_string()),
                    }
                }
            })
            .collect()
    }
}

/// One input document, fully read: its object graph and the text of each page.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    name: String,
    document: Document,
    pages: Vec<PdfPage>,
}

impl SourceDocument {
    /// Parse a PDF and extract the text of every page.
    pub fn load(name: impl Into<String>, data: &[u8]) -> Result<Self> {
        let mut extractor = PdfExtractor::new(name);
        extractor.load(data)?;
        let pages = extractor.extract_pages();
        let name = extractor.name().to_string();
        let document = extractor.into_document().ok_or_else(|| PdfError::Parse {
            name: name.clone(),
            reason: "no document loaded".to_string(),
        })?;

        Ok(Self {
            name,
            document,
            pages,
        })
    }

    /// Build a source from an already parsed document and page texts
    /// obtained elsewhere. Missing texts are treated as empty pages.
    pub fn from_parts(
        name: impl Into<String>,
        document: Document,
        texts: Vec<String>,
    ) -> Result<Self> {
        let name = name.into();
        let page_count = document.get_pages().len() as u32;
        if page_count == 0 {
            return Err(PdfError::NoPages(name));
        }

        let mut texts = texts.into_iter();
        let pages = (1..=page_count)
            .map(|number| PdfPage {
                number,
                text: texts.next().unwrap_or_default(),
                text_error: None,
            })
            .collect();

        Ok(Self {
            name,
            document,
            pages,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn pages(&self) -> &[PdfPage] {
        &self.pages
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }
}
