//! Page level records produced by text extraction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one page: source document name plus 1-based page index.
///
/// Ordering is by document name, then page index, which is the order pages
/// take inside every assembled output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageKey {
    /// Name of the source document.
    pub document: String,
    /// Page number (1-indexed).
    pub page: u32,
}

impl PageKey {
    pub fn new(document: impl Into<String>, page: u32) -> Self {
        Self {
            document: document.into(),
            page,
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' p.{}", self.document, self.page)
    }
}

/// Fields extracted from a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Which page this is.
    pub key: PageKey,

    /// Normalized policy identifier, if one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Normalized customer name, if one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    /// Start of the page text, newlines flattened, for diagnostics.
    pub text_preview: String,
}

/// Build the diagnostic preview of a page text.
pub fn text_preview(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}

/// Normalize an identifier or customer name: trim and uppercase.
///
/// Returns `None` for values that are blank after trimming. Applying it to
/// its own output is a no-op.
pub fn normalize(value: &str) -> Option<String> {
    let normalized = value.trim().to_uppercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_idempotent() {
        for raw in ["  pol001 ", "Rossi S.r.l.", "POL001", "àbc"] {
            let once = normalize(raw).unwrap();
            assert_eq!(normalize(&once), Some(once.clone()));
        }
        assert_eq!(normalize("  pol001 "), Some("POL001".to_string()));
    }

    #[test]
    fn test_normalize_blank() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   \t"), None);
    }

    #[test]
    fn test_page_key_ordering() {
        let mut keys = vec![
            PageKey::new("b.pdf", 1),
            PageKey::new("a.pdf", 10),
            PageKey::new("a.pdf", 2),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                PageKey::new("a.pdf", 2),
                PageKey::new("a.pdf", 10),
                PageKey::new("b.pdf", 1),
            ]
        );
    }

    #[test]
    fn test_text_preview() {
        assert_eq!(text_preview("COMPAGNIA X\nCLIENTE Y", 200), "COMPAGNIA X CLIENTE Y");
        assert_eq!(text_preview("abcdef", 3), "abc");
        assert_eq!(text_preview("", 200), "");
    }
}
