//! Identifier and customer name extraction from raw page text.

pub mod patterns;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::config::ExtractionConfig;
use crate::models::page::normalize;

use patterns::CUSTOMER_NAME_TAIL;

/// Fields found on one page. Absent values were simply not found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFields {
    /// Normalized identifier known to the directory.
    pub identifier: Option<String>,
    /// Normalized customer name.
    pub customer_name: Option<String>,
}

impl PageFields {
    pub fn has_identifier(&self) -> bool {
        self.identifier.is_some()
    }

    pub fn has_customer(&self) -> bool {
        self.customer_name.is_some()
    }
}

/// Pulls the policy identifier and customer name out of page text.
#[derive(Debug, Clone)]
pub struct PageFieldExtractor {
    identifier_marker: String,
    customer_marker: String,
}

impl PageFieldExtractor {
    /// Create an extractor with the default markers.
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    /// Create an extractor using the configured markers.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            identifier_marker: config.identifier_marker.clone(),
            customer_marker: config.customer_marker.clone(),
        }
    }

    /// Extract both fields from a page.
    pub fn extract(&self, text: &str, known_identifiers: &HashSet<String>) -> PageFields {
        PageFields {
            identifier: self.extract_identifier(text, known_identifiers),
            customer_name: self.extract_customer(text),
        }
    }

    /// Find the identifier on the first line starting with the marker.
    ///
    /// Only that first marker line is consulted: if none of its tokens is a
    /// known identifier, later marker lines are not searched.
    pub fn extract_identifier(
        &self,
        text: &str,
        known_identifiers: &HashSet<String>,
    ) -> Option<String> {
        let line = text
            .lines()
            .find(|line| line.starts_with(self.identifier_marker.as_str()))?;

        line.split_whitespace()
            .skip(1)
            .map(|token| token.trim().to_uppercase())
            .find(|candidate| known_identifiers.contains(candidate))
    }

    /// Find the customer name following the first usable customer marker.
    pub fn extract_customer(&self, text: &str) -> Option<String> {
        if self.customer_marker.is_empty() {
            return None;
        }

        text.match_indices(self.customer_marker.as_str())
            .find_map(|(start, marker)| {
                let tail = &text[start + marker.len()..];
                CUSTOMER_NAME_TAIL
                    .captures(tail)
                    .map(|caps| caps[1].to_string())
            })
            .and_then(|name| normalize(&name))
    }
}

impl Default for PageFieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}
