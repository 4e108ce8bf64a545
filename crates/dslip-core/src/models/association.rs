//! Page to producer associations and operator overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::page::PageKey;

/// Where the producer of an association came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Found by joining the extracted identifier against the directory.
    Extracted,
    /// Forced by an operator assignment.
    Manual,
}

/// A candidate link between one page and one producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAssociation {
    /// Which page this is.
    pub key: PageKey,

    /// Identifier extracted from the page.
    pub identifier: Option<String>,

    /// Customer name extracted from the page.
    pub customer_name: Option<String>,

    /// Producer the page is routed to, if any.
    pub producer: Option<String>,

    /// Provenance of `producer`.
    pub origin: Origin,
}

/// One operator assignment, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentEntry {
    pub document: String,
    pub page: u32,
    pub producer: String,
}

/// Operator maintained page to producer assignments.
///
/// Keys are unique; assigning a page again replaces the previous producer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AssignmentEntry>", into = "Vec<AssignmentEntry>")]
pub struct ManualAssignments {
    entries: BTreeMap<PageKey, String>,
}

impl ManualAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a page to a producer, returning the replaced producer.
    pub fn assign(&mut self, key: PageKey, producer: impl Into<String>) -> Option<String> {
        self.entries.insert(key, producer.into())
    }

    /// Remove the assignment for a page.
    pub fn unassign(&mut self, key: &PageKey) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &PageKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &PageKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PageKey, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load assignments from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save assignments to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

/// Entries with a blank producer leave the page unassigned.
impl From<Vec<AssignmentEntry>> for ManualAssignments {
    fn from(entries: Vec<AssignmentEntry>) -> Self {
        let mut assignments = Self::new();
        for entry in entries.into_iter().filter(|e| !e.producer.trim().is_empty()) {
            assignments.assign(PageKey::new(entry.document, entry.page), entry.producer);
        }
        assignments
    }
}

impl From<ManualAssignments> for Vec<AssignmentEntry> {
    fn from(assignments: ManualAssignments) -> Self {
        assignments
            .entries
            .into_iter()
            .map(|(key, producer)| AssignmentEntry {
                document: key.document,
                page: key.page,
                producer,
            })
            .collect()
    }
}
