//! Applying operator assignments on top of automatic matches.

use std::collections::HashSet;

use tracing::debug;

use crate::models::association::{ManualAssignments, Origin, PageAssociation};
use crate::models::page::PageKey;

/// Outcome of merging manual assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideReport {
    /// Pages whose producer was forced by an assignment.
    pub applied: Vec<(PageKey, String)>,
    /// Assignments naming a page that is not part of the batch.
    pub unknown: Vec<PageKey>,
}

/// Overwrite the producer of every association whose page has a manual
/// assignment, whatever the automatic match found.
pub fn apply_overrides(
    associations: &mut [PageAssociation],
    assignments: &ManualAssignments,
) -> OverrideReport {
    let mut report = OverrideReport::default();
    if assignments.is_empty() {
        return report;
    }

    for association in associations.iter_mut() {
        let Some(producer) = assignments.get(&association.key) else {
            continue;
        };
        if association.producer.as_deref() != Some(producer) {
            debug!(
                "{}: {:?} -> '{}' (manual)",
                association.key, association.producer, producer
            );
        }
        association.producer = Some(producer.to_string());
        association.origin = Origin::Manual;
    }

    let present: HashSet<&PageKey> = associations.iter().map(|a| &a.key).collect();
    for (key, producer) in assignments.iter() {
        if present.contains(key) {
            report.applied.push((key.clone(), producer.to_string()));
        } else {
            report.unknown.push(key.clone());
        }
    }

    report
}
