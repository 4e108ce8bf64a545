//! Joining extracted page identifiers against the producer directory.

use tracing::debug;

use crate::directory::ProducerDirectory;
use crate::models::association::{Origin, PageAssociation};
use crate::models::page::PageRecord;

/// Left outer join of pages against the directory on identifier.
///
/// Every page yields at least one association. A page whose identifier is
/// absent or unknown gets a single association without producer; a page whose
/// identifier appears on several directory rows gets one association per row.
/// A directory row without producer leaves its pages unmatched.
pub fn match_pages(pages: &[PageRecord], directory: &ProducerDirectory) -> Vec<PageAssociation> {
    let mut associations = Vec::with_capacity(pages.len());

    for page in pages {
        let unmatched = || PageAssociation {
            key: page.key.clone(),
            identifier: page.identifier.clone(),
            customer_name: page.customer_name.clone(),
            producer: None,
            origin: Origin::Extracted,
        };

        let Some(identifier) = page.identifier.as_deref() else {
            associations.push(unmatched());
            continue;
        };

        let before = associations.len();
        associations.extend(directory.lookup(identifier).map(|record| PageAssociation {
            producer: record.producer.clone(),
            ..unmatched()
        }));

        match associations.len() - before {
            0 => associations.push(unmatched()),
            1 => {}
            n => debug!("{} matches {} directory rows for '{}'", page.key, n, identifier),
        }
    }

    associations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::ProducerRecord;
    use crate::models::page::PageKey;
    use pretty_assertions::assert_eq;

    fn record(identifier: &str, producer: &str) -> ProducerRecord {
        ProducerRecord {
            identifier: identifier.to_string(),
            producer: Some(producer.to_string()).filter(|p| !p.is_empty()),
            customer_name: None,
        }
    }

    fn page(document: &str, number: u32, identifier: Option<&str>) -> PageRecord {
        PageRecord {
            key: PageKey::new(document, number),
            identifier: identifier.map(str::to_string),
            customer_name: Some("ROSSI SRL".to_string()),
            text_preview: String::new(),
        }
    }

    fn producers(associations: &[PageAssociation]) -> Vec<Option<&str>> {
        associations.iter().map(|a| a.producer.as_deref()).collect()
    }

    #[test]
    fn test_single_match() {
        let directory = ProducerDirectory::from_records(vec![record("POL001", "Acme & Co")]);
        let result = match_pages(&[page("a.pdf", 1, Some("POL001"))], &directory);
        assert_eq!(
            result,
            vec![PageAssociation {
                key: PageKey::new("a.pdf", 1),
                identifier: Some("POL001".to_string()),
                customer_name: Some("ROSSI SRL".to_string()),
                producer: Some("Acme & Co".to_string()),
                origin: Origin::Extracted,
            }]
        );
    }

    #[test]
    fn test_pages_without_match_are_kept() {
        let directory = ProducerDirectory::from_records(vec![record("POL001", "Acme & Co")]);
        let pages = [page("a.pdf", 1, None), page("a.pdf", 2, Some("POL404"))];
        let result = match_pages(&pages, &directory);
        assert_eq!(result.len(), 2);
        assert_eq!(producers(&result), vec![None, None]);
        assert_eq!(result[1].identifier.as_deref(), Some("POL404"));
    }

    #[test]
    fn test_duplicate_identifier_fans_out() {
        let directory = ProducerDirectory::from_records(vec![
            record("POL002", "X"),
            record("POL001", "Acme & Co"),
            record("POL002", "Y"),
        ]);
        let pages = [page("a.pdf", 1, Some("POL002")), page("a.pdf", 2, Some("POL001"))];
        let result = match_pages(&pages, &directory);
        assert_eq!(producers(&result), vec![Some("X"), Some("Y"), Some("Acme & Co")]);
        assert!(result[..2].iter().all(|a| a.key == PageKey::new("a.pdf", 1)));
    }

    #[test]
    fn test_row_without_producer_leaves_page_unmatched() {
        let directory =
            ProducerDirectory::from_records(vec![record("POLX", ""), record("POLY", "P")]);
        let result = match_pages(&[page("a.pdf", 1, Some("POLX"))], &directory);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].identifier.as_deref(), Some("POLX"));
        assert_eq!(result[0].producer, None);
    }

    #[test]
    fn test_empty_directory() {
        let directory = ProducerDirectory::default();
        let result = match_pages(&[page("a.pdf", 1, Some("POL001"))], &directory);
        assert_eq!(producers(&result), vec![None]);
    }
}
