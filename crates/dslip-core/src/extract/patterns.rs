//! Regex patterns for page field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Customer name following the customer marker: whitespace, then a run of
    // uppercase letters, digits and the punctuation found in company names.
    pub static ref CUSTOMER_NAME_TAIL: Regex = Regex::new(
        r"^\s+([A-Z0-9' .,&/-]+)"
    ).unwrap();
}
