//! ISBN candidate filtering.
//!
//! The decoder reports every barcode it sees; only codes shaped like book
//! identifiers are worth a lookup. Anything else is ignored and scanning
//! continues.

use regex::Regex;
use std::sync::LazyLock;

/// 13-digit codes must carry a Bookland prefix.
static ISBN13: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^97[89]\d{10}$").unwrap());

/// ISBN-10: nine digits and a digit or X check character.
static ISBN10: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{9}[\dXx]$").unwrap());

/// Strip separators a decoder or a human may leave in a code.
pub fn normalize(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Whether a decoded code is shaped like a book identifier.
pub fn is_candidate(code: &str) -> bool {
    let code = normalize(code);
    ISBN13.is_match(&code) || ISBN10.is_match(&code)
}
