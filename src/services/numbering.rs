//! Per-owner invoice number generation.
//!
//! Numbers look like `INV-00042`. The next number is derived from the owner's
//! most recently *created* invoice (creation order, not lexical order). An
//! unparsable predecessor restarts the sequence at 1; the database unique
//! constraint is the backstop against collisions, and a collision on insert
//! is retried once before surfacing as a conflict.

const PREFIX: &str = "INV-";

/// Derive the next invoice number from the previous one, if any.
pub fn next_invoice_number(last: Option<&str>) -> String {
    let next = last.and_then(parse_sequence).map_or(1, |n| n + 1);
    format_invoice_number(next)
}

/// Format a sequence value as `INV-` plus the value zero-padded to 5 digits.
pub fn format_invoice_number(sequence: u64) -> String {
    format!("{}{:05}", PREFIX, sequence)
}

fn parse_sequence(number: &str) -> Option<u64> {
    number.strip_prefix(PREFIX)?.parse().ok()
}
