//! # Quote Numbers
//!
//! Human-readable quote identifiers derived from the database sequence.
//!
//! ## Format
//! ```text
//! sequence id 42       →  "Q-000042"
//! sequence id 999999   →  "Q-999999"
//! sequence id 1234567  →  "Q-1234567"   (padding only widens, never truncates)
//! ```
//!
//! The sequence itself lives in the database (see `materi-db`); this module
//! only formats and parses.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{QUOTE_NUMBER_PREFIX, QUOTE_NUMBER_WIDTH};

/// Formats a sequence id as a quote number.
///
/// ## Example
/// ```rust
/// use materi_core::format_quote_number;
///
/// assert_eq!(format_quote_number(1), "Q-000001");
/// assert_eq!(format_quote_number(1_000_000), "Q-1000000");
/// ```
pub fn format_quote_number(sequence_id: i64) -> String {
    format!(
        "{}{:0width$}",
        QUOTE_NUMBER_PREFIX,
        sequence_id,
        width = QUOTE_NUMBER_WIDTH
    )
}

/// Extracts the sequence id from a quote number.
///
/// Returns `None` unless the input is the prefix followed by at least
/// [`QUOTE_NUMBER_WIDTH`] digits.
pub fn parse_quote_number(quote_number: &str) -> Option<i64> {
    let digits = quote_number.strip_prefix(QUOTE_NUMBER_PREFIX)?;
    if digits.len() < QUOTE_NUMBER_WIDTH || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// A reserved slot in the quote number sequence.
///
/// Serialized as `{ "seqId": 42, "quote_number": "Q-000042" }`, the shape the
/// quote builder already consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuoteNumberReservation {
    #[serde(rename = "seqId")]
    pub sequence_id: i64,
    pub quote_number: String,
}

impl QuoteNumberReservation {
    pub fn new(sequence_id: i64) -> Self {
        QuoteNumberReservation {
            sequence_id,
            quote_number: format_quote_number(sequence_id),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
