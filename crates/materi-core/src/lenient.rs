//! # Lenient Numeric Parsing
//!
//! Client forms send numbers in every shape: JSON numbers, numeric strings,
//! empty strings, `null`, or nothing at all. Materi never rejects a write
//! because a number is malformed; it degrades to a default instead.
//!
//! ## Leniency Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  JSON input            LenientNumber      cost / quantity   margin      │
//! │  ─────────────────     ──────────────     ───────────────   ─────────── │
//! │  (field absent)        Absent             default (0)       global      │
//! │  null, ""              Null               default (0)       global      │
//! │  12.5, "12.5"          Number(12.5)       12.5              12.5        │
//! │  "abc", true, [..]     Malformed          default (0)       global      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This is an accepted quirk kept for compatibility with existing clients.
//! All coercion goes through [`parse_or_default`] so the policy lives in one
//! place.
//!
//! `Absent` and `Null` are kept apart so partial updates can tell
//! "leave this field alone" from "clear this margin override".

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A numeric field as received from a client.
///
/// Use `#[serde(default)]` on the field so a missing key becomes
/// [`LenientNumber::Absent`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LenientNumber {
    /// The field was not present in the payload.
    #[default]
    Absent,
    /// Explicit `null` or an empty/blank string.
    Null,
    /// A finite number, possibly parsed from a string.
    Number(f64),
    /// Anything that cannot be read as a finite number.
    Malformed,
}

impl LenientNumber {
    /// Classifies an arbitrary JSON value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => LenientNumber::Null,
            Value::Number(n) => match n.as_f64() {
                Some(v) if v.is_finite() => LenientNumber::Number(v),
                _ => LenientNumber::Malformed,
            },
            Value::String(s) => Self::from_str_lenient(s),
            _ => LenientNumber::Malformed,
        }
    }

    fn from_str_lenient(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return LenientNumber::Null;
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => LenientNumber::Number(v),
            _ => LenientNumber::Malformed,
        }
    }

    /// Returns the number if one was supplied.
    #[inline]
    pub fn value(&self) -> Option<f64> {
        match self {
            LenientNumber::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// True when the field was missing from the payload entirely.
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, LenientNumber::Absent)
    }

    /// Reads the value as a margin override.
    ///
    /// Anything that is not a number means "no override", so the item falls
    /// back to the parent's global margin.
    #[inline]
    pub fn as_margin(&self) -> Option<f64> {
        self.value()
    }
}

impl From<f64> for LenientNumber {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            LenientNumber::Number(v)
        } else {
            LenientNumber::Malformed
        }
    }
}

impl From<Option<f64>> for LenientNumber {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(v) => LenientNumber::from(v),
            None => LenientNumber::Null,
        }
    }
}

impl<'de> Deserialize<'de> for LenientNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(LenientNumber::from_value(&value))
    }
}

/// Coerces a client-supplied number, falling back to `default`.
///
/// ## Example
/// ```rust
/// use materi_core::lenient::{parse_or_default, LenientNumber};
///
/// assert_eq!(parse_or_default(&LenientNumber::Number(3.5), 0.0), 3.5);
/// assert_eq!(parse_or_default(&LenientNumber::Malformed, 0.0), 0.0);
/// assert_eq!(parse_or_default(&LenientNumber::Absent, 20.0), 20.0);
/// ```
#[inline]
pub fn parse_or_default(value: &LenientNumber, default: f64) -> f64 {
    value.value().unwrap_or(default)
}

// =============================================================================
// Unit Tests
// =============================================================================
