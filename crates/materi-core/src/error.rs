//! # Error Types
//!
//! Domain-specific error types for materi-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  materi-core errors (this file)                                        │
//! │  ├── CoreError        - Quote/cart rule violations                     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  materi-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  HTTP errors (apps/api)                                                │
//! │  └── ApiError         - What the client sees (JSON body + status)      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Malformed numbers are never an error here; see [`crate::lenient`].

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Quote cannot be found.
    #[error("Quote not found: {0}")]
    QuoteNotFound(String),

    /// Cart cannot be found.
    #[error("Cart not found: {0}")]
    CartNotFound(String),

    /// Quote line item or cart item cannot be found.
    #[error("Line item not found: {0}")]
    LineItemNotFound(String),

    /// An update tried to change the quote number of an existing quote.
    ///
    /// ## When This Occurs
    /// - PATCH carries a `quote_number` or `quote_seq_id` different from the
    ///   stored one
    ///
    /// Numbers are stamped once at creation and never change afterwards.
    #[error("Quote {quote_id} already has number {quote_number}; it cannot be changed")]
    ImmutableQuoteNumber {
        quote_id: String,
        quote_number: String,
    },

    /// Client-computed totals disagree with the server's recomputation.
    ///
    /// ## When This Occurs
    /// ```text
    /// Client sends line_sale_total: 360
    ///      │
    ///      ▼
    /// Server recomputes: 100 × 1.25 × 3 = 375
    ///      │
    ///      ▼
    /// PricingMismatch { field: "line_sale_total", claimed: 360, expected: 375 }
    /// ```
    #[error("Pricing mismatch on {field}: client sent {claimed}, expected {expected}")]
    PricingMismatch {
        field: String,
        claimed: f64,
        expected: f64,
    },

    /// A quote with no line items cannot be exported to the cart.
    #[error("Quote {0} has no line items to export")]
    EmptyExport(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before any write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid email, unknown status).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
