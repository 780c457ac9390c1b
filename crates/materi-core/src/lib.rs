//! # materi-core: Pure Business Logic for Materi
//!
//! This crate holds the quote pricing model and quote-number formatting as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Materi Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (React)                             │   │
//! │  │    Quote Builder ──► Cart ──► Quotes list                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum handlers)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ materi-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌──────────┐  │   │
//! │  │   │  pricing  │  │  lenient  │  │quote_number│  │   edit   │  │   │
//! │  │   │ LinePrice │  │ parse_or_ │  │  Q-000042  │  │ SavePlan │  │   │
//! │  │   │  Totals   │  │  default  │  │            │  │          │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    materi-db (Database Layer)                   │   │
//! │  │         SQLite queries, migrations, quote number sequence      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`pricing`] - Margin/markup formula and aggregation
//! - [`lenient`] - Forgiving numeric parsing for client input
//! - [`quote_number`] - `Q-NNNNNN` formatting and parsing
//! - [`types`] - Domain types (Quote, QuoteLineItem, Cart, CartItem)
//! - [`edit`] - Line-item edit session and save diff
//! - [`validation`] - Quote header validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use materi_core::pricing::{price_line, LineInputs};
//!
//! let line = price_line(&LineInputs::new(100.0, 3.0, Some(25.0)), 20.0);
//!
//! assert_eq!(line.line_cost_total, 300.0);
//! assert_eq!(line.unit_sale_price, 125.0);
//! assert_eq!(line.line_sale_total, 375.0);
//! assert_eq!(line.line_profit_amount, 75.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod edit;
pub mod error;
pub mod lenient;
pub mod pricing;
pub mod quote_number;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use lenient::{parse_or_default, LenientNumber};
pub use pricing::{price_line, LineInputs, LinePricing, Priced, Totals};
pub use quote_number::{format_quote_number, parse_quote_number, QuoteNumberReservation};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Markup applied to every line of a new quote or cart unless overridden.
pub const DEFAULT_GLOBAL_MARGIN_PERCENT: f64 = 20.0;

/// Unit of measure recorded when a product snapshot carries none.
pub const DEFAULT_UNIT_OF_MEASURE: &str = "unit";

/// Prefix of every human-readable quote number.
pub const QUOTE_NUMBER_PREFIX: &str = "Q-";

/// Minimum digit count of the numeric part of a quote number.
///
/// Numbers are zero-padded up to this width and never truncated beyond it.
pub const QUOTE_NUMBER_WIDTH: usize = 6;

/// Tolerance used when comparing client-computed totals with ours.
///
/// Applied relative to the larger magnitude, floored at this absolute value.
pub const PRICE_TOLERANCE: f64 = 1e-6;
