//! # Pricing Module
//!
//! The margin/markup formula shared by the quote builder, the cart and the
//! server when it persists quotes.
//!
//! ## The Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  effective_margin   = item.margin_percent ?? parent.global_margin      │
//! │  line_cost_total    = unit_cost_price × quantity                       │
//! │  unit_sale_price    = unit_cost_price × (1 + effective_margin / 100)   │
//! │  line_sale_total    = unit_sale_price × quantity                       │
//! │  line_profit_amount = line_sale_total − line_cost_total                │
//! │                                                                         │
//! │  Example: cost 100, qty 3, margin 25%                                   │
//! │    line_cost_total 300, unit_sale_price 125,                            │
//! │    line_sale_total 375, line_profit_amount 75                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Negative margins are legal and produce a loss; profit is never clamped.
//! Quantity positivity is a UI concern; the formula is defined for any
//! real quantity including zero.
//!
//! ## Aggregation
//! [`Totals`] sums line cost and line sale totals across the items of a
//! quote or cart, and derives profit as `sale − cost`. Summation order does
//! not matter.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;
use crate::lenient::{parse_or_default, LenientNumber};
use crate::PRICE_TOLERANCE;

// =============================================================================
// Inputs
// =============================================================================

/// Raw inputs of one priced line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineInputs {
    pub unit_cost_price: f64,
    pub quantity: f64,
    /// Per-item override; `None` means "use the parent's global margin".
    pub margin_percent: Option<f64>,
}

impl LineInputs {
    pub fn new(unit_cost_price: f64, quantity: f64, margin_percent: Option<f64>) -> Self {
        LineInputs {
            unit_cost_price,
            quantity,
            margin_percent,
        }
    }

    /// Builds inputs from client-supplied values, applying the leniency
    /// policy: malformed cost and quantity become `0`, a malformed margin
    /// becomes "no override".
    pub fn from_lenient(
        unit_cost_price: &LenientNumber,
        quantity: &LenientNumber,
        margin_percent: &LenientNumber,
    ) -> Self {
        LineInputs {
            unit_cost_price: parse_or_default(unit_cost_price, 0.0),
            quantity: parse_or_default(quantity, 0.0),
            margin_percent: margin_percent.as_margin(),
        }
    }
}

/// Resolves the margin that applies to an item.
#[inline]
pub fn effective_margin(item_margin: Option<f64>, global_margin: f64) -> f64 {
    item_margin.unwrap_or(global_margin)
}

// =============================================================================
// Line Pricing
// =============================================================================

/// Computed fields of one line item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LinePricing {
    /// The margin that was actually applied (override or global).
    pub effective_margin_percent: f64,
    pub line_cost_total: f64,
    pub unit_sale_price: f64,
    pub line_sale_total: f64,
    pub line_profit_amount: f64,
}

/// Prices a single line.
///
/// ## Example
/// ```rust
/// use materi_core::pricing::{price_line, LineInputs};
///
/// // A 10% loss: cost 50, qty 2, margin -10
/// let line = price_line(&LineInputs::new(50.0, 2.0, Some(-10.0)), 20.0);
/// assert_eq!(line.unit_sale_price, 45.0);
/// assert_eq!(line.line_profit_amount, -10.0);
/// ```
pub fn price_line(inputs: &LineInputs, global_margin: f64) -> LinePricing {
    let margin = effective_margin(inputs.margin_percent, global_margin);

    let line_cost_total = inputs.unit_cost_price * inputs.quantity;
    let unit_sale_price = inputs.unit_cost_price * (1.0 + margin / 100.0);
    let line_sale_total = unit_sale_price * inputs.quantity;

    LinePricing {
        effective_margin_percent: margin,
        line_cost_total,
        unit_sale_price,
        line_sale_total,
        line_profit_amount: line_sale_total - line_cost_total,
    }
}

/// Compares two amounts within [`PRICE_TOLERANCE`].
pub fn approx_eq(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= PRICE_TOLERANCE * scale
}

/// Computed fields as claimed by a client.
///
/// Any field left `None` is not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClaimedPricing {
    pub line_cost_total: Option<f64>,
    pub unit_sale_price: Option<f64>,
    pub line_sale_total: Option<f64>,
    pub line_profit_amount: Option<f64>,
}

impl ClaimedPricing {
    pub fn from_lenient(
        line_cost_total: &LenientNumber,
        unit_sale_price: &LenientNumber,
        line_sale_total: &LenientNumber,
        line_profit_amount: &LenientNumber,
    ) -> Self {
        ClaimedPricing {
            line_cost_total: line_cost_total.value(),
            unit_sale_price: unit_sale_price.value(),
            line_sale_total: line_sale_total.value(),
            line_profit_amount: line_profit_amount.value(),
        }
    }

    /// True when the client sent no computed fields at all.
    pub fn is_empty(&self) -> bool {
        *self == ClaimedPricing::default()
    }
}

impl LinePricing {
    /// Checks client-supplied totals against this computation.
    ///
    /// Returns the first field that disagrees.
    pub fn verify(&self, claimed: &ClaimedPricing) -> Result<(), CoreError> {
        let checks = [
            ("line_cost_total", claimed.line_cost_total, self.line_cost_total),
            ("unit_sale_price", claimed.unit_sale_price, self.unit_sale_price),
            ("line_sale_total", claimed.line_sale_total, self.line_sale_total),
            ("line_profit_amount", claimed.line_profit_amount, self.line_profit_amount),
        ];

        for (field, claimed, expected) in checks {
            if let Some(claimed) = claimed {
                if !approx_eq(claimed, expected) {
                    return Err(CoreError::PricingMismatch {
                        field: field.to_string(),
                        claimed,
                        expected,
                    });
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// Priced Items
// =============================================================================

/// Anything carrying a cost/quantity/margin snapshot plus stored computed
/// fields: quote line items and cart items.
pub trait Priced {
    /// Raw inputs as currently stored on the item.
    fn pricing_inputs(&self) -> LineInputs;

    /// Overwrites the stored computed fields.
    fn apply_pricing(&mut self, pricing: &LinePricing);

    /// Stored line cost total.
    fn line_cost_total(&self) -> f64;

    /// Stored line sale total.
    fn line_sale_total(&self) -> f64;

    /// Recomputes the stored fields against the parent's global margin.
    fn reprice(&mut self, global_margin: f64) -> LinePricing {
        let pricing = price_line(&self.pricing_inputs(), global_margin);
        self.apply_pricing(&pricing);
        pricing
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Aggregate totals of a quote or cart.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub total_cost: f64,
    pub total_sale_price: f64,
    pub total_profit_amount: f64,
}

impl Totals {
    /// Builds totals from a cost and sale sum.
    pub fn new(total_cost: f64, total_sale_price: f64) -> Self {
        Totals {
            total_cost,
            total_sale_price,
            total_profit_amount: total_sale_price - total_cost,
        }
    }

    /// Aggregates computed line pricings.
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a LinePricing>,
    {
        let (cost, sale) = lines.into_iter().fold((0.0, 0.0), |(c, s), l| {
            (c + l.line_cost_total, s + l.line_sale_total)
        });
        Totals::new(cost, sale)
    }

    /// Aggregates the stored computed fields of priced items.
    pub fn from_items<'a, T, I>(items: I) -> Self
    where
        T: Priced + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let (cost, sale) = items.into_iter().fold((0.0, 0.0), |(c, s), i| {
            (c + i.line_cost_total(), s + i.line_sale_total())
        });
        Totals::new(cost, sale)
    }

    /// Aggregate margin for display: `profit / cost × 100`.
    ///
    /// `None` when there is no cost to divide by.
    pub fn margin_percent(&self) -> Option<f64> {
        if self.total_cost > 0.0 {
            Some(self.total_profit_amount / self.total_cost * 100.0)
        } else {
            None
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
