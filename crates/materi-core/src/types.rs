//! # Domain Types
//!
//! Core domain types used throughout Materi.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────┐              │
//! │  │       Quote          │ 1    * │    QuoteLineItem     │              │
//! │  │  ──────────────────  │───────►│  ──────────────────  │              │
//! │  │  id (UUID)           │        │  product snapshot    │              │
//! │  │  quote_number        │        │  quantity            │              │
//! │  │  global_margin %     │        │  margin_percent?     │              │
//! │  │  totals (snapshot)   │        │  computed fields     │              │
//! │  └──────────────────────┘        └──────────────────────┘              │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────┐              │
//! │  │       Cart           │ 1    * │      CartItem        │              │
//! │  │  one per vendor      │───────►│  same pricing shape  │              │
//! │  │  global_margin %     │        │  as QuoteLineItem    │              │
//! │  └──────────────────────┘        └──────────────────────┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Line items copy product data (name, cost, unit) at the time they are
//! added. Later catalog edits never change an existing quote.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::pricing::{LineInputs, LinePricing, Priced, Totals};
use crate::DEFAULT_UNIT_OF_MEASURE;

/// Generates a new entity id (UUID v4, hyphenated).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// =============================================================================
// Quote Status
// =============================================================================

/// The status of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
pub enum QuoteStatus {
    /// Being edited, not yet shown to the customer.
    #[default]
    Draft,
    /// Sent to the customer.
    Sent,
    /// The customer accepted.
    Accepted,
    /// The customer declined.
    Rejected,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 4] = [
        QuoteStatus::Draft,
        QuoteStatus::Sent,
        QuoteStatus::Accepted,
        QuoteStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "Draft",
            QuoteStatus::Sent => "Sent",
            QuoteStatus::Accepted => "Accepted",
            QuoteStatus::Rejected => "Rejected",
        }
    }

    /// Parses a status name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        QuoteStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

// =============================================================================
// Product Snapshot
// =============================================================================

/// Product data frozen onto a line item when it is added.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSnapshot {
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    pub product_id: Option<String>,
    pub product_name: String,
    pub description: Option<String>,
    pub unit_of_measure: String,
    pub unit_cost_price: f64,
}

impl ProductSnapshot {
    /// Falls back to the default unit when none is given.
    pub fn unit_or_default(unit: Option<String>) -> String {
        unit.filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UNIT_OF_MEASURE.to_string())
    }
}

// =============================================================================
// Quote
// =============================================================================

/// A customer-facing quote owned by one vendor.
///
/// `quote_seq_id` and `quote_number` are fixed at creation. The totals are
/// snapshots refreshed whenever a line item or the global margin changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Quote {
    pub id: String,
    pub quote_seq_id: i64,
    pub quote_number: String,
    pub vendor_id: String,
    pub customer_name: String,
    pub customer_company: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub status: QuoteStatus,
    pub global_margin_percent: f64,
    pub total_cost: f64,
    pub total_sale_price: f64,
    pub total_profit_amount: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    /// Returns the stored aggregate snapshot.
    pub fn totals(&self) -> Totals {
        Totals {
            total_cost: self.total_cost,
            total_sale_price: self.total_sale_price,
            total_profit_amount: self.total_profit_amount,
        }
    }

    /// Replaces the aggregate snapshot.
    pub fn set_totals(&mut self, totals: &Totals) {
        self.total_cost = totals.total_cost;
        self.total_sale_price = totals.total_sale_price;
        self.total_profit_amount = totals.total_profit_amount;
    }
}

// =============================================================================
// Quote Line Item
// =============================================================================

/// One product entry of a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct QuoteLineItem {
    pub id: String,
    pub quote_id: String,
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    pub product_id: Option<String>,
    pub product_name: String,
    pub product_description_snapshot: Option<String>,
    pub unit_of_measure: String,
    pub quantity: f64,
    pub unit_cost_price: f64,
    /// `None` means "use the quote's global margin". Distinct from `Some(0.0)`.
    pub margin_percent: Option<f64>,
    pub line_cost_total: f64,
    pub unit_sale_price: f64,
    pub line_sale_total: f64,
    pub line_profit_amount: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl QuoteLineItem {
    /// Creates a priced line item from a product snapshot.
    pub fn from_snapshot(
        id: String,
        quote_id: String,
        snapshot: ProductSnapshot,
        quantity: f64,
        margin_percent: Option<f64>,
        global_margin: f64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut item = QuoteLineItem {
            id,
            quote_id,
            supplier_id: snapshot.supplier_id,
            supplier_name: snapshot.supplier_name,
            product_id: snapshot.product_id,
            product_name: snapshot.product_name,
            product_description_snapshot: snapshot.description,
            unit_of_measure: snapshot.unit_of_measure,
            quantity,
            unit_cost_price: snapshot.unit_cost_price,
            margin_percent,
            line_cost_total: 0.0,
            unit_sale_price: 0.0,
            line_sale_total: 0.0,
            line_profit_amount: 0.0,
            created_at: now,
            updated_at: now,
        };
        item.reprice(global_margin);
        item
    }

    /// The product snapshot carried by this item.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            supplier_id: self.supplier_id.clone(),
            supplier_name: self.supplier_name.clone(),
            product_id: self.product_id.clone(),
            product_name: self.product_name.clone(),
            description: self.product_description_snapshot.clone(),
            unit_of_measure: self.unit_of_measure.clone(),
            unit_cost_price: self.unit_cost_price,
        }
    }
}

impl Priced for QuoteLineItem {
    fn pricing_inputs(&self) -> LineInputs {
        LineInputs::new(self.unit_cost_price, self.quantity, self.margin_percent)
    }

    fn apply_pricing(&mut self, pricing: &LinePricing) {
        self.line_cost_total = pricing.line_cost_total;
        self.unit_sale_price = pricing.unit_sale_price;
        self.line_sale_total = pricing.line_sale_total;
        self.line_profit_amount = pricing.line_profit_amount;
    }

    fn line_cost_total(&self) -> f64 {
        self.line_cost_total
    }

    fn line_sale_total(&self) -> f64 {
        self.line_sale_total
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A vendor's persistent shopping cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Cart {
    pub id: String,
    pub vendor_id: String,
    pub global_margin_percent: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Cart Item
// =============================================================================

/// One product entry of a cart. Priced exactly like a quote line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub vendor_id: String,
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    pub product_id: Option<String>,
    pub product_name: String,
    pub product_description: Option<String>,
    pub product_image_url: Option<String>,
    pub unit_of_measure: String,
    pub quantity: f64,
    pub unit_cost_price: f64,
    pub margin_percent: Option<f64>,
    pub line_cost_total: f64,
    pub unit_sale_price: f64,
    pub line_sale_total: f64,
    pub line_profit_amount: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a priced cart item from a product snapshot.
    #[allow(clippy::too_many_arguments)]
    pub fn from_snapshot(
        id: String,
        cart: &Cart,
        snapshot: ProductSnapshot,
        product_image_url: Option<String>,
        quantity: f64,
        margin_percent: Option<f64>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut item = CartItem {
            id,
            cart_id: cart.id.clone(),
            vendor_id: cart.vendor_id.clone(),
            supplier_id: snapshot.supplier_id,
            supplier_name: snapshot.supplier_name,
            product_id: snapshot.product_id,
            product_name: snapshot.product_name,
            product_description: snapshot.description,
            product_image_url,
            unit_of_measure: snapshot.unit_of_measure,
            quantity,
            unit_cost_price: snapshot.unit_cost_price,
            margin_percent,
            line_cost_total: 0.0,
            unit_sale_price: 0.0,
            line_sale_total: 0.0,
            line_profit_amount: 0.0,
            created_at: now,
            updated_at: now,
        };
        item.reprice(cart.global_margin_percent);
        item
    }
}

impl Priced for CartItem {
    fn pricing_inputs(&self) -> LineInputs {
        LineInputs::new(self.unit_cost_price, self.quantity, self.margin_percent)
    }

    fn apply_pricing(&mut self, pricing: &LinePricing) {
        self.line_cost_total = pricing.line_cost_total;
        self.unit_sale_price = pricing.unit_sale_price;
        self.line_sale_total = pricing.line_sale_total;
        self.line_profit_amount = pricing.line_profit_amount;
    }

    fn line_cost_total(&self) -> f64 {
        self.line_cost_total
    }

    fn line_sale_total(&self) -> f64 {
        self.line_sale_total
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(cost: f64) -> ProductSnapshot {
        ProductSnapshot {
            supplier_id: Some("sup-1".to_string()),
            supplier_name: Some("Aceros SA".to_string()),
            product_id: Some("prod-1".to_string()),
            product_name: "Rebar 8mm".to_string(),
            description: None,
            unit_of_measure: "bar".to_string(),
            unit_cost_price: cost,
        }
    }

    fn cart(margin: f64) -> Cart {
        Cart {
            id: "cart-1".to_string(),
            vendor_id: "vendor-1".to_string(),
            global_margin_percent: margin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_default_and_parse() {
        assert_eq!(QuoteStatus::default(), QuoteStatus::Draft);
        assert_eq!(QuoteStatus::parse("accepted"), Some(QuoteStatus::Accepted));
        assert_eq!(QuoteStatus::parse(" Sent "), Some(QuoteStatus::Sent));
        assert_eq!(QuoteStatus::parse("archived"), None);
    }

    #[test]
    fn test_status_serializes_capitalized() {
        let json = serde_json::to_string(&QuoteStatus::Rejected).unwrap();
        assert_eq!(json, "\"Rejected\"");
    }

    #[test]
    fn test_line_item_priced_on_creation() {
        let item = QuoteLineItem::from_snapshot(
            "li-1".to_string(),
            "q-1".to_string(),
            snapshot(100.0),
            3.0,
            Some(25.0),
            20.0,
            Utc::now(),
        );
        assert_eq!(item.line_cost_total, 300.0);
        assert_eq!(item.line_sale_total, 375.0);
        assert_eq!(item.line_profit_amount, 75.0);
    }

    #[test]
    fn test_line_item_reprices_on_global_change() {
        let mut item = QuoteLineItem::from_snapshot(
            "li-1".to_string(),
            "q-1".to_string(),
            snapshot(10.0),
            2.0,
            None,
            20.0,
            Utc::now(),
        );
        assert!((item.unit_sale_price - 12.0).abs() < 1e-9);

        item.reprice(50.0);
        assert!((item.unit_sale_price - 15.0).abs() < 1e-9);
        assert!((item.line_profit_amount - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_cart_item_uses_cart_margin() {
        let item = CartItem::from_snapshot(
            "ci-1".to_string(),
            &cart(10.0),
            snapshot(200.0),
            None,
            1.0,
            None,
            Utc::now(),
        );
        assert!((item.unit_sale_price - 220.0).abs() < 1e-9);
        assert_eq!(item.vendor_id, "vendor-1");
    }

    #[test]
    fn test_totals_from_items() {
        let c = cart(20.0);
        let items = vec![
            CartItem::from_snapshot("a".into(), &c, snapshot(100.0), None, 3.0, Some(25.0), Utc::now()),
            CartItem::from_snapshot("b".into(), &c, snapshot(50.0), None, 2.0, Some(-10.0), Utc::now()),
        ];
        let totals = Totals::from_items(&items);
        assert!((totals.total_cost - 400.0).abs() < 1e-9);
        assert!((totals.total_profit_amount - 65.0).abs() < 1e-9);
    }

    #[test]
    fn test_unit_or_default() {
        assert_eq!(ProductSnapshot::unit_or_default(None), "unit");
        assert_eq!(ProductSnapshot::unit_or_default(Some("  ".into())), "unit");
        assert_eq!(ProductSnapshot::unit_or_default(Some("kg".into())), "kg");
    }
}
