//! # Repository Module
//!
//! Database repository implementations for Materi.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.quotes().save(batch)                                       │
//! │       ▼                                                                 │
//! │  QuoteRepository                                                       │
//! │  ├── begin transaction                                                 │
//! │  ├── validate / reserve quote number   (sequence.rs)                   │
//! │  ├── apply line-item diff              (line_item.rs)                  │
//! │  ├── refresh aggregates                (materi-core Totals)            │
//! │  └── commit                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Multi-statement writes open with `BEGIN IMMEDIATE` via [`begin_write`]:
//! they read before they write, and a deferred SQLite transaction cannot
//! upgrade to a writer once another connection has committed.
//!
//! Every write that touches computed fields recomputes them with
//! `materi_core::pricing` inside the same transaction as the write.
//!
//! ## Available Repositories
//!
//! - [`SequenceRepository`](sequence::SequenceRepository) - Quote number reservation
//! - [`QuoteRepository`](quote::QuoteRepository) - Quote CRUD and batch save
//! - [`LineItemRepository`](line_item::LineItemRepository) - Quote line items
//! - [`CartRepository`](cart::CartRepository) - Carts, cart items, quote export

pub mod cart;
pub mod line_item;
pub mod quote;
pub mod sequence;

use sqlx::{Sqlite, SqlitePool, Transaction};

use materi_core::edit::Identified;
use materi_core::pricing::ClaimedPricing;
use materi_core::{LinePricing, ProductSnapshot};

use crate::error::DbResult;

/// Opens a transaction holding the database write lock.
///
/// Concurrent writers queue on the busy timeout instead of failing with
/// `database is locked`.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    let tx = pool.begin_with("BEGIN IMMEDIATE").await?;
    Ok(tx)
}

// =============================================================================
// Item Inputs
// =============================================================================

/// A line item or cart item as submitted for creation.
///
/// Numbers are already coerced; `claimed` carries client-computed fields
/// that must agree with the recomputation when present.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    /// Existing id for updates and deletes inside a batch save.
    pub id: Option<String>,
    pub snapshot: ProductSnapshot,
    /// Cart items only.
    pub product_image_url: Option<String>,
    pub quantity: f64,
    pub margin_percent: Option<f64>,
    pub claimed: Option<ClaimedPricing>,
}

impl ItemDraft {
    pub fn new(snapshot: ProductSnapshot, quantity: f64, margin_percent: Option<f64>) -> Self {
        ItemDraft {
            id: None,
            snapshot,
            product_image_url: None,
            quantity,
            margin_percent,
            claimed: None,
        }
    }
}

impl Identified for ItemDraft {
    fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }
}

/// A partial update of a line item or cart item.
///
/// `None` leaves the field untouched. For `margin_percent`, `Some(None)`
/// clears the override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub product_name: Option<String>,
    pub description: Option<Option<String>>,
    pub unit_of_measure: Option<String>,
    pub unit_cost_price: Option<f64>,
    pub quantity: Option<f64>,
    pub margin_percent: Option<Option<f64>>,
    pub claimed: Option<ClaimedPricing>,
}

impl ItemPatch {
    /// Applies the patched fields to a mutable view of an item snapshot.
    fn apply(
        &self,
        snapshot: &mut ProductSnapshot,
        quantity: &mut f64,
        margin_percent: &mut Option<f64>,
    ) {
        if let Some(name) = &self.product_name {
            snapshot.product_name = name.clone();
        }
        if let Some(description) = &self.description {
            snapshot.description = description.clone();
        }
        if let Some(unit) = &self.unit_of_measure {
            snapshot.unit_of_measure = unit.clone();
        }
        if let Some(cost) = self.unit_cost_price {
            snapshot.unit_cost_price = cost;
        }
        if let Some(qty) = self.quantity {
            *quantity = qty;
        }
        if let Some(margin) = self.margin_percent {
            *margin_percent = margin;
        }
    }
}

/// Rejects client-computed fields that disagree with `pricing`.
fn verify_claimed(claimed: Option<&ClaimedPricing>, pricing: &LinePricing) -> DbResult<()> {
    if let Some(claimed) = claimed {
        pricing.verify(claimed)?;
    }
    Ok(())
}
