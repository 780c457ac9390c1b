//! # Quote Line Item Repository
//!
//! Database operations for the priced product entries of a quote.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create / update / delete line item                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE                                                        │
//! │  ├── load parent quote (global margin)                                 │
//! │  ├── price_line(inputs, global)      ← materi-core                     │
//! │  ├── verify client totals (if sent)  → PricingMismatch, rollback       │
//! │  ├── write the item row                                                │
//! │  └── refresh quote totals from all of its items                        │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::quote::{self, refresh_totals_in};
use super::{begin_write, verify_claimed, ItemDraft, ItemPatch};
use crate::error::DbResult;
use materi_core::{CoreError, Priced, QuoteLineItem};

/// Repository for quote line item database operations.
#[derive(Debug, Clone)]
pub struct LineItemRepository {
    pool: SqlitePool,
}

impl LineItemRepository {
    /// Creates a new LineItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LineItemRepository { pool }
    }

    /// Lists the items of a quote in insertion order.
    pub async fn list(&self, quote_id: &str) -> DbResult<Vec<QuoteLineItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_for_quote_in(&mut *conn, quote_id).await
    }

    /// Gets a line item by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<QuoteLineItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_in(&mut *conn, id).await
    }

    /// Adds a priced item to a quote and refreshes the quote totals.
    pub async fn create(&self, quote_id: &str, draft: &ItemDraft) -> DbResult<QuoteLineItem> {
        let mut tx = begin_write(&self.pool).await?;

        let mut quote = quote::require_in(&mut *tx, quote_id).await?;
        let item = build_item(&quote.id, quote.global_margin_percent, draft, Utc::now())?;

        debug!(quote_id = %quote.id, item_id = %item.id, "Inserting line item");
        insert_in(&mut *tx, &item).await?;
        refresh_totals_in(&mut *tx, &mut quote, false).await?;

        tx.commit().await?;
        Ok(item)
    }

    /// Applies a partial update, reprices the item and refreshes the totals.
    pub async fn update(&self, id: &str, patch: &ItemPatch) -> DbResult<QuoteLineItem> {
        let mut tx = begin_write(&self.pool).await?;

        let mut item = fetch_in(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::LineItemNotFound(id.to_string()))?;
        let mut quote = quote::require_in(&mut *tx, &item.quote_id).await?;

        apply_patch(&mut item, patch);
        let pricing = item.reprice(quote.global_margin_percent);
        verify_claimed(patch.claimed.as_ref(), &pricing)?;
        item.updated_at = Utc::now();

        debug!(item_id = %item.id, "Updating line item");
        update_in(&mut *tx, &item).await?;
        refresh_totals_in(&mut *tx, &mut quote, false).await?;

        tx.commit().await?;
        Ok(item)
    }

    /// Deletes a line item and refreshes the quote totals.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        let item = fetch_in(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::LineItemNotFound(id.to_string()))?;
        let mut quote = quote::require_in(&mut *tx, &item.quote_id).await?;

        debug!(item_id = %id, quote_id = %quote.id, "Deleting line item");
        delete_in(&mut *tx, id).await?;
        refresh_totals_in(&mut *tx, &mut quote, false).await?;

        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Building and Patching
// =============================================================================

/// Prices a draft against the quote's global margin.
///
/// Fails with `PricingMismatch` when the draft carries disagreeing totals.
pub(crate) fn build_item(
    quote_id: &str,
    global_margin: f64,
    draft: &ItemDraft,
    now: DateTime<Utc>,
) -> DbResult<QuoteLineItem> {
    let item = QuoteLineItem::from_snapshot(
        Uuid::new_v4().to_string(),
        quote_id.to_string(),
        draft.snapshot.clone(),
        draft.quantity,
        draft.margin_percent,
        global_margin,
        now,
    );

    let pricing = materi_core::price_line(&item.pricing_inputs(), global_margin);
    verify_claimed(draft.claimed.as_ref(), &pricing)?;
    Ok(item)
}

/// Overwrites an existing item with the full contents of a draft.
pub(crate) fn overwrite_item(
    item: &mut QuoteLineItem,
    draft: &ItemDraft,
    global_margin: f64,
) -> DbResult<()> {
    let snapshot = draft.snapshot.clone();
    item.supplier_id = snapshot.supplier_id;
    item.supplier_name = snapshot.supplier_name;
    item.product_id = snapshot.product_id;
    item.product_name = snapshot.product_name;
    item.product_description_snapshot = snapshot.description;
    item.unit_of_measure = snapshot.unit_of_measure;
    item.unit_cost_price = snapshot.unit_cost_price;
    item.quantity = draft.quantity;
    item.margin_percent = draft.margin_percent;

    let pricing = item.reprice(global_margin);
    verify_claimed(draft.claimed.as_ref(), &pricing)?;
    item.updated_at = Utc::now();
    Ok(())
}

fn apply_patch(item: &mut QuoteLineItem, patch: &ItemPatch) {
    let mut snapshot = item.snapshot();
    let mut quantity = item.quantity;
    let mut margin = item.margin_percent;
    patch.apply(&mut snapshot, &mut quantity, &mut margin);

    item.product_name = snapshot.product_name;
    item.product_description_snapshot = snapshot.description;
    item.unit_of_measure = snapshot.unit_of_measure;
    item.unit_cost_price = snapshot.unit_cost_price;
    item.quantity = quantity;
    item.margin_percent = margin;
}

// =============================================================================
// Connection-Level Queries
// =============================================================================
// Shared with the quote and cart repositories so multi-step writes can run on
// one transaction.

pub(crate) async fn fetch_in(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<QuoteLineItem>> {
    let item = sqlx::query_as::<_, QuoteLineItem>("SELECT * FROM quote_line_items WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

pub(crate) async fn fetch_for_quote_in(
    conn: &mut SqliteConnection,
    quote_id: &str,
) -> DbResult<Vec<QuoteLineItem>> {
    let items = sqlx::query_as::<_, QuoteLineItem>(
        "SELECT * FROM quote_line_items WHERE quote_id = ?1 ORDER BY created_at, rowid",
    )
    .bind(quote_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

pub(crate) async fn insert_in(conn: &mut SqliteConnection, item: &QuoteLineItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO quote_line_items (
            id, quote_id,
            supplier_id, supplier_name, product_id, product_name,
            product_description_snapshot, unit_of_measure,
            quantity, unit_cost_price, margin_percent,
            line_cost_total, unit_sale_price, line_sale_total, line_profit_amount,
            created_at, updated_at
        ) VALUES (
            ?1, ?2,
            ?3, ?4, ?5, ?6,
            ?7, ?8,
            ?9, ?10, ?11,
            ?12, ?13, ?14, ?15,
            ?16, ?17
        )
        "#,
    )
    .bind(&item.id)
    .bind(&item.quote_id)
    .bind(&item.supplier_id)
    .bind(&item.supplier_name)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(&item.product_description_snapshot)
    .bind(&item.unit_of_measure)
    .bind(item.quantity)
    .bind(item.unit_cost_price)
    .bind(item.margin_percent)
    .bind(item.line_cost_total)
    .bind(item.unit_sale_price)
    .bind(item.line_sale_total)
    .bind(item.line_profit_amount)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes every mutable column. Returns `false` if the row is gone.
pub(crate) async fn update_in(conn: &mut SqliteConnection, item: &QuoteLineItem) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE quote_line_items SET
            supplier_id = ?2,
            supplier_name = ?3,
            product_id = ?4,
            product_name = ?5,
            product_description_snapshot = ?6,
            unit_of_measure = ?7,
            quantity = ?8,
            unit_cost_price = ?9,
            margin_percent = ?10,
            line_cost_total = ?11,
            unit_sale_price = ?12,
            line_sale_total = ?13,
            line_profit_amount = ?14,
            updated_at = ?15
        WHERE id = ?1
        "#,
    )
    .bind(&item.id)
    .bind(&item.supplier_id)
    .bind(&item.supplier_name)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(&item.product_description_snapshot)
    .bind(&item.unit_of_measure)
    .bind(item.quantity)
    .bind(item.unit_cost_price)
    .bind(item.margin_percent)
    .bind(item.line_cost_total)
    .bind(item.unit_sale_price)
    .bind(item.line_sale_total)
    .bind(item.line_profit_amount)
    .bind(item.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns `false` if the row was already gone.
pub(crate) async fn delete_in(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM quote_line_items WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Unit Tests
// =============================================================================
