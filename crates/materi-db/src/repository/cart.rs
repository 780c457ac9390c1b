//! # Cart Repository
//!
//! Database operations for vendor carts and cart items.
//!
//! ## Cart Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  vendor ──1:1──► Cart { global_margin_percent }                        │
//! │                    │                                                    │
//! │                    └──1:*──► CartItem (unique per product)             │
//! │                                                                         │
//! │  add_item(product already in cart)  → quantities merge                 │
//! │  update_margin(cart)                → every item repriced              │
//! │  export_quote(quote → cart)         → each line merged or added,       │
//! │                                       margin overrides preserved       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{begin_write, line_item, quote, verify_claimed, ItemDraft, ItemPatch};
use crate::error::DbResult;
use materi_core::{
    price_line, Cart, CartItem, CoreError, LineInputs, Priced, ProductSnapshot, Totals,
    DEFAULT_GLOBAL_MARGIN_PERCENT,
};

// =============================================================================
// Inputs and Outputs
// =============================================================================

/// Cart list filter.
#[derive(Debug, Clone, Default)]
pub struct CartFilter {
    pub id: Option<String>,
    pub vendor_id: Option<String>,
}

/// Cart item list filter.
#[derive(Debug, Clone, Default)]
pub struct CartItemFilter {
    pub vendor_id: Option<String>,
    pub cart_id: Option<String>,
    pub product_id: Option<String>,
}

/// Aggregate view of a cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartTotals {
    pub cart_id: String,
    pub item_count: usize,
    #[serde(flatten)]
    pub totals: Totals,
    /// `profit / cost × 100`; absent for an empty or zero-cost cart.
    pub margin_percent: Option<f64>,
}

/// Outcome of exporting a quote into a cart.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub cart: Cart,
    pub added: Vec<String>,
    pub merged: Vec<String>,
    pub items: Vec<CartItem>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Returns the vendor's cart, creating it with the default margin.
    pub async fn get_or_create(&self, vendor_id: &str) -> DbResult<Cart> {
        let mut conn = self.pool.acquire().await?;
        get_or_create_in(&mut *conn, vendor_id).await
    }

    /// Gets a cart by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Cart>> {
        let mut conn = self.pool.acquire().await?;
        fetch_in(&mut *conn, id).await
    }

    /// Lists carts matching the filter.
    pub async fn list(&self, filter: &CartFilter) -> DbResult<Vec<Cart>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM carts WHERE 1 = 1");
        if let Some(id) = &filter.id {
            qb.push(" AND id = ").push_bind(id.clone());
        }
        if let Some(vendor_id) = &filter.vendor_id {
            qb.push(" AND vendor_id = ").push_bind(vendor_id.clone());
        }
        qb.push(" ORDER BY created_at, rowid");

        let carts = qb.build_query_as::<Cart>().fetch_all(&self.pool).await?;
        Ok(carts)
    }

    /// Changes the cart's global margin and reprices every item.
    pub async fn update_margin(&self, cart_id: &str, global_margin_percent: f64) -> DbResult<Cart> {
        let mut tx = begin_write(&self.pool).await?;

        let mut cart = require_in(&mut *tx, cart_id).await?;
        cart.global_margin_percent = global_margin_percent;
        cart.updated_at = Utc::now();

        sqlx::query("UPDATE carts SET global_margin_percent = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&cart.id)
            .bind(cart.global_margin_percent)
            .bind(cart.updated_at)
            .execute(&mut *tx)
            .await?;

        let mut items = fetch_items_in(&mut *tx, &cart.id).await?;
        for item in &mut items {
            item.reprice(global_margin_percent);
            item.updated_at = cart.updated_at;
            update_item_in(&mut *tx, item).await?;
        }

        tx.commit().await?;

        info!(cart_id = %cart.id, margin = global_margin_percent, items = items.len(), "Repriced cart");
        Ok(cart)
    }

    /// Aggregate totals of a cart.
    pub async fn totals(&self, cart_id: &str) -> DbResult<CartTotals> {
        let mut conn = self.pool.acquire().await?;
        let cart = require_in(&mut *conn, cart_id).await?;
        let items = fetch_items_in(&mut *conn, &cart.id).await?;

        let totals = Totals::from_items(&items);
        Ok(CartTotals {
            cart_id: cart.id,
            item_count: items.len(),
            margin_percent: totals.margin_percent(),
            totals,
        })
    }

    // -------------------------------------------------------------------------
    // Cart Items
    // -------------------------------------------------------------------------

    /// Lists cart items matching the filter.
    pub async fn list_items(&self, filter: &CartItemFilter) -> DbResult<Vec<CartItem>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM cart_items WHERE 1 = 1");
        if let Some(vendor_id) = &filter.vendor_id {
            qb.push(" AND vendor_id = ").push_bind(vendor_id.clone());
        }
        if let Some(cart_id) = &filter.cart_id {
            qb.push(" AND cart_id = ").push_bind(cart_id.clone());
        }
        if let Some(product_id) = &filter.product_id {
            qb.push(" AND product_id = ").push_bind(product_id.clone());
        }
        qb.push(" ORDER BY created_at, rowid");

        let items = qb.build_query_as::<CartItem>().fetch_all(&self.pool).await?;
        Ok(items)
    }

    /// Gets a cart item by ID.
    pub async fn get_item(&self, id: &str) -> DbResult<Option<CartItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_item_in(&mut *conn, id).await
    }

    /// Adds a product to a cart.
    ///
    /// If the product is already in the cart its quantity grows by the
    /// draft's quantity instead.
    pub async fn add_item(&self, cart_id: &str, draft: &ItemDraft) -> DbResult<CartItem> {
        let mut tx = begin_write(&self.pool).await?;
        let cart = require_in(&mut *tx, cart_id).await?;

        // Claimed totals describe the submitted line, before any merge.
        let inputs = LineInputs::new(
            draft.snapshot.unit_cost_price,
            draft.quantity,
            draft.margin_percent,
        );
        let pricing = price_line(&inputs, cart.global_margin_percent);
        verify_claimed(draft.claimed.as_ref(), &pricing)?;

        let (item, _) = add_or_merge_in(&mut *tx, &cart, draft).await?;
        tx.commit().await?;
        Ok(item)
    }

    /// Applies a partial update to a cart item and reprices it.
    pub async fn update_item(&self, id: &str, patch: &ItemPatch) -> DbResult<CartItem> {
        let mut tx = begin_write(&self.pool).await?;

        let mut item = fetch_item_in(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::LineItemNotFound(id.to_string()))?;
        let cart = require_in(&mut *tx, &item.cart_id).await?;

        let mut snapshot = item_snapshot(&item);
        patch.apply(&mut snapshot, &mut item.quantity, &mut item.margin_percent);
        item.product_name = snapshot.product_name;
        item.product_description = snapshot.description;
        item.unit_of_measure = snapshot.unit_of_measure;
        item.unit_cost_price = snapshot.unit_cost_price;

        let pricing = item.reprice(cart.global_margin_percent);
        verify_claimed(patch.claimed.as_ref(), &pricing)?;
        item.updated_at = Utc::now();

        update_item_in(&mut *tx, &item).await?;
        tx.commit().await?;

        debug!(item_id = %item.id, "Updated cart item");
        Ok(item)
    }

    /// Removes an item from its cart.
    pub async fn delete_item(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::LineItemNotFound(id.to_string()).into());
        }
        Ok(())
    }

    /// Copies every line item of a quote into the vendor's cart.
    ///
    /// Products already in the cart have their quantity increased. Explicit
    /// margin overrides travel with the item; items without one follow the
    /// cart's global margin.
    pub async fn export_quote(&self, quote_id: &str, vendor_id: &str) -> DbResult<ExportReport> {
        let mut tx = begin_write(&self.pool).await?;

        let quote = quote::require_in(&mut *tx, quote_id).await?;
        let lines = line_item::fetch_for_quote_in(&mut *tx, &quote.id).await?;
        if lines.is_empty() {
            return Err(CoreError::EmptyExport(quote.id).into());
        }

        let cart = get_or_create_in(&mut *tx, vendor_id).await?;
        let mut report = ExportReport {
            cart: cart.clone(),
            added: Vec::new(),
            merged: Vec::new(),
            items: Vec::new(),
        };

        for line in &lines {
            let draft = ItemDraft::new(line.snapshot(), line.quantity, line.margin_percent);
            let (item, merged) = add_or_merge_in(&mut *tx, &cart, &draft).await?;
            if merged {
                report.merged.push(item.id);
            } else {
                report.added.push(item.id);
            }
        }

        report.items = fetch_items_in(&mut *tx, &cart.id).await?;
        tx.commit().await?;

        info!(
            quote_id = %quote_id,
            cart_id = %cart.id,
            added = report.added.len(),
            merged = report.merged.len(),
            "Exported quote to cart"
        );
        Ok(report)
    }
}

// =============================================================================
// Connection-Level Queries
// =============================================================================

async fn fetch_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Cart>> {
    let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(cart)
}

async fn require_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Cart> {
    fetch_in(conn, id)
        .await?
        .ok_or_else(|| CoreError::CartNotFound(id.to_string()).into())
}

async fn get_or_create_in(conn: &mut SqliteConnection, vendor_id: &str) -> DbResult<Cart> {
    let now = Utc::now();

    let inserted = sqlx::query(
        r#"
        INSERT INTO carts (id, vendor_id, global_margin_percent, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        ON CONFLICT (vendor_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(vendor_id)
    .bind(DEFAULT_GLOBAL_MARGIN_PERCENT)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected()
        > 0;

    if inserted {
        info!(vendor_id = %vendor_id, "Created cart");
    }

    let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE vendor_id = ?1")
        .bind(vendor_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(cart)
}

async fn fetch_item_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<CartItem>> {
    let item = sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

async fn fetch_items_in(conn: &mut SqliteConnection, cart_id: &str) -> DbResult<Vec<CartItem>> {
    let items = sqlx::query_as::<_, CartItem>(
        "SELECT * FROM cart_items WHERE cart_id = ?1 ORDER BY created_at, rowid",
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

/// Inserts the draft, or grows the existing row for the same product.
///
/// Returns the stored item and whether it was merged.
async fn add_or_merge_in(
    conn: &mut SqliteConnection,
    cart: &Cart,
    draft: &ItemDraft,
) -> DbResult<(CartItem, bool)> {
    let existing = match &draft.snapshot.product_id {
        Some(product_id) => {
            sqlx::query_as::<_, CartItem>(
                "SELECT * FROM cart_items WHERE cart_id = ?1 AND product_id = ?2",
            )
            .bind(&cart.id)
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?
        }
        None => None,
    };

    if let Some(mut item) = existing {
        item.quantity += draft.quantity;
        if draft.margin_percent.is_some() {
            item.margin_percent = draft.margin_percent;
        }
        item.reprice(cart.global_margin_percent);
        item.updated_at = Utc::now();
        update_item_in(&mut *conn, &item).await?;

        debug!(cart_id = %cart.id, item_id = %item.id, quantity = item.quantity, "Merged cart item");
        return Ok((item, true));
    }

    let item = CartItem::from_snapshot(
        Uuid::new_v4().to_string(),
        cart,
        draft.snapshot.clone(),
        draft.product_image_url.clone(),
        draft.quantity,
        draft.margin_percent,
        Utc::now(),
    );
    insert_item_in(&mut *conn, &item).await?;

    debug!(cart_id = %cart.id, item_id = %item.id, "Inserted cart item");
    Ok((item, false))
}

async fn insert_item_in(conn: &mut SqliteConnection, item: &CartItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cart_items (
            id, cart_id, vendor_id,
            supplier_id, supplier_name, product_id, product_name,
            product_description, product_image_url, unit_of_measure,
            quantity, unit_cost_price, margin_percent,
            line_cost_total, unit_sale_price, line_sale_total, line_profit_amount,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3,
            ?4, ?5, ?6, ?7,
            ?8, ?9, ?10,
            ?11, ?12, ?13,
            ?14, ?15, ?16, ?17,
            ?18, ?19
        )
        "#,
    )
    .bind(&item.id)
    .bind(&item.cart_id)
    .bind(&item.vendor_id)
    .bind(&item.supplier_id)
    .bind(&item.supplier_name)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(&item.product_description)
    .bind(&item.product_image_url)
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

async fn update_item_in(conn: &mut SqliteConnection, item: &CartItem) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE cart_items SET
            product_name = ?2,
            product_description = ?3,
            unit_of_measure = ?4,
            quantity = ?5,
            unit_cost_price = ?6,
            margin_percent = ?7,
            line_cost_total = ?8,
            unit_sale_price = ?9,
            line_sale_total = ?10,
            line_profit_amount = ?11,
            updated_at = ?12
        WHERE id = ?1
        "#,
    )
    .bind(&item.id)
    .bind(&item.product_name)
    .bind(&item.product_description)
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

    Ok(())
}

fn item_snapshot(item: &CartItem) -> ProductSnapshot {
    ProductSnapshot {
        supplier_id: item.supplier_id.clone(),
        supplier_name: item.supplier_name.clone(),
        product_id: item.product_id.clone(),
        product_name: item.product_name.clone(),
        description: item.product_description.clone(),
        unit_of_measure: item.unit_of_measure.clone(),
        unit_cost_price: item.unit_cost_price,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
