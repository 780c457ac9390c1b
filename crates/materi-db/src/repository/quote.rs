//! # Quote Repository
//!
//! Database operations for quotes, including the batch save used by the
//! quote builder.
//!
//! ## Batch Save
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save(QuoteSave { target, items + edit states })                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE                                                        │
//! │  ├── Update { id, .. }  partial header update (number is immutable)    │
//! │  │   Create(header)     validate reservation or reserve inline         │
//! │  ├── EditSession::load(stored items)     ← materi-core                 │
//! │  │   ├── PendingCreate → add     (priced against header margin)        │
//! │  │   ├── Modified      → modify  (not in session? → report.not_found)  │
//! │  │   └── Deleted       → remove  (not in session? → report.not_found)  │
//! │  ├── reprice_all if the global margin changed                          │
//! │  ├── session.plan() → INSERT / UPDATE / DELETE                         │
//! │  └── mark_saved, store quote totals from the surviving items           │
//! │  COMMIT → SaveReport                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quote totals sent by clients are never trusted; they are always summed
//! from the stored items.

use chrono::Utc;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::line_item;
use super::sequence;
use super::{begin_write, ItemDraft};
use crate::error::{DbError, DbResult};
use materi_core::edit::{EditSession, EditState, Identified};
use materi_core::validation::CustomerFields;
use materi_core::{
    format_quote_number, CoreError, Priced, Quote, QuoteLineItem, QuoteStatus, Totals,
    DEFAULT_GLOBAL_MARGIN_PERCENT,
};

// =============================================================================
// Inputs
// =============================================================================

/// List filter. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct QuoteFilter {
    pub id: Option<String>,
    pub vendor_id: Option<String>,
    pub status: Option<QuoteStatus>,
}

/// A validated quote header for creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuote {
    /// A reservation from `GET /quotes/next-number`; reserved inline if `None`.
    pub quote_seq_id: Option<i64>,
    pub vendor_id: String,
    pub customer: CustomerFields,
    pub customer_company: Option<String>,
    pub notes: Option<String>,
    pub status: QuoteStatus,
    pub global_margin_percent: f64,
}

impl NewQuote {
    /// A draft quote with default margin and no reservation.
    pub fn for_customer(vendor_id: impl Into<String>, customer_name: impl Into<String>) -> Self {
        NewQuote {
            quote_seq_id: None,
            vendor_id: vendor_id.into(),
            customer: CustomerFields {
                customer_name: customer_name.into(),
                customer_email: None,
                customer_phone: None,
            },
            customer_company: None,
            notes: None,
            status: QuoteStatus::Draft,
            global_margin_percent: DEFAULT_GLOBAL_MARGIN_PERCENT,
        }
    }

}

/// A partial header update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteUpdate {
    /// Accepted only when equal to the stored value.
    pub quote_seq_id: Option<i64>,
    /// Accepted only when equal to the stored value.
    pub quote_number: Option<String>,
    pub customer_name: Option<String>,
    pub customer_company: Option<Option<String>>,
    pub customer_email: Option<Option<String>>,
    pub customer_phone: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub status: Option<QuoteStatus>,
    pub global_margin_percent: Option<f64>,
}

/// Which quote a batch save writes to.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveTarget {
    /// Create a new quote from a full header.
    Create(NewQuote),
    /// Update an existing quote. Unset header fields keep their stored values.
    Update { quote_id: String, header: QuoteUpdate },
}

/// A batch save from the quote builder.
#[derive(Debug, Clone)]
pub struct QuoteSave {
    pub target: SaveTarget,
    pub items: Vec<(ItemDraft, EditState)>,
}

impl QuoteSave {
    /// The quote being updated, if any.
    pub fn quote_id(&self) -> Option<&str> {
        match &self.target {
            SaveTarget::Create(_) => None,
            SaveTarget::Update { quote_id, .. } => Some(quote_id),
        }
    }
}

/// Outcome of a batch save.
#[derive(Debug, Clone, Serialize)]
pub struct SaveReport {
    pub quote: Quote,
    pub items: Vec<QuoteLineItem>,
    pub inserted: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    /// Rows that vanished before the save reached them.
    pub not_found: Vec<String>,
}

impl SaveReport {
    /// True when no line item was written.
    pub fn is_noop(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for quote database operations.
#[derive(Debug, Clone)]
pub struct QuoteRepository {
    pool: SqlitePool,
}

impl QuoteRepository {
    /// Creates a new QuoteRepository.
    pub fn new(pool: SqlitePool) -> Self {
        QuoteRepository { pool }
    }

    /// Gets a quote by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Quote>> {
        let mut conn = self.pool.acquire().await?;
        fetch_in(&mut *conn, id).await
    }

    /// Lists quotes matching the filter, newest first.
    pub async fn list(&self, filter: &QuoteFilter) -> DbResult<Vec<Quote>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM quotes WHERE 1 = 1");

        if let Some(id) = &filter.id {
            qb.push(" AND id = ").push_bind(id.clone());
        }
        if let Some(vendor_id) = &filter.vendor_id {
            qb.push(" AND vendor_id = ").push_bind(vendor_id.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        qb.push(" ORDER BY created_at DESC, rowid DESC");

        let quotes = qb.build_query_as::<Quote>().fetch_all(&self.pool).await?;
        Ok(quotes)
    }

    /// Creates a quote, stamping it with a quote number.
    ///
    /// ## Reservation Handling
    /// - `quote_seq_id` given: must exist, else `NotFound` before any write
    /// - `quote_seq_id` already used by another quote: `UniqueViolation`
    /// - `quote_seq_id` absent: reserved inside this transaction
    pub async fn create(&self, new: NewQuote) -> DbResult<Quote> {
        let mut tx = begin_write(&self.pool).await?;
        let quote = create_in(&mut *tx, &new).await?;
        tx.commit().await?;

        info!(quote_id = %quote.id, quote_number = %quote.quote_number, "Created quote");
        Ok(quote)
    }

    /// Updates the quote header.
    ///
    /// A changed global margin reprices every item in the same transaction.
    pub async fn update(&self, id: &str, update: &QuoteUpdate) -> DbResult<Quote> {
        let mut tx = begin_write(&self.pool).await?;
        let mut quote = require_in(&mut *tx, id).await?;
        let repriced = apply_update_in(&mut *tx, &mut quote, update).await?;
        refresh_totals_in(&mut *tx, &mut quote, repriced).await?;
        tx.commit().await?;

        debug!(quote_id = %id, repriced, "Updated quote header");
        Ok(quote)
    }

    /// Deletes a quote and, by cascade, its line items.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM quotes WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::QuoteNotFound(id.to_string()).into());
        }

        info!(quote_id = %id, "Deleted quote");
        Ok(())
    }

    /// Persists a header plus a line-item diff in one transaction.
    pub async fn save(&self, save: QuoteSave) -> DbResult<SaveReport> {
        let mut tx = begin_write(&self.pool).await?;

        let (mut quote, margin_changed) = match &save.target {
            SaveTarget::Update { quote_id, header } => {
                let mut quote = require_in(&mut *tx, quote_id).await?;
                let changed = apply_update_in(&mut *tx, &mut quote, header).await?;
                (quote, changed)
            }
            SaveTarget::Create(header) => (create_in(&mut *tx, header).await?, false),
        };
        let margin = quote.global_margin_percent;

        let stored = line_item::fetch_for_quote_in(&mut *tx, &quote.id).await?;
        let mut session = EditSession::load(stored);
        let mut not_found = Vec::new();

        let now = Utc::now();
        for (draft, state) in &save.items {
            let id = draft.id();
            match state {
                EditState::PendingCreate => {
                    session.add(line_item::build_item(&quote.id, margin, draft, now)?);
                }
                EditState::Modified => {
                    let mut overwritten = Ok(());
                    let found = session.modify(id, |item| {
                        overwritten = line_item::overwrite_item(item, draft, margin);
                    });
                    overwritten?;
                    if !found {
                        warn!(item_id = %id, "Line item vanished before update");
                        not_found.push(id.to_string());
                    }
                }
                EditState::Deleted => {
                    if !session.remove(id) {
                        warn!(item_id = %id, "Line item vanished before delete");
                        not_found.push(id.to_string());
                    }
                }
                EditState::Unmodified => {}
            }
        }

        if margin_changed {
            session.reprice_all(margin);
        }

        let plan = session.plan();
        let mut report = SaveReport {
            quote: quote.clone(),
            items: Vec::new(),
            inserted: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
            not_found,
        };

        for item in &plan.inserts {
            line_item::insert_in(&mut *tx, item).await?;
            report.inserted.push(item.id.clone());
        }

        for item in &plan.updates {
            if line_item::update_in(&mut *tx, item).await? {
                report.updated.push(item.id.clone());
            } else {
                report.not_found.push(item.id.clone());
            }
        }

        for id in &plan.deletes {
            if line_item::delete_in(&mut *tx, id).await? {
                report.deleted.push(id.clone());
            } else {
                report.not_found.push(id.clone());
            }
        }

        session.mark_saved();
        report.items = session.live_items().cloned().collect();
        store_totals_in(&mut *tx, &mut quote, &report.items).await?;
        report.quote = quote;

        tx.commit().await?;

        info!(
            quote_id = %report.quote.id,
            inserted = report.inserted.len(),
            updated = report.updated.len(),
            deleted = report.deleted.len(),
            not_found = report.not_found.len(),
            "Saved quote"
        );
        Ok(report)
    }
}

// =============================================================================
// Connection-Level Queries
// =============================================================================

pub(crate) async fn fetch_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Quote>> {
    let quote = sqlx::query_as::<_, Quote>("SELECT * FROM quotes WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(quote)
}

pub(crate) async fn require_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Quote> {
    fetch_in(conn, id)
        .await?
        .ok_or_else(|| CoreError::QuoteNotFound(id.to_string()).into())
}

async fn create_in(conn: &mut SqliteConnection, new: &NewQuote) -> DbResult<Quote> {
    let sequence_id = match new.quote_seq_id {
        Some(seq_id) => {
            if !sequence::exists_in(&mut *conn, seq_id).await? {
                return Err(DbError::not_found(
                    "Quote number reservation",
                    seq_id.to_string(),
                ));
            }
            seq_id
        }
        None => sequence::reserve_in(&mut *conn).await?.sequence_id,
    };

    let now = Utc::now();
    let quote = Quote {
        id: Uuid::new_v4().to_string(),
        quote_seq_id: sequence_id,
        quote_number: format_quote_number(sequence_id),
        vendor_id: new.vendor_id.clone(),
        customer_name: new.customer.customer_name.clone(),
        customer_company: new.customer_company.clone(),
        customer_email: new.customer.customer_email.clone(),
        customer_phone: new.customer.customer_phone.clone(),
        notes: new.notes.clone(),
        status: new.status,
        global_margin_percent: new.global_margin_percent,
        total_cost: 0.0,
        total_sale_price: 0.0,
        total_profit_amount: 0.0,
        created_at: now,
        updated_at: now,
    };

    debug!(quote_id = %quote.id, quote_number = %quote.quote_number, "Inserting quote");

    sqlx::query(
        r#"
        INSERT INTO quotes (
            id, quote_seq_id, quote_number, vendor_id,
            customer_name, customer_company, customer_email, customer_phone, notes,
            status, global_margin_percent,
            total_cost, total_sale_price, total_profit_amount,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7, ?8, ?9,
            ?10, ?11,
            ?12, ?13, ?14,
            ?15, ?16
        )
        "#,
    )
    .bind(&quote.id)
    .bind(quote.quote_seq_id)
    .bind(&quote.quote_number)
    .bind(&quote.vendor_id)
    .bind(&quote.customer_name)
    .bind(&quote.customer_company)
    .bind(&quote.customer_email)
    .bind(&quote.customer_phone)
    .bind(&quote.notes)
    .bind(quote.status)
    .bind(quote.global_margin_percent)
    .bind(quote.total_cost)
    .bind(quote.total_sale_price)
    .bind(quote.total_profit_amount)
    .bind(quote.created_at)
    .bind(quote.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => {
            DbError::duplicate("quote_seq_id", sequence_id.to_string())
        }
        other => other,
    })?;

    Ok(quote)
}

/// Applies a header update to `quote` and writes it.
///
/// Returns whether the global margin changed.
async fn apply_update_in(
    conn: &mut SqliteConnection,
    quote: &mut Quote,
    update: &QuoteUpdate,
) -> DbResult<bool> {
    let seq_changed = update
        .quote_seq_id
        .is_some_and(|seq_id| seq_id != quote.quote_seq_id);
    let number_changed = update
        .quote_number
        .as_deref()
        .is_some_and(|number| number != quote.quote_number);
    if seq_changed || number_changed {
        return Err(CoreError::ImmutableQuoteNumber {
            quote_id: quote.id.clone(),
            quote_number: quote.quote_number.clone(),
        }
        .into());
    }

    if let Some(name) = &update.customer_name {
        quote.customer_name = name.clone();
    }
    if let Some(company) = &update.customer_company {
        quote.customer_company = company.clone();
    }
    if let Some(email) = &update.customer_email {
        quote.customer_email = email.clone();
    }
    if let Some(phone) = &update.customer_phone {
        quote.customer_phone = phone.clone();
    }
    if let Some(notes) = &update.notes {
        quote.notes = notes.clone();
    }
    if let Some(status) = update.status {
        quote.status = status;
    }

    let margin_changed = match update.global_margin_percent {
        Some(margin) if margin != quote.global_margin_percent => {
            quote.global_margin_percent = margin;
            true
        }
        _ => false,
    };

    quote.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE quotes SET
            customer_name = ?2,
            customer_company = ?3,
            customer_email = ?4,
            customer_phone = ?5,
            notes = ?6,
            status = ?7,
            global_margin_percent = ?8,
            updated_at = ?9
        WHERE id = ?1
        "#,
    )
    .bind(&quote.id)
    .bind(&quote.customer_name)
    .bind(&quote.customer_company)
    .bind(&quote.customer_email)
    .bind(&quote.customer_phone)
    .bind(&quote.notes)
    .bind(quote.status)
    .bind(quote.global_margin_percent)
    .bind(quote.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(margin_changed)
}

/// Recomputes the quote aggregates from its stored items and writes them.
///
/// With `reprice`, every item is first repriced against the quote's current
/// global margin. Returns the items as stored afterwards.
pub(crate) async fn refresh_totals_in(
    conn: &mut SqliteConnection,
    quote: &mut Quote,
    reprice: bool,
) -> DbResult<Vec<QuoteLineItem>> {
    let mut items = line_item::fetch_for_quote_in(&mut *conn, &quote.id).await?;

    if reprice {
        let now = Utc::now();
        for item in &mut items {
            item.reprice(quote.global_margin_percent);
            item.updated_at = now;
            line_item::update_in(&mut *conn, item).await?;
        }
        debug!(quote_id = %quote.id, count = items.len(), "Repriced line items");
    }

    store_totals_in(&mut *conn, quote, &items).await?;
    Ok(items)
}

/// Sums `items` into the quote aggregates and writes them.
async fn store_totals_in(
    conn: &mut SqliteConnection,
    quote: &mut Quote,
    items: &[QuoteLineItem],
) -> DbResult<()> {
    let totals = Totals::from_items(items);
    quote.set_totals(&totals);

    sqlx::query(
        r#"
        UPDATE quotes SET
            total_cost = ?2,
            total_sale_price = ?3,
            total_profit_amount = ?4
        WHERE id = ?1
        "#,
    )
    .bind(&quote.id)
    .bind(totals.total_cost)
    .bind(totals.total_sale_price)
    .bind(totals.total_profit_amount)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
