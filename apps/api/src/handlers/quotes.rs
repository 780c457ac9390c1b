//! # Quote Handlers
//!
//! ## Builder Round Trip
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Open builder    GET  /quotes/next-number    → { seqId, quote_number }  │
//! │                                                                         │
//! │  Edit items      (client-side; flags isNew / isModified / isDeleted)    │
//! │                                                                         │
//! │  Save            POST /quotes/save                                      │
//! │                  {                                                      │
//! │                    "quote_id": null | "<uuid>",                         │
//! │                    "quote": { "quote_seq_id": 42, "vendor_id", ... },   │
//! │                    "items": [ { "isNew": true, ... }, ... ]             │
//! │                  }                                                      │
//! │                  → { quote, items, inserted, updated, deleted,          │
//! │                      not_found }                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use materi_core::edit::EditState;
use materi_core::validation::{
    validate_customer, validate_customer_name, validate_email, validate_phone, validate_required,
};
use materi_core::{LenientNumber, ProductSnapshot, Quote, QuoteNumberReservation, QuoteStatus};
use materi_db::{
    ExportReport, ItemDraft, NewQuote, QuoteFilter, QuoteSave, QuoteUpdate, SaveReport, SaveTarget,
};

use super::{global_margin, nullable, parse_seq_id, parse_status, ItemBody};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Trims a free-text field; blank becomes `None`.
fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteQuery {
    pub id: Option<String>,
    pub vendor_id: Option<String>,
    pub status: Option<String>,
}

/// Quote header for creation, `PATCH` and batch save.
///
/// On create the header is validated as a whole. On update absent fields are
/// left alone and `null` clears the optional customer fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteHeaderBody {
    /// Reservation from `GET /quotes/next-number`.
    #[serde(default)]
    pub quote_seq_id: LenientNumber,
    /// Accepted on update only when equal to the stored number.
    #[serde(default)]
    pub quote_number: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub customer_company: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub customer_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub customer_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub global_margin_percent: LenientNumber,
}

impl QuoteHeaderBody {
    /// Validates the header for a new quote. Nothing is written if this fails.
    pub fn new_quote(&self) -> ApiResult<NewQuote> {
        let vendor_id = validate_required("vendor_id", self.vendor_id.as_deref().unwrap_or_default())?;
        let customer = validate_customer(
            self.customer_name.as_deref().unwrap_or_default(),
            self.customer_email.clone().flatten().as_deref(),
            self.customer_phone.clone().flatten().as_deref(),
        )?;
        let status = match self.status.as_deref() {
            Some(status) => parse_status(status)?,
            None => QuoteStatus::Draft,
        };

        Ok(NewQuote {
            quote_seq_id: parse_seq_id(&self.quote_seq_id)?,
            vendor_id,
            customer,
            customer_company: optional_text(self.customer_company.clone().flatten().as_deref()),
            notes: optional_text(self.notes.clone().flatten().as_deref()),
            status,
            global_margin_percent: global_margin(&self.global_margin_percent),
        })
    }

    /// The header as a partial update of an existing quote.
    pub fn update(&self) -> ApiResult<QuoteUpdate> {
        let customer_name = match &self.customer_name {
            Some(name) => Some(validate_customer_name(name)?),
            None => None,
        };
        let customer_email = match &self.customer_email {
            Some(email) => Some(validate_email(email.as_deref())?),
            None => None,
        };
        let customer_phone = match &self.customer_phone {
            Some(phone) => Some(validate_phone(phone.as_deref())?),
            None => None,
        };
        let status = match self.status.as_deref() {
            Some(status) => Some(parse_status(status)?),
            None => None,
        };
        let global_margin_percent = if self.global_margin_percent.is_absent() {
            None
        } else {
            Some(global_margin(&self.global_margin_percent))
        };

        Ok(QuoteUpdate {
            quote_seq_id: parse_seq_id(&self.quote_seq_id)?,
            quote_number: self.quote_number.clone(),
            customer_name,
            customer_company: self
                .customer_company
                .as_ref()
                .map(|company| optional_text(company.as_deref())),
            customer_email,
            customer_phone,
            notes: self.notes.as_ref().map(|notes| optional_text(notes.as_deref())),
            status,
            global_margin_percent,
        })
    }
}

/// One line item in a batch save, with the builder's edit flags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveItemBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "isNew", alias = "is_new")]
    pub is_new: bool,
    #[serde(default, rename = "isModified", alias = "is_modified")]
    pub is_modified: bool,
    #[serde(default, rename = "isDeleted", alias = "is_deleted")]
    pub is_deleted: bool,
    #[serde(flatten)]
    pub item: ItemBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteSaveBody {
    /// Existing quote; a new one is created when absent.
    #[serde(default)]
    pub quote_id: Option<String>,
    pub quote: QuoteHeaderBody,
    #[serde(default)]
    pub items: Vec<SaveItemBody>,
}

impl QuoteSaveBody {
    /// Validates the whole batch up front and pairs each item with its state.
    pub fn into_save(self, verify: bool) -> ApiResult<QuoteSave> {
        let target = match optional_text(self.quote_id.as_deref()) {
            Some(quote_id) => SaveTarget::Update {
                quote_id,
                header: self.quote.update()?,
            },
            None => SaveTarget::Create(self.quote.new_quote()?),
        };

        let mut items = Vec::with_capacity(self.items.len());
        for body in &self.items {
            let Some(state) = EditState::from_flags(body.is_new, body.is_modified, body.is_deleted)
            else {
                continue;
            };

            let draft = match state {
                EditState::PendingCreate => body.item.draft(verify)?,
                EditState::Unmodified => continue,
                EditState::Modified | EditState::Deleted => {
                    let Some(id) = body.id.clone() else {
                        debug!(?state, "Skipping stored item without id");
                        continue;
                    };
                    let mut draft = if state == EditState::Modified {
                        body.item.draft(verify)?
                    } else {
                        ItemDraft::new(ProductSnapshot::default(), 0.0, None)
                    };
                    draft.id = Some(id);
                    draft
                }
            };
            items.push((draft, state));
        }

        Ok(QuoteSave { target, items })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportBody {
    /// Target cart owner; defaults to the quote's vendor.
    #[serde(default)]
    pub vendor_id: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /quotes/next-number`
pub async fn next_number(State(state): State<AppState>) -> ApiResult<Json<QuoteNumberReservation>> {
    let reservation = state.db.sequences().reserve_next().await?;
    Ok(Json(reservation))
}

/// `GET /quotes?id=&vendor_id=&status=`
pub async fn list_quotes(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> ApiResult<Json<Vec<Quote>>> {
    let status = match query.status.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(status) => Some(parse_status(status)?),
    };
    let filter = QuoteFilter {
        id: optional_text(query.id.as_deref()),
        vendor_id: optional_text(query.vendor_id.as_deref()),
        status,
    };

    let quotes = state.db.quotes().list(&filter).await?;
    Ok(Json(quotes))
}

/// `GET /quotes/:id`
pub async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Quote>> {
    state
        .db
        .quotes()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Quote", &id))
}

/// `POST /quotes`
pub async fn create_quote(
    State(state): State<AppState>,
    Json(body): Json<QuoteHeaderBody>,
) -> ApiResult<(StatusCode, Json<Quote>)> {
    let new = body.new_quote()?;
    let quote = state.db.quotes().create(new).await?;
    Ok((StatusCode::CREATED, Json(quote)))
}

/// `PATCH /quotes/:id`
pub async fn update_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<QuoteHeaderBody>,
) -> ApiResult<Json<Quote>> {
    let update = body.update()?;
    let quote = state.db.quotes().update(&id, &update).await?;
    Ok(Json(quote))
}

/// `DELETE /quotes/:id`
pub async fn delete_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.quotes().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /quotes/save`
pub async fn save_quote(
    State(state): State<AppState>,
    Json(body): Json<QuoteSaveBody>,
) -> ApiResult<Json<SaveReport>> {
    let save = body.into_save(state.config.pricing.reject_mismatch)?;
    debug!(quote_id = ?save.quote_id(), items = save.items.len(), "Batch save");

    let report = state.db.quotes().save(save).await?;
    Ok(Json(report))
}

/// `POST /quotes/:id/export-to-cart`
pub async fn export_to_cart(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ExportBody>>,
) -> ApiResult<Json<ExportReport>> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let vendor_id = match optional_text(body.vendor_id.as_deref()) {
        Some(vendor_id) => vendor_id,
        None => {
            state
                .db
                .quotes()
                .get(&id)
                .await?
                .ok_or_else(|| ApiError::not_found("Quote", &id))?
                .vendor_id
        }
    };

    let report = state.db.carts().export_quote(&id, &vendor_id).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_header_requires_customer_name() {
        let body: QuoteHeaderBody =
            serde_json::from_value(json!({ "vendor_id": "v1", "customer_name": "  " })).unwrap();
        assert!(body.new_quote().is_err());
    }

    #[test]
    fn test_header_defaults() {
        let body: QuoteHeaderBody =
            serde_json::from_value(json!({ "vendor_id": "v1", "customer_name": "Acme" })).unwrap();
        let new = body.new_quote().unwrap();
        assert_eq!(new.quote_seq_id, None);
        assert_eq!(new.status, QuoteStatus::Draft);
        assert_eq!(new.global_margin_percent, 20.0);
    }

    #[test]
    fn test_header_rejects_malformed_seq_id() {
        let body: QuoteHeaderBody = serde_json::from_value(json!({
            "vendor_id": "v1",
            "customer_name": "Acme",
            "quote_seq_id": "not-a-number",
        }))
        .unwrap();
        assert!(body.new_quote().is_err());
    }

    #[test]
    fn test_patch_null_clears_email() {
        let body: QuoteHeaderBody =
            serde_json::from_value(json!({ "customer_email": null })).unwrap();
        let update = body.update().unwrap();
        assert_eq!(update.customer_email, Some(None));
        assert_eq!(update.customer_phone, None);
        assert_eq!(update.global_margin_percent, None);
    }

    #[test]
    fn test_save_maps_flags_to_states() {
        let body: QuoteSaveBody = serde_json::from_value(json!({
            "quote": { "vendor_id": "v1", "customer_name": "Acme" },
            "items": [
                { "isNew": true, "product_name": "Sand", "unit_cost_price": 10, "quantity": 2 },
                { "id": "a", "isModified": true, "product_name": "Brick", "quantity": 1 },
                { "id": "b", "isDeleted": true },
                { "id": "c" },
                { "isNew": true, "isDeleted": true, "product_name": "Ghost" },
            ],
        }))
        .unwrap();

        let save = body.into_save(true).unwrap();
        assert!(matches!(save.target, SaveTarget::Create(_)));
        let states: Vec<EditState> = save.items.iter().map(|(_, state)| *state).collect();
        assert_eq!(
            states,
            vec![EditState::PendingCreate, EditState::Modified, EditState::Deleted]
        );
        assert_eq!(save.items[0].0.id, None);
        assert_eq!(save.items[1].0.id.as_deref(), Some("a"));
        assert_eq!(save.items[2].0.id.as_deref(), Some("b"));
    }

    #[test]
    fn test_save_deleted_item_needs_no_product_name() {
        let body: QuoteSaveBody = serde_json::from_value(json!({
            "quote_id": "q1",
            "quote": { "vendor_id": "v1", "customer_name": "Acme" },
            "items": [{ "id": "b", "isDeleted": true }],
        }))
        .unwrap();
        assert!(body.into_save(true).is_ok());
    }

    #[test]
    fn test_save_to_existing_quote_leaves_absent_fields_alone() {
        let body: QuoteSaveBody = serde_json::from_value(json!({
            "quote_id": "q1",
            "quote": { "vendor_id": "v1", "customer_name": "Acme" },
        }))
        .unwrap();

        let save = body.into_save(true).unwrap();
        let SaveTarget::Update { quote_id, header } = save.target else {
            panic!("expected an update");
        };
        assert_eq!(quote_id, "q1");
        assert_eq!(header.customer_name.as_deref(), Some("Acme"));
        assert_eq!(header.global_margin_percent, None);
        assert_eq!(header.notes, None);
        assert_eq!(header.customer_email, None);
    }
}
