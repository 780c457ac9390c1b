//! Quote line item handlers.
//!
//! Every write recomputes the item and the parent quote's totals.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use materi_core::validation::validate_required;
use materi_core::QuoteLineItem;

use super::{ItemBody, ItemPatchBody};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemQuery {
    pub quote_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLineItemBody {
    #[serde(default)]
    pub quote_id: Option<String>,
    #[serde(flatten)]
    pub item: ItemBody,
}

/// `GET /quote-line-items?quote_id=`
pub async fn list_line_items(
    State(state): State<AppState>,
    Query(query): Query<LineItemQuery>,
) -> ApiResult<Json<Vec<QuoteLineItem>>> {
    let items = state.db.line_items().list(&query.quote_id).await?;
    Ok(Json(items))
}

/// `GET /quote-line-items/:id`
pub async fn get_line_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<QuoteLineItem>> {
    state
        .db
        .line_items()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Line item", &id))
}

/// `POST /quote-line-items`
pub async fn create_line_item(
    State(state): State<AppState>,
    Json(body): Json<CreateLineItemBody>,
) -> ApiResult<(StatusCode, Json<QuoteLineItem>)> {
    let quote_id = validate_required("quote_id", body.quote_id.as_deref().unwrap_or_default())?;
    let draft = body.item.draft(state.config.pricing.reject_mismatch)?;

    let item = state.db.line_items().create(&quote_id, &draft).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `PATCH /quote-line-items/:id`
pub async fn update_line_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ItemPatchBody>,
) -> ApiResult<Json<QuoteLineItem>> {
    let patch = body.patch(state.config.pricing.reject_mismatch)?;
    let item = state.db.line_items().update(&id, &patch).await?;
    Ok(Json(item))
}

/// `DELETE /quote-line-items/:id`
pub async fn delete_line_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.line_items().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
