//! # Cart Handlers
//!
//! One persistent cart per vendor. Items carry the same pricing fields as
//! quote line items and follow the cart's global margin unless they have
//! their own override.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use materi_core::validation::validate_required;
use materi_core::{Cart, CartItem, LenientNumber};
use materi_db::{CartFilter, CartItemFilter, CartTotals};

use super::{global_margin, ItemBody, ItemPatchBody};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartQuery {
    pub id: Option<String>,
    pub vendor_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartItemQuery {
    pub vendor_id: Option<String>,
    pub cart_id: Option<String>,
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCartBody {
    #[serde(default)]
    pub vendor_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCartBody {
    #[serde(default)]
    pub global_margin_percent: LenientNumber,
}

/// Target cart is `cart_id` if given, else the vendor's cart (created on
/// demand).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCartItemBody {
    #[serde(default)]
    pub cart_id: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(flatten)]
    pub item: ItemBody,
}

// =============================================================================
// Carts
// =============================================================================

/// `GET /carts?vendor_id=&id=`
pub async fn list_carts(
    State(state): State<AppState>,
    Query(query): Query<CartQuery>,
) -> ApiResult<Json<Vec<Cart>>> {
    let filter = CartFilter {
        id: query.id,
        vendor_id: query.vendor_id,
    };
    let carts = state.db.carts().list(&filter).await?;
    Ok(Json(carts))
}

/// `GET /carts/:id`
pub async fn get_cart(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Cart>> {
    state
        .db
        .carts()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Cart", &id))
}

/// `POST /carts`
///
/// Idempotent: returns the existing cart when the vendor already has one.
pub async fn create_cart(
    State(state): State<AppState>,
    Json(body): Json<CreateCartBody>,
) -> ApiResult<Json<Cart>> {
    let vendor_id = validate_required("vendor_id", body.vendor_id.as_deref().unwrap_or_default())?;
    let cart = state.db.carts().get_or_create(&vendor_id).await?;
    Ok(Json(cart))
}

/// `PATCH /carts/:id`
pub async fn update_cart(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCartBody>,
) -> ApiResult<Json<Cart>> {
    if body.global_margin_percent.is_absent() {
        return Err(ApiError::validation("global_margin_percent is required"));
    }
    let margin = global_margin(&body.global_margin_percent);
    let cart = state.db.carts().update_margin(&id, margin).await?;
    Ok(Json(cart))
}

/// `GET /carts/:id/totals`
pub async fn cart_totals(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CartTotals>> {
    let totals = state.db.carts().totals(&id).await?;
    Ok(Json(totals))
}

// =============================================================================
// Cart Items
// =============================================================================

/// `GET /cart-items?vendor_id=&cart_id=&product_id=`
pub async fn list_cart_items(
    State(state): State<AppState>,
    Query(query): Query<CartItemQuery>,
) -> ApiResult<Json<Vec<CartItem>>> {
    let filter = CartItemFilter {
        vendor_id: query.vendor_id,
        cart_id: query.cart_id,
        product_id: query.product_id,
    };
    let items = state.db.carts().list_items(&filter).await?;
    Ok(Json(items))
}

/// `GET /cart-items/:id`
pub async fn get_cart_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CartItem>> {
    state
        .db
        .carts()
        .get_item(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Cart item", &id))
}

/// `POST /cart-items`
pub async fn create_cart_item(
    State(state): State<AppState>,
    Json(body): Json<CreateCartItemBody>,
) -> ApiResult<(StatusCode, Json<CartItem>)> {
    let draft = body.item.draft(state.config.pricing.reject_mismatch)?;
    let carts = state.db.carts();

    let cart_id = match (body.cart_id, body.vendor_id) {
        (Some(cart_id), _) => cart_id,
        (None, Some(vendor_id)) => carts.get_or_create(&vendor_id).await?.id,
        (None, None) => return Err(ApiError::validation("cart_id or vendor_id is required")),
    };

    debug!(cart_id = %cart_id, product = %draft.snapshot.product_name, "Adding cart item");
    let item = carts.add_item(&cart_id, &draft).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `PATCH /cart-items/:id`
pub async fn update_cart_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ItemPatchBody>,
) -> ApiResult<Json<CartItem>> {
    let patch = body.patch(state.config.pricing.reject_mismatch)?;
    let item = state.db.carts().update_item(&id, &patch).await?;
    Ok(Json(item))
}

/// `DELETE /cart-items/:id`
pub async fn delete_cart_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.carts().delete_item(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
