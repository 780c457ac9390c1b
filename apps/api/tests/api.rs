//! Router-level tests against an in-memory database.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use materi_api::{router, AppConfig, AppState};
use materi_db::{Database, DbConfig};

async fn app_with(config: AppConfig) -> Router {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    router(AppState::new(db, config))
}

async fn app() -> Router {
    app_with(AppConfig::default()).await
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_quote(app: &Router) -> Value {
    let (status, quote) = send(
        app,
        Method::POST,
        "/quotes",
        Some(json!({ "vendor_id": "vendor-1", "customer_name": "Acme Builders" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    quote
}

fn approx(value: &Value, expected: f64) -> bool {
    value.as_f64().is_some_and(|v| (v - expected).abs() < 1e-9)
}

// =============================================================================
// Health & Quote Numbers
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "database": true }));
}

#[tokio::test]
async fn test_next_number_increases() {
    let app = app().await;

    let (status, first) = send(&app, Method::GET, "/quotes/next-number", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, json!({ "seqId": 1, "quote_number": "Q-000001" }));

    let (_, second) = send(&app, Method::GET, "/quotes/next-number", None).await;
    assert_eq!(second["seqId"], 2);
    assert_eq!(second["quote_number"], "Q-000002");
}

#[tokio::test]
async fn test_create_with_reservation_uses_reserved_number() {
    let app = app().await;
    let (_, reservation) = send(&app, Method::GET, "/quotes/next-number", None).await;

    let (status, quote) = send(
        &app,
        Method::POST,
        "/quotes",
        Some(json!({
            "quote_seq_id": reservation["seqId"],
            "vendor_id": "vendor-1",
            "customer_name": "Acme",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(quote["quote_number"], reservation["quote_number"]);
    assert_eq!(quote["status"], "Draft");
    assert_eq!(quote["global_margin_percent"], 20.0);
}

#[tokio::test]
async fn test_unknown_reservation_rejected_before_write() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/quotes",
        Some(json!({ "quote_seq_id": 999, "vendor_id": "vendor-1", "customer_name": "Acme" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (_, quotes) = send(&app, Method::GET, "/quotes", None).await;
    assert_eq!(quotes, json!([]));

    // no reservation was created on the failed path
    let (_, next) = send(&app, Method::GET, "/quotes/next-number", None).await;
    assert_eq!(next["seqId"], 1);
}

#[tokio::test]
async fn test_malformed_reservation_is_bad_request() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/quotes",
        Some(json!({ "quote_seq_id": "abc", "vendor_id": "vendor-1", "customer_name": "Acme" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_reused_reservation_conflicts() {
    let app = app().await;
    let (_, reservation) = send(&app, Method::GET, "/quotes/next-number", None).await;
    let body = json!({
        "quote_seq_id": reservation["seqId"],
        "vendor_id": "vendor-1",
        "customer_name": "Acme",
    });

    let (status, _) = send(&app, Method::POST, "/quotes", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = send(&app, Method::POST, "/quotes", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "CONFLICT");
}

#[tokio::test]
async fn test_abandoned_reservation_leaves_gap() {
    let app = app().await;
    let (_, abandoned) = send(&app, Method::GET, "/quotes/next-number", None).await;
    assert_eq!(abandoned["seqId"], 1);

    let quote = create_quote(&app).await;
    assert_eq!(quote["quote_seq_id"], 2);
    assert_eq!(quote["quote_number"], "Q-000002");
}

// =============================================================================
// Quote Headers
// =============================================================================

#[tokio::test]
async fn test_header_validation() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/quotes",
        Some(json!({ "vendor_id": "vendor-1", "customer_name": "Acme", "customer_email": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        Method::POST,
        "/quotes",
        Some(json!({ "vendor_id": "vendor-1", "customer_name": "Acme", "customer_phone": "123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/quotes",
        Some(json!({ "vendor_id": "vendor-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let app = app().await;
    let quote = create_quote(&app).await;
    create_quote(&app).await;

    let uri = format!("/quotes/{}", quote["id"].as_str().unwrap());
    let (status, updated) = send(&app, Method::PATCH, &uri, Some(json!({ "status": "Sent" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "Sent");

    let (_, sent) = send(&app, Method::GET, "/quotes?vendor_id=vendor-1&status=Sent", None).await;
    assert_eq!(sent.as_array().unwrap().len(), 1);
    assert_eq!(sent[0]["id"], quote["id"]);

    let (_, all) = send(&app, Method::GET, "/quotes?vendor_id=vendor-1", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_quote_number_cannot_change() {
    let app = app().await;
    let quote = create_quote(&app).await;
    let uri = format!("/quotes/{}", quote["id"].as_str().unwrap());

    let (status, err) =
        send(&app, Method::PATCH, &uri, Some(json!({ "quote_number": "Q-999999" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "CONFLICT");

    let (status, _) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(json!({ "quote_number": quote["quote_number"], "notes": "same number is fine" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_quote_cascades() {
    let app = app().await;
    let quote = create_quote(&app).await;
    let quote_id = quote["id"].as_str().unwrap();

    let (_, item) = send(
        &app,
        Method::POST,
        "/quote-line-items",
        Some(json!({ "quote_id": quote_id, "product_name": "Sand", "unit_cost_price": 10, "quantity": 1 })),
    )
    .await;

    let (status, body) = send(&app, Method::DELETE, &format!("/quotes/{}", quote_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::GET, &format!("/quotes/{}", quote_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let item_uri = format!("/quote-line-items/{}", item["id"].as_str().unwrap());
    let (status, _) = send(&app, Method::GET, &item_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &format!("/quotes/{}", quote_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Line Items & Pricing
// =============================================================================

#[tokio::test]
async fn test_line_item_pricing_and_totals() {
    let app = app().await;
    let quote = create_quote(&app).await;
    let quote_id = quote["id"].as_str().unwrap();

    let (status, item) = send(
        &app,
        Method::POST,
        "/quote-line-items",
        Some(json!({
            "quote_id": quote_id,
            "product_name": "Cement 50kg",
            "unit_cost_price": 100,
            "quantity": 3,
            "margin_percent": 25,
            "line_sale_total": 375,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(approx(&item["line_cost_total"], 300.0));
    assert!(approx(&item["unit_sale_price"], 125.0));
    assert!(approx(&item["line_sale_total"], 375.0));
    assert!(approx(&item["line_profit_amount"], 75.0));
    assert_eq!(item["margin_percent"], 25.0);

    let (_, quote) = send(&app, Method::GET, &format!("/quotes/{}", quote_id), None).await;
    assert!(approx(&quote["total_cost"], 300.0));
    assert!(approx(&quote["total_sale_price"], 375.0));
    assert!(approx(&quote["total_profit_amount"], 75.0));
}

#[tokio::test]
async fn test_negative_margin() {
    let app = app().await;
    let quote = create_quote(&app).await;

    let (_, item) = send(
        &app,
        Method::POST,
        "/quote-line-items",
        Some(json!({
            "quote_id": quote["id"],
            "product_name": "Clearance tiles",
            "unit_cost_price": 50,
            "quantity": 2,
            "margin_percent": -10,
        })),
    )
    .await;
    assert!(approx(&item["unit_sale_price"], 45.0));
    assert!(approx(&item["line_sale_total"], 90.0));
    assert!(approx(&item["line_cost_total"], 100.0));
    assert!(approx(&item["line_profit_amount"], -10.0));
}

#[tokio::test]
async fn test_pricing_mismatch_rejected() {
    let app = app().await;
    let quote = create_quote(&app).await;
    let quote_id = quote["id"].as_str().unwrap();

    let (status, err) = send(
        &app,
        Method::POST,
        "/quote-line-items",
        Some(json!({
            "quote_id": quote_id,
            "product_name": "Cement",
            "unit_cost_price": 100,
            "quantity": 3,
            "margin_percent": 25,
            "line_sale_total": 360,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "PRICING_MISMATCH");

    let (_, items) = send(
        &app,
        Method::GET,
        &format!("/quote-line-items?quote_id={}", quote_id),
        None,
    )
    .await;
    assert_eq!(items, json!([]));
}

#[tokio::test]
async fn test_pricing_mismatch_overridden_when_lenient() {
    let mut config = AppConfig::default();
    config.pricing.reject_mismatch = false;
    let app = app_with(config).await;
    let quote = create_quote(&app).await;

    let (status, item) = send(
        &app,
        Method::POST,
        "/quote-line-items",
        Some(json!({
            "quote_id": quote["id"],
            "product_name": "Cement",
            "unit_cost_price": 100,
            "quantity": 3,
            "margin_percent": 25,
            "line_sale_total": 360,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(approx(&item["line_sale_total"], 375.0));
}

#[tokio::test]
async fn test_lenient_numbers() {
    let app = app().await;
    let quote = create_quote(&app).await;

    let (status, item) = send(
        &app,
        Method::POST,
        "/quote-line-items",
        Some(json!({
            "quote_id": quote["id"],
            "product_name": "Gravel",
            "unit_cost_price": "12.5",
            "quantity": "abc",
            "margin_percent": "",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["unit_cost_price"], 12.5);
    assert_eq!(item["quantity"], 0.0);
    assert_eq!(item["margin_percent"], Value::Null);
    assert_eq!(item["unit_of_measure"], "unit");
}

#[tokio::test]
async fn test_global_margin_change_reprices_inherited_items() {
    let app = app().await;
    let quote = create_quote(&app).await;
    let quote_id = quote["id"].as_str().unwrap();

    let (_, inherited) = send(
        &app,
        Method::POST,
        "/quote-line-items",
        Some(json!({ "quote_id": quote_id, "product_name": "Sand", "unit_cost_price": 10, "quantity": 10 })),
    )
    .await;
    let (_, fixed) = send(
        &app,
        Method::POST,
        "/quote-line-items",
        Some(json!({
            "quote_id": quote_id,
            "product_name": "Bricks",
            "unit_cost_price": 10,
            "quantity": 10,
            "margin_percent": 0,
        })),
    )
    .await;
    assert!(approx(&inherited["line_sale_total"], 120.0));

    let (status, quote) = send(
        &app,
        Method::PATCH,
        &format!("/quotes/{}", quote_id),
        Some(json!({ "global_margin_percent": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(approx(&quote["total_sale_price"], 250.0));

    let (_, inherited) = send(
        &app,
        Method::GET,
        &format!("/quote-line-items/{}", inherited["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert!(approx(&inherited["line_sale_total"], 150.0));
    assert_eq!(inherited["margin_percent"], Value::Null);

    let (_, fixed) = send(
        &app,
        Method::GET,
        &format!("/quote-line-items/{}", fixed["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert!(approx(&fixed["line_sale_total"], 100.0));
    assert_eq!(fixed["margin_percent"], 0.0);
}

#[tokio::test]
async fn test_patch_and_delete_line_item() {
    let app = app().await;
    let quote = create_quote(&app).await;
    let quote_id = quote["id"].as_str().unwrap();

    let (_, item) = send(
        &app,
        Method::POST,
        "/quote-line-items",
        Some(json!({
            "quote_id": quote_id,
            "product_name": "Sand",
            "unit_cost_price": 10,
            "quantity": 1,
            "margin_percent": 10,
        })),
    )
    .await;
    let uri = format!("/quote-line-items/{}", item["id"].as_str().unwrap());

    let (status, item) =
        send(&app, Method::PATCH, &uri, Some(json!({ "quantity": 4, "margin_percent": null }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["margin_percent"], Value::Null);
    assert!(approx(&item["line_sale_total"], 48.0));

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, quote) = send(&app, Method::GET, &format!("/quotes/{}", quote_id), None).await;
    assert!(approx(&quote["total_cost"], 0.0));

    let (status, err) = send(&app, Method::PATCH, &uri, Some(json!({ "quantity": 1 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "NOT_FOUND");
}

// =============================================================================
// Batch Save
// =============================================================================

#[tokio::test]
async fn test_batch_save_then_noop() {
    let app = app().await;
    let (_, reservation) = send(&app, Method::GET, "/quotes/next-number", None).await;

    let (status, report) = send(
        &app,
        Method::POST,
        "/quotes/save",
        Some(json!({
            "quote": {
                "quote_seq_id": reservation["seqId"],
                "vendor_id": "vendor-1",
                "customer_name": "Acme",
            },
            "items": [
                { "isNew": true, "product_name": "Sand", "unit_cost_price": 10, "quantity": 2 },
                { "isNew": true, "product_name": "Cement", "unit_cost_price": 100, "quantity": 3, "margin_percent": 25 },
                { "isNew": true, "isDeleted": true, "product_name": "Never saved" },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["quote"]["quote_number"], reservation["quote_number"]);
    assert_eq!(report["inserted"].as_array().unwrap().len(), 2);
    assert_eq!(report["items"].as_array().unwrap().len(), 2);
    assert!(approx(&report["quote"]["total_cost"], 320.0));
    assert!(approx(&report["quote"]["total_sale_price"], 399.0));

    // Second save with everything unmodified writes nothing.
    let quote_id = report["quote"]["id"].clone();
    let items: Vec<Value> = report["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| json!({ "id": item["id"], "product_name": item["product_name"] }))
        .collect();
    let (status, second) = send(
        &app,
        Method::POST,
        "/quotes/save",
        Some(json!({
            "quote_id": quote_id,
            "quote": { "vendor_id": "vendor-1", "customer_name": "Acme" },
            "items": items,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["inserted"], json!([]));
    assert_eq!(second["updated"], json!([]));
    assert_eq!(second["deleted"], json!([]));
    assert_eq!(second["quote"]["quote_number"], reservation["quote_number"]);
}

#[tokio::test]
async fn test_batch_save_diff_reports_vanished_rows() {
    let app = app().await;
    let (_, report) = send(
        &app,
        Method::POST,
        "/quotes/save",
        Some(json!({
            "quote": { "vendor_id": "vendor-1", "customer_name": "Acme" },
            "items": [
                { "isNew": true, "product_name": "Sand", "unit_cost_price": 10, "quantity": 2 },
                { "isNew": true, "product_name": "Gravel", "unit_cost_price": 5, "quantity": 4 },
            ],
        })),
    )
    .await;
    let quote_id = report["quote"]["id"].as_str().unwrap().to_string();
    let sand = report["items"][0]["id"].as_str().unwrap().to_string();
    let gravel = report["items"][1]["id"].as_str().unwrap().to_string();

    let (status, report) = send(
        &app,
        Method::POST,
        "/quotes/save",
        Some(json!({
            "quote_id": quote_id,
            "quote": { "vendor_id": "vendor-1", "customer_name": "Acme Ltd" },
            "items": [
                { "id": sand, "isModified": true, "product_name": "Sand", "unit_cost_price": 10, "quantity": 5 },
                { "id": gravel, "isDeleted": true },
                { "id": "gone", "isModified": true, "product_name": "Ghost", "quantity": 1 },
                { "id": "also-gone", "isDeleted": true },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["updated"], json!([sand]));
    assert_eq!(report["deleted"], json!([gravel]));
    assert_eq!(report["not_found"], json!(["gone", "also-gone"]));
    assert_eq!(report["quote"]["customer_name"], "Acme Ltd");
    assert!(approx(&report["quote"]["total_cost"], 50.0));
    assert!(approx(&report["quote"]["total_sale_price"], 60.0));
}

#[tokio::test]
async fn test_batch_save_unknown_quote_is_not_found() {
    let app = app().await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/quotes/save",
        Some(json!({
            "quote_id": "missing",
            "quote": { "vendor_id": "vendor-1", "customer_name": "Acme" },
            "items": [],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resave_with_minimal_header_keeps_margin_and_totals() {
    let app = app().await;
    let (_, first) = send(
        &app,
        Method::POST,
        "/quotes/save",
        Some(json!({
            "quote": {
                "vendor_id": "vendor-1",
                "customer_name": "Acme",
                "customer_company": "Acme Ltd",
                "notes": "call before delivery",
                "global_margin_percent": 35,
            },
            "items": [
                { "isNew": true, "product_name": "Sand", "unit_cost_price": 10, "quantity": 2 },
            ],
        })),
    )
    .await;
    assert!(approx(&first["quote"]["total_sale_price"], 27.0));

    let (status, second) = send(
        &app,
        Method::POST,
        "/quotes/save",
        Some(json!({
            "quote_id": first["quote"]["id"],
            "quote": { "vendor_id": "vendor-1", "customer_name": "Acme" },
            "items": [],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["updated"], json!([]));
    assert!(approx(&second["quote"]["global_margin_percent"], 35.0));
    assert!(approx(&second["quote"]["total_sale_price"], 27.0));
    assert_eq!(second["quote"]["customer_company"], "Acme Ltd");
    assert_eq!(second["quote"]["notes"], "call before delivery");
    assert!(approx(&second["items"][0]["unit_sale_price"], 13.5));
}

// =============================================================================
// Carts
// =============================================================================

#[tokio::test]
async fn test_cart_get_or_create_is_idempotent() {
    let app = app().await;
    let (status, first) = send(&app, Method::POST, "/carts", Some(json!({ "vendor_id": "vendor-1" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["global_margin_percent"], 20.0);

    let (_, second) = send(&app, Method::POST, "/carts", Some(json!({ "vendor_id": "vendor-1" }))).await;
    assert_eq!(first["id"], second["id"]);

    let (_, carts) = send(&app, Method::GET, "/carts?vendor_id=vendor-1", None).await;
    assert_eq!(carts.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cart_items_merge_and_totals() {
    let app = app().await;
    let item = json!({
        "vendor_id": "vendor-1",
        "product_id": "p-1",
        "product_name": "Sand",
        "unit_cost_price": 10,
        "quantity": 2,
    });

    let (status, first) = send(&app, Method::POST, "/cart-items", Some(item.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, merged) = send(&app, Method::POST, "/cart-items", Some(item)).await;
    assert_eq!(first["id"], merged["id"]);
    assert_eq!(merged["quantity"], 4.0);

    let cart_id = merged["cart_id"].as_str().unwrap();
    let (status, totals) = send(&app, Method::GET, &format!("/carts/{}/totals", cart_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(totals["item_count"], 1);
    assert!(approx(&totals["total_cost"], 40.0));
    assert!(approx(&totals["total_sale_price"], 48.0));
    assert!(approx(&totals["margin_percent"], 20.0));

    let (status, cart) = send(
        &app,
        Method::PATCH,
        &format!("/carts/{}", cart_id),
        Some(json!({ "global_margin_percent": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["global_margin_percent"], 50.0);

    let (_, items) = send(&app, Method::GET, "/cart-items?vendor_id=vendor-1", None).await;
    assert!(approx(&items[0]["line_sale_total"], 60.0));

    let uri = format!("/cart-items/{}", first["id"].as_str().unwrap());
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, totals) = send(&app, Method::GET, &format!("/carts/{}/totals", cart_id), None).await;
    assert_eq!(totals["item_count"], 0);
    assert_eq!(totals["margin_percent"], Value::Null);
}

#[tokio::test]
async fn test_cart_item_requires_target() {
    let app = app().await;
    let (status, err) = send(
        &app,
        Method::POST,
        "/cart-items",
        Some(json!({ "product_name": "Sand", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_export_quote_to_cart() {
    let app = app().await;
    let quote = create_quote(&app).await;
    let quote_id = quote["id"].as_str().unwrap();

    for (product_id, margin) in [("p-1", json!(null)), ("p-2", json!(35))] {
        send(
            &app,
            Method::POST,
            "/quote-line-items",
            Some(json!({
                "quote_id": quote_id,
                "product_id": product_id,
                "product_name": product_id,
                "unit_cost_price": 10,
                "quantity": 1,
                "margin_percent": margin,
            })),
        )
        .await;
    }

    let uri = format!("/quotes/{}/export-to-cart", quote_id);
    let (status, report) = send(&app, Method::POST, &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["cart"]["vendor_id"], "vendor-1");
    assert_eq!(report["added"].as_array().unwrap().len(), 2);
    assert_eq!(report["items"].as_array().unwrap().len(), 2);

    // No body at all exports to the quote's vendor.
    let (status, report) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["cart"]["vendor_id"], "vendor-1");
    assert_eq!(report["merged"].as_array().unwrap().len(), 2);
    let items = report["items"].as_array().unwrap();
    assert!(items.iter().all(|item| item["quantity"] == 2.0));
    let kept = items.iter().find(|item| item["product_id"] == "p-2").unwrap();
    assert_eq!(kept["margin_percent"], 35.0);
}

#[tokio::test]
async fn test_export_empty_quote_rejected() {
    let app = app().await;
    let quote = create_quote(&app).await;

    let uri = format!("/quotes/{}/export-to-cart", quote["id"].as_str().unwrap());
    let (status, err) = send(&app, Method::POST, &uri, Some(json!({ "vendor_id": "vendor-1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");
}
