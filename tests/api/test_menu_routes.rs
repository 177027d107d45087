// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Menu CRUD and health endpoints

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use smart_menu_node::api::create_router;
use smart_menu_node::vector::VectorStore;

use super::support::*;

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn tom_yum() -> Value {
    json!({
        "name": "Tom Yum Goong",
        "description": "Spicy prawn soup.",
        "price": 12.5,
        "category": "Soup"
    })
}

#[tokio::test]
async fn test_welcome_message() {
    let app = test_app();
    let router = create_router(app.state);

    let (status, body) = call(&router, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to Smart Menu API");
}

#[tokio::test]
async fn test_menu_crud_round() {
    let app = test_app();
    let router = create_router(app.state.clone());

    let (status, created) = call(&router, Method::POST, "/menu/", Some(tom_yum())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["name"], "Tom Yum Goong");
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(app.store.len().await, 1);

    let (status, listed) = call(&router, Method::GET, "/menu", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let mut changed = tom_yum();
    changed["price"] = json!(14.0);
    changed["description"] = json!("Hot and sour prawn soup");
    let (status, updated) = call(&router, Method::PUT, &format!("/menu/{}", id), Some(changed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["price"], 14.0);

    let entry = app.store.get(id.parse().unwrap()).await.unwrap();
    assert!(entry.content_chunk.contains("Hot and sour prawn soup"));

    let (status, deleted) = call(&router, Method::DELETE, &format!("/menu/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["status"], "success");
    assert!(app.store.is_empty().await);

    // Unknown ids delete cleanly too
    let (status, _) = call(&router, Method::DELETE, &format!("/menu/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_unknown_item_is_404() {
    let app = test_app();
    let router = create_router(app.state);

    let uri = format!("/menu/{}", uuid::Uuid::new_v4());
    let (status, body) = call(&router, Method::PUT, &uri, Some(tom_yum())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");
}

#[tokio::test]
async fn test_blank_name_is_rejected() {
    let app = test_app();
    let router = create_router(app.state.clone());

    let mut item = tom_yum();
    item["name"] = json!("   ");
    let (status, body) = call(&router, Method::POST, "/menu/", Some(item)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_request");
    assert!(app.state.catalog.is_empty().await);
}

#[tokio::test]
async fn test_encoder_outage_rejects_mutation() {
    let app = test_app();
    let router = create_router(app.state.clone());

    let (_, created) = call(&router, Method::POST, "/menu/", Some(tom_yum())).await;
    let id = created["id"].as_str().unwrap().to_string();

    app.encoder.set_offline(true);

    let (status, body) = call(&router, Method::POST, "/menu/", Some(tom_yum())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "ENCODING_ERROR");

    let mut changed = tom_yum();
    changed["name"] = json!("Tom Yum Talay");
    let (status, _) = call(&router, Method::PUT, &format!("/menu/{}", id), Some(changed)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Neither the menu nor the index moved
    let (_, listed) = call(&router, Method::GET, "/menu", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "Tom Yum Goong");
    let entry = app.store.get(id.parse().unwrap()).await.unwrap();
    assert!(entry.content_chunk.starts_with("Name: Tom Yum Goong."));

    // Deletes never need the encoder
    let (status, _) = call(&router, Method::DELETE, &format!("/menu/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_health_reports_counts() {
    let app = test_app();
    let router = create_router(app.state.clone());

    call(&router, Method::POST, "/menu", Some(tom_yum())).await;

    let (status, health) = call(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["menu_items"], 1);
    assert_eq!(health["indexed_entries"], 1);
    assert_eq!(health["encoder"], "switchable");
    assert_eq!(health["embedding_dimension"], DIMENSION);

    // An out-of-band delete shows up as drift
    let id = app.state.catalog.list().await[0].id;
    app.store.delete(id).await.unwrap();
    let (_, health) = call(&router, Method::GET, "/health", None).await;
    assert_eq!(health["status"], "degraded");
}
