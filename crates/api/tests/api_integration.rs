//! Integration tests for the API server.

use std::io::Cursor;
use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::{Engine, engine::general_purpose::STANDARD};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use storage::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> Router {
    let config = api::Config {
        jwt_secret: "integration-secret".to_string(),
        ..api::Config::default()
    };
    let state = api::create_state(InMemoryStore::new(), &config);
    api::create_app(state, get_metrics_handle())
}

fn png_base64() -> String {
    let mut bytes = Vec::new();
    image::RgbImage::new(1, 1)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    STANDARD.encode(bytes)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn user_body(username: &str) -> Value {
    json!({
        "name": "Reader",
        "username": username,
        "email": format!("{username}@example.com"),
        "password": "s3cret-pass",
        "address": "1 Library Lane"
    })
}

/// Registers and logs in a user, returning `(id, token)`.
async fn login(app: &Router, username: &str) -> (i64, String) {
    let (status, _) = send(app, "POST", "/users/register", None, Some(user_body(username))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(
        app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "username": username, "password": "s3cret-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = json["data"]["user"]["id"].as_i64().unwrap();
    let token = json["data"]["token"].as_str().unwrap().to_string();
    (id, token)
}

/// Creates a category and a book, returning the book id.
async fn seed_book(app: &Router, token: &str, price: i64, quantity: i32, discount: f64) -> i64 {
    let (status, json) = send(
        app,
        "POST",
        "/category",
        Some(token),
        Some(json!({ "name": format!("Category {price}") })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = send(
        app,
        "POST",
        "/book",
        Some(token),
        Some(json!({
            "title": "Dune",
            "description": "Desert planet",
            "categoryId": category_id,
            "price": price,
            "quantity": quantity,
            "discount": discount,
            "cover": { "encoding": "image/png", "content": png_base64() }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_and_login() {
    let app = setup();
    let (id, token) = login(&app, "alice").await;
    assert!(id > 0);
    assert!(!token.is_empty());

    let (status, json) = send(&app, "GET", &format!("/user/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["username"], "alice");
    assert!(json["data"].get("password").is_none());
    assert!(json["data"].get("passwordHash").is_none());
    assert!(json["data"]["joinedAt"].is_string());
}

#[tokio::test]
async fn test_duplicate_registration_is_conflict() {
    let app = setup();
    login(&app, "alice").await;

    let (status, json) = send(&app, "POST", "/users/register", None, Some(user_body("alice"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], 409);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = setup();
    login(&app, "alice").await;

    let (status, json) = send(
        &app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], 401);
}

#[tokio::test]
async fn test_validation_errors_list_fields() {
    let app = setup();
    let (status, json) = send(
        &app,
        "POST",
        "/users/register",
        None,
        Some(json!({ "name": "Al", "username": "1alice", "email": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 400);
    let fields = json["data"].as_object().unwrap();
    for field in ["name", "username", "email", "password", "address"] {
        assert!(fields.contains_key(field), "missing {field}");
    }
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = setup();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/users/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_need_token() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], 401);

    let (status, _) = send(&app, "GET", "/user", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/category",
        None,
        Some(json!({ "name": "poetry" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Reading the catalog stays public.
    let (status, _) = send(&app, "GET", "/category", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_foreign_user_resources_are_unauthorized() {
    let app = setup();
    let (alice, _) = login(&app, "alice").await;
    let (_, bob_token) = login(&app, "bob").await;

    let (status, _) = send(&app, "GET", &format!("/user/{alice}/cart"), Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "DELETE", &format!("/user/{alice}"), Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cart_to_order_flow() {
    let app = setup();
    let (user, token) = login(&app, "alice").await;
    let book = seed_book(&app, &token, 2000, 10, 0.1).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/user/{user}/cart"),
        Some(&token),
        Some(json!({ "bookId": book, "quantity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["pricePerUnit"], 1800);

    let (_, json) = send(&app, "GET", &format!("/book/{book}"), None, None).await;
    assert_eq!(json["data"]["quantity"], 6);
    assert_eq!(json["data"]["effectivePrice"], 1800);

    let (status, json) = send(&app, "GET", &format!("/user/{user}/cart"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 7200);

    let (status, json) = send(&app, "POST", &format!("/user/{user}/order"), Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let order = &json["data"];
    assert_eq!(order["totalPrice"], 7200);
    assert_eq!(order["lines"].as_array().unwrap().len(), 1);
    assert_eq!(order["lines"][0]["bookId"], book);
    assert_eq!(order["lines"][0]["quantity"], 4);
    assert_eq!(order["lines"][0]["pricePerUnit"], 1800);
    let order_id = order["id"].as_i64().unwrap();

    let (_, json) = send(&app, "GET", &format!("/user/{user}/cart"), Some(&token), None).await;
    assert!(json["data"]["entries"].as_array().unwrap().is_empty());

    let (_, json) = send(&app, "GET", &format!("/book/{book}"), None, None).await;
    assert_eq!(json["data"]["quantity"], 6);
    assert_eq!(json["data"]["purchaseCount"], 4);

    let (status, json) = send(&app, "GET", &format!("/order/{order_id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["userId"], user);

    let (_, json) = send(&app, "GET", &format!("/user/{user}/order"), Some(&token), None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_cart_places_no_order() {
    let app = setup();
    let (user, token) = login(&app, "alice").await;

    let (status, json) = send(&app, "POST", &format!("/user/{user}/order"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.get("data").is_none());

    let (_, json) = send(&app, "GET", "/order", Some(&token), None).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_quantity_above_stock_is_bad_request() {
    let app = setup();
    let (user, token) = login(&app, "alice").await;
    let book = seed_book(&app, &token, 1000, 3, 0.0).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/user/{user}/cart"),
        Some(&token),
        Some(json!({ "bookId": book, "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 400);
}

#[tokio::test]
async fn test_remove_from_cart_restores_stock() {
    let app = setup();
    let (user, token) = login(&app, "alice").await;
    let book = seed_book(&app, &token, 1000, 5, 0.0).await;

    send(
        &app,
        "POST",
        &format!("/user/{user}/cart"),
        Some(&token),
        Some(json!({ "bookId": book, "quantity": 2 })),
    )
    .await;
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/user/{user}/cart/{book}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app, "GET", &format!("/book/{book}"), None, None).await;
    assert_eq!(json["data"]["quantity"], 5);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/user/{user}/cart/{book}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_book_listing_query_validation() {
    let app = setup();
    let (_, token) = login(&app, "alice").await;
    seed_book(&app, &token, 1000, 1, 0.0).await;

    let (status, json) = send(&app, "GET", "/book?sorting=price_asc&page=1&limit=5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["totalPages"], 1);
    assert_eq!(json["data"]["books"].as_array().unwrap().len(), 1);

    for uri in ["/book?sorting=cheapest", "/book?page=0", "/book?limit=500", "/book?page=x"] {
        let (status, json) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["code"], 400);
    }
}

#[tokio::test]
async fn test_cover_is_served_as_image() {
    let app = setup();
    let (_, token) = login(&app, "alice").await;
    let book = seed_book(&app, &token, 1000, 1, 0.0).await;

    let (_, json) = send(&app, "GET", &format!("/book/{book}"), None, None).await;
    let cover_id = json["data"]["coverId"].as_i64().unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/cover/{cover_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
}

#[tokio::test]
async fn test_invalid_cover_is_rejected() {
    let app = setup();
    let (_, token) = login(&app, "alice").await;
    let (_, json) = send(
        &app,
        "POST",
        "/category",
        Some(&token),
        Some(json!({ "name": "poetry" })),
    )
    .await;
    let category_id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = send(
        &app,
        "POST",
        "/book",
        Some(&token),
        Some(json!({
            "title": "Odes",
            "description": "Verses",
            "categoryId": category_id,
            "price": 500,
            "quantity": 1,
            "discount": 0.0,
            "cover": { "encoding": "image/png", "content": STANDARD.encode(b"not an image") }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 400);
}

#[tokio::test]
async fn test_missing_book_is_not_found() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/book/424242", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], 404);
    assert_eq!(json["message"], "book not found");
}

#[tokio::test]
async fn test_category_in_use_cannot_be_deleted() {
    let app = setup();
    let (_, token) = login(&app, "alice").await;
    let book = seed_book(&app, &token, 1000, 1, 0.0).await;
    let (_, json) = send(&app, "GET", &format!("/book/{book}"), None, None).await;
    let category_id = json["data"]["categoryId"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/category/{category_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
