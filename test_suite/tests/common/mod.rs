//! Entities and helpers shared by the integration tests.

use std::sync::Arc;

use autocrud::{App, Entity, MemoryDriver, SeaOrmDriver, StorageDriver};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower::ServiceExt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity)]
pub struct User {
    #[crud("pk")]
    pub id: i64,
    pub name: String,
    pub email: String,
    #[crud("hidden")]
    pub password: String,
    #[crud("readonly")]
    pub created_by: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity)]
#[storage("table:catalog_products")]
pub struct Product {
    #[storage("primaryKey")]
    pub id: i64,
    pub name: String,
    #[storage("column:unit_price")]
    pub price: f64,
    #[crud("fk:users.id")]
    pub owner_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub price: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity)]
pub struct Order {
    #[crud("pk")]
    pub id: i64,
    pub customer: String,
    #[crud("list")]
    pub items: Vec<LineItem>,
    #[crud("count:Items")]
    pub item_count: i64,
    #[crud("sum:Items.Price")]
    pub total: i64,
}

/// Schema for [`Product`] on SQLite.
#[allow(dead_code)]
pub const CREATE_PRODUCTS: &str = "CREATE TABLE catalog_products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    unit_price REAL NOT NULL,
    owner_id INTEGER NOT NULL
)";

#[allow(dead_code)]
pub const CREATE_ORDERS: &str = "CREATE TABLE orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer TEXT NOT NULL,
    items TEXT NOT NULL
)";

/// In-memory SQLite driver with the product and order tables created.
#[allow(dead_code)]
pub async fn setup_sqlite_driver() -> SeaOrmDriver {
    let driver = SeaOrmDriver::connect("sqlite::memory:")
        .await
        .expect("open sqlite");
    driver
        .connection()
        .execute_unprepared(CREATE_PRODUCTS)
        .await
        .expect("create products table");
    driver
        .connection()
        .execute_unprepared(CREATE_ORDERS)
        .await
        .expect("create orders table");
    driver
}

/// Router serving users and orders from a fresh in-memory driver.
#[allow(dead_code)]
pub fn setup_memory_app() -> (Router, Arc<MemoryDriver>) {
    let storage = Arc::new(MemoryDriver::new());
    let shared: Arc<dyn StorageDriver> = storage.clone();
    let mut app = App::builder().shared_storage(shared).build();
    app.register::<User>()
        .and_then(|app| app.register::<Order>())
        .expect("register entities");
    (app.into_router(), storage)
}

/// Sends one request and returns the status with the decoded JSON body
/// (`Value::Null` for an empty body).
#[allow(dead_code)]
pub async fn send(router: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .expect("build request");

    let response = router.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    };
    (status, json)
}
