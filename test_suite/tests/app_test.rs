mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use autocrud::config::{DATABASE_URL_VAR, REQUEST_TIMEOUT_VAR, TRACE_VAR};
use autocrud::{App, AppConfig, CrudError, MemoryDriver, Registry};
use axum::http::{Method, StatusCode};
use axum::{Router, routing::get};
use serial_test::serial;

use common::{Order, User, send};

mod first {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize, autocrud::Entity)]
    pub struct Widget {
        #[crud("pk")]
        pub id: i64,
    }
}

mod second {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize, autocrud::Entity)]
    pub struct Widget {
        #[crud("pk")]
        pub id: i64,
        pub color: String,
    }
}

#[test]
fn test_register_without_storage_fails() {
    let mut app = App::builder().build();
    let err = app.register::<User>().unwrap_err();
    assert!(matches!(err, CrudError::NoStorageConfigured));
    assert!(app.entities().is_empty());
}

#[test]
fn test_registering_twice_is_a_no_op() {
    let mut app = App::builder().storage(MemoryDriver::new()).build();
    app.register::<User>().unwrap();
    app.register::<User>().unwrap();
    assert_eq!(app.entities().len(), 1);
    assert_eq!(app.registry().len(), 1);
}

#[test]
fn test_conflicting_resource_is_rejected() {
    let mut app = App::builder().storage(MemoryDriver::new()).build();
    app.register::<first::Widget>().unwrap();

    let err = app.register::<second::Widget>().unwrap_err();
    assert!(matches!(&err, CrudError::DuplicateRoute { resource } if resource == "widget"));
    assert_eq!(app.entities().len(), 1);
}

#[test]
fn test_shared_registry_is_populated() {
    let registry = Arc::new(Registry::new());
    let mut app = App::builder()
        .registry(Arc::clone(&registry))
        .storage(MemoryDriver::new())
        .build();
    app.register::<User>().unwrap().register::<Order>().unwrap();

    assert_eq!(registry.len(), 2);
    let names: Vec<_> = app.entities().iter().map(|e| e.name().to_string()).collect();
    assert_eq!(names, vec!["User", "Order"]);
}

#[test]
fn test_openapi_lists_every_entity() {
    let mut app = App::builder().storage(MemoryDriver::new()).build();
    app.register::<User>().unwrap().register::<Order>().unwrap();

    let doc = app.openapi();
    let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
    for expected in ["/user", "/user/{id}", "/order", "/order/{id}"] {
        assert!(paths.iter().any(|p| p == expected), "missing {expected} in {paths:?}");
    }

    let json = serde_json::to_value(&doc).unwrap();
    let user = &json["components"]["schemas"]["User"]["properties"];
    assert!(user.get("name").is_some());
    assert!(user.get("password").is_none(), "hidden fields stay out of the schema");
}

#[tokio::test]
async fn test_middleware_wraps_the_router() {
    let mut app = App::builder()
        .storage(MemoryDriver::new())
        .middleware(|router: Router| router.route("/health", get(|| async { "ok" })))
        .build();
    app.register::<User>().unwrap();
    let router = app.into_router();

    let (status, _) = send(&router, Method::GET, "/user", None).await;
    assert_eq!(status, StatusCode::OK);
    let response = tower::ServiceExt::oneshot(
        router,
        axum::http::Request::builder()
            .uri("/health")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_config_from_lookup() {
    let vars: HashMap<&str, &str> = HashMap::from([
        (REQUEST_TIMEOUT_VAR, "250"),
        (DATABASE_URL_VAR, "sqlite::memory:"),
        (TRACE_VAR, "false"),
    ]);
    let config = AppConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).unwrap();

    assert_eq!(config.address, "0.0.0.0:8080");
    assert_eq!(config.request_timeout, Some(Duration::from_millis(250)));
    assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
    assert!(!config.trace_requests);

    let err = AppConfig::from_lookup(|key| (key == REQUEST_TIMEOUT_VAR).then(|| "soon".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains(REQUEST_TIMEOUT_VAR));
}

#[tokio::test]
#[serial]
async fn test_connect_opens_storage_from_the_environment() {
    // SAFETY: serialized with every other test touching the environment.
    unsafe { std::env::set_var(DATABASE_URL_VAR, "sqlite::memory:") };
    let config = AppConfig::from_env();
    unsafe { std::env::remove_var(DATABASE_URL_VAR) };

    let config = config.unwrap();
    let mut app = App::connect(config).await.unwrap();
    assert!(app.register::<User>().is_ok());
}

#[tokio::test]
#[serial]
async fn test_connect_without_database_url_has_no_storage() {
    // SAFETY: serialized with every other test touching the environment.
    unsafe { std::env::remove_var(DATABASE_URL_VAR) };
    let config = AppConfig::from_env().unwrap();

    let mut app = App::connect(config).await.unwrap();
    assert!(matches!(app.register::<User>(), Err(CrudError::NoStorageConfigured)));
}
