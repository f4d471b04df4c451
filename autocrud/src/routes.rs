//! REST routes generated per entity.
//!
//! For an entity named `User` the router serves:
//!
//! | method | path | success |
//! |---|---|---|
//! | `POST` | `/user` | 201 with the created entity |
//! | `GET` | `/user` | 200 with every entity |
//! | `GET` | `/user/{id}` | 200 |
//! | `PUT` | `/user/{id}` | 200 with the updated entity |
//! | `DELETE` | `/user/{id}` | 204 |
//!
//! Every handler follows the same sequence: decode, before-hook, repository
//! call, after-hook, encode.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde_json::Value;

use crate::Entity;
use crate::context::Context;
use crate::errors::ApiError;
use crate::hooks;
use crate::metadata::EntityDescriptor;
use crate::repository::Repository;
use crate::representation::{PayloadError, decode_payload, to_api, to_row};
use crate::storage::{EntityId, StorageDriver, TableRef};

/// Shared state behind one entity's routes.
pub struct EntityHandlers<T> {
    repository: Repository<T>,
    storage: Arc<dyn StorageDriver>,
    request_timeout: Option<Duration>,
}

impl<T: Entity + Default> EntityHandlers<T> {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageDriver>, descriptor: Arc<EntityDescriptor>) -> Self {
        Self {
            repository: Repository::new(Some(Arc::clone(&storage)), descriptor),
            storage,
            request_timeout: None,
        }
    }

    /// Deadline applied to each request's [`Context`].
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn descriptor(&self) -> &EntityDescriptor {
        self.repository.descriptor()
    }

    fn context(&self) -> Context {
        self.request_timeout
            .map_or_else(Context::new, Context::with_timeout)
    }

    fn parse_id(&self, raw: &str) -> Result<EntityId, ApiError> {
        let kind = TableRef::for_entity(self.descriptor()).key_kind;
        EntityId::parse(raw, kind).map_err(|reason| {
            tracing::debug!(entity = self.descriptor().name(), %reason, "rejected id");
            ApiError::bad_request("Invalid ID")
        })
    }

    fn decode(&self, base: &T, body: &[u8]) -> Result<T, ApiError> {
        let base = to_row(self.descriptor(), base)?;
        decode_payload(self.descriptor(), base, body).map_err(|err: PayloadError| {
            tracing::debug!(entity = self.descriptor().name(), error = %err, "rejected body");
            ApiError::bad_request("Invalid request body")
        })
    }

    fn encode(&self, entity: &T) -> Result<Value, ApiError> {
        Ok(to_api(self.descriptor(), to_row(self.descriptor(), entity)?))
    }

    /// # Errors
    ///
    /// 400 for a malformed body, 500 for hook or storage failures.
    pub async fn create(&self, body: &[u8]) -> Result<Value, ApiError> {
        let mut entity = self.decode(&T::default(), body)?;
        let ctx = self.context();

        hooks::call_before_create(&ctx, &mut entity, &*self.storage).await?;
        self.repository.create(&ctx, &mut entity).await?;
        hooks::call_after_create(&ctx, &mut entity, &*self.storage).await?;

        self.encode(&entity)
    }

    /// # Errors
    ///
    /// 500 for storage failures.
    pub async fn list(&self) -> Result<Value, ApiError> {
        let ctx = self.context();
        let entities = self.repository.get_all(&ctx).await?;
        entities
            .iter()
            .map(|entity| self.encode(entity))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    /// # Errors
    ///
    /// 400 for a malformed id, 404 when missing.
    pub async fn get(&self, raw_id: &str) -> Result<Value, ApiError> {
        let id = self.parse_id(raw_id)?;
        let entity = self.repository.get_by_id(&self.context(), id).await?;
        self.encode(&entity)
    }

    /// Merges the body over the stored entity; the key always comes from the path.
    ///
    /// # Errors
    ///
    /// 400 for a malformed id or body, 404 when missing, 500 otherwise.
    pub async fn update(&self, raw_id: &str, body: &[u8]) -> Result<Value, ApiError> {
        let id = self.parse_id(raw_id)?;
        let ctx = self.context();
        let existing = self.repository.get_by_id(&ctx, id.clone()).await?;
        let mut entity = self.decode(&existing, body)?;
        self.repository.set_key(&mut entity, &id)?;

        hooks::call_before_update(&ctx, &mut entity, &*self.storage).await?;
        self.repository.update(&ctx, &entity).await?;
        hooks::call_after_update(&ctx, &mut entity, &*self.storage).await?;

        self.encode(&entity)
    }

    /// # Errors
    ///
    /// 400 for a malformed id, 404 when missing, 500 otherwise.
    pub async fn delete(&self, raw_id: &str) -> Result<(), ApiError> {
        let id = self.parse_id(raw_id)?;
        let ctx = self.context();
        let mut entity = self.repository.get_by_id(&ctx, id.clone()).await?;

        hooks::call_before_delete(&ctx, &mut entity, &*self.storage).await?;
        self.repository.delete(&ctx, id).await?;
        hooks::call_after_delete(&ctx, &mut entity, &*self.storage).await?;
        Ok(())
    }
}

async fn create_handler<T: Entity + Default>(
    State(handlers): State<Arc<EntityHandlers<T>>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let created = handlers.create(&body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_handler<T: Entity + Default>(
    State(handlers): State<Arc<EntityHandlers<T>>>,
) -> Result<Json<Value>, ApiError> {
    handlers.list().await.map(Json)
}

async fn get_handler<T: Entity + Default>(
    State(handlers): State<Arc<EntityHandlers<T>>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    handlers.get(&id).await.map(Json)
}

async fn update_handler<T: Entity + Default>(
    State(handlers): State<Arc<EntityHandlers<T>>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    handlers.update(&id, &body).await.map(Json)
}

async fn delete_handler<T: Entity + Default>(
    State(handlers): State<Arc<EntityHandlers<T>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    handlers.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Collection path of an entity, e.g. `/user`.
#[must_use]
pub fn collection_path(descriptor: &EntityDescriptor) -> String {
    format!("/{}", descriptor.resource_segment())
}

/// Item path of an entity in axum syntax, e.g. `/user/{id}`.
#[must_use]
pub fn item_path(descriptor: &EntityDescriptor) -> String {
    format!("/{}/{{id}}", descriptor.resource_segment())
}

/// The five routes of `T`, ready to be merged into an application router.
pub fn entity_routes<T: Entity + Default>(handlers: Arc<EntityHandlers<T>>) -> Router {
    let collection = collection_path(handlers.descriptor());
    let item = item_path(handlers.descriptor());

    Router::new()
        .route(
            &collection,
            get(list_handler::<T>).post(create_handler::<T>),
        )
        .route(
            &item,
            get(get_handler::<T>)
                .put(update_handler::<T>)
                .delete(delete_handler::<T>),
        )
        .with_state(handlers)
}
