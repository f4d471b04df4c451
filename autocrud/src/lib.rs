//! # autocrud
//!
//! Turns plain struct declarations into table mappings, a generic repository,
//! lifecycle hook dispatch and REST routes.
//!
//! ```rust,ignore
//! use autocrud::{App, Entity, MemoryDriver};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize, Entity)]
//! pub struct User {
//!     #[crud("pk")]
//!     pub id: i64,
//!     pub name: String,
//!     #[crud("hidden")]
//!     pub password: String,
//! }
//!
//! let mut app = App::builder().storage(MemoryDriver::new()).build();
//! app.register::<User>()?;
//! let router = app.into_router();
//! ```
//!
//! A struct becomes an entity through a [`Declare`] implementation (usually
//! `#[derive(Entity)]`), which the [`Registry`] parses once into an
//! [`EntityDescriptor`]. Field annotations:
//!
//! | annotation | effect |
//! |---|---|
//! | `#[crud("pk")]` / `#[storage("primaryKey")]` | primary key |
//! | `#[crud("hidden")]` | never serialized in responses |
//! | `#[crud("readonly")]` | ignored in request bodies |
//! | `#[crud("nested")]`, `#[crud("list")]` | embedded structure, collection |
//! | `#[crud("fk:users.id")]`, `#[crud("m2m:post_tags")]` | relation metadata |
//! | `#[crud("count:Items")]`, `#[crud("sum:Items.Price")]` | computed on read |
//! | `#[storage("column:user_id")]` | storage column name |
//!
//! Struct annotations: `#[storage("table:people")]` and
//! `#[crud(hooks(before_create, after_delete))]`.
//!
//! Field names are the JSON keys of an entity. The derive rejects
//! `#[serde(rename)]` and `#[serde(rename_all)]`; structured fields (`nested`,
//! `list`, `Vec`) are stored as JSON in a single column.

extern crate self as autocrud;

pub mod aggregate;
pub mod app;
pub mod config;
pub mod context;
pub mod declaration;
pub mod errors;
pub mod hooks;
pub mod metadata;
pub mod naming;
pub mod openapi;
pub mod registry;
pub mod repository;
pub mod representation;
pub mod routes;
pub mod storage;
mod tags;

pub use app::{App, AppBuilder};
pub use config::{AppConfig, ConfigError};
pub use context::Context;
pub use declaration::{Declaration, Declare, FieldDeclaration, StructDeclaration};
pub use errors::{ApiError, CrudError};
pub use hooks::{BoxError, HookError, Lifecycle};
pub use metadata::{
    AggregateDescriptor, AggregateKind, EntityDescriptor, FieldDescriptor, ForeignKey, KeyKind,
    ManyToMany, NestedDescriptor,
};
pub use registry::{ParseError, Registry};
pub use repository::Repository;
pub use routes::{EntityHandlers, entity_routes};
pub use storage::{EntityId, MemoryDriver, Row, SeaOrmDriver, StorageDriver, StorageError, TableRef};

#[cfg(feature = "derive")]
pub use autocrud_derive::Entity;

// Re-exported for generated code.
pub use async_trait::async_trait;

/// A declared, serializable type the repository and routes can work with.
///
/// Implemented automatically; the generated routes additionally require
/// `Default`, used as the starting point when decoding a create request.
pub trait Entity:
    Declare + Lifecycle + serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Entity for T where
    T: Declare + Lifecycle + serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static
{
}
