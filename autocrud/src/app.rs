//! Application wiring: configuration, registry, storage and router.
//!
//! ```rust,ignore
//! let mut app = App::connect(AppConfig::from_env()?).await?;
//! app.register::<User>()?.register::<Product>()?;
//! app.serve().await?;
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa::openapi::OpenApi;

use crate::Entity;
use crate::config::AppConfig;
use crate::errors::CrudError;
use crate::metadata::EntityDescriptor;
use crate::openapi;
use crate::registry::Registry;
use crate::routes::{EntityHandlers, entity_routes};
use crate::storage::{SeaOrmDriver, StorageDriver, StorageError};

type Middleware = Box<dyn FnOnce(Router) -> Router + Send>;

/// Builder for [`App`].
#[derive(Default)]
pub struct AppBuilder {
    config: AppConfig,
    registry: Option<Arc<Registry>>,
    storage: Option<Arc<dyn StorageDriver>>,
    middleware: Vec<Middleware>,
}

impl AppBuilder {
    #[must_use]
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn storage(mut self, storage: impl StorageDriver + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    #[must_use]
    pub fn shared_storage(mut self, storage: Arc<dyn StorageDriver>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Shares an existing registry; by default the app owns a fresh one.
    #[must_use]
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Adds a router transformation applied by [`App::into_router`], in
    /// registration order and before the trace layer.
    #[must_use]
    pub fn middleware(mut self, layer: impl FnOnce(Router) -> Router + Send + 'static) -> Self {
        self.middleware.push(Box::new(layer));
        self
    }

    #[must_use]
    pub fn build(self) -> App {
        App {
            config: self.config,
            registry: self.registry.unwrap_or_default(),
            storage: self.storage,
            middleware: self.middleware,
            router: Router::new(),
            entities: Vec::new(),
            mounted: HashMap::new(),
        }
    }
}

/// A set of registered entities served over HTTP.
pub struct App {
    config: AppConfig,
    registry: Arc<Registry>,
    storage: Option<Arc<dyn StorageDriver>>,
    middleware: Vec<Middleware>,
    router: Router,
    entities: Vec<Arc<EntityDescriptor>>,
    mounted: HashMap<String, TypeId>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("storage", &self.storage.as_ref().map(|s| s.backend()))
            .field(
                "entities",
                &self.entities.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl App {
    #[must_use]
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    /// Builds an app from `config`, opening a [`SeaOrmDriver`] when a
    /// database URL is configured.
    ///
    /// # Errors
    ///
    /// [`StorageError::Database`] when the connection fails.
    pub async fn connect(config: AppConfig) -> Result<Self, StorageError> {
        let mut builder = Self::builder();
        if let Some(url) = config.database_url.as_deref() {
            let driver = SeaOrmDriver::connect(url).await?;
            tracing::info!(backend = driver.backend(), "connected to storage");
            builder = builder.storage(driver);
        }
        Ok(builder.config(config).build())
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Registered entities in registration order.
    #[must_use]
    pub fn entities(&self) -> &[Arc<EntityDescriptor>] {
        &self.entities
    }

    /// Parses `T` and mounts its routes. Registering the same type again is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// [`CrudError::NoStorageConfigured`], [`CrudError::Parse`], or
    /// [`CrudError::DuplicateRoute`] when another entity already owns the
    /// resource segment.
    pub fn register<T: Entity + Default>(&mut self) -> Result<&mut Self, CrudError> {
        let storage = self.storage.clone().ok_or(CrudError::NoStorageConfigured)?;
        let descriptor = self.registry.parse::<T>()?;
        let resource = descriptor.resource_segment();

        match self.mounted.get(&resource).copied() {
            Some(owner) if owner == descriptor.type_id() => return Ok(self),
            Some(_) => return Err(CrudError::DuplicateRoute { resource }),
            None => {}
        }

        let handlers = EntityHandlers::<T>::new(storage, Arc::clone(&descriptor))
            .with_timeout(self.config.request_timeout);
        let router = std::mem::take(&mut self.router);
        self.router = router.merge(entity_routes(Arc::new(handlers)));

        tracing::info!(
            entity = descriptor.name(),
            table = descriptor.table_name(),
            path = %format!("/{resource}"),
            "registered entity routes"
        );
        self.mounted.insert(resource, descriptor.type_id());
        self.entities.push(descriptor);
        Ok(self)
    }

    /// OpenAPI document for every registered entity.
    #[must_use]
    pub fn openapi(&self) -> OpenApi {
        openapi::document(
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            self.entities.iter().map(|entity| &**entity),
        )
    }

    /// The final router: entity routes, then middleware, then request tracing.
    pub fn into_router(self) -> Router {
        let mut router = self.router;
        for layer in self.middleware {
            router = layer(router);
        }
        if self.config.trace_requests {
            router = router.layer(TraceLayer::new_for_http());
        }
        router
    }

    /// Binds the configured address and serves until the process stops.
    ///
    /// # Errors
    ///
    /// Any I/O error from binding or serving.
    pub async fn serve(self) -> std::io::Result<()> {
        let address = self.config.address.clone();
        let listener = tokio::net::TcpListener::bind(&address).await?;
        tracing::info!(%address, entities = self.entities.len(), "serving");
        axum::serve(listener, self.into_router()).await
    }
}
