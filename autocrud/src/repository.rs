//! Generic data access for any registered entity.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::Entity;
use crate::aggregate;
use crate::context::Context;
use crate::errors::CrudError;
use crate::metadata::EntityDescriptor;
use crate::registry::Registry;
use crate::representation::{from_columns, from_row, is_unset_key, to_columns, to_row};
use crate::storage::{EntityId, Row, StorageDriver, TableRef};

/// CRUD operations for `T`, bound to its descriptor and an optional driver.
///
/// Without a driver every operation fails with
/// [`CrudError::NoStorageConfigured`]; this lets a repository exist before
/// storage is wired up.
pub struct Repository<T> {
    storage: Option<Arc<dyn StorageDriver>>,
    descriptor: Arc<EntityDescriptor>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            descriptor: Arc::clone(&self.descriptor),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &self.descriptor.name())
            .field("table", &self.descriptor.table_name())
            .field("storage", &self.storage.as_ref().map(|s| s.backend()))
            .finish()
    }
}

impl<T: Entity> Repository<T> {
    #[must_use]
    pub fn new(storage: Option<Arc<dyn StorageDriver>>, descriptor: Arc<EntityDescriptor>) -> Self {
        Self {
            storage,
            descriptor,
            _entity: PhantomData,
        }
    }

    /// Builds a repository from the registry's descriptor for `T`.
    ///
    /// # Errors
    ///
    /// [`CrudError::Parse`] when `T` does not resolve to a struct.
    pub fn from_registry(
        registry: &Registry,
        storage: Option<Arc<dyn StorageDriver>>,
    ) -> Result<Self, CrudError> {
        Ok(Self::new(storage, registry.parse::<T>()?))
    }

    #[must_use]
    pub fn descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.descriptor
    }

    #[must_use]
    pub fn storage(&self) -> Option<&Arc<dyn StorageDriver>> {
        self.storage.as_ref()
    }

    fn driver(&self) -> Result<&dyn StorageDriver, CrudError> {
        self.storage.as_deref().ok_or(CrudError::NoStorageConfigured)
    }

    fn table(&self) -> TableRef<'_> {
        TableRef::for_entity(&self.descriptor)
    }

    fn require_key(&self) -> Result<(), CrudError> {
        match self.descriptor.primary_key() {
            Some(_) => Ok(()),
            None => Err(CrudError::NoPrimaryKey {
                entity: self.descriptor.name().to_string(),
            }),
        }
    }

    /// Stored columns to `T`; aggregate fields are computed, as they are never stored.
    fn materialize(&self, row: Row) -> Result<T, CrudError> {
        let mut fields = from_columns(&self.descriptor, row);
        aggregate::apply(&self.descriptor, &mut fields);
        from_row(&self.descriptor, fields)
    }

    /// Persists `entity` and writes the stored state back into it.
    ///
    /// An unset primary key (`0`, `""`, `null` or the nil UUID) is left for
    /// the driver to generate.
    ///
    /// # Errors
    ///
    /// [`CrudError::NoStorageConfigured`], [`CrudError::Mapping`] or a storage error.
    pub async fn create(&self, ctx: &Context, entity: &mut T) -> Result<(), CrudError> {
        let driver = self.driver()?;
        let fields = to_row(&self.descriptor, entity)?;
        let mut columns = to_columns(&self.descriptor, fields.clone());
        if let Some(pk) = self.descriptor.primary_key() {
            if columns.get(&pk.column).is_some_and(is_unset_key) {
                columns.remove(&pk.column);
            }
        }

        tracing::debug!(entity = self.descriptor.name(), "creating row");
        let stored = driver.insert(ctx, self.table(), columns).await?;

        let mut merged = fields;
        merged.extend(from_columns(&self.descriptor, stored));
        aggregate::apply(&self.descriptor, &mut merged);
        *entity = from_row(&self.descriptor, merged)?;
        Ok(())
    }

    /// # Errors
    ///
    /// [`CrudError::NotFound`] when no row has this key,
    /// [`CrudError::NoPrimaryKey`], [`CrudError::NoStorageConfigured`] or a
    /// storage error.
    pub async fn get_by_id(&self, ctx: &Context, id: impl Into<EntityId>) -> Result<T, CrudError> {
        let driver = self.driver()?;
        self.require_key()?;
        let id = id.into();
        tracing::debug!(entity = self.descriptor.name(), %id, "loading row");

        match driver.find_by_id(ctx, self.table(), &id).await? {
            Some(row) => self.materialize(row),
            None => Err(CrudError::NotFound {
                entity: self.descriptor.name().to_string(),
                id: id.to_string(),
            }),
        }
    }

    /// Every stored entity, in driver order.
    ///
    /// # Errors
    ///
    /// [`CrudError::NoStorageConfigured`], [`CrudError::Mapping`] or a storage error.
    pub async fn get_all(&self, ctx: &Context) -> Result<Vec<T>, CrudError> {
        let driver = self.driver()?;
        tracing::debug!(entity = self.descriptor.name(), "loading all rows");
        driver
            .find_all(ctx, self.table())
            .await?
            .into_iter()
            .map(|row| self.materialize(row))
            .collect()
    }

    /// Persists the full state of `entity`, keyed by its primary key.
    ///
    /// # Errors
    ///
    /// [`CrudError::NotFound`] when no row was affected,
    /// [`CrudError::InvalidKey`] when the key is unset, plus
    /// [`CrudError::NoStorageConfigured`] and [`CrudError::NoPrimaryKey`].
    pub async fn update(&self, ctx: &Context, entity: &T) -> Result<(), CrudError> {
        let driver = self.driver()?;
        let id = self.key_of(entity)?;
        let columns = to_columns(&self.descriptor, to_row(&self.descriptor, entity)?);

        tracing::debug!(entity = self.descriptor.name(), %id, "updating row");
        let affected = driver.update(ctx, self.table(), &id, columns).await?;
        if affected == 0 {
            return Err(CrudError::NotFound {
                entity: self.descriptor.name().to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Removes the row with `id`. Deleting a missing row succeeds.
    ///
    /// # Errors
    ///
    /// [`CrudError::NoStorageConfigured`], [`CrudError::NoPrimaryKey`] or a storage error.
    pub async fn delete(&self, ctx: &Context, id: impl Into<EntityId>) -> Result<(), CrudError> {
        let driver = self.driver()?;
        self.require_key()?;
        let id = id.into();
        tracing::debug!(entity = self.descriptor.name(), %id, "deleting row");
        driver.delete(ctx, self.table(), &id).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// [`CrudError::NoStorageConfigured`] or a storage error.
    pub async fn count(&self, ctx: &Context) -> Result<u64, CrudError> {
        let driver = self.driver()?;
        Ok(driver.count(ctx, self.table()).await?)
    }

    /// Primary key value of `entity`.
    ///
    /// # Errors
    ///
    /// [`CrudError::NoPrimaryKey`] or [`CrudError::InvalidKey`].
    pub fn key_of(&self, entity: &T) -> Result<EntityId, CrudError> {
        let Some(pk) = self.descriptor.primary_key() else {
            return Err(CrudError::NoPrimaryKey {
                entity: self.descriptor.name().to_string(),
            });
        };
        let row = to_row(&self.descriptor, entity)?;
        row.get(&pk.name)
            .filter(|value| !is_unset_key(value))
            .and_then(EntityId::from_json)
            .ok_or_else(|| CrudError::InvalidKey {
                entity: self.descriptor.name().to_string(),
            })
    }

    /// Sets the primary key field of `entity` to `id`.
    ///
    /// # Errors
    ///
    /// [`CrudError::NoPrimaryKey`] or [`CrudError::Mapping`] when the key
    /// does not fit the field's type.
    pub fn set_key(&self, entity: &mut T, id: &EntityId) -> Result<(), CrudError> {
        let Some(pk) = self.descriptor.primary_key() else {
            return Err(CrudError::NoPrimaryKey {
                entity: self.descriptor.name().to_string(),
            });
        };
        let mut row = to_row(&self.descriptor, entity)?;
        row.insert(pk.name.clone(), id.to_json());
        *entity = from_row(&self.descriptor, row)?;
        Ok(())
    }
}
