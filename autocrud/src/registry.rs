//! Entity registry: parses declarations into [`EntityDescriptor`]s and caches
//! them by type identity.
//!
//! A registry is constructed once at startup and handed to the repository,
//! the route generator and the app by reference (usually as `Arc<Registry>`).
//! [`Registry::clear`] exists for test isolation.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::declaration::{Declaration, Declare, StructDeclaration};
use crate::metadata::{AggregateDescriptor, EntityDescriptor, FieldDescriptor, NestedDescriptor};
use crate::naming;
use crate::tags::{parse_field_tag, parse_storage_tag};

/// The declared type does not resolve to a struct.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot resolve `{type_name}` to a struct type")]
pub struct ParseError {
    pub type_name: String,
}

/// Cache of parsed entity descriptors keyed by structural type identity.
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<HashMap<TypeId, Arc<EntityDescriptor>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the descriptor for `T`, parsing and caching it on first use.
    ///
    /// Repeated calls return the same `Arc` until [`Registry::clear`] is called,
    /// including when several threads race on a type that was not cached yet.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when `T` does not resolve to a struct, either
    /// because it is a scalar or because it wraps more than one indirection.
    pub fn parse<T: Declare>(&self) -> Result<Arc<EntityDescriptor>, ParseError> {
        let key = T::type_identity();
        if let Some(found) = self.get(key) {
            return Ok(found);
        }

        let descriptor = build_descriptor(resolve(T::declaration())?);
        tracing::debug!(
            entity = descriptor.name(),
            table = descriptor.table_name(),
            fields = descriptor.fields().len(),
            "parsed entity declaration"
        );

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            entries
                .entry(descriptor.type_id())
                .or_insert_with(|| Arc::new(descriptor)),
        ))
    }

    /// Same as [`Registry::parse`], inferring the type from a value.
    ///
    /// # Errors
    ///
    /// See [`Registry::parse`].
    pub fn parse_value<T: Declare>(&self, _value: &T) -> Result<Arc<EntityDescriptor>, ParseError> {
        self.parse::<T>()
    }

    /// Cached descriptor for a type identity, if parsed already.
    #[must_use]
    pub fn get(&self, type_id: TypeId) -> Option<Arc<EntityDescriptor>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .cloned()
    }

    /// All cached descriptors, in no particular order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<Arc<EntityDescriptor>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards every cached descriptor.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Dereferences at most one indirection; anything but a struct is rejected.
fn resolve(declaration: Declaration) -> Result<StructDeclaration, ParseError> {
    match declaration {
        Declaration::Struct(decl) => Ok(decl),
        Declaration::Indirect(inner) => match *inner {
            Declaration::Struct(decl) => Ok(decl),
            other => Err(ParseError {
                type_name: other.type_name().to_string(),
            }),
        },
        Declaration::Scalar { type_name } => Err(ParseError {
            type_name: type_name.to_string(),
        }),
    }
}

fn build_descriptor(decl: StructDeclaration) -> EntityDescriptor {
    let storage = decl
        .storage_tag
        .as_deref()
        .map(parse_storage_tag)
        .unwrap_or_default();
    let table_name = storage
        .table
        .unwrap_or_else(|| naming::table_name(&decl.name));

    let mut entity = EntityDescriptor::new(decl.type_id, decl.type_name, decl.name, table_name);

    for field in decl.fields.into_iter().filter(|f| f.exported) {
        let tag = field.tag.as_deref().map(parse_field_tag).unwrap_or_default();
        let storage = field
            .storage_tag
            .as_deref()
            .map(parse_storage_tag)
            .unwrap_or_default();

        for (kind, path) in tag.aggregates {
            entity.push_aggregate(AggregateDescriptor {
                name: field.name.clone(),
                kind,
                path,
            });
        }
        if tag.nested {
            entity.push_nested(NestedDescriptor {
                name: field.name.clone(),
                type_name: field.type_name.clone(),
                path: field.path.clone(),
            });
        }

        entity.push_field(FieldDescriptor {
            column: storage.column.unwrap_or_else(|| field.name.clone()),
            name: field.name,
            type_name: field.type_name,
            path: field.path,
            is_primary_key: tag.primary_key || storage.primary_key,
            is_nested: tag.nested,
            is_list: tag.list,
            is_hidden: tag.hidden,
            is_read_only: tag.read_only,
            foreign_key: tag.foreign_key,
            many_to_many: tag.many_to_many,
        });
    }

    entity
}
