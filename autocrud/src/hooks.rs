//! Lifecycle hooks.
//!
//! An entity opts into a hook by implementing the matching capability trait
//! and exposing it through [`Lifecycle`]. With the derive macro this is
//! `#[crud(hooks(before_create, after_update))]`; by hand it looks like:
//!
//! ```rust
//! use async_trait::async_trait;
//! use autocrud::hooks::{BeforeCreate, Lifecycle};
//! use autocrud::{BoxError, Context, StorageDriver};
//!
//! struct Note {
//!     title: String,
//! }
//!
//! #[async_trait]
//! impl BeforeCreate for Note {
//!     async fn before_create(&mut self, _ctx: &Context, _tx: &dyn StorageDriver) -> Result<(), BoxError> {
//!         self.title = self.title.trim().to_string();
//!         Ok(())
//!     }
//! }
//!
//! impl Lifecycle for Note {
//!     fn before_create_hook(&mut self) -> Option<&mut dyn BeforeCreate> {
//!         Some(self)
//!     }
//! }
//! ```
//!
//! Hooks receive the storage driver the operation runs against. The driver
//! is not transactional; a hook that needs atomicity must arrange it itself.

use std::error::Error;
use std::fmt;

use async_trait::async_trait;

use crate::context::Context;
use crate::storage::StorageDriver;

/// Error type hooks return. Any error converts into it with `?`.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

#[async_trait]
pub trait BeforeCreate: Send {
    async fn before_create(&mut self, ctx: &Context, tx: &dyn StorageDriver)
    -> Result<(), BoxError>;
}

#[async_trait]
pub trait AfterCreate: Send {
    async fn after_create(&mut self, ctx: &Context, tx: &dyn StorageDriver) -> Result<(), BoxError>;
}

#[async_trait]
pub trait BeforeUpdate: Send {
    async fn before_update(&mut self, ctx: &Context, tx: &dyn StorageDriver)
    -> Result<(), BoxError>;
}

#[async_trait]
pub trait AfterUpdate: Send {
    async fn after_update(&mut self, ctx: &Context, tx: &dyn StorageDriver) -> Result<(), BoxError>;
}

#[async_trait]
pub trait BeforeDelete: Send {
    async fn before_delete(&mut self, ctx: &Context, tx: &dyn StorageDriver)
    -> Result<(), BoxError>;
}

#[async_trait]
pub trait AfterDelete: Send {
    async fn after_delete(&mut self, ctx: &Context, tx: &dyn StorageDriver) -> Result<(), BoxError>;
}

/// Capability check: which hooks an entity implements.
///
/// Every accessor defaults to `None`, so `impl Lifecycle for T {}` declares
/// an entity without hooks.
pub trait Lifecycle: Send {
    fn before_create_hook(&mut self) -> Option<&mut dyn BeforeCreate> {
        None
    }

    fn after_create_hook(&mut self) -> Option<&mut dyn AfterCreate> {
        None
    }

    fn before_update_hook(&mut self) -> Option<&mut dyn BeforeUpdate> {
        None
    }

    fn after_update_hook(&mut self) -> Option<&mut dyn AfterUpdate> {
        None
    }

    fn before_delete_hook(&mut self) -> Option<&mut dyn BeforeDelete> {
        None
    }

    fn after_delete_hook(&mut self) -> Option<&mut dyn AfterDelete> {
        None
    }
}

/// Error returned by a hook, carried unmodified.
pub struct HookError(BoxError);

impl HookError {
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }

    /// The error exactly as the hook returned it.
    #[must_use]
    pub fn into_inner(self) -> BoxError {
        self.0
    }

    #[must_use]
    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.0
    }
}

impl fmt::Debug for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HookError").field(&self.0).finish()
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for HookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.0)
    }
}

macro_rules! dispatch {
    ($($(#[$doc:meta])* $fn_name:ident => $accessor:ident . $method:ident;)*) => {
        $(
            $(#[$doc])*
            ///
            /// # Errors
            ///
            /// The hook's own error, wrapped in [`HookError`].
            pub async fn $fn_name<E: Lifecycle + ?Sized>(
                ctx: &Context,
                entity: &mut E,
                tx: &dyn StorageDriver,
            ) -> Result<(), HookError> {
                match entity.$accessor() {
                    Some(hook) => hook.$method(ctx, tx).await.map_err(HookError),
                    None => Ok(()),
                }
            }
        )*
    };
}

dispatch! {
    /// Runs the entity's `BeforeCreate` hook, if any.
    call_before_create => before_create_hook.before_create;
    /// Runs the entity's `AfterCreate` hook, if any.
    call_after_create => after_create_hook.after_create;
    /// Runs the entity's `BeforeUpdate` hook, if any.
    call_before_update => before_update_hook.before_update;
    /// Runs the entity's `AfterUpdate` hook, if any.
    call_after_update => after_update_hook.after_update;
    /// Runs the entity's `BeforeDelete` hook, if any.
    call_before_delete => before_delete_hook.before_delete;
    /// Runs the entity's `AfterDelete` hook, if any.
    call_after_delete => after_delete_hook.after_delete;
}
