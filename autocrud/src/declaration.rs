//! Ahead-of-time schema declarations.
//!
//! A type opts into the registry by implementing [`Declare`], usually through
//! `#[derive(Entity)]`. The declaration carries the raw annotation strings;
//! interpreting them is the registry's job.
//!
//! ```rust
//! use autocrud::{Declaration, Declare, FieldDeclaration, StructDeclaration};
//!
//! struct Tag {
//!     id: i64,
//!     label: String,
//! }
//!
//! impl Declare for Tag {
//!     fn declaration() -> Declaration {
//!         Declaration::Struct(
//!             StructDeclaration::of::<Self>("Tag")
//!                 .field(FieldDeclaration::new("id", "i64").tag("pk"))
//!                 .field(FieldDeclaration::new("label", "String")),
//!         )
//!     }
//! }
//! ```

use std::any::{TypeId, type_name};
use std::sync::Arc;

/// Shape of a declared type as seen by the parser.
#[derive(Debug, Clone)]
pub enum Declaration {
    /// A struct with named fields.
    Struct(StructDeclaration),
    /// One level of indirection (`Box<T>`, `Arc<T>`) over another declaration.
    Indirect(Box<Declaration>),
    /// A value without fields.
    Scalar { type_name: &'static str },
}

impl Declaration {
    /// Rust type name of the outermost declared type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Struct(decl) => decl.type_name,
            Self::Indirect(inner) => inner.type_name(),
            Self::Scalar { type_name } => type_name,
        }
    }
}

/// Declared struct: name, storage annotation and fields in declaration order.
#[derive(Debug, Clone)]
pub struct StructDeclaration {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) name: String,
    pub(crate) storage_tag: Option<String>,
    pub(crate) fields: Vec<FieldDeclaration>,
}

impl StructDeclaration {
    /// Starts a declaration for `T` under the logical name `name`.
    #[must_use]
    pub fn of<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: name.into(),
            storage_tag: None,
            fields: Vec::new(),
        }
    }

    /// Struct-level storage annotation, e.g. `table:people`.
    #[must_use]
    pub fn storage_tag(mut self, tag: impl Into<String>) -> Self {
        self.storage_tag = Some(tag.into());
        self
    }

    /// Appends a field. Fields without an explicit path get their position.
    #[must_use]
    pub fn field(mut self, mut field: FieldDeclaration) -> Self {
        if field.path.is_empty() {
            field.path.push(self.fields.len());
        }
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDeclaration] {
        &self.fields
    }
}

/// One declared field with its raw annotations.
#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) exported: bool,
    pub(crate) tag: Option<String>,
    pub(crate) storage_tag: Option<String>,
    pub(crate) path: Vec<usize>,
}

impl FieldDeclaration {
    /// An exported field without annotations.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            exported: true,
            tag: None,
            storage_tag: None,
            path: Vec::new(),
        }
    }

    /// Non-exported fields are skipped by the parser.
    #[must_use]
    pub fn exported(mut self, exported: bool) -> Self {
        self.exported = exported;
        self
    }

    /// Semicolon-separated entity annotation, e.g. `pk` or `fk:users;readonly`.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Storage annotation, e.g. `primaryKey` or `column:user_id`.
    #[must_use]
    pub fn storage_tag(mut self, tag: impl Into<String>) -> Self {
        self.storage_tag = Some(tag.into());
        self
    }

    /// Structural path for embedded fields.
    #[must_use]
    pub fn path(mut self, path: Vec<usize>) -> Self {
        self.path = path;
        self
    }
}

/// Types that can describe themselves to the registry.
pub trait Declare: 'static {
    /// Identity the registry caches under. Indirections forward to their target.
    fn type_identity() -> TypeId {
        TypeId::of::<Self>()
    }

    fn declaration() -> Declaration;
}

macro_rules! declare_scalars {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Declare for $ty {
                fn declaration() -> Declaration {
                    Declaration::Scalar { type_name: type_name::<$ty>() }
                }
            }
        )*
    };
}

declare_scalars!(
    bool, char, String, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

impl<T: Declare> Declare for Box<T> {
    fn type_identity() -> TypeId {
        TypeId::of::<T>()
    }

    fn declaration() -> Declaration {
        Declaration::Indirect(Box::new(T::declaration()))
    }
}

impl<T: Declare> Declare for Arc<T> {
    fn type_identity() -> TypeId {
        TypeId::of::<T>()
    }

    fn declaration() -> Declaration {
        Declaration::Indirect(Box::new(T::declaration()))
    }
}
