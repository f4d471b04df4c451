//! Normalized description of a parsed entity.
//!
//! These types are the common intermediate representation consumed by the
//! repository, the route generator and the aggregate evaluator. Entity
//! descriptors are only built by [`Registry`](crate::Registry) and are shared
//! as `Arc<EntityDescriptor>`.

use std::any::TypeId;

use crate::naming;

/// Foreign key target of a field tagged `fk:<table>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub field: String,
}

/// Many-to-many link of a field tagged `m2m:<join_table>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManyToMany {
    pub join_table: String,
    pub field: String,
}

/// How values of a primary key are generated and parsed from URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Integer,
    Uuid,
    Text,
}

impl KeyKind {
    /// Classifies a normalized type name such as `i64`, `Option<uuid::Uuid>` or `String`.
    /// Path-qualified spellings (`std::option::Option<core::primitive::i64>`) are accepted.
    #[must_use]
    pub fn from_type_name(type_name: &str) -> Self {
        let inner = option_inner(type_name).unwrap_or(type_name);
        let last = inner.rsplit("::").next().unwrap_or(inner);

        match last {
            "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
            | "u128" | "usize" => Self::Integer,
            "Uuid" => Self::Uuid,
            _ => Self::Text,
        }
    }
}

/// The `T` of `Option<T>`, also when written as `std::option::Option<T>`.
#[must_use]
pub fn option_inner(type_name: &str) -> Option<&str> {
    let start = type_name.find("Option<")?;
    let qualifier = &type_name[..start];
    if !(qualifier.is_empty() || qualifier.ends_with("::")) || qualifier.contains('<') {
        return None;
    }
    type_name[start + "Option<".len()..].strip_suffix('>')
}

/// Metadata for one declared struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as declared; also the key in the serialized form.
    pub name: String,
    /// Storage column; equals `name` unless overridden with `column:<name>`.
    pub column: String,
    /// Normalized declared type, e.g. `Vec<Item>`.
    pub type_name: String,
    /// Field indices from the entity root, one element per nesting level.
    pub path: Vec<usize>,
    pub is_primary_key: bool,
    pub is_nested: bool,
    pub is_list: bool,
    pub is_hidden: bool,
    pub is_read_only: bool,
    pub foreign_key: Option<ForeignKey>,
    pub many_to_many: Option<ManyToMany>,
}

impl FieldDescriptor {
    #[must_use]
    pub fn key_kind(&self) -> KeyKind {
        KeyKind::from_type_name(&self.type_name)
    }

    /// Whether the field holds a structure or collection rather than a scalar.
    /// SQL backends store such values as JSON text.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        let inner = option_inner(&self.type_name).unwrap_or(&self.type_name);
        self.is_list || self.is_nested || self.many_to_many.is_some() || inner.starts_with("Vec<")
    }
}

/// Kind of computed value an aggregate produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AggregateKind {
    Count,
    Sum,
}

impl AggregateKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
        }
    }
}

/// A computed value attached to an entity, e.g. `count:Items` or `sum:Items.Price`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateDescriptor {
    /// Name of the field that receives the computed value.
    pub name: String,
    pub kind: AggregateKind,
    /// Dot-separated relation path.
    pub path: String,
}

/// An embedded sub-structure declared with the `nested` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedDescriptor {
    pub name: String,
    pub type_name: String,
    pub path: Vec<usize>,
}

/// Parsed description of one entity type.
#[derive(Debug)]
pub struct EntityDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    name: String,
    table_name: String,
    fields: Vec<FieldDescriptor>,
    primary_key: Option<usize>,
    aggregates: Vec<AggregateDescriptor>,
    nested: Vec<NestedDescriptor>,
}

impl EntityDescriptor {
    pub(crate) fn new(
        type_id: TypeId,
        type_name: &'static str,
        name: String,
        table_name: String,
    ) -> Self {
        Self {
            type_id,
            type_name,
            name,
            table_name,
            fields: Vec::new(),
            primary_key: None,
            aggregates: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Appends a field; the first primary key field stays the entity's key.
    pub(crate) fn push_field(&mut self, field: FieldDescriptor) {
        if field.is_primary_key && self.primary_key.is_none() {
            self.primary_key = Some(self.fields.len());
        }
        self.fields.push(field);
    }

    pub(crate) fn push_aggregate(&mut self, aggregate: AggregateDescriptor) {
        self.aggregates.push(aggregate);
    }

    pub(crate) fn push_nested(&mut self, nested: NestedDescriptor) {
        self.nested.push(nested);
    }

    /// Identity of the struct type this descriptor was parsed from.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified Rust type name, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// URL segment the entity's routes are mounted under.
    #[must_use]
    pub fn resource_segment(&self) -> String {
        naming::resource_segment(&self.name)
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.primary_key.map(|idx| &self.fields[idx])
    }

    #[must_use]
    pub fn aggregates(&self) -> &[AggregateDescriptor] {
        &self.aggregates
    }

    #[must_use]
    pub fn nested(&self) -> &[NestedDescriptor] {
        &self.nested
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn field_by_column(&self, column: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.column == column)
    }

    #[must_use]
    pub fn aggregate(&self, name: &str) -> Option<&AggregateDescriptor> {
        self.aggregates.iter().find(|a| a.name == name)
    }

    /// Whether `name` receives a computed aggregate value.
    #[must_use]
    pub fn is_aggregate_field(&self, name: &str) -> bool {
        self.aggregate(name).is_some()
    }
}
