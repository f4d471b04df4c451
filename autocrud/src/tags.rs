//! Annotation grammar.
//!
//! Entity tags are semicolon-separated fragments (`pk;readonly;fk:users`).
//! Storage tags live in their own namespace and only contribute the primary
//! key marker, column and table overrides. Unknown fragments are ignored.

use crate::metadata::{AggregateKind, ForeignKey, ManyToMany};

const DEFAULT_TARGET_FIELD: &str = "id";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct FieldTag {
    pub(crate) primary_key: bool,
    pub(crate) nested: bool,
    pub(crate) list: bool,
    pub(crate) hidden: bool,
    pub(crate) read_only: bool,
    pub(crate) foreign_key: Option<ForeignKey>,
    pub(crate) many_to_many: Option<ManyToMany>,
    pub(crate) aggregates: Vec<(AggregateKind, String)>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct StorageTag {
    pub(crate) primary_key: bool,
    pub(crate) column: Option<String>,
    pub(crate) table: Option<String>,
}

fn fragments(tag: &str) -> impl Iterator<Item = &str> {
    tag.split(';').map(str::trim).filter(|f| !f.is_empty())
}

/// Splits `table` or `table.field`; the field defaults to `id`.
fn target(value: &str) -> Option<(String, String)> {
    let (table, field) = match value.split_once('.') {
        Some((table, field)) => (table.trim(), field.trim()),
        None => (value.trim(), DEFAULT_TARGET_FIELD),
    };
    if table.is_empty() || field.is_empty() {
        return None;
    }
    Some((table.to_string(), field.to_string()))
}

pub(crate) fn parse_field_tag(tag: &str) -> FieldTag {
    let mut parsed = FieldTag::default();

    for fragment in fragments(tag) {
        match fragment {
            "pk" => parsed.primary_key = true,
            "nested" => parsed.nested = true,
            "list" => parsed.list = true,
            "hidden" => parsed.hidden = true,
            "readonly" => parsed.read_only = true,
            _ => {
                let Some((key, value)) = fragment.split_once(':') else {
                    continue;
                };
                let value = value.trim();
                match key.trim() {
                    "fk" => {
                        if let Some((table, field)) = target(value) {
                            parsed.foreign_key = Some(ForeignKey { table, field });
                        }
                    }
                    "m2m" => {
                        if let Some((join_table, field)) = target(value) {
                            parsed.many_to_many = Some(ManyToMany { join_table, field });
                        }
                    }
                    "count" if !value.is_empty() => {
                        parsed.aggregates.push((AggregateKind::Count, value.to_string()));
                    }
                    "sum" if !value.is_empty() => {
                        parsed.aggregates.push((AggregateKind::Sum, value.to_string()));
                    }
                    _ => {}
                }
            }
        }
    }

    parsed
}

pub(crate) fn parse_storage_tag(tag: &str) -> StorageTag {
    let mut parsed = StorageTag::default();

    for fragment in fragments(tag) {
        if fragment == "primaryKey" {
            parsed.primary_key = true;
            continue;
        }
        if let Some((key, value)) = fragment.split_once(':') {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "column" => parsed.column = Some(value.to_string()),
                "table" => parsed.table = Some(value.to_string()),
                _ => {}
            }
        }
    }

    parsed
}
