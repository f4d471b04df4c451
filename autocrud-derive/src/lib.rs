mod attribute_parser;
mod code_generator;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `autocrud::Declare` and `autocrud::hooks::Lifecycle`.
///
/// Field attributes:
/// - `#[crud("pk;readonly")]`: entity annotations, several attributes are joined with `;`
/// - `#[storage("primaryKey;column:user_id")]`: storage annotations
///
/// Struct attributes:
/// - `#[storage("table:people")]`: table name override
/// - `#[crud(hooks(before_create, after_update))]`: hooks the struct implements;
///   each listed hook requires the matching `autocrud::hooks` trait impl
///
/// Only `pub` fields are exported to the registry. Field names are the JSON
/// keys of the entity, so `#[serde(rename)]` and `#[serde(rename_all)]` are
/// rejected.
#[proc_macro_derive(Entity, attributes(crud, storage))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    code_generator::expand_entity(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
