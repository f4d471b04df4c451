use proc_macro2::TokenStream;
use quote::{ToTokens, format_ident, quote};
use syn::{Data, DeriveInput, Field, Fields, Visibility};

use crate::attribute_parser::{self, Hook};

pub(crate) fn expand_entity(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            ident,
            "Entity can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            ident,
            "Entity requires a struct with named fields",
        ));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    attribute_parser::reject_serde_renames(&input.attrs)?;

    let name = ident.to_string();
    let table = attribute_parser::tag_string(&input.attrs, "storage")?
        .map(|tag| quote! { .storage_tag(#tag) });
    let fields = named
        .named
        .iter()
        .map(field_declaration)
        .collect::<syn::Result<Vec<_>>>()?;
    let accessors = attribute_parser::hooks(&input.attrs)?
        .into_iter()
        .map(hook_accessor);

    Ok(quote! {
        #[automatically_derived]
        impl ::autocrud::Declare for #ident {
            fn declaration() -> ::autocrud::Declaration {
                ::autocrud::Declaration::Struct(
                    ::autocrud::StructDeclaration::of::<Self>(#name)
                        #table
                        #(#fields)*
                )
            }
        }

        #[automatically_derived]
        impl ::autocrud::hooks::Lifecycle for #ident {
            #(#accessors)*
        }
    })
}

fn field_declaration(field: &Field) -> syn::Result<TokenStream> {
    let Some(ident) = &field.ident else {
        return Err(syn::Error::new_spanned(field, "expected a named field"));
    };
    attribute_parser::reject_serde_renames(&field.attrs)?;
    let name = ident.to_string();
    let name = name.strip_prefix("r#").unwrap_or(&name);
    let type_name = field.ty.to_token_stream().to_string().replace(' ', "");
    let exported = matches!(field.vis, Visibility::Public(_));
    let tag = attribute_parser::tag_string(&field.attrs, "crud")?.map(|t| quote! { .tag(#t) });
    let storage =
        attribute_parser::tag_string(&field.attrs, "storage")?.map(|t| quote! { .storage_tag(#t) });

    Ok(quote! {
        .field(
            ::autocrud::FieldDeclaration::new(#name, #type_name)
                .exported(#exported)
                #tag
                #storage
        )
    })
}

fn hook_accessor(hook: Hook) -> TokenStream {
    let (accessor, capability) = hook.runtime_names();
    let accessor = format_ident!("{}", accessor);
    let capability = format_ident!("{}", capability);
    quote! {
        fn #accessor(&mut self) -> ::core::option::Option<&mut dyn ::autocrud::hooks::#capability> {
            ::core::option::Option::Some(self)
        }
    }
}
