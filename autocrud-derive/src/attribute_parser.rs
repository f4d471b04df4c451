use heck::ToSnakeCase;
use syn::punctuated::Punctuated;
use syn::{Attribute, LitStr, Meta, Token};

/// Lifecycle hooks selectable through `#[crud(hooks(...))]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hook {
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
}

impl Hook {
    /// Accepts `before_create` as well as `BeforeCreate`.
    fn from_name(name: &str) -> Option<Self> {
        match name.to_snake_case().as_str() {
            "before_create" => Some(Self::BeforeCreate),
            "after_create" => Some(Self::AfterCreate),
            "before_update" => Some(Self::BeforeUpdate),
            "after_update" => Some(Self::AfterUpdate),
            "before_delete" => Some(Self::BeforeDelete),
            "after_delete" => Some(Self::AfterDelete),
            _ => None,
        }
    }

    /// `(accessor method, capability trait)` on the runtime side.
    pub(crate) fn runtime_names(self) -> (&'static str, &'static str) {
        match self {
            Self::BeforeCreate => ("before_create_hook", "BeforeCreate"),
            Self::AfterCreate => ("after_create_hook", "AfterCreate"),
            Self::BeforeUpdate => ("before_update_hook", "BeforeUpdate"),
            Self::AfterUpdate => ("after_update_hook", "AfterUpdate"),
            Self::BeforeDelete => ("before_delete_hook", "BeforeDelete"),
            Self::AfterDelete => ("after_delete_hook", "AfterDelete"),
        }
    }
}

/// Joins every string-literal `#[<name>("...")]` on an item with `;`.
pub(crate) fn tag_string(attrs: &[Attribute], name: &str) -> syn::Result<Option<String>> {
    let mut fragments = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident(name)) {
        let lit: LitStr = attr.parse_args().map_err(|err| {
            syn::Error::new(
                err.span(),
                format!("expected a string literal, e.g. #[{name}(\"pk;readonly\")]"),
            )
        })?;
        fragments.push(lit.value());
    }
    Ok((!fragments.is_empty()).then(|| fragments.join(";")))
}

/// Fails on `#[serde(rename ..)]` and `#[serde(rename_all ..)]`.
///
/// Field names double as payload keys, so a renamed field would no longer
/// line up with its key, readonly, hidden or aggregate annotations.
pub(crate) fn reject_serde_renames(attrs: &[Attribute]) -> syn::Result<()> {
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let metas = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        if let Some(meta) = metas
            .iter()
            .find(|m| m.path().is_ident("rename") || m.path().is_ident("rename_all"))
        {
            return Err(syn::Error::new_spanned(
                meta,
                "Entity fields cannot be renamed with serde; field names are used as payload keys",
            ));
        }
    }
    Ok(())
}

/// Struct-level `#[crud(hooks(before_create, after_delete))]`.
pub(crate) fn hooks(attrs: &[Attribute]) -> syn::Result<Vec<Hook>> {
    let mut hooks = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("crud")) {
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("hooks") {
                return Err(meta.error("unsupported crud attribute, expected `hooks(...)`"));
            }
            meta.parse_nested_meta(|hook| {
                let name = hook
                    .path
                    .get_ident()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                match Hook::from_name(&name) {
                    Some(kind) if !hooks.contains(&kind) => hooks.push(kind),
                    Some(_) => {}
                    None => {
                        return Err(hook.error(format!(
                            "unknown hook `{name}`, expected one of before_create, after_create, \
                             before_update, after_update, before_delete, after_delete"
                        )));
                    }
                }
                Ok(())
            })
        })?;
    }
    Ok(hooks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_serde_renames_are_rejected() {
        let renamed: syn::Field = parse_quote! {
            #[serde(default, rename = "userId")]
            pub id: i64
        };
        let err = reject_serde_renames(&renamed.attrs).unwrap_err();
        assert!(err.to_string().contains("cannot be renamed"));

        let input: syn::DeriveInput = parse_quote! {
            #[serde(rename_all = "camelCase")]
            struct Person { pub id: i64 }
        };
        assert!(reject_serde_renames(&input.attrs).is_err());

        let plain: syn::Field = parse_quote! {
            #[serde(skip, default)]
            pub calls: Vec<String>
        };
        assert!(reject_serde_renames(&plain.attrs).is_ok());
    }

    #[test]
    fn test_tag_fragments_are_joined() {
        let field: syn::Field = parse_quote! {
            #[crud("pk")]
            #[crud("readonly")]
            #[storage("column:user_id")]
            pub id: i64
        };
        assert_eq!(
            tag_string(&field.attrs, "crud").unwrap().as_deref(),
            Some("pk;readonly")
        );
        assert_eq!(
            tag_string(&field.attrs, "storage").unwrap().as_deref(),
            Some("column:user_id")
        );
    }

    #[test]
    fn test_missing_tag_is_none() {
        let field: syn::Field = parse_quote! { pub name: String };
        assert_eq!(tag_string(&field.attrs, "crud").unwrap(), None);
    }

    #[test]
    fn test_non_string_tag_is_rejected() {
        let field: syn::Field = parse_quote! { #[crud(pk)] pub id: i64 };
        assert!(tag_string(&field.attrs, "crud").is_err());
    }

    #[test]
    fn test_hooks_accept_both_spellings() {
        let input: syn::DeriveInput = parse_quote! {
            #[crud(hooks(before_create, AfterDelete, before_create))]
            struct Note { title: String }
        };
        assert_eq!(
            hooks(&input.attrs).unwrap(),
            vec![Hook::BeforeCreate, Hook::AfterDelete]
        );
    }

    #[test]
    fn test_unknown_hook_is_an_error() {
        let input: syn::DeriveInput = parse_quote! {
            #[crud(hooks(before_save))]
            struct Note { title: String }
        };
        let err = hooks(&input.attrs).unwrap_err();
        assert!(err.to_string().contains("unknown hook `before_save`"));
    }
}
