//! `#[derive(UpdatePayload)]` implementation.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, LitStr, Path};

/// Struct-level `#[update(...)]` settings.
struct PayloadAttrs {
    field: Option<LitStr>,
    krate: Path,
}

fn parse_attrs(attrs: &[Attribute]) -> syn::Result<PayloadAttrs> {
    let mut field = None;
    let mut krate = None;

    for attr in attrs.iter().filter(|a| a.path().is_ident("update")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("field") {
                let lit: LitStr = meta.value()?.parse()?;
                if lit.value().is_empty() {
                    return Err(meta.error("`field` must not be empty"));
                }
                field = Some(lit);
                Ok(())
            } else if meta.path.is_ident("crate") {
                let lit: LitStr = meta.value()?.parse()?;
                krate = Some(lit.parse::<Path>()?);
                Ok(())
            } else {
                Err(meta.error("unknown attribute, expected `field` or `crate`"))
            }
        })?;
    }

    Ok(PayloadAttrs {
        field,
        krate: krate.unwrap_or_else(|| syn::parse_quote!(::sakura_core)),
    })
}

pub fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    match &input.data {
        Data::Struct(_) => {}
        Data::Enum(_) | Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "UpdatePayload can only be derived for structs",
            ));
        }
    }

    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "UpdatePayload types must own their data",
        ));
    }

    let PayloadAttrs { field, krate } = parse_attrs(&input.attrs)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match field {
        Some(field) => quote!(update.extract_field::<Self>(#field)),
        None => quote!(update.extract::<Self>()),
    };

    Ok(quote! {
        impl #impl_generics #krate::FromUpdate for #name #ty_generics #where_clause {
            const KIND: #krate::ParamKind = #krate::ParamKind::Record;

            fn from_update(
                update: &::std::sync::Arc<#krate::Update>,
            ) -> #krate::ExtractResult<Self> {
                #body
            }
        }
    })
}
