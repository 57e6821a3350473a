//! Procedural macros for the firefly project.
//!
//! `#[derive(Model)]` implements `firefly::model::Model` for a struct with named
//! fields. The collection name is resolved at compile time from the type name
//! (snake case, then pluralized) unless overridden:
//!
//! ```ignore
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! #[model(collection = "insects")]
//! pub struct Bug {
//!     #[model(id)]
//!     pub key: String,
//!     pub created_at: String,
//!     pub timestamp: i64,
//!     pub name: String,
//! }
//! ```
//!
//! The identity field defaults to `id`. Every model must also declare `created_at`
//! and `timestamp` fields, which the construction contract fills in.

#[allow(unused_extern_crates)]
extern crate self as firefly_macros;

use inflector::Inflector;
use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, FieldsNamed, Ident, LitStr, parse_macro_input};

const REQUIRED_FIELDS: [&str; 2] = ["created_at", "timestamp"];

#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_model(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_model(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let fields = named_fields(input)?;
    let collection = extract_collection(input)?;
    let id_field = extract_id_field(input, fields)?;

    for required in REQUIRED_FIELDS {
        let present = fields
            .named
            .iter()
            .any(|field| field.ident.as_ref().is_some_and(|ident| ident == required));

        if !present {
            return Err(syn::Error::new_spanned(
                name,
                format!("Model derive: `{name}` needs a `{required}` field"),
            ));
        }
    }

    let id_name = id_field.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::firefly::model::Model for #name #ty_generics #where_clause {
            fn collection_name() -> &'static str {
                #collection
            }

            fn id(&self) -> &str {
                &self.#id_field
            }

            fn set_id(&mut self, id: ::std::string::String) {
                self.#id_field = id;
            }

            fn id_field() -> &'static str {
                #id_name
            }
        }
    })
}

fn named_fields(input: &DeriveInput) -> syn::Result<&FieldsNamed> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                "Model derive: only structs with named fields are supported",
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            "Model derive: only structs are supported",
        )),
    }
}

/// `#[model(collection = "...")]`, or the pluralized snake case type name.
fn extract_collection(input: &DeriveInput) -> syn::Result<String> {
    let mut collection = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("model") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("collection name must not be empty"));
                }
                collection = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unknown model attribute"))
            }
        })?;
    }

    Ok(collection.unwrap_or_else(|| input.ident.to_string().to_snake_case().to_plural()))
}

/// The field tagged `#[model(id)]`, or the one named `id`.
fn extract_id_field(input: &DeriveInput, fields: &FieldsNamed) -> syn::Result<Ident> {
    for field in &fields.named {
        for attr in &field.attrs {
            if !attr.path().is_ident("model") {
                continue;
            }

            let mut is_id = false;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    is_id = true;
                    Ok(())
                } else {
                    Err(meta.error("unknown model field attribute"))
                }
            })?;

            if is_id {
                if let Some(ident) = &field.ident {
                    return Ok(ident.clone());
                }
            }
        }
    }

    fields
        .named
        .iter()
        .filter_map(|field| field.ident.as_ref())
        .find(|ident| *ident == "id")
        .cloned()
        .ok_or_else(|| {
            syn::Error::new_spanned(
                &input.ident,
                "Model derive: no field marked #[model(id)] and no field named `id`",
            )
        })
}
