use proc_macro::TokenStream;
use quote::quote;
use std::collections::HashSet;
use syn::{
    Expr, ExprLit, Fields, Ident, ItemStruct, Lit, Meta, Path, Token, parse_macro_input,
    parse_quote, punctuated::Punctuated,
};

/// Settings parsed from `#[base_entity(...)]`.
struct EntityOptions {
    traits_path: Path,
    active_model: Ident,
    id_field: Ident,
    created_at_field: Ident,
    updated_at_field: Ident,
    append_only: bool,
}

impl Default for EntityOptions {
    fn default() -> Self {
        let span = proc_macro2::Span::call_site();
        Self {
            traits_path: parse_quote!(crate::db::dao::base_traits),
            active_model: Ident::new("ActiveModel", span),
            id_field: Ident::new("id", span),
            created_at_field: Ident::new("created_at", span),
            updated_at_field: Ident::new("updated_at", span),
            append_only: false,
        }
    }
}

/// Prepends the uuid primary key and audit timestamps to a sea-orm model and
/// implements the DAO base traits for it.
///
/// `#[base_entity(append_only)]` is used for history tables: the model gets no
/// `updated_at` column and `set_updated_at` does nothing.
#[proc_macro_attribute]
pub fn base_entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr with Punctuated<Meta, Token![,]>::parse_terminated);
    let mut options = EntityOptions::default();
    if let Err(err) = parse_options(&mut options, args) {
        return err.to_compile_error().into();
    }

    let mut input = parse_macro_input!(item as ItemStruct);
    let struct_ident = input.ident.clone();
    let Fields::Named(fields) = &mut input.fields else {
        return syn::Error::new_spanned(
            struct_ident,
            "base_entity requires a struct with named fields",
        )
        .to_compile_error()
        .into();
    };

    let declared: HashSet<String> = fields
        .named
        .iter()
        .filter_map(|field| field.ident.as_ref().map(ToString::to_string))
        .collect();

    let id_ident = &options.id_field;
    let created_ident = &options.created_at_field;
    let updated_ident = &options.updated_at_field;

    let mut injected: Vec<syn::Field> = Vec::new();
    if !declared.contains(&id_ident.to_string()) {
        injected.push(parse_quote! {
            #[sea_orm(primary_key, auto_increment = false)]
            pub #id_ident: uuid::Uuid
        });
    }
    if !declared.contains(&created_ident.to_string()) {
        injected.push(parse_quote! {
            #[sea_orm(default_expr = "Expr::current_timestamp()", indexed)]
            pub #created_ident: sea_orm::entity::prelude::DateTimeWithTimeZone
        });
    }
    if !options.append_only && !declared.contains(&updated_ident.to_string()) {
        injected.push(parse_quote! {
            #[sea_orm(default_expr = "Expr::current_timestamp()")]
            pub #updated_ident: sea_orm::entity::prelude::DateTimeWithTimeZone
        });
    }

    let mut merged = Punctuated::new();
    for field in injected.into_iter().chain(fields.named.iter().cloned()) {
        merged.push(field);
    }
    fields.named = merged;

    let traits_path = &options.traits_path;
    let active_model = &options.active_model;
    let set_updated = if options.append_only {
        quote! {}
    } else {
        quote! {
            fn set_updated_at(&mut self, ts: sea_orm::entity::prelude::DateTimeWithTimeZone) {
                self.#updated_ident = sea_orm::ActiveValue::Set(ts);
            }
        }
    };

    let expanded = quote! {
        #input

        impl #traits_path::HasIdActiveModel for #active_model {
            fn set_id(&mut self, id: uuid::Uuid) {
                self.#id_ident = sea_orm::ActiveValue::Set(id);
            }
        }

        impl #traits_path::TimestampedActiveModel for #active_model {
            fn set_created_at(&mut self, ts: sea_orm::entity::prelude::DateTimeWithTimeZone) {
                self.#created_ident = sea_orm::ActiveValue::Set(ts);
            }

            #set_updated
        }

        impl #traits_path::HasCreatedAtColumn for Entity {
            fn created_at_column() -> Column {
                Column::CreatedAt
            }
        }
    };

    expanded.into()
}

fn parse_options(
    options: &mut EntityOptions,
    args: Punctuated<Meta, Token![,]>,
) -> Result<(), syn::Error> {
    for meta in args {
        match meta {
            Meta::Path(path) if path.is_ident("append_only") => {
                options.append_only = true;
            }
            Meta::NameValue(name_value) => {
                let Some(key) = name_value.path.get_ident().map(ToString::to_string) else {
                    return Err(syn::Error::new_spanned(
                        name_value.path,
                        "expected simple identifier for attribute key",
                    ));
                };
                let value = match &name_value.value {
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(value),
                        ..
                    }) => value.clone(),
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            "expected string literal for attribute value",
                        ));
                    }
                };

                match key.as_str() {
                    "traits" => {
                        options.traits_path = value.parse::<Path>().map_err(|err| {
                            syn::Error::new(value.span(), format!("invalid traits path: {err}"))
                        })?;
                    }
                    "active_model" => {
                        options.active_model = Ident::new(&value.value(), value.span());
                    }
                    "id" => options.id_field = Ident::new(&value.value(), value.span()),
                    "created_at" => {
                        options.created_at_field = Ident::new(&value.value(), value.span());
                    }
                    "updated_at" => {
                        options.updated_at_field = Ident::new(&value.value(), value.span());
                    }
                    _ => {
                        return Err(syn::Error::new(
                            value.span(),
                            format!("unknown base_entity attribute key `{key}`"),
                        ));
                    }
                }
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "expected `append_only` or a name-value pair such as traits = \"path\"",
                ));
            }
        }
    }

    Ok(())
}
