//! Procedural macros for declaring tidings event contracts.
//!
//! This crate provides `#[derive(EventContract)]`, which turns a single
//! enum declaration into a complete contract: the contract impl, a name
//! enum, and one zero-sized event marker per variant.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type, Visibility, parse_macro_input};

/// Derives an event contract from an enum.
///
/// Each variant declares one event:
///
/// - a unit variant `Closed` is an event without payload; its listeners
///   take no arguments,
/// - a single-field tuple variant `Greeting(String)` is an event whose
///   listeners take `&String`. Tuples and arrays are one payload value.
///
/// For `enum Chat`, the derive generates:
///
/// - `enum ChatName`, the runtime name of every event,
/// - `mod chat` holding one marker struct per variant (`chat::Greeting`),
///   visible wherever `Chat` itself is,
/// - the `EventContract` impl for `Chat` and an `Event` impl per marker.
///
/// Attributes:
///
/// - `#[event(module = "ev")]` on the enum renames the marker module,
/// - `#[event(name = "greeting")]` on a variant sets its string name
///   (defaults to the variant identifier).
#[proc_macro_derive(EventContract, attributes(event))]
pub fn derive_event_contract(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct EventVariant {
    ident: Ident,
    name: LitStr,
    payload: Option<Type>,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "EventContract can only be derived for enums",
        ));
    };

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "EventContract cannot be derived for generic enums",
        ));
    }

    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "EventContract requires at least one event variant",
        ));
    }

    let contract = &input.ident;
    let vis = &input.vis;
    let marker_vis = marker_visibility(vis);
    let name_enum = format_ident!("{}Name", contract);
    let module = module_ident(input)?;

    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if let Some((_, discriminant)) = &variant.discriminant {
            return Err(syn::Error::new_spanned(
                discriminant,
                "event variants cannot have explicit discriminants",
            ));
        }

        let payload = match &variant.fields {
            Fields::Unit => None,
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                fields.unnamed.first().map(|f| f.ty.clone())
            },
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "event variants must be unit variants or have exactly one unnamed field; \
                     wrap multiple values in a tuple",
                ));
            },
        };

        variants.push(EventVariant {
            ident: variant.ident.clone(),
            name: variant_name(variant)?,
            payload,
        });
    }

    let idents: Vec<&Ident> = variants.iter().map(|v| &v.ident).collect();
    let names: Vec<&LitStr> = variants.iter().map(|v| &v.name).collect();

    let name_doc = format!("Event names of the `{contract}` contract.");
    let module_doc = format!("Event markers of the `{contract}` contract.");

    let markers = variants.iter().map(|v| {
        let ident = &v.ident;
        let doc = format!("The `{}` event.", v.name.value());
        quote! {
            #[doc = #doc]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
            #marker_vis struct #ident;
        }
    });

    // Names every variant so contract enums that are never constructed
    // do not trip the dead-code lint.
    let variant_uses = variants.iter().map(|v| {
        let ident = &v.ident;
        quote!(let _ = #contract::#ident;)
    });

    let event_impls = variants.iter().map(|v| {
        let ident = &v.ident;
        let payload = v
            .payload
            .as_ref()
            .map_or_else(|| quote!(::tidings::NoPayload), |ty| quote!(#ty));
        quote! {
            impl ::tidings::Event for #module::#ident {
                type Contract = #contract;
                type Payload = #payload;
                const NAME: #name_enum = #name_enum::#ident;
            }
        }
    });

    Ok(quote! {
        #[doc = #name_doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #vis enum #name_enum {
            #(
                #[allow(missing_docs)]
                #idents,
            )*
        }

        impl ::tidings::EventName for #name_enum {
            fn as_str(&self) -> &'static str {
                match self {
                    #( Self::#idents => #names, )*
                }
            }
        }

        impl ::core::fmt::Display for #name_enum {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(::tidings::EventName::as_str(self))
            }
        }

        impl ::tidings::EventContract for #contract {
            type Name = #name_enum;

            fn names() -> &'static [#name_enum] {
                &[ #( #name_enum::#idents, )* ]
            }
        }

        #[doc = #module_doc]
        #[allow(dead_code)]
        #vis mod #module {
            #( #markers )*
        }

        #( #event_impls )*

        #[doc(hidden)]
        const _: () = {
            #( #variant_uses )*
        };
    })
}

/// Visibility of the generated markers. They live one module below the
/// enum, so they must reach exactly as far as the enum does from there.
fn marker_visibility(vis: &Visibility) -> proc_macro2::TokenStream {
    match vis {
        Visibility::Public(_) => quote!(pub),
        Visibility::Inherited => quote!(pub(super)),
        Visibility::Restricted(restricted) => {
            let path = &restricted.path;
            let first = path.segments.first().map(|s| s.ident.to_string());
            match first.as_deref() {
                Some("crate") => quote!(#vis),
                Some("self") => {
                    let rest = path.segments.iter().skip(1);
                    quote!(pub(in super #(:: #rest)*))
                },
                _ => quote!(pub(in super::#path)),
            }
        },
    }
}

/// Reads `#[event(module = "...")]` from the enum, defaulting to the
/// snake-cased enum name.
fn module_ident(input: &DeriveInput) -> syn::Result<Ident> {
    let mut module = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("event")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("module") {
                let lit: LitStr = meta.value()?.parse()?;
                module = Some(lit.parse::<Ident>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported event attribute; expected `module`"))
            }
        })?;
    }
    Ok(module.unwrap_or_else(|| {
        Ident::new(&to_snake_case(&input.ident.to_string()), Span::call_site())
    }))
}

/// Reads `#[event(name = "...")]` from a variant, defaulting to its identifier.
fn variant_name(variant: &syn::Variant) -> syn::Result<LitStr> {
    let mut name = None;
    for attr in variant.attrs.iter().filter(|a| a.path().is_ident("event")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                if lit.value().is_empty() {
                    return Err(meta.error("event name cannot be empty"));
                }
                name = Some(lit);
                Ok(())
            } else {
                Err(meta.error("unsupported event attribute; expected `name`"))
            }
        })?;
    }
    Ok(name.unwrap_or_else(|| LitStr::new(&variant.ident.to_string(), variant.ident.span())))
}

fn to_snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let mut prev_lower = false;
    for ch in ident.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}
