//! Procedural macros for the pubsub-relay crate.
//!
//! - `#[derive(Event)]`: implements `pubsub_relay::Event` for your type, preserving generics.
//!   The type identifier defaults to the module-qualified type name; use
//!   `#[event(name = "...")]` to pin an explicit one.
//!
//! ```rust,ignore
//! use pubsub_relay::Event;
//!
//! #[derive(Clone, Serialize, Deserialize, Event)]
//! #[event(name = "demo.SimpleEvent")]
//! struct SimpleEvent { message_text: String }
//! ```
use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr, parse_macro_input};

#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ident = input.ident;
    let generics = input.generics;

    let mut name: Option<LitStr> = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("event")) {
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported event attribute, expected `name`"))
            }
        });
        if let Err(err) = parsed {
            return err.to_compile_error().into();
        }
    }

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    // Without an explicit name the trait's default (std::any::type_name) applies.
    let type_name_impl = match name {
        Some(name) => quote! {
            fn type_name() -> ::std::borrow::Cow<'static, str> {
                ::std::borrow::Cow::Borrowed(#name)
            }
        },
        None => quote! {},
    };

    let expanded = quote! {
        impl #impl_generics pubsub_relay::Event for #ident #ty_generics #where_clause {
            #type_name_impl
        }
    };

    TokenStream::from(expanded)
}
