//! Procedural macros for rat-route.
//!
//! This library provides the `#[routable]` attribute, which declares the route
//! types a screen accepts.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{DeriveInput, Ident, Token, parse_macro_input};

/// Attribute macro declaring a screen type's supported route types.
///
/// # Usage
///
/// ```ignore
/// #[routable(declarative, programmatic)]
/// struct DetailScreen {
///     item: Mutex<Option<String>>,
/// }
///
/// // Opts into neither mechanism; every resolution fails validation.
/// #[routable]
/// struct Splash;
/// ```
///
/// The macro generates:
/// - `impl Screen for DetailScreen` with the default methods.
/// - `impl Routable for DetailScreen` with `ROUTE_TYPES` set from the flags.
///
/// Pass `no_screen` when the type already has its own `Screen` impl.
#[proc_macro_attribute]
pub fn routable(attr: TokenStream, item: TokenStream) -> TokenStream {
    let flags = parse_macro_input!(attr with Punctuated::<Ident, Token![,]>::parse_terminated);
    let input = parse_macro_input!(item as DeriveInput);

    match expand_routable(&flags, &input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand_routable(
    flags: &Punctuated<Ident, Token![,]>,
    input: &DeriveInput,
) -> syn::Result<TokenStream2> {
    let mut route_types = Vec::new();
    let mut emit_screen = true;

    for flag in flags {
        match flag.to_string().as_str() {
            "declarative" => route_types.push(quote!(::rat_route::RouteTypes::DECLARATIVE)),
            "programmatic" => route_types.push(quote!(::rat_route::RouteTypes::PROGRAMMATIC)),
            "no_screen" => emit_screen = false,
            other => {
                return Err(syn::Error::new_spanned(
                    flag,
                    format!(
                        "unknown routable flag `{other}`, expected one of: declarative, programmatic, no_screen"
                    ),
                ));
            }
        }
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // `union` is const, so the declaration stays a plain associated const.
    let route_types = route_types
        .iter()
        .fold(quote!(::rat_route::RouteTypes::empty()), |acc, flag| quote!(#acc.union(#flag)));

    let screen_impl = emit_screen.then(|| {
        quote! {
            impl #impl_generics ::rat_route::Screen for #name #ty_generics #where_clause {}
        }
    });

    Ok(quote! {
        #input

        #screen_impl

        impl #impl_generics ::rat_route::Routable for #name #ty_generics #where_clause {
            const ROUTE_TYPES: ::rat_route::RouteTypes = #route_types;
        }
    })
}
