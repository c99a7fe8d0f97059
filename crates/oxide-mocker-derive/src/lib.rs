//! Attribute macro for dispatchable request handlers.
//!
//! This crate provides the `#[controller]` attribute, which turns the
//! annotated methods of an `impl` block into route definitions for
//! `oxide-mocker`.

mod attrs;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, parse_quote, ImplItem, ItemImpl};

use crate::attrs::{take_route_method, OutputInfo, ParamInfo, RouteMethod, Source};

/// Registers the annotated methods of an `impl` block as request handlers.
///
/// The block is emitted unchanged apart from the handler annotations, and an
/// `oxide_mocker::Controller` implementation listing the handlers in
/// declaration order is added next to it.
///
/// # Method Attributes
///
/// - `#[route("template")]` - Route template, optionally with scheme and host
/// - `#[get]`, `#[post]`, `#[put]`, `#[patch]`, `#[delete]`, `#[head]`,
///   `#[options]` - HTTP verb, exactly one per handler
///
/// Only `pub` methods with both a route and a verb are registered. Handlers
/// take `&self` or no receiver; `&self` handlers are only reachable through
/// a dispatcher built with an instance.
///
/// # Parameter Attributes
///
/// - `#[from_route]` - Captured route value (the default)
/// - `#[from_query]` / `#[from_query(name = "key")]` - Query string value
/// - `#[from_header]` / `#[from_header(name = "x-key")]` - First header value
/// - `#[from_body]` - Request body
/// - `#[default(expr)]` - Value used when nothing was bound; `expr` has the
///   parameter's type
///
/// # Return Types
///
/// Any `Serialize` value, `ActionResult<T>`, `()`, or a `Result` of those
/// whose error converts into a boxed error. `async fn` handlers and handlers
/// returning `impl Future` are awaited before conversion.
#[proc_macro_attribute]
pub fn controller(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr = TokenStream2::from(attr);
    let input = parse_macro_input!(item as ItemImpl);
    controller_impl(attr, input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn controller_impl(attr: TokenStream2, mut input: ItemImpl) -> syn::Result<TokenStream2> {
    if !attr.is_empty() {
        return Err(syn::Error::new_spanned(attr, "#[controller] takes no arguments"));
    }
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[controller] applies to inherent impl blocks only",
        ));
    }

    let mut routes = Vec::new();
    for item in &mut input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        if let Some(route) = take_route_method(method)? {
            routes.push(route_definition(&method.sig.ident, &route));
        }
    }

    let self_ty = &input.self_ty;
    let mut generics = input.generics.clone();
    if !generics.params.is_empty() {
        generics.make_where_clause().predicates.push(parse_quote! {
            #self_ty: ::std::marker::Send + ::std::marker::Sync + 'static
        });
    }
    let (impl_generics, _, where_clause) = generics.split_for_impl();

    Ok(quote! {
        #input

        impl #impl_generics ::oxide_mocker::Controller for #self_ty #where_clause {
            fn routes() -> ::std::vec::Vec<::oxide_mocker::RouteDefinition<Self>> {
                ::std::vec![#(#routes),*]
            }
        }
    })
}

fn route_definition(ident: &syn::Ident, route: &RouteMethod) -> TokenStream2 {
    let handler = ident.to_string();
    let handler = handler.trim_start_matches("r#");
    let template = &route.template;
    let verb = format_ident!("{}", route.verb);
    let receiver = if route.instance {
        format_ident!("Instance")
    } else {
        format_ident!("Static")
    };

    let this = if route.instance {
        quote! {
            let __this = __instance
                .ok_or(::oxide_mocker::DispatchError::MissingInstance(#handler))?;
        }
    } else {
        quote! { let _ = __instance; }
    };

    let arg_names: Vec<_> = (0..route.params.len())
        .map(|i| format_ident!("__arg{}", i))
        .collect();
    let takes = route.params.iter().zip(&arg_names).map(|(param, name)| {
        let ty = &param.ty;
        quote! { let #name: #ty = __args.take()?; }
    });

    let call = if route.instance {
        quote! { __this.#ident(#(#arg_names),*) }
    } else {
        quote! { Self::#ident(#(#arg_names),*) }
    };
    let body = invoke_body(&call, &route.output);
    let args_binding = if route.params.is_empty() {
        quote! { __args }
    } else {
        quote! { mut __args }
    };
    let params = route.params.iter().map(param_spec);
    let discard = route.params.is_empty().then(|| quote! { let _ = __args; });

    quote! {
        ::oxide_mocker::RouteDefinition::new(
            #handler,
            ::oxide_mocker::Method::#verb,
            #template,
            ::oxide_mocker::Receiver::#receiver,
            |__instance: ::std::option::Option<::std::sync::Arc<Self>>,
             #args_binding: ::oxide_mocker::Arguments|
             -> ::oxide_mocker::__private::BoxFuture<
                'static,
                ::oxide_mocker::Result<::oxide_mocker::ReturnValue>,
            > {
                ::std::boxed::Box::pin(async move {
                    #this
                    #discard
                    #(#takes)*
                    #body
                })
            },
        )
        #(.param(#params))*
    }
}

/// Calls the handler and converts what it returns.
fn invoke_body(call: &TokenStream2, output: &OutputInfo) -> TokenStream2 {
    let convert = if output.fallible {
        quote! {
            match __ret {
                ::std::result::Result::Ok(value) => {
                    ::oxide_mocker::IntoReturnValue::into_return_value(value)
                }
                ::std::result::Result::Err(err) => {
                    ::std::result::Result::Err(::oxide_mocker::DispatchError::handler(err))
                }
            }
        }
    } else {
        quote! { ::oxide_mocker::IntoReturnValue::into_return_value(__ret) }
    };

    if output.deferred {
        quote! {
            ::std::result::Result::Ok(::oxide_mocker::ReturnValue::Deferred(
                ::std::boxed::Box::pin(async move {
                    let __ret = #call.await;
                    #convert
                }),
            ))
        }
    } else {
        quote! {
            let __ret = #call;
            #convert
        }
    }
}

fn param_spec(param: &ParamInfo) -> TokenStream2 {
    let name = &param.name;
    let kind = format_ident!("{}", param.kind);
    let source = match &param.source {
        Source::Route => quote! { ::oxide_mocker::BindingSource::Route },
        Source::Query(key) => quote! { ::oxide_mocker::BindingSource::Query(#key) },
        Source::Header(key) => quote! { ::oxide_mocker::BindingSource::Header(#key) },
        Source::Body => quote! { ::oxide_mocker::BindingSource::Body },
    };
    let default = param.default.as_ref().map(|expr| {
        let ty = &param.ty;
        quote! {
            .default_value(|| ::oxide_mocker::__private::default_value::<#ty>(#expr))
        }
    });

    quote! {
        ::oxide_mocker::ParamSpec::new(#name, ::oxide_mocker::ValueKind::#kind)
            .source(#source)
            #default
    }
}
