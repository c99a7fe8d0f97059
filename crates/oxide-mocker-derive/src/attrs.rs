//! Parsing of route, verb and parameter annotations.

use syn::{
    Attribute, Expr, FnArg, GenericArgument, ImplItemFn, LitStr, Meta, Pat, PathArguments,
    ReturnType, Type, Visibility,
};

/// Verb attributes and the `Method` variant they map to.
const VERBS: &[(&str, &str)] = &[
    ("get", "Get"),
    ("post", "Post"),
    ("put", "Put"),
    ("patch", "Patch"),
    ("delete", "Delete"),
    ("head", "Head"),
    ("options", "Options"),
];

const PARAM_ATTRS: &[&str] = &["from_route", "from_query", "from_header", "from_body", "default"];

/// A method carrying both a route and a verb.
pub struct RouteMethod {
    pub template: LitStr,
    pub verb: &'static str,
    pub instance: bool,
    pub params: Vec<ParamInfo>,
    pub output: OutputInfo,
}

/// How a parameter is bound.
pub enum Source {
    Route,
    Query(String),
    Header(String),
    Body,
}

pub struct ParamInfo {
    pub name: String,
    pub ty: Type,
    pub kind: &'static str,
    pub source: Source,
    pub default: Option<Expr>,
}

/// What the method returns, as far as it can be told from its signature.
pub struct OutputInfo {
    /// `async fn` or `impl Future<Output = _>`.
    pub deferred: bool,
    /// The (awaited) return type is spelled `Result<..>`.
    pub fallible: bool,
}

/// Strips every annotation this macro understands from `method` and returns
/// the route description when the method is routed.
///
/// Methods need a route, exactly one verb and `pub` visibility to be routed.
/// Parameter annotations are removed from every method either way.
pub fn take_route_method(method: &mut ImplItemFn) -> syn::Result<Option<RouteMethod>> {
    let mut template: Option<LitStr> = None;
    let mut verb: Option<&'static str> = None;
    let mut kept = Vec::with_capacity(method.attrs.len());

    for attr in std::mem::take(&mut method.attrs) {
        if attr.path().is_ident("route") {
            if template.is_some() {
                return Err(syn::Error::new_spanned(&attr, "duplicate #[route] attribute"));
            }
            template = Some(attr.parse_args::<LitStr>()?);
        } else if let Some(&(_, variant)) = VERBS.iter().find(|(name, _)| attr.path().is_ident(name)) {
            if !matches!(attr.meta, Meta::Path(_)) {
                return Err(syn::Error::new_spanned(
                    &attr,
                    "verb attributes take no arguments; put the template in #[route(\"...\")]",
                ));
            }
            if verb.is_some() {
                return Err(syn::Error::new_spanned(
                    &attr,
                    "a routed method takes exactly one HTTP verb attribute",
                ));
            }
            verb = Some(variant);
        } else {
            kept.push(attr);
        }
    }
    method.attrs = kept;

    let params = take_params(method)?;

    let (Some(template), Some(verb)) = (template, verb) else {
        return Ok(None);
    };
    if matches!(method.vis, Visibility::Inherited) {
        return Ok(None);
    }
    check_owned_params(method)?;

    Ok(Some(RouteMethod {
        template,
        verb,
        instance: receiver_kind(method)?,
        params,
        output: output_info(method),
    }))
}

/// Returns true for `&self` methods, false for associated functions.
fn receiver_kind(method: &ImplItemFn) -> syn::Result<bool> {
    match method.sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) => {
            if receiver.reference.is_none() || receiver.mutability.is_some() {
                Err(syn::Error::new_spanned(
                    receiver,
                    "routed methods take `&self` or no receiver at all",
                ))
            } else {
                Ok(true)
            }
        }
        _ => Ok(false),
    }
}

/// Rejects borrowed parameter types on a routed method.
fn check_owned_params(method: &ImplItemFn) -> syn::Result<()> {
    for input in &method.sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Type::Reference(reference) = pat_type.ty.as_ref() {
                return Err(syn::Error::new_spanned(
                    reference,
                    "handler parameters must be owned types",
                ));
            }
        }
    }
    Ok(())
}

fn take_params(method: &mut ImplItemFn) -> syn::Result<Vec<ParamInfo>> {
    let mut params = Vec::new();

    for (index, input) in method.sig.inputs.iter_mut().enumerate() {
        let FnArg::Typed(pat_type) = input else {
            continue;
        };

        let mut source: Option<Source> = None;
        let mut default = None;
        let mut kept = Vec::with_capacity(pat_type.attrs.len());

        for attr in std::mem::take(&mut pat_type.attrs) {
            let Some(tag) = PARAM_ATTRS.iter().find(|name| attr.path().is_ident(name)) else {
                kept.push(attr);
                continue;
            };

            if *tag == "default" {
                default = Some(attr.parse_args::<Expr>()?);
                continue;
            }
            if source.is_some() {
                return Err(syn::Error::new_spanned(
                    &attr,
                    "a parameter takes at most one binding source",
                ));
            }
            source = Some(match *tag {
                "from_query" => Source::Query(parse_name(&attr)?.unwrap_or_default()),
                "from_header" => Source::Header(parse_name(&attr)?.unwrap_or_default()),
                "from_body" => {
                    if !matches!(attr.meta, Meta::Path(_)) {
                        return Err(syn::Error::new_spanned(&attr, "#[from_body] takes no arguments"));
                    }
                    Source::Body
                }
                _ => Source::Route,
            });
        }
        pat_type.attrs = kept;

        let name = match pat_type.pat.as_ref() {
            Pat::Ident(ident) => ident.ident.to_string().trim_start_matches("r#").to_string(),
            _ => format!("arg{index}"),
        };

        // A query or header binding without an explicit name uses the
        // parameter name.
        let source = match source.unwrap_or(Source::Route) {
            Source::Query(key) if key.is_empty() => Source::Query(name.clone()),
            Source::Header(key) if key.is_empty() => Source::Header(name.clone()),
            other => other,
        };

        let ty = (*pat_type.ty).clone();
        params.push(ParamInfo {
            kind: value_kind(&ty, matches!(source, Source::Body)),
            name,
            ty,
            source,
            default,
        });
    }

    Ok(params)
}

/// Parses `#[attr]`, `#[attr("name")]` or `#[attr(name = "name")]`.
fn parse_name(attr: &Attribute) -> syn::Result<Option<String>> {
    if matches!(attr.meta, Meta::Path(_)) {
        return Ok(None);
    }
    if let Ok(lit) = attr.parse_args::<LitStr>() {
        return Ok(Some(lit.value()));
    }

    let mut name = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            let value: LitStr = meta.value()?.parse()?;
            name = Some(value.value());
            Ok(())
        } else {
            Err(meta.error("expected `name = \"...\"`"))
        }
    })?;
    Ok(name)
}

/// Computes the declared type tag, looking through `Option<_>`.
pub fn value_kind(ty: &Type, body: bool) -> &'static str {
    let ty = option_inner(ty).unwrap_or(ty);

    let scalar = match last_segment(ty) {
        Some((ident, args)) => match ident.as_str() {
            "String" | "str" | "char" => "Text",
            "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
            | "u128" | "usize" => "Integer",
            "f32" | "f64" => "Float",
            "bool" => "Boolean",
            "Bytes" | "BytesMut" => "Bytes",
            "Vec" if first_type_arg(args).is_some_and(|t| is_ident(t, "u8")) => "Bytes",
            _ => "Other",
        },
        None => "Other",
    };

    match (scalar, body) {
        ("Text" | "Bytes", true) => scalar,
        (_, true) | ("Bytes", false) => "Json",
        ("Other", false) => "Enum",
        _ => scalar,
    }
}

fn output_info(method: &ImplItemFn) -> OutputInfo {
    let ret = match &method.sig.output {
        ReturnType::Default => None,
        ReturnType::Type(_, ty) => Some(ty.as_ref()),
    };

    let future_output = ret.and_then(future_output);
    let deferred = method.sig.asyncness.is_some() || future_output.is_some();
    let awaited = future_output.or(ret);

    OutputInfo {
        deferred,
        fallible: awaited.is_some_and(|ty| is_ident(ty, "Result")),
    }
}

/// Returns `T` for `impl Future<Output = T>`.
fn future_output(ty: &Type) -> Option<&Type> {
    let Type::ImplTrait(impl_trait) = ty else {
        return None;
    };
    impl_trait.bounds.iter().find_map(|bound| {
        let syn::TypeParamBound::Trait(bound) = bound else {
            return None;
        };
        let segment = bound.path.segments.last()?;
        if segment.ident != "Future" {
            return None;
        }
        let PathArguments::AngleBracketed(args) = &segment.arguments else {
            return None;
        };
        args.args.iter().find_map(|arg| match arg {
            GenericArgument::AssocType(assoc) if assoc.ident == "Output" => Some(&assoc.ty),
            _ => None,
        })
    })
}

fn option_inner(ty: &Type) -> Option<&Type> {
    match last_segment(ty) {
        Some((ident, args)) if ident == "Option" => first_type_arg(args),
        _ => None,
    }
}

fn last_segment(ty: &Type) -> Option<(String, &PathArguments)> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .map(|segment| (segment.ident.to_string(), &segment.arguments)),
        Type::Group(group) => last_segment(&group.elem),
        Type::Paren(paren) => last_segment(&paren.elem),
        _ => None,
    }
}

fn first_type_arg(args: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = args else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn is_ident(ty: &Type, name: &str) -> bool {
    last_segment(ty).is_some_and(|(ident, _)| ident == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_value_kind_for_bindings() {
        assert_eq!(value_kind(&parse_quote!(String), false), "Text");
        assert_eq!(value_kind(&parse_quote!(Option<u64>), false), "Integer");
        assert_eq!(value_kind(&parse_quote!(f32), false), "Float");
        assert_eq!(value_kind(&parse_quote!(bool), false), "Boolean");
        assert_eq!(value_kind(&parse_quote!(Color), false), "Enum");
        assert_eq!(value_kind(&parse_quote!(Vec<u8>), false), "Json");
    }

    #[test]
    fn test_value_kind_for_body() {
        assert_eq!(value_kind(&parse_quote!(String), true), "Text");
        assert_eq!(value_kind(&parse_quote!(Vec<u8>), true), "Bytes");
        assert_eq!(value_kind(&parse_quote!(Option<bytes::Bytes>), true), "Bytes");
        assert_eq!(value_kind(&parse_quote!(i32), true), "Json");
        assert_eq!(value_kind(&parse_quote!(Vec<String>), true), "Json");
        assert_eq!(value_kind(&parse_quote!(TestBody), true), "Json");
    }

    #[test]
    fn test_route_method_parsing() {
        let mut method: ImplItemFn = parse_quote! {
            #[route("/api/test/{id}")]
            #[post]
            #[doc = "kept"]
            pub async fn okay(
                &self,
                id: String,
                #[from_query(name = "queryParam")] query: String,
                #[from_header("x-header")] header: Option<String>,
                #[from_body] body: TestBody,
                #[default(10)] #[from_query] limit: u32,
            ) -> Result<ActionResult<TestResult>, Error> {
                todo!()
            }
        };

        let route = take_route_method(&mut method).unwrap().unwrap();
        assert_eq!(route.template.value(), "/api/test/{id}");
        assert_eq!(route.verb, "Post");
        assert!(route.instance);
        assert!(route.output.deferred);
        assert!(route.output.fallible);
        assert_eq!(method.attrs.len(), 1);

        let names: Vec<&str> = route.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["id", "query", "header", "body", "limit"]);
        assert!(matches!(route.params[0].source, Source::Route));
        assert!(matches!(&route.params[1].source, Source::Query(key) if key == "queryParam"));
        assert!(matches!(&route.params[2].source, Source::Header(key) if key == "x-header"));
        assert!(matches!(route.params[3].source, Source::Body));
        assert!(matches!(&route.params[4].source, Source::Query(key) if key == "limit"));
        assert!(route.params[4].default.is_some());
    }

    #[test]
    fn test_unrouted_method_is_skipped_but_stripped() {
        let mut method: ImplItemFn = parse_quote! {
            #[get]
            pub fn helper(#[from_query] q: String) {}
        };
        assert!(take_route_method(&mut method).unwrap().is_none());
        let FnArg::Typed(arg) = &method.sig.inputs[0] else {
            panic!("expected typed argument");
        };
        assert!(arg.attrs.is_empty());
    }

    #[test]
    fn test_private_method_is_not_routed() {
        let mut method: ImplItemFn = parse_quote! {
            #[route("/x")]
            #[get]
            fn hidden() {}
        };
        assert!(take_route_method(&mut method).unwrap().is_none());
    }

    #[test]
    fn test_two_verbs_is_an_error() {
        let mut method: ImplItemFn = parse_quote! {
            #[route("/x")]
            #[get]
            #[post]
            pub fn both() {}
        };
        assert!(take_route_method(&mut method).is_err());
    }

    #[test]
    fn test_mut_receiver_is_an_error() {
        let mut method: ImplItemFn = parse_quote! {
            #[route("/x")]
            #[get]
            pub fn change(&mut self) {}
        };
        assert!(take_route_method(&mut method).is_err());
    }

    #[test]
    fn test_borrowed_parameters_only_rejected_on_routes() {
        let mut helper: ImplItemFn = parse_quote! {
            pub fn helper(name: &str, #[from_query] q: &String) -> usize { name.len() }
        };
        assert!(take_route_method(&mut helper).unwrap().is_none());

        let mut private: ImplItemFn = parse_quote! {
            #[route("/x")]
            #[get]
            fn private(name: &str) {}
        };
        assert!(take_route_method(&mut private).unwrap().is_none());

        let mut routed: ImplItemFn = parse_quote! {
            #[route("/x")]
            #[get]
            pub fn routed(name: &str) {}
        };
        assert!(take_route_method(&mut routed).is_err());
    }

    #[test]
    fn test_impl_future_return_is_deferred() {
        let mut method: ImplItemFn = parse_quote! {
            #[route("/x")]
            #[get]
            pub fn later() -> impl std::future::Future<Output = u32> + Send {
                async { 1 }
            }
        };
        let route = take_route_method(&mut method).unwrap().unwrap();
        assert!(route.output.deferred);
        assert!(!route.output.fallible);
    }
}
