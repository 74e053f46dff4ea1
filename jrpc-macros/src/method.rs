//! Implementation of the `#[method]` attribute
//!
//! # Expansion
//!
//! Input:
//! ```ignore
//! #[method(name = "math.add")]
//! async fn add(a: i64, b: Option<i64>, #[rest] more: Vec<i64>) -> Result<i64, HandlerError> {
//!     /* body */
//! }
//! ```
//!
//! Output (approximately):
//! ```ignore
//! fn add() -> ::jrpc_server::MethodDefinition {
//!     async fn __jrpc_method_impl(a: i64, b: Option<i64>, more: Vec<i64>)
//!         -> Result<i64, HandlerError> { /* body */ }
//!
//!     ::jrpc_server::MethodDefinition::new(
//!         "math.add",
//!         ::jrpc_server::from_fn(|__params: ::jrpc_server::Params| async move {
//!             let a: i64 = match ::jrpc_server::decode_arg(&__params, 0usize, "a") { .. };
//!             let b: Option<i64> = match ::jrpc_server::decode_arg(&__params, 1usize, "b") { .. };
//!             let more: Vec<i64> = match ::jrpc_server::decode_rest(&__params, 2usize, "more") { .. };
//!             ::jrpc_server::result_to_value(__jrpc_method_impl(a, b, more).await)
//!         }),
//!     )
//!     .param("a")
//!     .param("b")
//!     .rest("more")
//! }
//! ```

use proc_macro2::{Span, TokenStream};
use quote::{quote, ToTokens};
use syn::{
    spanned::Spanned, FnArg, Ident, ItemFn, LitStr, Pat, ReturnType, Type, Visibility,
};

const REST_ATTR: &str = "rest";

/// Options given inside `#[method(...)]`
#[derive(Default)]
pub struct MethodArgs {
    pub name: Option<LitStr>,
}

impl MethodArgs {
    /// Parse `name = "..."`
    pub fn parse(&mut self, meta: syn::meta::ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported #[method] option, expected `name = \"...\"`"))
        }
    }
}

struct Argument {
    ident: Ident,
    ty: Type,
    rest: bool,
}

pub fn expand(args: MethodArgs, mut function: ItemFn) -> syn::Result<TokenStream> {
    if !function.sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            function.sig.generics.span(),
            "#[method] functions cannot be generic",
        ));
    }

    let arguments = collect_arguments(&mut function)?;

    let outer_ident = function.sig.ident.clone();
    let outer_vis = function.vis.clone();
    let outer_attrs = std::mem::take(&mut function.attrs);
    let method_name = args
        .name
        .unwrap_or_else(|| LitStr::new(&unraw(&outer_ident), outer_ident.span()));

    if method_name.value().is_empty() {
        return Err(syn::Error::new(method_name.span(), "method name cannot be empty"));
    }

    let inner_ident = Ident::new("__jrpc_method_impl", Span::call_site());
    function.sig.ident = inner_ident.clone();
    function.vis = Visibility::Inherited;

    let decoders = arguments.iter().enumerate().map(|(index, argument)| {
        let ident = &argument.ident;
        let ty = &argument.ty;
        let name = unraw(ident);
        let decoder = if argument.rest {
            quote!(::jrpc_server::decode_rest)
        } else {
            quote!(::jrpc_server::decode_arg)
        };
        quote! {
            let #ident: #ty = match #decoder(&__params, #index, #name) {
                ::core::result::Result::Ok(value) => value,
                ::core::result::Result::Err(error) => return ::core::result::Result::Err(error),
            };
        }
    });

    let declarations = arguments.iter().map(|argument| {
        let name = unraw(&argument.ident);
        if argument.rest {
            quote!(.rest(#name))
        } else {
            quote!(.param(#name))
        }
    });

    let idents = arguments.iter().map(|argument| &argument.ident);
    let call = if function.sig.asyncness.is_some() {
        quote!(#inner_ident(#(#idents),*).await)
    } else {
        quote!(#inner_ident(#(#idents),*))
    };

    let convert = if returns_result(&function.sig.output) {
        quote!(::jrpc_server::result_to_value(__outcome))
    } else {
        quote!(::jrpc_server::to_value(__outcome))
    };

    let inner = function.into_token_stream();

    Ok(quote! {
        #(#outer_attrs)*
        #outer_vis fn #outer_ident() -> ::jrpc_server::MethodDefinition {
            #[allow(clippy::too_many_arguments)]
            #inner

            ::jrpc_server::MethodDefinition::new(
                #method_name,
                ::jrpc_server::from_fn(|__params: ::jrpc_server::Params| async move {
                    #(#decoders)*
                    let __outcome = #call;
                    #convert
                }),
            )
            #(#declarations)*
        }
    })
}

/// Strip `#[rest]` from the inputs and record every argument
fn collect_arguments(function: &mut ItemFn) -> syn::Result<Vec<Argument>> {
    let count = function.sig.inputs.len();
    let mut arguments = Vec::with_capacity(count);

    for (position, input) in function.sig.inputs.iter_mut().enumerate() {
        let typed = match input {
            FnArg::Typed(typed) => typed,
            FnArg::Receiver(receiver) => {
                return Err(syn::Error::new(
                    receiver.span(),
                    "#[method] cannot be used on methods taking `self`",
                ))
            }
        };

        let before = typed.attrs.len();
        typed.attrs.retain(|attr| !attr.path().is_ident(REST_ATTR));
        let rest = typed.attrs.len() != before;

        if rest && position + 1 != count {
            return Err(syn::Error::new(
                typed.span(),
                "#[rest] is only allowed on the last parameter",
            ));
        }

        let ident = match typed.pat.as_ref() {
            Pat::Ident(pat) if pat.subpat.is_none() => pat.ident.clone(),
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "#[method] parameters must be plain identifiers",
                ))
            }
        };

        arguments.push(Argument {
            ident,
            ty: (*typed.ty).clone(),
            rest,
        });
    }

    Ok(arguments)
}

/// Whether the declared return type is spelled `...::Result<..>`
fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => match ty.as_ref() {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .map(|segment| segment.ident == "Result")
                .unwrap_or(false),
            _ => false,
        },
    }
}

fn unraw(ident: &Ident) -> String {
    let name = ident.to_string();
    name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(attr: Option<&str>, item: &str) -> syn::Result<String> {
        let function: ItemFn = syn::parse_str(item)?;
        let args = MethodArgs {
            name: attr.map(|n| LitStr::new(n, Span::call_site())),
        };
        expand(args, function).map(|tokens| tokens.to_string())
    }

    #[test]
    fn test_declares_params_in_order() {
        let out = expand_str(None, "fn f(a: i64, s: String, #[rest] args: Vec<i64>) -> i64 { a }")
            .unwrap();

        let a = out.find(". param (\"a\")").unwrap();
        let s = out.find(". param (\"s\")").unwrap();
        let rest = out.find(". rest (\"args\")").unwrap();
        assert!(a < s && s < rest);
        assert!(out.contains("MethodDefinition :: new (\"f\""));
        assert!(out.contains(":: jrpc_server :: to_value (__outcome)"));
        assert!(!out.contains("# [rest]"));
    }

    #[test]
    fn test_custom_name_and_result() {
        let out = expand_str(
            Some("math.add"),
            "async fn add(a: i64) -> Result<i64, HandlerError> { Ok(a) }",
        )
        .unwrap();

        assert!(out.contains("\"math.add\""));
        assert!(out.contains("result_to_value"));
        assert!(out.contains(". await"));
    }

    #[test]
    fn test_rejects_misplaced_rest() {
        let error = expand_str(None, "fn f(#[rest] a: Vec<i64>, b: i64) {}").unwrap_err();
        assert!(error.to_string().contains("last parameter"));
    }

    #[test]
    fn test_rejects_self_and_patterns() {
        assert!(expand_str(None, "fn f(&self) {}").is_err());
        assert!(expand_str(None, "fn f((a, b): (i64, i64)) {}").is_err());
        assert!(expand_str(None, "fn f<T>(a: T) {}").is_err());
    }

    #[test]
    fn test_returns_result() {
        let result: ReturnType = syn::parse_str("-> std::result::Result<(), E>").unwrap();
        let plain: ReturnType = syn::parse_str("-> Vec<i64>").unwrap();
        assert!(returns_result(&result));
        assert!(!returns_result(&plain));
        assert!(!returns_result(&ReturnType::Default));
    }
}
