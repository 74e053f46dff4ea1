//! Procedural macros for the jrpc JSON-RPC toolkit
//!
//! # `#[method]`
//!
//! Turns a plain Rust function into a factory returning a
//! `jrpc_server::MethodDefinition`:
//!
//! - the method name is the function name, or `#[method(name = "...")]`
//! - each parameter is decoded from the request params by position (array
//!   params) or by name (object params), and declared for introspection
//! - a parameter marked `#[rest]` (last position, type `Vec<T>`) collects the
//!   remaining positional arguments and is reported as `"...name"`
//! - the function may be `async` or not, and may return any `Serialize`
//!   value or a `Result<T, E>` with `E: Into<HandlerError>`
//!
//! A parameter that fails to decode yields "Invalid params"; a missing one
//! decodes from `null`, so `Option<T>` parameters are optional.
//!
//! # Examples
//!
//! ```ignore
//! use jrpc_macros::method;
//! use jrpc_server::{HandlerError, JrpcServer};
//!
//! #[method]
//! fn sum(#[rest] values: Vec<i64>) -> i64 {
//!     values.iter().sum()
//! }
//!
//! #[method(name = "accounts.get")]
//! async fn get_account(id: u64) -> Result<serde_json::Value, HandlerError> {
//!     Err(HandlerError::named("NotFound", format!("account {}", id)))
//! }
//!
//! let server = JrpcServer::builder()
//!     .method(sum())
//!     .method(get_account());
//! ```
//!
//! The generated code refers to `::jrpc_server`, so the crate using the
//! macro must depend on `jrpc-server`.

mod method;

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemFn};

/// Turn a function into a `MethodDefinition` factory
///
/// See the crate documentation for the accepted signatures.
#[proc_macro_attribute]
pub fn method(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = method::MethodArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(meta));
    parse_macro_input!(attr with parser);

    let function = parse_macro_input!(item as ItemFn);

    method::expand(args, function)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
