//! Procedural macros shared by the tilepress crates.
//!
//! The only macro right now is [`macro@context`], which wraps the body of a function
//! returning `anyhow::Result` so that every error leaving it carries an extra,
//! formatted context frame:
//!
//! ```ignore
//! #[context("planning zoom level {zoom}")]
//! fn plan_level(zoom: u8) -> anyhow::Result<LevelPlan> { ... }
//! ```
//!
//! Prefix the format arguments with `move,` when the body must take ownership of
//! captured arguments (e.g. `#[context(move, "writing {}", path.display())]`).

mod args;

use args::ContextArgs;
use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use quote::{ToTokens, quote};
use syn::{ItemFn, ReturnType, parse_macro_input};

#[proc_macro_attribute]
pub fn context(args: TokenStream, input: TokenStream) -> TokenStream {
	let args = parse_macro_input!(args as ContextArgs);
	let mut function = parse_macro_input!(input as ItemFn);

	let wrapped = match wrap_body(&function, &args) {
		Ok(tokens) => tokens,
		Err(error) => return error.to_compile_error().into(),
	};

	function.block.stmts = vec![syn::Stmt::Expr(syn::Expr::Verbatim(wrapped), None)];
	function.into_token_stream().into()
}

fn wrap_body(function: &ItemFn, args: &ContextArgs) -> syn::Result<TokenStream2> {
	let body = &function.block;
	let message = &args.message;
	let move_token = &args.move_token;
	let error = Ident::new("error", Span::mixed_site());

	let ReturnType::Type(_, return_type) = &function.sig.output else {
		return Err(syn::Error::new_spanned(
			&function.sig,
			"#[context] requires a function returning anyhow::Result",
		));
	};

	if function.sig.asyncness.is_some() {
		let result = Ident::new("result", Span::mixed_site());
		return Ok(quote! {
			let #result: #return_type = async #move_token { #body }.await;
			#result.map_err(|#error| #error.context(format!(#message)).into())
		});
	}

	// The empty iterator is moved into the closure so that it is always FnOnce,
	// which keeps borrowck happy when the body moves out of captured arguments.
	let once = Ident::new("once", Span::mixed_site());
	Ok(quote! {
		let #once = ::core::iter::empty::<()>();
		(#move_token || -> #return_type {
			::core::mem::drop(#once);
			#body
		})()
		.map_err(|#error| #error.context(format!(#message)).into())
	})
}
