use proc_macro2::TokenStream;
use syn::{
	Token,
	parse::{Parse, ParseStream},
};

/// Arguments of `#[context(...)]`: an optional leading `move,` followed by
/// anything `format!` accepts.
pub struct ContextArgs {
	pub move_token: Option<Token![move]>,
	pub message: TokenStream,
}

impl Parse for ContextArgs {
	fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
		let mut move_token = None;
		if input.peek(Token![move]) {
			move_token = Some(input.parse()?);
			input.parse::<Token![,]>()?;
		}
		if input.is_empty() {
			return Err(input.error("#[context] needs a format string"));
		}
		Ok(ContextArgs {
			move_token,
			message: input.parse()?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::ContextArgs;
	use syn::parse_str;

	#[test]
	fn plain_message() {
		let args: ContextArgs = parse_str(r#""level {}", zoom"#).unwrap();
		assert!(args.move_token.is_none());
		let message = args.message.to_string();
		assert!(message.starts_with(r#""level {}""#));
		assert!(message.ends_with("zoom"));
	}

	#[test]
	fn message_with_move() {
		let args: ContextArgs = parse_str(r#"move, "batch {index}""#).unwrap();
		assert!(args.move_token.is_some());
		assert_eq!(args.message.to_string(), r#""batch {index}""#);
	}

	#[test]
	fn move_without_comma_is_rejected() {
		assert!(parse_str::<ContextArgs>(r#"move "oops""#).is_err());
	}

	#[test]
	fn empty_arguments_are_rejected() {
		let error = parse_str::<ContextArgs>("").err().unwrap();
		assert!(error.to_string().contains("format string"));
	}
}
