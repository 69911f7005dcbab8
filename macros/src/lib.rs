mod route;

use proc_macro::TokenStream;

/// Generates an OpenAPI documentation function for a handler, named after the
/// handler with the suffix `_docs`.
///
/// The first paragraph of the doc comment becomes the summary, the rest becomes
/// the description.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}
