//! Rust source for a generated client implementation.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::ImplementationId;
use crate::declare::{InterfaceDefinition, MethodDefinition, ParamRole, ReturnShape};

/// Renders the implementation struct, its constructor and the trait impl.
///
/// Output depends only on `definition` and `implementation`, so repeated
/// generations are byte-identical.
pub(crate) fn render(definition: &InterfaceDefinition, implementation: &ImplementationId) -> String {
	let ty = format_ident!("{}", implementation.as_str());
	let interface = definition.name.as_str();
	let trait_path = definition.name.segments().map(|segment| format_ident!("{}", segment));
	let methods = definition.methods.iter().map(render_method);

	quote! {
		#[stubgen_engine::generated(interface = #interface)]
		pub struct #ty {
			dispatcher: ::std::sync::Arc<dyn ::stubgen_contract::Dispatcher>,
		}

		impl #ty {
			pub fn new(dispatcher: ::std::sync::Arc<dyn ::stubgen_contract::Dispatcher>) -> Self {
				Self { dispatcher }
			}
		}

		impl #(#trait_path)::* for #ty {
			#(#methods)*
		}
	}
	.to_string()
}

fn render_method(method: &MethodDefinition) -> TokenStream {
	let name = &method.name;
	let params = method.params.iter().map(|param| {
		let ident = &param.ident;
		let ty = &param.ty;
		quote!(#ident: #ty)
	});
	let verb = format_ident!("{}", method.verb.variant());
	let path = &method.path;
	let headers = method.headers.iter().map(|(name, value)| quote!(.header(#name, #value)));
	let bindings = method.params.iter().map(|param| {
		let ident = &param.ident;
		match &param.role {
			ParamRole::Path(name) => quote!(.path_param(#name, #ident)),
			ParamRole::Query(name) => quote!(.query(#name, #ident)),
			ParamRole::Header(name) => quote!(.header(#name, #ident)),
			ParamRole::Body => quote!(.body(#ident)),
		}
	});
	let (output, dispatch) = match &method.returns {
		ReturnShape::Unit => (
			quote!(::stubgen_contract::DispatchResult),
			quote!(self.dispatcher.send(request)),
		),
		ReturnShape::Value(ty) => (
			quote!(::stubgen_contract::DispatchResult<#ty>),
			quote!(self.dispatcher.send_for_value(request).and_then(::stubgen_contract::decode)),
		),
	};

	quote! {
		fn #name(&self, #(#params),*) -> #output {
			let request = ::stubgen_contract::RequestDescription::new(::stubgen_contract::Method::#verb, #path)
				#(#headers)*
				#(#bindings)*;
			#dispatch
		}
	}
}
