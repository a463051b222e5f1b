//! Lowering of generated units into an executable [`Image`].
//!
//! Emission accepts exactly the shape the generation engine renders: a marked
//! struct, an inherent `new` constructor and one trait impl whose methods
//! build a `RequestDescription` and hand it to the dispatcher. Anything else
//! is reported with an `EM` diagnostic rather than guessed at.

use std::collections::{BTreeMap, BTreeSet};

use stubgen_contract::Method;
use stubgen_engine::types::{ParamType, classify, single_type_argument};
use stubgen_engine::{
	CompilationContext, Diagnostic, DiagnosticCode, ImplementationId, InterfaceName, SpanResolver, SyntaxUnit,
	render_diagnostics,
};
use syn::spanned::Spanned;
use syn::{
	Expr, ExprMethodCall, FnArg, GenericArgument, ImplItem, ImplItemFn, Item, ItemImpl, ItemStruct, Lit, LitStr, Member,
	Pat, PathArguments, ReturnType, Stmt, TraitItem, Type, TypeParamBound,
};
use thiserror::Error;

use crate::image::{CompiledMethod, CompiledType, HeaderSource, Image, ParamSlot, RequestOp, ReturnKind};

/// An absolute path names nothing exported by the context's libraries.
pub const UNRESOLVED_PATH: DiagnosticCode = DiagnosticCode::new("EM0001");
/// A trait impl or marker names an interface the context does not declare.
pub const UNRESOLVED_INTERFACE: DiagnosticCode = DiagnosticCode::new("EM0002");
/// Source outside the generated shape, or a unit that does not parse.
pub const UNSUPPORTED_CONSTRUCT: DiagnosticCode = DiagnosticCode::new("EM0003");
/// A declared interface method has no implementation.
pub const MISSING_METHOD: DiagnosticCode = DiagnosticCode::new("EM0004");
/// An implemented method is not declared by the interface.
pub const EXTRA_METHOD: DiagnosticCode = DiagnosticCode::new("EM0005");
/// A generated type has no `new` constructor.
pub const MISSING_CONSTRUCTOR: DiagnosticCode = DiagnosticCode::new("EM0006");
/// The generated-type marker is missing or disagrees with the impl.
pub const INVALID_MARKER: DiagnosticCode = DiagnosticCode::new("EM0007");
/// A request argument is not a parameter of its method.
pub const UNRESOLVED_NAME: DiagnosticCode = DiagnosticCode::new("EM0008");
/// The request verb is not a `Method` variant.
pub const UNKNOWN_VERB: DiagnosticCode = DiagnosticCode::new("EM0009");

/// Emission failed; every problem found is listed.
#[derive(Debug, Clone, Error)]
#[error("emission failed:\n{}", render_diagnostics(&self.diagnostics))]
pub struct EmitError {
	pub diagnostics: Vec<Diagnostic>,
}

/// Lowers every generated unit of `context` into one image.
pub fn emit(context: &CompilationContext) -> Result<Image, EmitError> {
	let mut emitter = Emitter {
		context,
		diagnostics: Vec::new(),
	};
	let mut types = Vec::new();
	let mut units = 0;
	for unit in context.generated_units() {
		units += 1;
		types.extend(emitter.unit(unit));
	}

	tracing::debug!(
		units,
		types = types.len(),
		errors = emitter.diagnostics.len(),
		"Emitted generated units"
	);

	if emitter.diagnostics.is_empty() {
		Ok(Image { types })
	} else {
		Err(EmitError {
			diagnostics: emitter.diagnostics,
		})
	}
}

enum Dispatch {
	Send,
	SendForValue,
}

struct Emitter<'a> {
	context: &'a CompilationContext,
	diagnostics: Vec<Diagnostic>,
}

impl Emitter<'_> {
	fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, span: stubgen_engine::SourceSpan) {
		self.diagnostics.push(Diagnostic::error(code, message, span));
	}

	fn unit(&mut self, unit: &SyntaxUnit) -> Vec<CompiledType> {
		let spans = SpanResolver::source(unit.path(), unit.text());
		let file = match unit.parse() {
			Ok(file) => file,
			Err(e) => {
				self.error(
					UNSUPPORTED_CONSTRUCT,
					format!("generated unit does not parse: {e}"),
					spans.resolve(e.span()),
				);
				return Vec::new();
			}
		};

		let mut marked: Vec<(&ItemStruct, InterfaceName)> = Vec::new();
		for item in &file.items {
			match item {
				Item::Struct(item) => {
					if let Some(interface) = self.marker(item, &spans) {
						marked.push((item, interface));
					}
				}
				Item::Impl(_) => {}
				other => self.error(
					UNSUPPORTED_CONSTRUCT,
					"generated units may only declare structs and impls",
					spans.resolve(other.span()),
				),
			}
		}

		let mut constructors = BTreeSet::new();
		let mut implemented: BTreeMap<String, Option<Vec<CompiledMethod>>> = BTreeMap::new();
		for item in &file.items {
			let Item::Impl(item) = item else {
				continue;
			};
			let Some(self_ident) = self_type_ident(&item.self_ty) else {
				self.error(
					UNSUPPORTED_CONSTRUCT,
					"impls must target a generated struct by name",
					spans.resolve(item.self_ty.span()),
				);
				continue;
			};
			let Some((_, interface)) = marked.iter().find(|(s, _)| s.ident == self_ident) else {
				self.error(
					INVALID_MARKER,
					format!("`{self_ident}` is not a generated type"),
					spans.resolve(item.self_ty.span()),
				);
				continue;
			};
			match &item.trait_ {
				None => {
					if self.constructor(item, &self_ident, &spans) {
						constructors.insert(self_ident);
					}
				}
				Some((_, path, _)) => {
					let name = InterfaceName::from_segments(path.segments.iter().map(|s| s.ident.to_string()));
					let methods = self.trait_impl(item, &name, interface, &spans);
					implemented.insert(self_ident, methods);
				}
			}
		}

		let mut types = Vec::new();
		for (item, interface) in marked {
			let ident = item.ident.to_string();
			if !constructors.contains(&ident) {
				self.error(
					MISSING_CONSTRUCTOR,
					format!("generated type `{ident}` has no `new` constructor"),
					spans.resolve(item.ident.span()),
				);
			}
			match implemented.remove(&ident) {
				Some(Some(methods)) => types.push(CompiledType {
					id: ImplementationId::new(ident),
					interface,
					methods,
				}),
				Some(None) => {}
				None => self.error(
					MISSING_METHOD,
					format!("generated type `{ident}` does not implement `{interface}`"),
					spans.resolve(item.ident.span()),
				),
			}
		}
		types
	}

	/// Reads the generated-type marker and checks the struct's field types.
	fn marker(&mut self, item: &ItemStruct, spans: &SpanResolver<'_>) -> Option<InterfaceName> {
		for field in &item.fields {
			self.check_type(&field.ty, spans);
		}

		let Some(attr) = item
			.attrs
			.iter()
			.find(|a| a.path().segments.last().is_some_and(|s| s.ident == "generated"))
		else {
			self.error(
				INVALID_MARKER,
				format!("`{}` carries no generated-type marker", item.ident),
				spans.resolve(item.ident.span()),
			);
			return None;
		};
		self.require_path(attr.path(), spans);

		let mut interface = None;
		let parsed = attr.parse_nested_meta(|meta| {
			if meta.path.is_ident("interface") {
				interface = Some(meta.value()?.parse::<LitStr>()?.value());
				Ok(())
			} else {
				Err(meta.error("unknown marker argument"))
			}
		});
		let (Ok(()), Some(interface)) = (parsed, interface) else {
			self.error(
				INVALID_MARKER,
				format!("marker on `{}` does not name an interface", item.ident),
				spans.resolve(attr.span()),
			);
			return None;
		};

		let interface = InterfaceName::new(interface);
		if self.context.resolve_interface(&interface).is_none() {
			self.error(
				UNRESOLVED_INTERFACE,
				format!("marker names `{interface}`, which the context does not declare"),
				spans.resolve(attr.span()),
			);
			return None;
		}
		Some(interface)
	}

	fn constructor(&mut self, item: &ItemImpl, ident: &str, spans: &SpanResolver<'_>) -> bool {
		let mut found = false;
		for impl_item in &item.items {
			match impl_item {
				ImplItem::Fn(f) if f.sig.ident == "new" => {
					let typed: Vec<&Type> = f
						.sig
						.inputs
						.iter()
						.filter_map(|input| match input {
							FnArg::Typed(pat) => Some(&*pat.ty),
							FnArg::Receiver(_) => None,
						})
						.collect();
					let returns_self =
						matches!(&f.sig.output, ReturnType::Type(_, ty) if matches!(&**ty, Type::Path(p) if p.path.is_ident("Self")));
					if typed.len() == 1 && f.sig.receiver().is_none() && returns_self {
						self.check_type(typed[0], spans);
						found = true;
					} else {
						self.error(
							UNSUPPORTED_CONSTRUCT,
							format!("constructor of `{ident}` must be `fn new(dispatcher) -> Self`"),
							spans.resolve(f.sig.span()),
						);
					}
				}
				other => self.error(
					UNSUPPORTED_CONSTRUCT,
					format!("inherent impl of `{ident}` may only define `new`"),
					spans.resolve(other.span()),
				),
			}
		}
		found
	}

	fn trait_impl(
		&mut self,
		item: &ItemImpl,
		name: &InterfaceName,
		marker: &InterfaceName,
		spans: &SpanResolver<'_>,
	) -> Option<Vec<CompiledMethod>> {
		let Some((_, path, _)) = &item.trait_ else {
			return None;
		};
		let Some(symbol) = self.context.resolve_interface(name) else {
			self.error(
				UNRESOLVED_INTERFACE,
				format!("`{name}` does not resolve to an interface"),
				spans.resolve(path.span()),
			);
			return None;
		};
		if name != marker {
			self.error(
				INVALID_MARKER,
				format!("marker names `{marker}` but the type implements `{name}`"),
				spans.resolve(path.span()),
			);
			return None;
		}
		let declared = match symbol.load() {
			Ok(declared) => declared,
			Err(e) => {
				self.error(UNRESOLVED_INTERFACE, e.to_string(), spans.resolve(path.span()));
				return None;
			}
		};
		let declared: Vec<String> = declared
			.items
			.iter()
			.filter_map(|item| match item {
				TraitItem::Fn(f) => Some(f.sig.ident.to_string()),
				_ => None,
			})
			.collect();

		let errors_before = self.diagnostics.len();
		let mut seen = BTreeSet::new();
		let mut methods = Vec::new();
		for impl_item in &item.items {
			let ImplItem::Fn(f) = impl_item else {
				self.error(
					UNSUPPORTED_CONSTRUCT,
					format!("impl of `{name}` may only define methods"),
					spans.resolve(impl_item.span()),
				);
				continue;
			};
			let method_name = f.sig.ident.to_string();
			if !declared.contains(&method_name) {
				self.error(
					EXTRA_METHOD,
					format!("`{method_name}` is not a method of `{name}`"),
					spans.resolve(f.sig.ident.span()),
				);
				continue;
			}
			seen.insert(method_name);
			if let Some(method) = self.method(f, spans) {
				methods.push(method);
			}
		}
		for missing in declared.iter().filter(|m| !seen.contains(*m)) {
			self.error(
				MISSING_METHOD,
				format!("`{name}::{missing}` is not implemented"),
				spans.resolve(path.span()),
			);
		}

		(self.diagnostics.len() == errors_before).then_some(methods)
	}

	fn method(&mut self, f: &ImplItemFn, spans: &SpanResolver<'_>) -> Option<CompiledMethod> {
		let name = f.sig.ident.to_string();
		let errors_before = self.diagnostics.len();

		let mut params = Vec::new();
		for input in &f.sig.inputs {
			let FnArg::Typed(pat_type) = input else {
				continue;
			};
			let Pat::Ident(pat) = &*pat_type.pat else {
				self.error(
					UNSUPPORTED_CONSTRUCT,
					format!("parameters of `{name}` must be plain identifiers"),
					spans.resolve(pat_type.pat.span()),
				);
				return None;
			};
			self.check_type(&pat_type.ty, spans);
			let ParamType { kind, optional } = classify(&pat_type.ty);
			params.push(ParamSlot {
				name: pat.ident.to_string(),
				kind,
				optional,
			});
		}

		let returns = self.return_kind(&f.sig.output, spans)?;

		let [Stmt::Local(local), Stmt::Expr(send, None)] = f.block.stmts.as_slice() else {
			self.error(
				UNSUPPORTED_CONSTRUCT,
				format!("body of `{name}` must build `request` and dispatch it"),
				spans.resolve(f.block.span()),
			);
			return None;
		};
		let binds_request = matches!(&local.pat, Pat::Ident(p) if p.ident == "request");
		let Some(init) = local.init.as_ref().filter(|init| binds_request && init.diverge.is_none()) else {
			self.error(
				UNSUPPORTED_CONSTRUCT,
				format!("`{name}` must bind its request as `let request = ...;`"),
				spans.resolve(local.span()),
			);
			return None;
		};

		let (verb, path, ops) = self.request_chain(&init.expr, &params, spans)?;
		let dispatch = self.dispatch(send, spans)?;
		let consistent = matches!(
			(&dispatch, returns),
			(Dispatch::Send, ReturnKind::Unit) | (Dispatch::SendForValue, ReturnKind::Value { .. })
		);
		if !consistent {
			self.error(
				UNSUPPORTED_CONSTRUCT,
				format!("`{name}` dispatches in a way its return type does not allow"),
				spans.resolve(send.span()),
			);
		}

		(self.diagnostics.len() == errors_before).then(|| CompiledMethod {
			name,
			params,
			verb,
			path,
			ops,
			returns,
		})
	}

	fn return_kind(&mut self, output: &ReturnType, spans: &SpanResolver<'_>) -> Option<ReturnKind> {
		let shape = match output {
			ReturnType::Type(_, ty) => match &**ty {
				Type::Path(path) if path.path.segments.last().is_some_and(|s| s.ident == "DispatchResult") => {
					self.check_type(ty, spans);
					path.path.segments.last().and_then(|last| match &last.arguments {
						PathArguments::None => Some(ReturnKind::Unit),
						args => single_type_argument(args).map(|inner| match inner {
							Type::Tuple(tuple) if tuple.elems.is_empty() => ReturnKind::Unit,
							inner => {
								let ParamType { kind, optional } = classify(inner);
								ReturnKind::Value { kind, optional }
							}
						}),
					})
				}
				_ => None,
			},
			ReturnType::Default => None,
		};
		if shape.is_none() {
			self.error(
				UNSUPPORTED_CONSTRUCT,
				"generated methods must return `DispatchResult`",
				spans.resolve(output.span()),
			);
		}
		shape
	}

	fn request_chain(
		&mut self,
		expr: &Expr,
		params: &[ParamSlot],
		spans: &SpanResolver<'_>,
	) -> Option<(Method, String, Vec<RequestOp>)> {
		let mut calls: Vec<&ExprMethodCall> = Vec::new();
		let mut current = expr;
		while let Expr::MethodCall(call) = current {
			calls.push(call);
			current = &call.receiver;
		}
		calls.reverse();

		let root = match current {
			Expr::Call(call) => match &*call.func {
				Expr::Path(func) if path_idents(&func.path) == ["stubgen_contract", "RequestDescription", "new"] => {
					self.require_path(&func.path, spans);
					Some(call)
				}
				_ => None,
			},
			_ => None,
		};
		let Some(root) = root else {
			self.error(
				UNSUPPORTED_CONSTRUCT,
				"requests must start with `::stubgen_contract::RequestDescription::new`",
				spans.resolve(current.span()),
			);
			return None;
		};

		let args: Vec<&Expr> = root.args.iter().collect();
		let [verb, path] = args.as_slice() else {
			self.error(
				UNSUPPORTED_CONSTRUCT,
				"`RequestDescription::new` takes a verb and a path",
				spans.resolve(root.span()),
			);
			return None;
		};
		let verb = self.verb(verb, spans)?;
		let path = self.literal(path, spans)?;

		let mut ops = Vec::with_capacity(calls.len());
		for call in calls {
			let args: Vec<&Expr> = call.args.iter().collect();
			let op = match (call.method.to_string().as_str(), args.as_slice()) {
				("path_param", [name, value]) => RequestOp::PathParam {
					name: self.literal(name, spans)?,
					slot: self.slot(value, params, spans)?,
				},
				("query", [name, value]) => RequestOp::Query {
					name: self.literal(name, spans)?,
					slot: self.slot(value, params, spans)?,
				},
				("header", [name, value]) => {
					let name = self.literal(name, spans)?;
					let source = match string_literal(value) {
						Some(text) => HeaderSource::Static(text),
						None => HeaderSource::Slot(self.slot(value, params, spans)?),
					};
					RequestOp::Header { name, source }
				}
				("body", [value]) => RequestOp::Body {
					slot: self.slot(value, params, spans)?,
				},
				(other, _) => {
					self.error(
						UNSUPPORTED_CONSTRUCT,
						format!("unsupported request builder call `{other}`"),
						spans.resolve(call.method.span()),
					);
					return None;
				}
			};
			ops.push(op);
		}
		Some((verb, path, ops))
	}

	fn verb(&mut self, expr: &Expr, spans: &SpanResolver<'_>) -> Option<Method> {
		let Expr::Path(path) = expr else {
			self.error(
				UNSUPPORTED_CONSTRUCT,
				"request verb must be a `Method` path",
				spans.resolve(expr.span()),
			);
			return None;
		};
		let variant = path.path.segments.last().map(|s| s.ident.to_string()).unwrap_or_default();
		match Method::from_variant(&variant) {
			Some(method) => {
				self.require_path(&path.path, spans);
				Some(method)
			}
			None => {
				self.error(
					UNKNOWN_VERB,
					format!("`{variant}` is not a request verb"),
					spans.resolve(expr.span()),
				);
				None
			}
		}
	}

	fn literal(&mut self, expr: &Expr, spans: &SpanResolver<'_>) -> Option<String> {
		let text = string_literal(expr);
		if text.is_none() {
			self.error(UNSUPPORTED_CONSTRUCT, "expected a string literal", spans.resolve(expr.span()));
		}
		text
	}

	fn slot(&mut self, expr: &Expr, params: &[ParamSlot], spans: &SpanResolver<'_>) -> Option<usize> {
		let Some(ident) = (match expr {
			Expr::Path(path) => path.path.get_ident(),
			_ => None,
		}) else {
			self.error(
				UNSUPPORTED_CONSTRUCT,
				"request arguments must be parameter names",
				spans.resolve(expr.span()),
			);
			return None;
		};
		let slot = params.iter().position(|p| ident == p.name.as_str());
		if slot.is_none() {
			self.error(
				UNRESOLVED_NAME,
				format!("`{ident}` is not a parameter of this method"),
				spans.resolve(ident.span()),
			);
		}
		slot
	}

	fn dispatch(&mut self, expr: &Expr, spans: &SpanResolver<'_>) -> Option<Dispatch> {
		if dispatcher_call(expr).as_deref() == Some("send") {
			return Some(Dispatch::Send);
		}
		if let Expr::MethodCall(call) = expr
			&& call.method == "and_then"
			&& dispatcher_call(&call.receiver).as_deref() == Some("send_for_value")
			&& let Some(Expr::Path(decode)) = call.args.first()
			&& call.args.len() == 1
			&& path_idents(&decode.path) == ["stubgen_contract", "decode"]
		{
			self.require_path(&decode.path, spans);
			return Some(Dispatch::SendForValue);
		}
		self.error(
			UNSUPPORTED_CONSTRUCT,
			"requests must be dispatched through `self.dispatcher`",
			spans.resolve(expr.span()),
		);
		None
	}

	/// Checks every absolute path inside `ty` against the context's libraries.
	fn check_type(&mut self, ty: &Type, spans: &SpanResolver<'_>) {
		match ty {
			Type::Path(path) => {
				if path.path.leading_colon.is_some() {
					self.require_path(&path.path, spans);
				}
				for segment in &path.path.segments {
					if let PathArguments::AngleBracketed(args) = &segment.arguments {
						for arg in &args.args {
							if let GenericArgument::Type(inner) = arg {
								self.check_type(inner, spans);
							}
						}
					}
				}
			}
			Type::TraitObject(object) => {
				for bound in &object.bounds {
					if let TypeParamBound::Trait(bound) = bound
						&& bound.path.leading_colon.is_some()
					{
						self.require_path(&bound.path, spans);
					}
				}
			}
			Type::Reference(reference) => self.check_type(&reference.elem, spans),
			_ => {}
		}
	}

	fn require_path(&mut self, path: &syn::Path, spans: &SpanResolver<'_>) {
		let segments = path_idents(path);
		if !self.context.resolves_path(&segments) {
			self.error(
				UNRESOLVED_PATH,
				format!("`{}` does not resolve in any referenced library", segments.join("::")),
				spans.resolve(path.span()),
			);
		}
	}
}

fn path_idents(path: &syn::Path) -> Vec<String> {
	path.segments.iter().map(|s| s.ident.to_string()).collect()
}

fn self_type_ident(ty: &Type) -> Option<String> {
	match ty {
		Type::Path(path) if path.qself.is_none() => path.path.get_ident().map(ToString::to_string),
		_ => None,
	}
}

fn string_literal(expr: &Expr) -> Option<String> {
	match expr {
		Expr::Lit(lit) => match &lit.lit {
			Lit::Str(text) => Some(text.value()),
			_ => None,
		},
		_ => None,
	}
}

/// Name of the dispatcher method if `expr` is `self.dispatcher.<method>(request)`.
fn dispatcher_call(expr: &Expr) -> Option<String> {
	let Expr::MethodCall(call) = expr else {
		return None;
	};
	let Expr::Field(field) = &*call.receiver else {
		return None;
	};
	let on_self = matches!(&*field.base, Expr::Path(p) if p.path.is_ident("self"));
	let on_dispatcher = matches!(&field.member, Member::Named(m) if m == "dispatcher");
	let forwards_request =
		call.args.len() == 1 && matches!(call.args.first(), Some(Expr::Path(p)) if p.path.is_ident("request"));
	(on_self && on_dispatcher && forwards_request).then(|| call.method.to_string())
}
