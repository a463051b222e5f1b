//! Analysis of `#[client]` trait declarations.
//!
//! [`analyze`] walks a trait, reports every rule violation to a
//! [`DiagnosticSink`] and returns the [`InterfaceDefinition`] only when no
//! error was reported. The sink decides whether analysis continues after an
//! error, which is how the two backends differ.

use std::ops::ControlFlow;

use proc_macro2::Span;
use stubgen_contract::Method;
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
	Attribute, FnArg, GenericArgument, Ident, ItemTrait, LitStr, Meta, Pat, PatType, PathArguments, ReturnType, Token,
	TraitItem, TraitItemFn, Type,
};

use crate::InterfaceName;
use crate::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSink, Halt, SpanResolver};
use crate::types::{ParamType, classify, single_type_argument};

/// A fully analysed client trait.
#[derive(Debug, Clone)]
pub struct InterfaceDefinition {
	pub name: InterfaceName,
	pub base_path: String,
	pub methods: Vec<MethodDefinition>,
}

#[derive(Debug, Clone)]
pub struct MethodDefinition {
	pub name: Ident,
	pub verb: Method,
	/// Path template with the base path already applied.
	pub path: String,
	/// Static headers, trait-level ones first.
	pub headers: Vec<(String, String)>,
	pub params: Vec<ParamDefinition>,
	pub returns: ReturnShape,
}

#[derive(Debug, Clone)]
pub struct ParamDefinition {
	pub ident: Ident,
	pub ty: Type,
	pub param_type: ParamType,
	pub role: ParamRole,
}

/// Where a parameter's value ends up in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamRole {
	Path(String),
	Query(String),
	Header(String),
	Body,
}

#[derive(Debug, Clone)]
pub enum ReturnShape {
	/// `DispatchResult`, `DispatchResult<()>` or `Result<(), DispatchError>`.
	Unit,
	/// `DispatchResult<T>`; the response is decoded into `T`.
	Value(Type),
}

/// Returns true for traits carrying the `#[client]` attribute.
pub fn is_client_trait(item: &ItemTrait) -> bool {
	item.attrs.iter().any(|a| a.path().is_ident("client"))
}

/// Analyses `item`, declared as `name`.
///
/// Returns `None` when an error was reported or the sink halted analysis.
pub fn analyze<S: DiagnosticSink>(
	item: &ItemTrait,
	name: &InterfaceName,
	spans: &SpanResolver<'_>,
	sink: &mut S,
) -> Option<InterfaceDefinition> {
	let mut analyzer = Analyzer { spans, sink, errors: 0 };
	match analyzer.interface(item, name) {
		Ok(definition) if analyzer.errors == 0 => Some(definition),
		_ => None,
	}
}

/// Splits a path template into its placeholder names.
pub fn parse_template(path: &str) -> Result<Vec<String>, String> {
	if !path.is_empty() && !path.starts_with('/') {
		return Err(format!("path `{path}` must be empty or start with `/`"));
	}
	let mut placeholders = Vec::new();
	let mut rest = path;
	while let Some(open) = rest.find(['{', '}']) {
		if rest[open..].starts_with('}') {
			return Err(format!("path `{path}` has an unmatched `}}`"));
		}
		let after = &rest[open + 1..];
		let Some(close) = after.find(['{', '}']) else {
			return Err(format!("path `{path}` has an unclosed `{{`"));
		};
		if after[close..].starts_with('{') {
			return Err(format!("path `{path}` nests placeholders"));
		}
		let placeholder = &after[..close];
		if placeholder.is_empty() || !placeholder.chars().all(|c| c.is_alphanumeric() || c == '_') {
			return Err(format!("path `{path}` has an invalid placeholder `{{{placeholder}}}`"));
		}
		placeholders.push(placeholder.to_owned());
		rest = &after[close + 1..];
	}
	Ok(placeholders)
}

fn join_path(base: &str, path: &str) -> String {
	let joined = format!("{}{}", base.trim_end_matches('/'), path);
	if joined.is_empty() { "/".to_owned() } else { joined }
}

fn split_header(raw: &str) -> Option<(String, String)> {
	let (name, value) = raw.split_once(':')?;
	let name = name.trim();
	if name.is_empty() || name.contains(char::is_whitespace) {
		return None;
	}
	Some((name.to_owned(), value.trim().to_owned()))
}

fn return_shape(output: &ReturnType) -> Option<ReturnShape> {
	let ReturnType::Type(_, ty) = output else {
		return None;
	};
	let Type::Path(path) = &**ty else {
		return None;
	};
	if path.qself.is_some() {
		return None;
	}
	let last = path.path.segments.last()?;
	if last.ident == "DispatchResult" {
		return match &last.arguments {
			PathArguments::None => Some(ReturnShape::Unit),
			args => single_type_argument(args).map(value_or_unit),
		};
	}
	if last.ident == "Result"
		&& let PathArguments::AngleBracketed(args) = &last.arguments
	{
		let types: Vec<&Type> = args
			.args
			.iter()
			.filter_map(|arg| match arg {
				GenericArgument::Type(ty) => Some(ty),
				_ => None,
			})
			.collect();
		if let [ok, Type::Path(err)] = types.as_slice()
			&& err.path.segments.last().is_some_and(|s| s.ident == "DispatchError")
		{
			return Some(value_or_unit(ok));
		}
	}
	None
}

fn value_or_unit(ty: &Type) -> ReturnShape {
	match ty {
		Type::Tuple(tuple) if tuple.elems.is_empty() => ReturnShape::Unit,
		other => ReturnShape::Value(other.clone()),
	}
}

fn attribute_name(attr: &Attribute) -> String {
	attr.path().get_ident().map(ToString::to_string).unwrap_or_default()
}

struct Template {
	path: String,
	placeholders: Vec<String>,
	span: Span,
}

struct Analyzer<'a, S> {
	spans: &'a SpanResolver<'a>,
	sink: &'a mut S,
	errors: usize,
}

impl<S: DiagnosticSink> Analyzer<'_, S> {
	fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) -> Result<(), Halt> {
		self.errors += 1;
		let diagnostic = Diagnostic::error(code, message, self.spans.resolve(span));
		self.push(diagnostic)
	}

	fn warning(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) -> Result<(), Halt> {
		let diagnostic = Diagnostic::warning(code, message, self.spans.resolve(span));
		self.push(diagnostic)
	}

	fn push(&mut self, diagnostic: Diagnostic) -> Result<(), Halt> {
		match self.sink.report(diagnostic) {
			ControlFlow::Continue(()) => Ok(()),
			ControlFlow::Break(halt) => Err(halt),
		}
	}

	fn interface(&mut self, item: &ItemTrait, name: &InterfaceName) -> Result<InterfaceDefinition, Halt> {
		let base_path = self.client_base(item)?;
		let trait_headers = self.static_headers(&item.attrs)?;

		let mut methods = Vec::new();
		for trait_item in &item.items {
			match trait_item {
				TraitItem::Fn(method) => {
					if let Some(method) = self.method(method, &base_path, &trait_headers)? {
						methods.push(method);
					}
				}
				other => self.error(
					DiagnosticCode::UNSUPPORTED_ITEM,
					format!("client trait `{}` may only declare methods", item.ident),
					other.span(),
				)?,
			}
		}

		Ok(InterfaceDefinition {
			name: name.clone(),
			base_path,
			methods,
		})
	}

	fn client_base(&mut self, item: &ItemTrait) -> Result<String, Halt> {
		let Some(attr) = item.attrs.iter().find(|a| a.path().is_ident("client")) else {
			return Ok(String::new());
		};
		if let Meta::Path(_) = attr.meta {
			return Ok(String::new());
		}

		let mut base = None;
		let parsed = attr.parse_nested_meta(|meta| {
			if meta.path.is_ident("base") {
				base = Some(meta.value()?.parse::<LitStr>()?);
				Ok(())
			} else {
				Err(meta.error("expected `base = \"/prefix\"`"))
			}
		});
		if let Err(e) = parsed {
			self.error(
				DiagnosticCode::MALFORMED_ATTRIBUTE,
				format!("invalid `#[client]` arguments: {e}"),
				e.span(),
			)?;
			return Ok(String::new());
		}

		let Some(lit) = base else {
			return Ok(String::new());
		};
		let value = lit.value();
		if let Err(problem) = parse_template(&value) {
			self.error(DiagnosticCode::INVALID_PATH, format!("base {problem}"), lit.span())?;
		}
		Ok(value)
	}

	fn static_headers(&mut self, attrs: &[Attribute]) -> Result<Vec<(String, String)>, Halt> {
		let mut headers = Vec::new();
		for attr in attrs.iter().filter(|a| a.path().is_ident("headers")) {
			let lits = match attr.parse_args_with(Punctuated::<LitStr, Token![,]>::parse_terminated) {
				Ok(lits) => lits,
				Err(e) => {
					self.error(
						DiagnosticCode::MALFORMED_ATTRIBUTE,
						format!("`#[headers]` expects string literals: {e}"),
						attr.span(),
					)?;
					continue;
				}
			};
			for lit in lits {
				match split_header(&lit.value()) {
					Some(header) => headers.push(header),
					None => self.error(
						DiagnosticCode::INVALID_HEADER,
						format!("header `{}` must be written as `Name: value`", lit.value()),
						lit.span(),
					)?,
				}
			}
		}
		Ok(headers)
	}

	fn method(
		&mut self,
		method: &TraitItemFn,
		base: &str,
		trait_headers: &[(String, String)],
	) -> Result<Option<MethodDefinition>, Halt> {
		let errors_before = self.errors;
		let sig = &method.sig;
		let name = &sig.ident;

		if !sig.generics.params.is_empty() {
			self.error(
				DiagnosticCode::GENERIC_METHOD,
				format!("method `{name}` is generic; generated clients cannot be generic"),
				name.span(),
			)?;
		}

		match sig.inputs.first() {
			Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
			_ => self.error(
				DiagnosticCode::MISSING_RECEIVER,
				format!("method `{name}` must take `&self`"),
				name.span(),
			)?,
		}

		let verbs: Vec<(&Attribute, Method)> = method
			.attrs
			.iter()
			.filter_map(|attr| Method::from_attribute(&attribute_name(attr)).map(|verb| (attr, verb)))
			.collect();
		let mut verb = None;
		let mut template = None;
		match verbs.as_slice() {
			[] => self.error(
				DiagnosticCode::MISSING_VERB,
				format!("method `{name}` has no verb attribute such as `#[get(\"/path\")]`"),
				name.span(),
			)?,
			[(attr, designated)] => {
				verb = Some(*designated);
				template = self.method_template(attr, base)?;
			}
			[_, (second, _), ..] => self.error(
				DiagnosticCode::MULTIPLE_VERBS,
				format!("method `{name}` has more than one verb attribute"),
				second.span(),
			)?,
		}

		let mut headers = trait_headers.to_vec();
		headers.extend(self.static_headers(&method.attrs)?);

		let mut params = Vec::new();
		let mut body_seen = false;
		for input in &sig.inputs {
			let FnArg::Typed(pat_type) = input else {
				continue;
			};
			let ident = match &*pat_type.pat {
				Pat::Ident(pat) if pat.by_ref.is_none() && pat.subpat.is_none() => pat.ident.clone(),
				other => {
					self.error(
						DiagnosticCode::UNSUPPORTED_PATTERN,
						format!("parameters of `{name}` must be bound to plain identifiers"),
						other.span(),
					)?;
					continue;
				}
			};
			let Some(role) = self.param_role(pat_type, &ident, template.as_ref())? else {
				continue;
			};
			let param_type = classify(&pat_type.ty);

			match &role {
				ParamRole::Path(placeholder) => {
					if param_type.optional {
						self.error(
							DiagnosticCode::OPTIONAL_PATH_PARAMETER,
							format!("parameter `{ident}` binds `{{{placeholder}}}` and cannot be optional"),
							ident.span(),
						)?;
					}
					if let Some(t) = &template
						&& !t.placeholders.contains(placeholder)
					{
						self.error(
							DiagnosticCode::STRAY_PATH_PARAMETER,
							format!(
								"parameter `{ident}` binds `{{{placeholder}}}` but `{}` has no such placeholder",
								t.path
							),
							ident.span(),
						)?;
					}
				}
				ParamRole::Body => {
					if body_seen {
						self.error(
							DiagnosticCode::MULTIPLE_BODIES,
							format!("method `{name}` binds more than one `#[body]` parameter"),
							ident.span(),
						)?;
					}
					body_seen = true;
					if let Some(verb) = verb
						&& !verb.allows_body()
					{
						self.warning(
							DiagnosticCode::BODY_ON_BODILESS_VERB,
							format!("`{verb}` requests usually carry no body; `{ident}` is sent anyway"),
							ident.span(),
						)?;
					}
				}
				ParamRole::Query(_) | ParamRole::Header(_) => {}
			}

			params.push(ParamDefinition {
				ident,
				ty: (*pat_type.ty).clone(),
				param_type,
				role,
			});
		}

		if let Some(t) = &template {
			for placeholder in &t.placeholders {
				let bound = params
					.iter()
					.any(|p| matches!(&p.role, ParamRole::Path(n) if n == placeholder));
				if !bound {
					self.error(
						DiagnosticCode::UNBOUND_PLACEHOLDER,
						format!(
							"placeholder `{{{placeholder}}}` in `{}` is not bound by any parameter of `{name}`",
							t.path
						),
						t.span,
					)?;
				}
			}
		}

		let returns = return_shape(&sig.output);
		if returns.is_none() {
			let span = match &sig.output {
				ReturnType::Default => name.span(),
				ReturnType::Type(_, ty) => ty.span(),
			};
			self.error(
				DiagnosticCode::UNSUPPORTED_RETURN,
				format!("method `{name}` must return `DispatchResult` or `DispatchResult<T>`"),
				span,
			)?;
		}

		if self.errors > errors_before {
			return Ok(None);
		}
		let (Some(verb), Some(template), Some(returns)) = (verb, template, returns) else {
			return Ok(None);
		};
		Ok(Some(MethodDefinition {
			name: name.clone(),
			verb,
			path: template.path,
			headers,
			params,
			returns,
		}))
	}

	fn method_template(&mut self, attr: &Attribute, base: &str) -> Result<Option<Template>, Halt> {
		let lit = match &attr.meta {
			Meta::Path(_) => None,
			Meta::List(_) => match attr.parse_args::<LitStr>() {
				Ok(lit) => Some(lit),
				Err(e) => {
					self.error(
						DiagnosticCode::MALFORMED_ATTRIBUTE,
						format!("`#[{}]` expects a single path string: {e}", attribute_name(attr)),
						attr.span(),
					)?;
					return Ok(None);
				}
			},
			Meta::NameValue(_) => {
				self.error(
					DiagnosticCode::MALFORMED_ATTRIBUTE,
					format!("`#[{}]` expects a single path string", attribute_name(attr)),
					attr.span(),
				)?;
				return Ok(None);
			}
		};

		let raw = lit.as_ref().map(LitStr::value).unwrap_or_default();
		let span = lit.as_ref().map_or_else(|| attr.span(), LitStr::span);
		if let Err(problem) = parse_template(&raw) {
			self.error(DiagnosticCode::INVALID_PATH, problem, span)?;
			return Ok(None);
		}
		let path = join_path(base, &raw);
		let placeholders = parse_template(&path).unwrap_or_default();
		Ok(Some(Template { path, placeholders, span }))
	}

	fn param_role(
		&mut self,
		pat_type: &PatType,
		ident: &Ident,
		template: Option<&Template>,
	) -> Result<Option<ParamRole>, Halt> {
		let mut role = None;
		for attr in &pat_type.attrs {
			let parsed = match attribute_name(attr).as_str() {
				"path" => self.named_role(attr, Some(ident))?.map(ParamRole::Path),
				"query" => self.named_role(attr, Some(ident))?.map(ParamRole::Query),
				"header" => self.named_role(attr, None)?.map(ParamRole::Header),
				"body" => {
					if matches!(attr.meta, Meta::Path(_)) {
						Some(ParamRole::Body)
					} else {
						self.error(DiagnosticCode::MALFORMED_ATTRIBUTE, "`#[body]` takes no arguments", attr.span())?;
						None
					}
				}
				_ => continue,
			};
			let Some(parsed) = parsed else {
				return Ok(None);
			};
			if role.is_some() {
				self.error(
					DiagnosticCode::MALFORMED_ATTRIBUTE,
					format!("parameter `{ident}` has more than one binding attribute"),
					attr.span(),
				)?;
				return Ok(None);
			}
			role = Some(parsed);
		}

		Ok(Some(role.unwrap_or_else(|| {
			let name = ident.unraw().to_string();
			if template.is_some_and(|t| t.placeholders.contains(&name)) {
				ParamRole::Path(name)
			} else {
				ParamRole::Query(name)
			}
		})))
	}

	fn named_role(&mut self, attr: &Attribute, default: Option<&Ident>) -> Result<Option<String>, Halt> {
		let kind = attribute_name(attr);
		match &attr.meta {
			Meta::Path(_) => match default {
				Some(ident) => Ok(Some(ident.unraw().to_string())),
				None => {
					self.error(
						DiagnosticCode::MALFORMED_ATTRIBUTE,
						format!("`#[{kind}]` needs a name, e.g. `#[{kind}(\"X-Name\")]`"),
						attr.span(),
					)?;
					Ok(None)
				}
			},
			Meta::List(_) => match attr.parse_args::<LitStr>() {
				Ok(lit) if !lit.value().trim().is_empty() => Ok(Some(lit.value())),
				Ok(lit) => {
					self.error(
						DiagnosticCode::MALFORMED_ATTRIBUTE,
						format!("`#[{kind}]` name must not be empty"),
						lit.span(),
					)?;
					Ok(None)
				}
				Err(e) => {
					self.error(
						DiagnosticCode::MALFORMED_ATTRIBUTE,
						format!("`#[{kind}]` expects a single name string: {e}"),
						attr.span(),
					)?;
					Ok(None)
				}
			},
			Meta::NameValue(_) => {
				self.error(
					DiagnosticCode::MALFORMED_ATTRIBUTE,
					format!("`#[{kind}]` expects a single name string"),
					attr.span(),
				)?;
				Ok(None)
			}
		}
	}
}
