//! Compilation contexts: the referenceable set of libraries, compiled
//! assemblies and source units that generation and emission resolve against.
//!
//! A [`CompilationContext`] is immutable once built. Adding a unit through
//! [`CompilationContext::with_unit`] yields a new context that shares every
//! existing reference with its base, so a process-wide context can be extended
//! per test without disturbing concurrent users.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use syn::{Item, ItemTrait};
use thiserror::Error;

use crate::declare::is_client_trait;
use crate::diagnostic::SpanResolver;
use crate::{ImplementationId, InterfaceName};

/// Errors raised while assembling or extending a context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
	#[error("failed to parse {path}: {message}")]
	Parse { path: String, message: String },
	#[error("library `{0}` is referenced twice")]
	DuplicateLibrary(String),
	#[error("interface `{name}` is declared by both {first} and {second}")]
	DuplicateInterface {
		name: InterfaceName,
		first: String,
		second: String,
	},
}

/// What a context is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
	/// References compiled code; generated implementations are emitted and run from it.
	Execution,
	/// References declaration sources; diagnostics carry real source spans.
	Diagnostics,
}

/// A referenced library and the symbol paths it exports.
///
/// Exports are written without the library name: `sync::Arc` in `std`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRef {
	name: String,
	exports: BTreeSet<String>,
}

impl LibraryRef {
	pub fn new<I, S>(name: impl Into<String>, exports: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			name: name.into(),
			exports: exports.into_iter().map(Into::into).collect(),
		}
	}

	/// The core runtime library, limited to what generated code names.
	pub fn std_library() -> Self {
		Self::new(
			"std",
			["sync::Arc", "string::String", "vec::Vec", "option::Option", "result::Result"],
		)
	}

	/// The networking contract generated code dispatches through.
	pub fn contract_library() -> Self {
		let mut exports = vec![
			"Dispatcher".to_owned(),
			"DispatchError".to_owned(),
			"DispatchResult".to_owned(),
			"RequestDescription".to_owned(),
			"RequestDescription::new".to_owned(),
			"Method".to_owned(),
			"Value".to_owned(),
			"decode".to_owned(),
		];
		exports.extend(stubgen_contract::Method::ALL.iter().map(|m| format!("Method::{}", m.variant())));
		Self::new("stubgen_contract", exports)
	}

	/// The generation engine itself, which provides the generated-type marker.
	pub fn engine_library() -> Self {
		Self::new("stubgen_engine", ["generated"])
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns true if `path` (relative to the library root) is exported.
	pub fn exports(&self, path: &str) -> bool {
		self.exports.contains(path)
	}
}

/// Why a syntax unit is part of a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOrigin {
	/// Declaration source, e.g. an embedded fixture.
	Declaration,
	/// Output of a generation backend.
	Generated {
		interface: InterfaceName,
		implementation: ImplementationId,
	},
}

/// Source text known to parse as a Rust file.
///
/// Only the text is retained; syntax trees are rebuilt on demand because they
/// cannot be shared across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxUnit {
	path: Arc<str>,
	text: Arc<str>,
	origin: UnitOrigin,
}

impl SyntaxUnit {
	/// Wraps a declaration source, checking that it parses.
	pub fn declaration(path: impl Into<Arc<str>>, text: impl Into<Arc<str>>) -> Result<Self, ContextError> {
		Self::checked(path.into(), text.into(), UnitOrigin::Declaration)
	}

	/// Wraps generated source, checking that it parses.
	pub fn generated(
		path: impl Into<Arc<str>>,
		text: impl Into<Arc<str>>,
		interface: InterfaceName,
		implementation: ImplementationId,
	) -> Result<Self, ContextError> {
		Self::checked(path.into(), text.into(), UnitOrigin::Generated { interface, implementation })
	}

	fn checked(path: Arc<str>, text: Arc<str>, origin: UnitOrigin) -> Result<Self, ContextError> {
		syn::parse_file(&text).map_err(|e| ContextError::Parse {
			path: path.to_string(),
			message: e.to_string(),
		})?;
		Ok(Self { path, text, origin })
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn origin(&self) -> &UnitOrigin {
		&self.origin
	}

	pub fn is_generated(&self) -> bool {
		matches!(self.origin, UnitOrigin::Generated { .. })
	}

	/// Parses the unit.
	pub fn parse(&self) -> syn::Result<syn::File> {
		syn::parse_file(&self.text)
	}

	/// Module path the unit's items live in.
	///
	/// The leading resource directory is dropped and `mod.rs`/`lib.rs` stand
	/// for their directory: `fixtures/users.rs` is `users`,
	/// `fixtures/billing/mod.rs` is `billing`.
	pub fn module_path(&self) -> Vec<String> {
		let trimmed = self.path.strip_suffix(".rs").unwrap_or(&self.path);
		let mut segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
		if segments.len() > 1 {
			segments.remove(0);
		}
		if matches!(segments.last(), Some(&"mod") | Some(&"lib")) {
			segments.pop();
		}
		segments.into_iter().map(|s| s.replace('-', "_")).collect()
	}
}

/// A compiled assembly whose client traits are visible as metadata only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRef {
	name: Arc<str>,
	units: Vec<Arc<SyntaxUnit>>,
}

impl AssemblyRef {
	pub fn new(name: impl Into<Arc<str>>, units: impl IntoIterator<Item = SyntaxUnit>) -> Self {
		Self {
			name: name.into(),
			units: units.into_iter().map(Arc::new).collect(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}
}

/// How a resolved interface is known to the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolOrigin {
	/// Declared in a source unit of the context.
	Source,
	/// Declared in a referenced assembly.
	Metadata { assembly: Arc<str> },
}

/// A client trait resolved inside a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSymbol {
	name: InterfaceName,
	unit: Arc<SyntaxUnit>,
	/// Inline modules between the unit root and the trait.
	inner_modules: Vec<String>,
	origin: SymbolOrigin,
}

impl InterfaceSymbol {
	pub fn name(&self) -> &InterfaceName {
		&self.name
	}

	pub fn unit(&self) -> &SyntaxUnit {
		&self.unit
	}

	pub fn origin(&self) -> &SymbolOrigin {
		&self.origin
	}

	/// Span resolver matching this symbol's origin.
	pub fn span_resolver(&self) -> SpanResolver<'_> {
		match &self.origin {
			SymbolOrigin::Source => SpanResolver::source(self.unit.path(), self.unit.text()),
			SymbolOrigin::Metadata { assembly } => SpanResolver::metadata(assembly.clone()),
		}
	}

	/// Parses the declaring unit and extracts the trait.
	pub fn load(&self) -> syn::Result<ItemTrait> {
		let file = self.unit.parse()?;
		let mut items = file.items;
		for module in &self.inner_modules {
			items = items
				.into_iter()
				.find_map(|item| match item {
					Item::Mod(m) if m.ident == module.as_str() => m.content.map(|(_, items)| items),
					_ => None,
				})
				.ok_or_else(|| missing(&self.name))?;
		}
		items
			.into_iter()
			.find_map(|item| match item {
				Item::Trait(t) if t.ident == self.name.ident() && is_client_trait(&t) => Some(t),
				_ => None,
			})
			.ok_or_else(|| missing(&self.name))
	}
}

fn missing(name: &InterfaceName) -> syn::Error {
	syn::Error::new(proc_macro2::Span::call_site(), format!("`{name}` is no longer declared in its unit"))
}

#[derive(Debug)]
struct ContextInner {
	kind: ContextKind,
	libraries: Vec<Arc<LibraryRef>>,
	assemblies: Vec<Arc<AssemblyRef>>,
	units: Vec<Arc<SyntaxUnit>>,
	interfaces: BTreeMap<InterfaceName, InterfaceSymbol>,
}

/// An immutable, cheaply clonable set of references.
#[derive(Debug, Clone)]
pub struct CompilationContext {
	inner: Arc<ContextInner>,
}

impl CompilationContext {
	pub fn kind(&self) -> ContextKind {
		self.inner.kind
	}

	pub fn resolve_interface(&self, name: &InterfaceName) -> Option<&InterfaceSymbol> {
		self.inner.interfaces.get(name)
	}

	/// Every resolvable interface, ordered by name.
	pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceSymbol> {
		self.inner.interfaces.values()
	}

	pub fn libraries(&self) -> impl Iterator<Item = &LibraryRef> {
		self.inner.libraries.iter().map(AsRef::as_ref)
	}

	pub fn units(&self) -> impl Iterator<Item = &SyntaxUnit> {
		self.inner.units.iter().map(AsRef::as_ref)
	}

	pub fn generated_units(&self) -> impl Iterator<Item = &SyntaxUnit> {
		self.units().filter(|u| u.is_generated())
	}

	/// Resolves an absolute path such as `stubgen_contract::Method::Get`
	/// against the referenced libraries.
	pub fn resolves_path<S: AsRef<str>>(&self, segments: &[S]) -> bool {
		let Some((root, rest)) = segments.split_first() else {
			return false;
		};
		let rest = rest.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("::");
		self.libraries().any(|lib| lib.name() == root.as_ref() && lib.exports(&rest))
	}

	/// Returns a new context with `unit` added. `self` is left untouched.
	pub fn with_unit(&self, unit: SyntaxUnit) -> Result<Self, ContextError> {
		let mut interfaces = self.inner.interfaces.clone();
		let unit = Arc::new(unit);
		register_unit(&mut interfaces, &unit, SymbolOrigin::Source)?;
		let mut units = self.inner.units.clone();
		units.push(unit);
		Ok(Self {
			inner: Arc::new(ContextInner {
				kind: self.inner.kind,
				libraries: self.inner.libraries.clone(),
				assemblies: self.inner.assemblies.clone(),
				units,
				interfaces,
			}),
		})
	}

	/// Returns true if both handles share the same underlying context.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

/// Assembles a [`CompilationContext`].
#[derive(Debug)]
pub struct ContextBuilder {
	kind: ContextKind,
	libraries: Vec<LibraryRef>,
	assemblies: Vec<AssemblyRef>,
	units: Vec<SyntaxUnit>,
}

impl ContextBuilder {
	pub fn new(kind: ContextKind) -> Self {
		Self {
			kind,
			libraries: Vec::new(),
			assemblies: Vec::new(),
			units: Vec::new(),
		}
	}

	/// Adds the `std`, contract and engine libraries.
	pub fn with_standard_libraries(self) -> Self {
		self.library(LibraryRef::std_library())
			.library(LibraryRef::contract_library())
			.library(LibraryRef::engine_library())
	}

	pub fn library(mut self, library: LibraryRef) -> Self {
		self.libraries.push(library);
		self
	}

	pub fn assembly(mut self, assembly: AssemblyRef) -> Self {
		self.assemblies.push(assembly);
		self
	}

	pub fn source(mut self, unit: SyntaxUnit) -> Self {
		self.units.push(unit);
		self
	}

	pub fn sources(mut self, units: impl IntoIterator<Item = SyntaxUnit>) -> Self {
		self.units.extend(units);
		self
	}

	pub fn build(self) -> Result<CompilationContext, ContextError> {
		let mut seen = BTreeSet::new();
		for library in &self.libraries {
			if !seen.insert(library.name()) {
				return Err(ContextError::DuplicateLibrary(library.name().to_owned()));
			}
		}

		let mut interfaces = BTreeMap::new();
		let assemblies: Vec<Arc<AssemblyRef>> = self.assemblies.into_iter().map(Arc::new).collect();
		for assembly in &assemblies {
			for unit in &assembly.units {
				let origin = SymbolOrigin::Metadata {
					assembly: assembly.name.clone(),
				};
				register_unit(&mut interfaces, unit, origin)?;
			}
		}

		let units: Vec<Arc<SyntaxUnit>> = self.units.into_iter().map(Arc::new).collect();
		for unit in &units {
			register_unit(&mut interfaces, unit, SymbolOrigin::Source)?;
		}

		tracing::debug!(
			kind = ?self.kind,
			libraries = self.libraries.len(),
			assemblies = assemblies.len(),
			units = units.len(),
			interfaces = interfaces.len(),
			"Built compilation context"
		);

		Ok(CompilationContext {
			inner: Arc::new(ContextInner {
				kind: self.kind,
				libraries: self.libraries.into_iter().map(Arc::new).collect(),
				assemblies,
				units,
				interfaces,
			}),
		})
	}
}

fn register_unit(
	interfaces: &mut BTreeMap<InterfaceName, InterfaceSymbol>,
	unit: &Arc<SyntaxUnit>,
	origin: SymbolOrigin,
) -> Result<(), ContextError> {
	let file = unit.parse().map_err(|e| ContextError::Parse {
		path: unit.path().to_owned(),
		message: e.to_string(),
	})?;
	let mut found = Vec::new();
	collect_client_traits(&file.items, &mut Vec::new(), &mut found);

	let root = unit.module_path();
	for (inner_modules, ident) in found {
		let name = InterfaceName::from_segments(root.iter().chain(&inner_modules).chain(std::iter::once(&ident)));
		if let Some(existing) = interfaces.get(&name) {
			return Err(ContextError::DuplicateInterface {
				name,
				first: existing.unit.path().to_owned(),
				second: unit.path().to_owned(),
			});
		}
		interfaces.insert(
			name.clone(),
			InterfaceSymbol {
				name,
				unit: unit.clone(),
				inner_modules,
				origin: origin.clone(),
			},
		);
	}
	Ok(())
}

fn collect_client_traits(items: &[Item], modules: &mut Vec<String>, found: &mut Vec<(Vec<String>, String)>) {
	for item in items {
		match item {
			Item::Trait(t) if is_client_trait(t) => found.push((modules.clone(), t.ident.to_string())),
			Item::Mod(m) => {
				if let Some((_, inner)) = &m.content {
					modules.push(m.ident.to_string());
					collect_client_traits(inner, modules, found);
					modules.pop();
				}
			}
			_ => {}
		}
	}
}

#[cfg(test)]
mod tests;
