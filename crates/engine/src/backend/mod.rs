//! Generation strategies.
//!
//! Both backends share one analysis and rendering pipeline and differ only in
//! the [`DiagnosticSink`] policy and in how the artifact text is framed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSink, SourceSpan};
use crate::{CompilationContext, ImplementationId, InterfaceName, codegen, declare};

mod runtime;
mod source;

pub use runtime::RuntimeBackend;
pub use source::SourceBackend;

/// A strategy turning an interface identity into an implementation artifact.
pub trait GenerationBackend: Send + Sync {
	fn kind(&self) -> BackendKind;

	/// Generates the implementation of `interface` declared in `context`.
	///
	/// Pure: identical inputs give identical output.
	fn generate(&self, context: &CompilationContext, interface: &InterfaceName) -> Generation;
}

/// Generated implementation source for one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
	pub interface: InterfaceName,
	pub implementation: ImplementationId,
	/// Synthetic file name the source is attached under, e.g. `generated/UsersApiImpl1a2b3c4d.rs`.
	pub file_name: String,
	pub source: String,
}

impl GeneratedArtifact {
	fn new(interface: InterfaceName, implementation: ImplementationId, source: String) -> Self {
		let file_name = format!("generated/{implementation}.rs");
		Self {
			interface,
			implementation,
			file_name,
			source,
		}
	}
}

/// Outcome of one generation: an artifact when no error was reported, plus
/// every diagnostic the backend's policy let through.
#[derive(Debug, Clone)]
pub struct Generation {
	pub artifact: Option<GeneratedArtifact>,
	pub diagnostics: Vec<Diagnostic>,
}

impl Generation {
	pub fn succeeded(&self) -> bool {
		self.artifact.is_some()
	}

	pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
		self.diagnostics.iter().filter(|d| d.is_error())
	}

	pub fn codes(&self) -> Vec<DiagnosticCode> {
		self.diagnostics.iter().map(|d| d.code).collect()
	}

	pub fn first_error_code(&self) -> Option<DiagnosticCode> {
		self.errors().next().map(|d| d.code)
	}
}

/// Configuration-time backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
	#[default]
	Runtime,
	Source,
}

impl BackendKind {
	pub const ALL: [Self; 2] = [Self::Runtime, Self::Source];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Runtime => "runtime",
			Self::Source => "source",
		}
	}
}

impl fmt::Display for BackendKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown generation backend `{0}` (expected `runtime` or `source`)")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
	type Err = UnknownBackend;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| UnknownBackend(s.to_owned()))
	}
}

/// Returns the shared instance of the selected backend.
pub fn backend(kind: BackendKind) -> &'static dyn GenerationBackend {
	match kind {
		BackendKind::Runtime => &RuntimeBackend,
		BackendKind::Source => &SourceBackend,
	}
}

/// Runs analysis and rendering with `sink` deciding how far analysis goes.
fn generate_with<S: DiagnosticSink>(
	kind: BackendKind,
	context: &CompilationContext,
	interface: &InterfaceName,
	mut sink: S,
) -> (Option<(ImplementationId, String)>, Vec<Diagnostic>) {
	let generated = generate_into(context, interface, &mut sink);
	let diagnostics = sink.into_diagnostics();
	tracing::debug!(
		backend = %kind,
		interface = %interface,
		generated = generated.is_some(),
		diagnostics = diagnostics.len(),
		"Ran generation backend"
	);
	(generated, diagnostics)
}

fn generate_into<S: DiagnosticSink>(
	context: &CompilationContext,
	interface: &InterfaceName,
	sink: &mut S,
) -> Option<(ImplementationId, String)> {
	// Early exits report one terminal error; a halt has nothing left to stop.
	let Some(symbol) = context.resolve_interface(interface) else {
		let _ = sink.report(Diagnostic::error(
			DiagnosticCode::UNKNOWN_INTERFACE,
			format!("interface `{interface}` is not declared in this context"),
			SourceSpan::metadata("<context>"),
		));
		return None;
	};

	let spans = symbol.span_resolver();
	let item = match symbol.load() {
		Ok(item) => item,
		Err(e) => {
			let _ = sink.report(Diagnostic::error(
				DiagnosticCode::UNKNOWN_INTERFACE,
				format!("declaration of `{interface}` could not be read: {e}"),
				spans.whole(),
			));
			return None;
		}
	};

	let definition = declare::analyze(&item, interface, &spans, sink)?;
	let implementation = ImplementationId::for_interface(interface);
	let source = codegen::render(&definition, &implementation);
	Some((implementation, source))
}

#[cfg(test)]
mod tests;
