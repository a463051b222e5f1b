//! The implementation loader: generation, emission, loading and
//! instantiation of a generated client in one step.

use std::sync::Arc;

use stubgen_contract::Dispatcher;
use stubgen_engine::{
	BackendKind, CompilationContext, ContextError, Diagnostic, DiagnosticCode, GeneratedArtifact, GenerationBackend,
	InterfaceName, SyntaxUnit, backend, render_diagnostics,
};
use stubgen_exec::{ImageError, LoadError, LoadedImplementation, ResolveError};
use thiserror::Error;

use crate::{config, contexts};

#[derive(Debug, Error)]
pub enum CreateError {
	#[error("interface `{0}` is not declared in the execution context")]
	UnknownInterface(InterfaceName),
	#[error("generation of `{interface}` failed:\n{}", render_diagnostics(.diagnostics))]
	Generation {
		interface: InterfaceName,
		diagnostics: Vec<Diagnostic>,
	},
	#[error(transparent)]
	Context(#[from] ContextError),
	#[error("emission of `{interface}` failed:\n{}", render_diagnostics(.diagnostics))]
	Emit {
		interface: InterfaceName,
		diagnostics: Vec<Diagnostic>,
	},
	#[error("failed to serialise image: {0}")]
	Image(#[from] ImageError),
	#[error(transparent)]
	Load(#[from] LoadError),
	#[error(transparent)]
	Resolve(#[from] ResolveError),
}

impl CreateError {
	/// Diagnostics attached to a generation or emission failure.
	pub fn diagnostics(&self) -> &[Diagnostic] {
		match self {
			Self::Generation { diagnostics, .. } | Self::Emit { diagnostics, .. } => diagnostics,
			_ => &[],
		}
	}

	/// Code of the first error diagnostic, if any.
	pub fn code(&self) -> Option<DiagnosticCode> {
		self.diagnostics().iter().find(|d| d.is_error()).map(|d| d.code)
	}
}

/// Turns an interface identity into a live implementation.
///
/// Every successful creation loads a new module into the process; nothing is
/// cached between calls.
#[derive(Clone)]
pub struct ImplementationLoader {
	backend: &'static dyn GenerationBackend,
	context: CompilationContext,
}

impl std::fmt::Debug for ImplementationLoader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ImplementationLoader")
			.field("backend", &self.backend.kind())
			.field("context", &self.context.kind())
			.finish()
	}
}

impl ImplementationLoader {
	/// Loader over the shared execution context.
	pub fn new(kind: BackendKind) -> Self {
		Self {
			backend: backend(kind),
			context: contexts::execution().clone(),
		}
	}

	/// Loader using the configured backend.
	pub fn configured() -> Self {
		Self::new(config::global().backend)
	}

	/// Replaces the execution context, e.g. with one extended by extra units.
	#[must_use]
	pub fn with_context(mut self, context: CompilationContext) -> Self {
		self.context = context;
		self
	}

	pub fn backend(&self) -> BackendKind {
		self.backend.kind()
	}

	pub fn context(&self) -> &CompilationContext {
		&self.context
	}

	pub fn try_create(
		&self,
		interface: &InterfaceName,
		dispatcher: Arc<dyn Dispatcher>,
	) -> Result<LoadedImplementation, CreateError> {
		if self.context.resolve_interface(interface).is_none() {
			return Err(CreateError::UnknownInterface(interface.clone()));
		}

		let generation = self.backend.generate(&self.context, interface);
		let Some(artifact) = generation.artifact else {
			return Err(CreateError::Generation {
				interface: interface.clone(),
				diagnostics: generation.diagnostics,
			});
		};
		self.try_load_artifact(&artifact, dispatcher)
	}

	/// Emits, loads and instantiates an already generated artifact.
	pub fn try_load_artifact(
		&self,
		artifact: &GeneratedArtifact,
		dispatcher: Arc<dyn Dispatcher>,
	) -> Result<LoadedImplementation, CreateError> {
		let unit = SyntaxUnit::generated(
			artifact.file_name.as_str(),
			artifact.source.as_str(),
			artifact.interface.clone(),
			artifact.implementation.clone(),
		)?;
		let merged = self.context.with_unit(unit)?;

		let image = stubgen_exec::emit(&merged).map_err(|e| CreateError::Emit {
			interface: artifact.interface.clone(),
			diagnostics: e.diagnostics,
		})?;
		let module = stubgen_exec::load(&image.to_bytes()?)?;
		let handle = module.resolve(&artifact.implementation, &artifact.interface)?;

		tracing::debug!(
			interface = %artifact.interface,
			implementation = %artifact.implementation,
			module = %module.id(),
			backend = %self.backend.kind(),
			"Created implementation"
		);
		Ok(handle.instantiate(dispatcher))
	}

	/// Like [`Self::try_create`], but panics with the full diagnostics text.
	pub fn create(&self, interface: &InterfaceName, dispatcher: Arc<dyn Dispatcher>) -> LoadedImplementation {
		self.try_create(interface, dispatcher)
			.unwrap_or_else(|e| panic!("failed to create implementation of `{interface}`:\n{e}"))
	}
}

/// Creates an implementation of `interface` with the configured backend.
///
/// # Panics
///
/// Panics if generation, emission, loading or resolution fails.
pub fn create_implementation(
	interface: impl Into<InterfaceName>,
	dispatcher: Arc<dyn Dispatcher>,
) -> LoadedImplementation {
	ImplementationLoader::configured().create(&interface.into(), dispatcher)
}

/// Fallible form of [`create_implementation`].
pub fn try_create_implementation(
	interface: impl Into<InterfaceName>,
	dispatcher: Arc<dyn Dispatcher>,
) -> Result<LoadedImplementation, CreateError> {
	ImplementationLoader::configured().try_create(&interface.into(), dispatcher)
}
