//! Client implementation generator for annotated contract traits.
//!
//! A contract is a trait marked `#[client]` whose methods carry verb, path,
//! header and parameter-role attributes. The engine resolves such a trait
//! inside a [`CompilationContext`], analyses its declaration and either
//! produces Rust source for an implementation that forwards every call to a
//! `stubgen_contract::Dispatcher`, or reports [`Diagnostic`]s.
//!
//! Two interchangeable [`GenerationBackend`]s exist:
//! * [`RuntimeBackend`]: stops at the first error and surfaces a single terminal diagnostic
//! * [`SourceBackend`]: reports every violation and emits annotated source text

pub mod backend;
mod codegen;
pub mod context;
pub mod declare;
pub mod diagnostic;
mod name;
pub mod types;

pub use backend::{
	BackendKind, GeneratedArtifact, Generation, GenerationBackend, RuntimeBackend, SourceBackend, UnknownBackend,
	backend,
};
pub use context::{
	AssemblyRef, CompilationContext, ContextBuilder, ContextError, ContextKind, InterfaceSymbol,
	LibraryRef, SymbolOrigin, SyntaxUnit, UnitOrigin,
};
pub use diagnostic::{
	Diagnostic, DiagnosticCode, Location, Severity, SourceSpan, SpanResolver, render_diagnostics,
};
pub use name::{ImplementationId, InterfaceName};
