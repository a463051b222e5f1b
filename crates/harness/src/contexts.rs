//! Process-wide compilation contexts built from the embedded fixtures.
//!
//! Both contexts are built once, on first use, and shared read-only by every
//! test afterwards. A build failure means the fixtures themselves are broken,
//! so it panics.

use std::sync::LazyLock;

use stubgen_engine::{AssemblyRef, CompilationContext, ContextBuilder, ContextError, ContextKind, SyntaxUnit};

use crate::resources::{SOURCE_SUFFIX, discover};

/// Name of the assembly reference standing for the compiled test crate.
pub const TEST_ASSEMBLY: &str = "stubgen_harness";

static EXECUTION: LazyLock<CompilationContext> =
	LazyLock::new(|| build_execution().unwrap_or_else(|e| panic!("failed to build execution context: {e}")));

static DIAGNOSTICS: LazyLock<CompilationContext> =
	LazyLock::new(|| build_diagnostics().unwrap_or_else(|e| panic!("failed to build diagnostics context: {e}")));

/// Context generated implementations are emitted from. Fixture interfaces are
/// visible through the test assembly only, as metadata.
pub fn execution() -> &'static CompilationContext {
	&EXECUTION
}

/// Context diagnostics are computed in. Fixture interfaces are source units
/// with real spans.
pub fn diagnostics() -> &'static CompilationContext {
	&DIAGNOSTICS
}

fn fixture_units() -> Result<Vec<SyntaxUnit>, ContextError> {
	discover(SOURCE_SUFFIX)
		.map(|resource| SyntaxUnit::declaration(resource.name, resource.text))
		.collect()
}

fn build_execution() -> Result<CompilationContext, ContextError> {
	ContextBuilder::new(ContextKind::Execution)
		.with_standard_libraries()
		.assembly(AssemblyRef::new(TEST_ASSEMBLY, fixture_units()?))
		.build()
}

fn build_diagnostics() -> Result<CompilationContext, ContextError> {
	ContextBuilder::new(ContextKind::Diagnostics)
		.with_standard_libraries()
		.sources(fixture_units()?)
		.build()
}

#[cfg(test)]
mod tests {
	use stubgen_engine::{InterfaceName, SymbolOrigin};

	use super::*;

	#[test]
	fn contexts_are_built_once() {
		assert!(execution().ptr_eq(execution()));
		assert!(diagnostics().ptr_eq(diagnostics()));
		assert_eq!(execution().kind(), ContextKind::Execution);
		assert_eq!(diagnostics().kind(), ContextKind::Diagnostics);
	}

	#[test]
	fn both_views_expose_the_same_interfaces() {
		let names = |context: &CompilationContext| context.interfaces().map(|s| s.name().clone()).collect::<Vec<_>>();
		assert_eq!(names(execution()), names(diagnostics()));

		let users = InterfaceName::new("users::UsersApi");
		assert!(matches!(
			execution().resolve_interface(&users).unwrap().origin(),
			SymbolOrigin::Metadata { .. }
		));
		assert_eq!(diagnostics().resolve_interface(&users).unwrap().origin(), &SymbolOrigin::Source);
	}

	#[test]
	fn inline_modules_extend_the_identity() {
		let nested = InterfaceName::new("nested::billing::v2::InvoicesApi");
		assert!(execution().resolve_interface(&nested).is_some());
		assert!(execution().resolve_interface(&"nested::billing::v2::Plain".into()).is_none());
	}
}
