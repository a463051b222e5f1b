use super::{BackendKind, GeneratedArtifact, Generation, GenerationBackend, generate_with};
use crate::diagnostic::FirstError;
use crate::{CompilationContext, InterfaceName};

/// Generates implementations meant to be loaded straight into the process.
///
/// Analysis stops at the first error, so a failed generation carries exactly
/// one terminal error diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeBackend;

impl GenerationBackend for RuntimeBackend {
	fn kind(&self) -> BackendKind {
		BackendKind::Runtime
	}

	fn generate(&self, context: &CompilationContext, interface: &InterfaceName) -> Generation {
		let (generated, diagnostics) = generate_with(self.kind(), context, interface, FirstError::default());
		Generation {
			artifact: generated
				.map(|(implementation, source)| GeneratedArtifact::new(interface.clone(), implementation, source)),
			diagnostics,
		}
	}
}
