use super::{BackendKind, GeneratedArtifact, Generation, GenerationBackend, generate_with};
use crate::diagnostic::CollectAll;
use crate::{CompilationContext, InterfaceName};

/// Ahead-of-time generator: reports every violation and emits source
/// suitable for checking in.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceBackend;

impl GenerationBackend for SourceBackend {
	fn kind(&self) -> BackendKind {
		BackendKind::Source
	}

	fn generate(&self, context: &CompilationContext, interface: &InterfaceName) -> Generation {
		let (generated, diagnostics) = generate_with(self.kind(), context, interface, CollectAll::default());
		Generation {
			artifact: generated.map(|(implementation, body)| {
				let source = format!("// @generated by stubgen-engine for `{interface}`. Do not edit.\n{body}\n");
				GeneratedArtifact::new(interface.clone(), implementation, source)
			}),
			diagnostics,
		}
	}
}
