//! Checks that declarations produce the diagnostics a test expects.

use std::fmt;

use stubgen_engine::{
	BackendKind, CompilationContext, Diagnostic, GenerationBackend, InterfaceName, backend, render_diagnostics,
};
use thiserror::Error;

use crate::loader::{CreateError, ImplementationLoader};
use crate::mock::MockDispatcher;
use crate::{config, contexts};

/// A diagnostic a test expects, by code. The highlighted text is shown in
/// failure messages only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedDiagnostic {
	pub code: String,
	pub text: Option<String>,
}

impl ExpectedDiagnostic {
	pub fn new(code: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			text: None,
		}
	}

	#[must_use]
	pub fn highlighting(mut self, text: impl Into<String>) -> Self {
		self.text = Some(text.into());
		self
	}
}

impl fmt::Display for ExpectedDiagnostic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.code)?;
		if let Some(text) = &self.text {
			write!(f, " (`{text}`)")?;
		}
		Ok(())
	}
}

#[derive(Debug, Error)]
pub enum VerifyError {
	#[error("expected `{interface}` to load cleanly, but it did not:\n{source}")]
	Creation {
		interface: InterfaceName,
		#[source]
		source: CreateError,
	},
	#[error("no diagnostic with code {expected_code} reported for `{interface}`\nexpected:\n{expected}\nactual:\n{actual}")]
	Mismatch {
		interface: InterfaceName,
		expected_code: String,
		expected: String,
		actual: String,
	},
}

/// Returns true if `actual` satisfies `expected`.
///
/// Only the first expected code is looked for, and any actual diagnostic
/// carrying it is a match. With nothing expected, no errors may be present.
pub fn match_diagnostics(actual: &[Diagnostic], expected: &[ExpectedDiagnostic]) -> bool {
	match expected.first() {
		None => actual.iter().all(|d| !d.is_error()),
		Some(first) => actual.iter().any(|d| d.code == first.code.as_str()),
	}
}

pub struct DiagnosticVerifier {
	backend: &'static dyn GenerationBackend,
	loader: ImplementationLoader,
	context: CompilationContext,
}

impl DiagnosticVerifier {
	pub fn new(kind: BackendKind) -> Self {
		Self {
			backend: backend(kind),
			loader: ImplementationLoader::new(kind),
			context: contexts::diagnostics().clone(),
		}
	}

	pub fn configured() -> Self {
		Self::new(config::global().backend)
	}

	/// Checks `interface` against `expected`.
	///
	/// Nothing expected means the implementation loader must succeed.
	/// Otherwise generation in the diagnostics context must report the first
	/// expected code.
	pub fn check(&self, interface: &InterfaceName, expected: &[ExpectedDiagnostic]) -> Result<(), VerifyError> {
		if expected.is_empty() {
			return self
				.loader
				.try_create(interface, MockDispatcher::strict())
				.map(drop)
				.map_err(|source| VerifyError::Creation {
					interface: interface.clone(),
					source,
				});
		}

		let generation = self.backend.generate(&self.context, interface);
		if match_diagnostics(&generation.diagnostics, expected) {
			return Ok(());
		}
		Err(VerifyError::Mismatch {
			interface: interface.clone(),
			expected_code: expected[0].code.clone(),
			expected: expected.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"),
			actual: render_diagnostics(&generation.diagnostics),
		})
	}

	/// Panicking form of [`Self::check`].
	pub fn verify(&self, interface: &InterfaceName, expected: &[ExpectedDiagnostic]) {
		if let Err(e) = self.check(interface, expected) {
			panic!("{e}");
		}
	}
}

/// Verifies `interface` with the configured backend; panics on mismatch.
pub fn verify_diagnostics(interface: impl Into<InterfaceName>, expected: &[ExpectedDiagnostic]) {
	DiagnosticVerifier::configured().verify(&interface.into(), expected);
}
