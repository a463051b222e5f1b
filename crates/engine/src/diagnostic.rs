//! Structured diagnostics for malformed declarations and generated code.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use proc_macro2::Span;

/// Stable diagnostic code such as `SG0001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiagnosticCode(&'static str);

impl DiagnosticCode {
	/// The interface identity does not resolve in the context.
	pub const UNKNOWN_INTERFACE: Self = Self("SG0000");
	/// A method carries no verb attribute.
	pub const MISSING_VERB: Self = Self("SG0001");
	/// A method carries several verb attributes.
	pub const MULTIPLE_VERBS: Self = Self("SG0002");
	/// A path template is malformed.
	pub const INVALID_PATH: Self = Self("SG0003");
	/// A path placeholder is bound by no parameter.
	pub const UNBOUND_PLACEHOLDER: Self = Self("SG0004");
	/// A `#[path]` parameter names no placeholder.
	pub const STRAY_PATH_PARAMETER: Self = Self("SG0005");
	/// More than one `#[body]` parameter.
	pub const MULTIPLE_BODIES: Self = Self("SG0006");
	/// Generic methods cannot be generated.
	pub const GENERIC_METHOD: Self = Self("SG0007");
	/// A method lacks a `&self` receiver.
	pub const MISSING_RECEIVER: Self = Self("SG0008");
	/// The return type is neither the void nor the value dispatch shape.
	pub const UNSUPPORTED_RETURN: Self = Self("SG0009");
	/// A client trait declares something other than methods.
	pub const UNSUPPORTED_ITEM: Self = Self("SG0010");
	/// A body is bound on a verb that carries none.
	pub const BODY_ON_BODILESS_VERB: Self = Self("SG0011");
	/// A static header is not written as `Name: value`.
	pub const INVALID_HEADER: Self = Self("SG0012");
	/// A parameter is not bound to a plain identifier.
	pub const UNSUPPORTED_PATTERN: Self = Self("SG0013");
	/// Attribute arguments could not be parsed.
	pub const MALFORMED_ATTRIBUTE: Self = Self("SG0014");
	/// A path placeholder is bound to an `Option<_>` parameter.
	pub const OPTIONAL_PATH_PARAMETER: Self = Self("SG0015");

	/// Declares a code outside the declaration rule set, e.g. for emission errors.
	pub const fn new(code: &'static str) -> Self {
		Self(code)
	}

	/// The code as written in messages and expectations.
	pub const fn as_str(self) -> &'static str {
		self.0
	}
}

impl fmt::Display for DiagnosticCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.0)
	}
}

impl PartialEq<&str> for DiagnosticCode {
	fn eq(&self, other: &&str) -> bool {
		self.0 == *other
	}
}

/// Diagnostic severity. Only errors prevent generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
	Error,
	Warning,
}

impl Severity {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Error => "error",
			Self::Warning => "warning",
		}
	}
}

/// 1-based line, 0-based character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LineColumn {
	pub line: usize,
	pub column: usize,
}

/// Where a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
	/// A range inside source text that is part of the context.
	Source { start: LineColumn, end: LineColumn },
	/// A declaration only known through a compiled reference; no text is available.
	Metadata,
}

/// Source range of a diagnostic together with the highlighted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
	/// Source file, or reference name for metadata locations.
	pub file: Arc<str>,
	pub location: Location,
	/// Highlighted source text; empty for metadata locations.
	pub text: String,
}

impl SourceSpan {
	/// Metadata-only location inside the named reference.
	pub fn metadata(file: impl Into<Arc<str>>) -> Self {
		Self {
			file: file.into(),
			location: Location::Metadata,
			text: String::new(),
		}
	}

	/// Start position, if the span points into source text.
	pub fn start(&self) -> Option<LineColumn> {
		match self.location {
			Location::Source { start, .. } => Some(start),
			Location::Metadata => None,
		}
	}
}

impl fmt::Display for SourceSpan {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.location {
			Location::Source { start, .. } => write!(f, "{}:{}:{}", self.file, start.line, start.column + 1),
			Location::Metadata => write!(f, "{} (metadata)", self.file),
		}
	}
}

/// One declaration or emission violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	pub code: DiagnosticCode,
	pub severity: Severity,
	pub message: String,
	pub span: SourceSpan,
}

impl Diagnostic {
	pub fn error(code: DiagnosticCode, message: impl Into<String>, span: SourceSpan) -> Self {
		Self {
			code,
			severity: Severity::Error,
			message: message.into(),
			span,
		}
	}

	pub fn warning(code: DiagnosticCode, message: impl Into<String>, span: SourceSpan) -> Self {
		Self {
			code,
			severity: Severity::Warning,
			message: message.into(),
			span,
		}
	}

	pub fn is_error(&self) -> bool {
		self.severity == Severity::Error
	}
}

impl fmt::Display for Diagnostic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}[{}]: {}", self.span, self.severity.as_str(), self.code, self.message)?;
		if !self.span.text.is_empty() {
			write!(f, " (`{}`)", self.span.text)?;
		}
		Ok(())
	}
}

/// Renders diagnostics one per line, in report order.
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
	if diagnostics.is_empty() {
		return "<no diagnostics>".to_owned();
	}
	diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

/// Converts token spans into [`SourceSpan`]s for one piece of text.
///
/// Spans must come from a `syn` parse of exactly `text`.
#[derive(Debug, Clone)]
pub struct SpanResolver<'a> {
	file: Arc<str>,
	text: Option<&'a str>,
}

impl<'a> SpanResolver<'a> {
	/// Resolves spans to real positions inside `text`.
	pub fn source(file: impl Into<Arc<str>>, text: &'a str) -> Self {
		Self {
			file: file.into(),
			text: Some(text),
		}
	}

	/// Resolves every span to a metadata-only location in `reference`.
	pub fn metadata(reference: impl Into<Arc<str>>) -> Self {
		Self {
			file: reference.into(),
			text: None,
		}
	}

	/// Span covering nothing in particular, used when no token is responsible.
	pub fn whole(&self) -> SourceSpan {
		match self.text {
			Some(_) => SourceSpan {
				file: self.file.clone(),
				location: Location::Source {
					start: LineColumn { line: 1, column: 0 },
					end: LineColumn { line: 1, column: 0 },
				},
				text: String::new(),
			},
			None => SourceSpan::metadata(self.file.clone()),
		}
	}

	pub fn resolve(&self, span: Span) -> SourceSpan {
		let Some(text) = self.text else {
			return SourceSpan::metadata(self.file.clone());
		};
		let start = span.start();
		let end = span.end();
		let start = LineColumn {
			line: start.line,
			column: start.column,
		};
		let end = LineColumn {
			line: end.line,
			column: end.column,
		};
		let highlighted = match (byte_offset(text, start), byte_offset(text, end)) {
			(Some(from), Some(to)) if from <= to => text[from..to].to_owned(),
			_ => String::new(),
		};
		SourceSpan {
			file: self.file.clone(),
			location: Location::Source { start, end },
			text: highlighted,
		}
	}
}

fn byte_offset(text: &str, position: LineColumn) -> Option<usize> {
	let line_start = if position.line <= 1 {
		0
	} else {
		text.match_indices('\n').nth(position.line - 2).map(|(idx, _)| idx + 1)?
	};
	let line = &text[line_start..];
	let within = line
		.char_indices()
		.map(|(idx, _)| idx)
		.chain(std::iter::once(line.len()))
		.nth(position.column)?;
	Some(line_start + within)
}

/// Marker returned when a sink refuses further diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halt;

/// Receives diagnostics as analysis proceeds and decides whether it continues.
pub trait DiagnosticSink {
	fn report(&mut self, diagnostic: Diagnostic) -> ControlFlow<Halt>;

	fn into_diagnostics(self) -> Vec<Diagnostic>
	where
		Self: Sized;
}

/// Accepts every diagnostic.
#[derive(Debug, Default)]
pub struct CollectAll(Vec<Diagnostic>);

impl DiagnosticSink for CollectAll {
	fn report(&mut self, diagnostic: Diagnostic) -> ControlFlow<Halt> {
		self.0.push(diagnostic);
		ControlFlow::Continue(())
	}

	fn into_diagnostics(self) -> Vec<Diagnostic> {
		self.0
	}
}

/// Accepts warnings and stops at the first error.
#[derive(Debug, Default)]
pub struct FirstError(Vec<Diagnostic>);

impl DiagnosticSink for FirstError {
	fn report(&mut self, diagnostic: Diagnostic) -> ControlFlow<Halt> {
		let is_error = diagnostic.is_error();
		self.0.push(diagnostic);
		if is_error { ControlFlow::Break(Halt) } else { ControlFlow::Continue(()) }
	}

	fn into_diagnostics(self) -> Vec<Diagnostic> {
		self.0
	}
}
