//! Diagnostics path: declaration rules and the verifier's matching policy.

use pretty_assertions::assert_eq;
use rstest::rstest;
use stubgen_engine::{BackendKind, DiagnosticCode, GenerationBackend, Location, Severity, SourceBackend};
use stubgen_harness::{DiagnosticVerifier, ExpectedDiagnostic, VerifyError, contexts};

fn expect(codes: &[&str]) -> Vec<ExpectedDiagnostic> {
	codes.iter().copied().map(ExpectedDiagnostic::new).collect()
}

#[test]
fn missing_verb_is_reported_at_the_method() {
	let generation = SourceBackend.generate(contexts::diagnostics(), &"invalid::missing_verb::NoVerbApi".into());
	assert!(generation.artifact.is_none());
	assert_eq!(generation.diagnostics.len(), 1);

	let diagnostic = &generation.diagnostics[0];
	assert_eq!(diagnostic.code, DiagnosticCode::MISSING_VERB);
	assert_eq!(diagnostic.severity, Severity::Error);
	assert_eq!(&*diagnostic.span.file, "fixtures/invalid.rs");
	assert_eq!(diagnostic.span.text, "list_items");
	assert!(matches!(diagnostic.span.location, Location::Source { .. }));
	assert_eq!(diagnostic.span.start().map(|s| s.line), Some(10));
}

#[rstest]
#[case("invalid::missing_verb::NoVerbApi", "SG0001", "list_items")]
#[case("invalid::MultipleVerbsApi", "SG0002", "post")]
#[case("invalid::UnboundPlaceholderApi", "SG0004", "\"/items/{item}\"")]
#[case("invalid::StrayPathParamApi", "SG0005", "page")]
#[case("invalid::NoReceiverApi", "SG0008", "list")]
#[case("invalid::WrongReturnApi", "SG0009", "list")]
#[case("invalid::AssociatedConstApi", "SG0010", "LIMIT")]
#[case("invalid::BodyOnGetApi", "SG0011", "filter")]
#[case("invalid::BadHeaderApi", "SG0012", "\"Accept\"")]
#[case("invalid::OptionalPathApi", "SG0015", "id")]
fn declaration_rules_hold_on_both_backends(
	#[values(BackendKind::Runtime, BackendKind::Source)] kind: BackendKind,
	#[case] interface: &str,
	#[case] code: &str,
	#[case] text: &str,
) {
	stubgen_harness::init_logging();
	let expected = [ExpectedDiagnostic::new(code).highlighting(text)];
	DiagnosticVerifier::new(kind).verify(&interface.into(), &expected);
}

#[rstest]
#[case("status::StatusApi")]
#[case("users::UsersApi")]
#[case("nested::billing::v2::InvoicesApi")]
#[case("invalid::BodyOnGetApi")]
fn well_formed_interfaces_verify_clean(
	#[values(BackendKind::Runtime, BackendKind::Source)] kind: BackendKind,
	#[case] interface: &str,
) {
	DiagnosticVerifier::new(kind).verify(&interface.into(), &[]);
}

#[rstest]
fn broken_interface_fails_clean_verification(#[values(BackendKind::Runtime, BackendKind::Source)] kind: BackendKind) {
	let err = DiagnosticVerifier::new(kind)
		.check(&"invalid::missing_verb::NoVerbApi".into(), &[])
		.unwrap_err();
	assert!(matches!(err, VerifyError::Creation { .. }));
	assert!(err.to_string().contains("SG0001"), "{err}");
}

#[test]
fn only_the_full_backend_reports_every_problem() {
	let interface = "invalid::ManyProblemsApi".into();
	let codes = |kind: BackendKind| {
		stubgen_engine::backend(kind)
			.generate(contexts::diagnostics(), &interface)
			.codes()
			.into_iter()
			.map(DiagnosticCode::as_str)
			.collect::<Vec<_>>()
	};
	assert_eq!(codes(BackendKind::Source), ["SG0001", "SG0003", "SG0006", "SG0007"]);
	assert_eq!(codes(BackendKind::Runtime), ["SG0001"]);
}

#[rstest]
fn matching_looks_at_the_first_expected_code(#[values(BackendKind::Runtime, BackendKind::Source)] kind: BackendKind) {
	let verifier = DiagnosticVerifier::new(kind);
	let interface = "invalid::ManyProblemsApi".into();

	verifier.verify(&interface, &expect(&["SG0001", "SG0003", "SG0006"]));
	verifier.verify(&interface, &expect(&["SG0001", "SG0099"]));

	let surfaced_later = verifier.check(&interface, &expect(&["SG0003", "SG0001"]));
	match kind {
		BackendKind::Source => assert!(surfaced_later.is_ok()),
		BackendKind::Runtime => assert!(matches!(
			surfaced_later,
			Err(VerifyError::Mismatch { ref expected_code, .. }) if expected_code == "SG0003"
		)),
	}
}

#[test]
fn mismatch_message_names_both_sets() {
	let expected = [ExpectedDiagnostic::new("SG0009").highlighting("list_items")];
	let err = DiagnosticVerifier::new(BackendKind::Source)
		.check(&"invalid::missing_verb::NoVerbApi".into(), &expected)
		.unwrap_err();
	let message = err.to_string();
	assert!(message.contains("SG0009 (`list_items`)"), "{message}");
	assert!(message.contains("error[SG0001]"), "{message}");
}

#[test]
#[should_panic(expected = "no diagnostic with code SG0002")]
fn verify_panics_on_mismatch() {
	stubgen_harness::verify_diagnostics("invalid::missing_verb::NoVerbApi", &expect(&["SG0002"]));
}
