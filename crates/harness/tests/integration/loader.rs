//! Execution path: generate, emit, load, instantiate, invoke.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rstest::rstest;
use stubgen_contract::{Binding, DispatchError, Method, Value};
use stubgen_engine::{BackendKind, DiagnosticCode, GeneratedArtifact, ImplementationId, InterfaceName, SyntaxUnit};
use stubgen_exec::{CallOutcome, InvokeError, ResolveError, emit};
use stubgen_harness::{CreateError, ImplementationLoader, MockDispatcher, contexts};

use crate::common::{ValueDispatcher, recording};

fn binding(name: &str, value: impl Into<Value>) -> Binding {
	Binding {
		name: name.to_owned(),
		value: value.into(),
	}
}

fn artifact(kind: BackendKind, interface: &str) -> GeneratedArtifact {
	let loader = ImplementationLoader::new(kind);
	stubgen_engine::backend(kind)
		.generate(loader.context(), &interface.into())
		.artifact
		.unwrap()
}

#[rstest]
fn parameterless_method_records_an_empty_request(#[values(BackendKind::Runtime, BackendKind::Source)] kind: BackendKind) {
	let (status, recorder) = recording(kind, "status::StatusApi");
	assert!(status.implements(&"status::StatusApi".into()));

	assert_eq!(status.invoke("ping", Vec::new()).unwrap(), CallOutcome::Unit);
	let request = recorder.take();
	assert_eq!(request.method(), Method::Get);
	assert_eq!(request.path(), "/status");
	assert!(request.path_params().is_empty());
	assert!(request.query_params().is_empty());
	assert!(request.headers().is_empty());
	assert_eq!(request.body_value(), None);
}

#[rstest]
fn get_user_round_trip(#[values(BackendKind::Runtime, BackendKind::Source)] kind: BackendKind) {
	let (users, recorder) = recording(kind, "users::UsersApi");

	users.invoke("get_user", vec![Value::Int(42)]).unwrap();
	let request = recorder.take();
	assert_eq!(request.method(), Method::Get);
	assert_eq!(request.path(), "/users/{id}");
	assert_eq!(request.path_params(), [binding("id", 42)]);
	assert_eq!(request.expanded_path(), "/users/42");
	assert_eq!(request.header_value("accept"), Some("application/json"));
	assert_eq!(recorder.call_count(), 1);
}

#[test]
fn roles_and_headers_are_replayed_in_order() {
	let (users, recorder) = recording(BackendKind::Runtime, "users::UsersApi");

	let user = serde_json::json!({ "name": "Ada", "email": "ada@example.com" });
	users.invoke("create_user", vec![Value::Json(user.clone())]).unwrap();
	let request = recorder.take();
	assert_eq!(request.method(), Method::Post);
	assert_eq!(
		request.headers(),
		[
			("Accept".to_owned(), "application/json".to_owned()),
			("X-Audit".to_owned(), "create".to_owned()),
		]
	);
	assert_eq!(request.body_value(), Some(&Value::Json(user)));

	users
		.invoke("end_session", vec![Value::Int(7), Value::Str("s-1".into())])
		.unwrap();
	let request = recorder.take();
	assert_eq!(request.method(), Method::Delete);
	assert_eq!(request.path_params(), [binding("user_id", 7), binding("session", "s-1")]);
	assert_eq!(request.expanded_path(), "/users/7/sessions/s-1");
}

#[test]
fn absent_optional_arguments_are_omitted() {
	let (users, recorder) = recording(BackendKind::Runtime, "users::UsersApi");

	users
		.invoke("search", vec![Value::Str("ada".into()), Value::Null, Value::Str("t-1".into())])
		.unwrap();
	let request = recorder.take();
	assert_eq!(request.query_params(), [binding("q", "ada")]);
	assert_eq!(request.header_value("X-Trace"), Some("t-1"));

	users
		.invoke("search", vec![Value::Str("ada".into()), Value::Int(2), Value::Null])
		.unwrap();
	let request = recorder.take();
	assert_eq!(request.query_params(), [binding("q", "ada"), binding("page", 2)]);
	assert_eq!(request.header_value("X-Trace"), None);
}

#[test]
fn nested_interfaces_load_by_full_identity() {
	let (invoices, recorder) = recording(BackendKind::Source, "nested::billing::v2::InvoicesApi");

	invoices
		.invoke("get_invoice", vec![Value::Str("inv-9".into()), Value::Bool(true)])
		.unwrap();
	let request = recorder.take();
	assert_eq!(request.expanded_path(), "/billing/v2/invoices/inv-9");
	assert_eq!(request.query_params(), [binding("expand", true)]);

	let patch = serde_json::json!({ "paid": true });
	invoices
		.invoke("update_invoice", vec![Value::Str("inv-9".into()), Value::Json(patch.clone())])
		.unwrap();
	let request = recorder.take();
	assert_eq!(request.method(), Method::Put);
	assert_eq!(request.body_value(), Some(&Value::Json(patch)));
}

#[test]
fn value_shaped_results_are_decoded() {
	let dispatcher = Arc::new(ValueDispatcher::new(serde_json::json!(12)));
	let users = ImplementationLoader::new(BackendKind::Runtime).create(&"users::UsersApi".into(), dispatcher.clone());

	let outcome = users.invoke("count", Vec::new()).unwrap();
	assert_eq!(outcome.clone().decode::<u64>().unwrap(), 12);
	assert_eq!(dispatcher.last().unwrap().path(), "/users/count");

	let wrong = Arc::new(ValueDispatcher::new(serde_json::json!("twelve")));
	let users = ImplementationLoader::new(BackendKind::Runtime).create(&"users::UsersApi".into(), wrong);
	assert!(matches!(
		users.invoke("count", Vec::new()),
		Err(InvokeError::Dispatch(DispatchError::Decode(_)))
	));
}

#[rstest]
fn optional_value_results_decode_null(#[values(BackendKind::Runtime, BackendKind::Source)] kind: BackendKind) {
	let dispatcher = Arc::new(ValueDispatcher::new(serde_json::Value::Null));
	let users = ImplementationLoader::new(kind).create(&"users::UsersApi".into(), dispatcher.clone());

	let outcome = users.invoke("oldest_age", Vec::new()).unwrap();
	assert_eq!(outcome.decode::<Option<u64>>().unwrap(), None);
	assert_eq!(dispatcher.last().unwrap().path(), "/users/oldest/age");

	let present = Arc::new(ValueDispatcher::new(serde_json::json!(97)));
	let users = ImplementationLoader::new(kind).create(&"users::UsersApi".into(), present);
	let outcome = users.invoke("oldest_age", Vec::new()).unwrap();
	assert_eq!(outcome.decode::<Option<u64>>().unwrap(), Some(97));
}

#[test]
fn optional_path_parameters_never_load() {
	let err = ImplementationLoader::new(BackendKind::Runtime)
		.try_create(&"invalid::OptionalPathApi".into(), MockDispatcher::strict())
		.unwrap_err();
	assert_eq!(err.code(), Some(DiagnosticCode::OPTIONAL_PATH_PARAMETER));
}

#[test]
fn dispatcher_failures_reach_the_caller() {
	let rejected = DispatchError::Rejected {
		status: 404,
		reason: "no such user".into(),
	};
	let (dispatcher, recorder) = MockDispatcher::returning(Err(rejected.clone()));
	let users = ImplementationLoader::new(BackendKind::Runtime).create(&"users::UsersApi".into(), dispatcher);

	match users.invoke("get_user", vec![Value::Int(1)]) {
		Err(InvokeError::Dispatch(error)) => assert_eq!(error, rejected),
		other => panic!("expected a dispatch error, got {other:?}"),
	}
	assert_eq!(recorder.call_count(), 1);
}

#[test]
fn bad_calls_are_rejected_before_dispatch() {
	let users = ImplementationLoader::new(BackendKind::Runtime).create(&"users::UsersApi".into(), MockDispatcher::strict());

	assert!(matches!(users.invoke("delete_user", Vec::new()), Err(InvokeError::UnknownMethod { .. })));
	assert!(matches!(
		users.invoke("get_user", Vec::new()),
		Err(InvokeError::Arity { expected: 1, found: 0, .. })
	));
	assert!(matches!(
		users.invoke("get_user", vec![Value::Str("seven".into())]),
		Err(InvokeError::ArgumentKind { expected: "int", .. })
	));
	assert!(matches!(
		users.invoke("get_user", vec![Value::Null]),
		Err(InvokeError::ArgumentKind { found: "null", .. })
	));
}

#[test]
#[should_panic(expected = "strict dispatcher")]
fn strict_mock_rejects_unconfigured_calls() {
	let users = ImplementationLoader::new(BackendKind::Runtime).create(&"users::UsersApi".into(), MockDispatcher::strict());
	let _ = users.invoke("get_user", vec![Value::Int(1)]);
}

#[test]
fn every_creation_loads_a_new_module() {
	let loader = ImplementationLoader::new(BackendKind::Runtime);
	let first = loader.create(&"status::StatusApi".into(), MockDispatcher::strict());
	let second = loader.create(&"status::StatusApi".into(), MockDispatcher::strict());
	assert_ne!(first.module(), second.module());
	assert_eq!(first.implementation(), second.implementation());
	assert!(stubgen_exec::loaded_modules().len() >= 2);
}

#[rstest]
fn missing_verb_is_a_typed_creation_error(#[values(BackendKind::Runtime, BackendKind::Source)] kind: BackendKind) {
	let err = ImplementationLoader::new(kind)
		.try_create(&"invalid::missing_verb::NoVerbApi".into(), MockDispatcher::strict())
		.unwrap_err();
	assert!(matches!(err, CreateError::Generation { .. }));
	assert_eq!(err.code(), Some(DiagnosticCode::MISSING_VERB));
	assert!(err.to_string().contains("SG0001"), "{err}");
}

#[test]
fn unknown_interfaces_fail_before_generation() {
	let err = ImplementationLoader::new(BackendKind::Runtime)
		.try_create(&"users::AccountsApi".into(), MockDispatcher::strict())
		.unwrap_err();
	assert!(matches!(err, CreateError::UnknownInterface(ref name) if name.as_str() == "users::AccountsApi"));
	assert_eq!(err.code(), None);
}

#[test]
#[should_panic(expected = "failed to create implementation of `invalid::ManyProblemsApi`")]
fn panicking_form_embeds_the_diagnostics() {
	let _ = stubgen_harness::create_implementation("invalid::ManyProblemsApi", MockDispatcher::strict());
}

#[test]
fn broken_generated_code_fails_emission() {
	let mut broken = artifact(BackendKind::Runtime, "status::StatusApi");
	broken.source = broken
		.source
		.replace(":: stubgen_contract :: Dispatcher", ":: stubgen_transport :: Dispatcher");

	let err = ImplementationLoader::new(BackendKind::Runtime)
		.try_load_artifact(&broken, MockDispatcher::strict())
		.unwrap_err();
	assert!(matches!(err, CreateError::Emit { .. }), "{err}");
	assert_eq!(err.code(), Some(emit::UNRESOLVED_PATH));
	assert!(err.diagnostics().iter().all(|d| d.code == emit::UNRESOLVED_PATH));
}

#[test]
fn unparsable_generated_code_is_a_context_error() {
	let mut broken = artifact(BackendKind::Runtime, "status::StatusApi");
	broken.source.push_str(" impl {");

	let err = ImplementationLoader::new(BackendKind::Runtime)
		.try_load_artifact(&broken, MockDispatcher::strict())
		.unwrap_err();
	assert!(matches!(err, CreateError::Context(_)), "{err}");
}

#[test]
fn two_types_claiming_one_interface_are_ambiguous() {
	let artifact = artifact(BackendKind::Runtime, "users::UsersApi");
	let duplicate_id = ImplementationId::new("UsersApiImplDuplicate");
	let duplicate = SyntaxUnit::generated(
		format!("generated/{duplicate_id}.rs"),
		artifact.source.replace(artifact.implementation.as_str(), duplicate_id.as_str()),
		artifact.interface.clone(),
		duplicate_id.clone(),
	)
	.unwrap();
	let context = contexts::execution().with_unit(duplicate).unwrap();

	let err = ImplementationLoader::new(BackendKind::Runtime)
		.with_context(context)
		.try_load_artifact(&artifact, MockDispatcher::strict())
		.unwrap_err();
	match err {
		CreateError::Resolve(ResolveError::Ambiguous { interface, candidates }) => {
			assert_eq!(interface, InterfaceName::new("users::UsersApi"));
			assert_eq!(candidates.len(), 2);
			assert!(candidates.contains(&duplicate_id));
		}
		other => panic!("expected ambiguity, got {other}"),
	}
}
