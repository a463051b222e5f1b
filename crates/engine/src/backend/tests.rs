use pretty_assertions::assert_eq;

use super::*;
use crate::{ContextBuilder, ContextKind, SyntaxUnit};

const ORDERS: &str = r#"
#[client(base = "/orders")]
pub trait OrdersApi {
	#[get("/{id}")]
	fn get_order(&self, id: u64) -> DispatchResult;

	#[get("/{id}/lines")]
	fn lines(&self, id: u64, #[body] filter: Filter) -> DispatchResult<Vec<Line>>;
}

#[client]
pub trait BrokenApi {
	fn first(&self) -> DispatchResult;

	#[get("second")]
	fn second(&self) -> DispatchResult;
}
"#;

fn context() -> CompilationContext {
	ContextBuilder::new(ContextKind::Diagnostics)
		.with_standard_libraries()
		.source(SyntaxUnit::declaration("fixtures/orders.rs", ORDERS).unwrap())
		.build()
		.unwrap()
}

#[test]
fn backend_kind_parses_and_selects() {
	assert_eq!("Source".parse::<BackendKind>().unwrap(), BackendKind::Source);
	assert_eq!(" runtime ".parse::<BackendKind>().unwrap(), BackendKind::Runtime);
	assert!("jit".parse::<BackendKind>().is_err());
	for kind in BackendKind::ALL {
		assert_eq!(backend(kind).kind(), kind);
	}
}

#[test]
fn warnings_do_not_suppress_the_artifact() {
	let interface = InterfaceName::from("orders::OrdersApi");
	for kind in BackendKind::ALL {
		let generation = backend(kind).generate(&context(), &interface);
		let artifact = generation.artifact.as_ref().expect("artifact");
		assert_eq!(generation.codes(), vec![DiagnosticCode::BODY_ON_BODILESS_VERB]);
		assert_eq!(artifact.implementation, ImplementationId::for_interface(&interface));
		assert_eq!(artifact.file_name, format!("generated/{}.rs", artifact.implementation));
		syn::parse_file(&artifact.source).unwrap();
	}
}

#[test]
fn source_backend_frames_the_runtime_source() {
	let interface = InterfaceName::from("orders::OrdersApi");
	let runtime = RuntimeBackend.generate(&context(), &interface).artifact.unwrap();
	let source = SourceBackend.generate(&context(), &interface).artifact.unwrap();
	assert!(source.source.starts_with("// @generated"));
	assert!(source.source.contains(&runtime.source));
}

#[test]
fn policies_differ_on_broken_declarations() {
	let interface = InterfaceName::from("orders::BrokenApi");
	let collected = SourceBackend.generate(&context(), &interface);
	let first = RuntimeBackend.generate(&context(), &interface);
	assert!(!collected.succeeded());
	assert!(!first.succeeded());
	assert_eq!(collected.codes(), vec![DiagnosticCode::MISSING_VERB, DiagnosticCode::INVALID_PATH]);
	assert_eq!(first.codes(), vec![DiagnosticCode::MISSING_VERB]);
	assert_eq!(first.first_error_code(), Some(DiagnosticCode::MISSING_VERB));
}

#[test]
fn unknown_interface_is_reported() {
	let generation = RuntimeBackend.generate(&context(), &"orders::Missing".into());
	assert!(generation.artifact.is_none());
	assert_eq!(generation.first_error_code(), Some(DiagnosticCode::UNKNOWN_INTERFACE));
}

#[test]
fn generation_is_deterministic() {
	let interface = InterfaceName::from("orders::OrdersApi");
	for kind in BackendKind::ALL {
		let a = backend(kind).generate(&context(), &interface).artifact;
		let b = backend(kind).generate(&context(), &interface).artifact;
		assert_eq!(a, b);
	}
}
