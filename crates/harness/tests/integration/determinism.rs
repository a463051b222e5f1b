//! Generation is a pure function of the declaration.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use stubgen_engine::{
	AssemblyRef, BackendKind, CompilationContext, ContextBuilder, ContextKind, InterfaceName, SyntaxUnit, backend,
};
use stubgen_harness::{ImplementationLoader, MockDispatcher, contexts};

#[test]
fn repeated_generation_is_identical() {
	for kind in BackendKind::ALL {
		for interface in ["users::UsersApi", "status::StatusApi", "nested::billing::v2::InvoicesApi"] {
			let interface = InterfaceName::new(interface);
			let first = backend(kind).generate(contexts::execution(), &interface);
			let second = backend(kind).generate(contexts::execution(), &interface);
			assert_eq!(first.artifact, second.artifact);
			assert_eq!(first.diagnostics, second.diagnostics);
		}
	}
}

#[test]
fn source_framing_wraps_the_same_body() {
	let interface = InterfaceName::new("users::UsersApi");
	let runtime = backend(BackendKind::Runtime).generate(contexts::execution(), &interface).artifact.unwrap();
	let source = backend(BackendKind::Source).generate(contexts::execution(), &interface).artifact.unwrap();
	assert_eq!(runtime.implementation, source.implementation);
	assert!(source.source.starts_with("// @generated"));
	assert!(source.source.contains(&runtime.source));
}

#[derive(Debug, Clone)]
struct MethodSpec {
	name: String,
	segments: Vec<String>,
	with_id: bool,
	returns_value: bool,
}

fn method_spec() -> impl Strategy<Value = MethodSpec> {
	(
		"[a-z]{1,8}",
		prop::collection::vec("[a-z]{1,6}", 1..4),
		any::<bool>(),
		any::<bool>(),
	)
		.prop_map(|(name, segments, with_id, returns_value)| MethodSpec {
			name,
			segments,
			with_id,
			returns_value,
		})
}

fn declaration(methods: &[MethodSpec]) -> String {
	let mut text = String::from("#[client(base = \"/prop\")]\npub trait PropApi {\n");
	for (index, method) in methods.iter().enumerate() {
		let mut path = format!("/{}", method.segments.join("/"));
		let mut params = String::new();
		if method.with_id {
			path.push_str("/{id}");
			params.push_str(", id: u64");
		}
		let output = if method.returns_value { "DispatchResult<String>" } else { "DispatchResult" };
		text.push_str(&format!(
			"\t#[get(\"{path}\")]\n\tfn m{index}_{}(&self{params}) -> {output};\n",
			method.name
		));
	}
	text.push_str("}\n");
	text
}

fn context(text: &str) -> CompilationContext {
	let unit = SyntaxUnit::declaration("props/prop.rs", text).unwrap();
	ContextBuilder::new(ContextKind::Execution)
		.with_standard_libraries()
		.assembly(AssemblyRef::new("props", [unit]))
		.build()
		.unwrap()
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(32))]

	#[test]
	fn generated_declarations_are_deterministic_and_loadable(
		methods in prop::collection::vec(method_spec(), 1..6),
		kind in prop_oneof![Just(BackendKind::Runtime), Just(BackendKind::Source)],
	) {
		let text = declaration(&methods);
		let interface = InterfaceName::new("prop::PropApi");

		let first = backend(kind).generate(&context(&text), &interface);
		let second = backend(kind).generate(&context(&text), &interface);
		prop_assert!(first.diagnostics.is_empty(), "{}", stubgen_engine::render_diagnostics(&first.diagnostics));
		prop_assert_eq!(&first.artifact, &second.artifact);

		let implementation = ImplementationLoader::new(kind)
			.with_context(context(&text))
			.try_create(&interface, MockDispatcher::strict());
		prop_assert!(implementation.is_ok(), "{:?}", implementation.err());
		let implementation = implementation.unwrap();
		prop_assert_eq!(implementation.methods().count(), methods.len());
	}
}
