use pretty_assertions::assert_eq;

use super::*;

const USERS: &str = r#"
#[client]
pub trait UsersApi {
	#[get("/users/{id}")]
	fn get_user(&self, id: u64) -> DispatchResult;
}

pub mod admin {
	#[client(base = "/admin")]
	pub trait AuditApi {
		#[get("/log")]
		fn log(&self) -> DispatchResult;
	}

	pub trait NotAClient {
		fn ignored(&self);
	}
}
"#;

fn users_unit() -> SyntaxUnit {
	SyntaxUnit::declaration("fixtures/users.rs", USERS).unwrap()
}

#[test]
fn module_path_drops_resource_root() {
	assert_eq!(users_unit().module_path(), vec!["users".to_owned()]);
	let nested = SyntaxUnit::declaration("fixtures/billing/mod.rs", "").unwrap();
	assert_eq!(nested.module_path(), vec!["billing".to_owned()]);
}

#[test]
fn collects_client_traits_through_inline_modules() {
	let context = ContextBuilder::new(ContextKind::Diagnostics)
		.with_standard_libraries()
		.source(users_unit())
		.build()
		.unwrap();
	let names: Vec<_> = context.interfaces().map(|s| s.name().as_str().to_owned()).collect();
	assert_eq!(names, vec!["users::UsersApi", "users::admin::AuditApi"]);

	let audit = context.resolve_interface(&"users::admin::AuditApi".into()).unwrap();
	assert_eq!(audit.load().unwrap().ident, "AuditApi");
	assert_eq!(audit.origin(), &SymbolOrigin::Source);
}

#[test]
fn assembly_interfaces_resolve_as_metadata() {
	let context = ContextBuilder::new(ContextKind::Execution)
		.with_standard_libraries()
		.assembly(AssemblyRef::new("tests", [users_unit()]))
		.build()
		.unwrap();
	let symbol = context.resolve_interface(&"users::UsersApi".into()).unwrap();
	assert_eq!(
		symbol.origin(),
		&SymbolOrigin::Metadata {
			assembly: "tests".into()
		}
	);
}

#[test]
fn unparsable_source_is_rejected() {
	let err = SyntaxUnit::declaration("fixtures/broken.rs", "pub trait {").unwrap_err();
	assert!(matches!(err, ContextError::Parse { ref path, .. } if path == "fixtures/broken.rs"));
}

#[test]
fn duplicate_interfaces_are_rejected() {
	let err = ContextBuilder::new(ContextKind::Diagnostics)
		.source(users_unit())
		.source(users_unit())
		.build()
		.unwrap_err();
	assert!(matches!(err, ContextError::DuplicateInterface { .. }));
}

#[test]
fn duplicate_libraries_are_rejected() {
	let err = ContextBuilder::new(ContextKind::Execution)
		.with_standard_libraries()
		.library(LibraryRef::std_library())
		.build()
		.unwrap_err();
	assert_eq!(err, ContextError::DuplicateLibrary("std".into()));
}

#[test]
fn with_unit_leaves_base_untouched() {
	let base = ContextBuilder::new(ContextKind::Execution)
		.with_standard_libraries()
		.build()
		.unwrap();
	let extended = base.with_unit(users_unit()).unwrap();

	assert_eq!(base.units().count(), 0);
	assert!(base.resolve_interface(&"users::UsersApi".into()).is_none());
	assert_eq!(extended.units().count(), 1);
	assert!(extended.resolve_interface(&"users::UsersApi".into()).is_some());
	assert!(!base.ptr_eq(&extended));
}

#[test]
fn resolves_library_paths() {
	let context = ContextBuilder::new(ContextKind::Execution)
		.with_standard_libraries()
		.build()
		.unwrap();
	assert!(context.resolves_path(&["stubgen_contract", "Method", "Get"]));
	assert!(context.resolves_path(&["std", "sync", "Arc"]));
	assert!(!context.resolves_path(&["stubgen_contract", "Method", "Fetch"]));
	assert!(!context.resolves_path(&["tokio", "sync", "Mutex"]));
}
