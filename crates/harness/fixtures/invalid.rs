//! Declarations that violate one or more client rules.

use stubgen_contract::DispatchResult;

pub mod missing_verb {
	use stubgen_contract::DispatchResult;

	#[client]
	pub trait NoVerbApi {
		fn list_items(&self) -> DispatchResult;
	}
}

#[client]
pub trait UnboundPlaceholderApi {
	#[get("/items/{item}")]
	fn get_item(&self, id: u64) -> DispatchResult;
}

#[client]
pub trait ManyProblemsApi {
	fn no_verb(&self) -> DispatchResult;

	#[get("items")]
	fn relative_path(&self) -> DispatchResult;

	#[post("/items")]
	fn two_bodies(&self, #[body] first: Item, #[body] second: Item) -> DispatchResult;

	#[get("/items")]
	fn generic<T>(&self) -> DispatchResult;
}

#[client]
pub trait WrongReturnApi {
	#[get("/items")]
	fn list(&self) -> Vec<Item>;
}

#[client]
pub trait NoReceiverApi {
	#[get("/items")]
	fn list() -> DispatchResult;
}

#[client]
pub trait BodyOnGetApi {
	#[get("/items/search")]
	fn search(&self, #[body] filter: Filter) -> DispatchResult;
}

#[client]
pub trait BadHeaderApi {
	#[get("/items")]
	#[headers("Accept")]
	fn list(&self) -> DispatchResult;
}

#[client]
pub trait MultipleVerbsApi {
	#[get("/items")]
	#[post("/items")]
	fn list(&self) -> DispatchResult;
}

#[client]
pub trait StrayPathParamApi {
	#[get("/items")]
	fn list(&self, #[path] page: u32) -> DispatchResult;
}

#[client]
pub trait AssociatedConstApi {
	const LIMIT: u32;

	#[get("/items")]
	fn list(&self) -> DispatchResult;
}

#[client]
pub trait OptionalPathApi {
	#[get("/items/{id}")]
	fn get_item(&self, id: Option<u64>) -> DispatchResult;
}
