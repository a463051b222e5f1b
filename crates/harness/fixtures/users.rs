use serde::{Deserialize, Serialize};
use stubgen_contract::DispatchResult;

#[derive(Debug, Serialize, Deserialize)]
pub struct NewUser {
	pub name: String,
	pub email: String,
}

#[client]
#[headers("Accept: application/json")]
pub trait UsersApi {
	#[get("/users/{id}")]
	fn get_user(&self, id: u64) -> DispatchResult;

	#[post("/users")]
	#[headers("X-Audit: create")]
	fn create_user(&self, #[body] user: NewUser) -> DispatchResult;

	#[get("/users")]
	fn search(
		&self,
		q: String,
		#[query("page")] page_number: Option<u32>,
		#[header("X-Trace")] trace: Option<String>,
	) -> DispatchResult;

	#[delete("/users/{user_id}/sessions/{session}")]
	fn end_session(&self, #[path("user_id")] user: u64, session: String) -> DispatchResult;

	#[get("/users/count")]
	fn count(&self) -> DispatchResult<u64>;

	#[get("/users/oldest/age")]
	fn oldest_age(&self) -> DispatchResult<Option<u64>>;
}
