use stubgen_contract::DispatchResult;

#[client(base = "/status")]
pub trait StatusApi {
	#[get]
	fn ping(&self) -> DispatchResult;
}
