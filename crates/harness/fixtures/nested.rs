pub mod billing {
	pub mod v2 {
		use stubgen_contract::DispatchResult;

		#[client(base = "/billing/v2")]
		pub trait InvoicesApi {
			#[get("/invoices/{invoice}")]
			fn get_invoice(&self, invoice: String, #[query] expand: bool) -> DispatchResult;

			#[put("/invoices/{invoice}")]
			fn update_invoice(&self, invoice: String, #[body] patch: serde_json::Value) -> DispatchResult;
		}

		/// Not a client; never resolvable as an interface.
		pub trait Plain {
			fn describe(&self) -> String;
		}
	}
}
