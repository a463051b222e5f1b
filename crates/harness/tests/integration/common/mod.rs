//! Shared helpers for harness integration tests.

use parking_lot::Mutex;
use stubgen_contract::{DispatchResult, Dispatcher, RequestDescription};
use stubgen_engine::BackendKind;
use stubgen_exec::LoadedImplementation;
use stubgen_harness::{ImplementationLoader, MockDispatcher};

pub use stubgen_harness::CallRecorder;

/// Loads `interface` with `kind` and a recording mock.
pub fn recording(kind: BackendKind, interface: &str) -> (LoadedImplementation, CallRecorder) {
	stubgen_harness::init_logging();
	let (dispatcher, recorder) = MockDispatcher::recording();
	let implementation = ImplementationLoader::new(kind).create(&interface.into(), dispatcher);
	(implementation, recorder)
}

/// Answers value-shaped calls with a fixed JSON value and keeps the last request.
#[derive(Debug)]
pub struct ValueDispatcher {
	value: serde_json::Value,
	last: Mutex<Option<RequestDescription>>,
}

impl ValueDispatcher {
	pub fn new(value: serde_json::Value) -> Self {
		Self {
			value,
			last: Mutex::new(None),
		}
	}

	pub fn last(&self) -> Option<RequestDescription> {
		self.last.lock().clone()
	}
}

impl Dispatcher for ValueDispatcher {
	fn send(&self, request: RequestDescription) -> DispatchResult {
		panic!("unexpected void-shaped call: {} {}", request.method(), request.path());
	}

	fn send_for_value(&self, request: RequestDescription) -> DispatchResult<serde_json::Value> {
		*self.last.lock() = Some(request);
		Ok(self.value.clone())
	}
}
