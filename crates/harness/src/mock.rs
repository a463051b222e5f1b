//! Dispatcher doubles for generated implementations.

use std::sync::Arc;

use parking_lot::Mutex;
use stubgen_contract::{DispatchResult, Dispatcher, RequestDescription};

/// A [`Dispatcher`] that panics on anything it was not configured for.
///
/// The value shape is never configured; only void-shaped calls can be
/// recorded.
#[derive(Debug)]
pub struct MockDispatcher {
	recording: Option<Recording>,
}

#[derive(Debug)]
struct Recording {
	recorder: CallRecorder,
	result: DispatchResult,
}

impl MockDispatcher {
	/// Rejects every call.
	pub fn strict() -> Arc<Self> {
		Arc::new(Self { recording: None })
	}

	/// Captures void-shaped calls and answers them with `Ok(())`.
	pub fn recording() -> (Arc<Self>, CallRecorder) {
		Self::returning(Ok(()))
	}

	/// Captures void-shaped calls and answers every one with `result`.
	pub fn returning(result: DispatchResult) -> (Arc<Self>, CallRecorder) {
		let recorder = CallRecorder::default();
		let mock = Self {
			recording: Some(Recording {
				recorder: recorder.clone(),
				result,
			}),
		};
		(Arc::new(mock), recorder)
	}
}

impl Dispatcher for MockDispatcher {
	fn send(&self, request: RequestDescription) -> DispatchResult {
		let Some(recording) = &self.recording else {
			panic!(
				"unexpected call on strict dispatcher: {} {}",
				request.method(),
				request.path()
			);
		};
		recording.recorder.capture(request);
		recording.result.clone()
	}

	fn send_for_value(&self, request: RequestDescription) -> DispatchResult<serde_json::Value> {
		panic!(
			"unexpected value-shaped call on mock dispatcher: {} {}",
			request.method(),
			request.path()
		);
	}
}

/// Holds the request captured by a recording [`MockDispatcher`].
///
/// Holds at most one request at a time; a capture while the previous one has
/// not been taken panics.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
	state: Arc<Mutex<RecorderState>>,
}

#[derive(Debug, Default)]
struct RecorderState {
	pending: Option<RequestDescription>,
	calls: usize,
}

impl CallRecorder {
	fn capture(&self, request: RequestDescription) {
		let mut state = self.state.lock();
		if let Some(pending) = &state.pending {
			panic!(
				"{} {} captured while {} {} is still outstanding",
				request.method(),
				request.path(),
				pending.method(),
				pending.path()
			);
		}
		state.pending = Some(request);
		state.calls += 1;
	}

	/// Removes and returns the captured request.
	///
	/// # Panics
	///
	/// Panics if nothing was captured.
	pub fn take(&self) -> RequestDescription {
		self.try_take().unwrap_or_else(|| panic!("no request was captured"))
	}

	pub fn try_take(&self) -> Option<RequestDescription> {
		self.state.lock().pending.take()
	}

	/// Inspects the captured request without taking it.
	pub fn peek<R>(&self, f: impl FnOnce(Option<&RequestDescription>) -> R) -> R {
		f(self.state.lock().pending.as_ref())
	}

	/// Number of requests captured so far, taken or not.
	pub fn call_count(&self) -> usize {
		self.state.lock().calls
	}
}
