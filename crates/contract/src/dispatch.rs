//! The dispatcher seam between generated clients and transports.

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::RequestDescription;

/// Result of a dispatched call.
pub type DispatchResult<T = ()> = std::result::Result<T, DispatchError>;

/// Errors surfaced by a [`Dispatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
	/// The remote side answered with a failure status.
	#[error("request rejected with status {status}: {reason}")]
	Rejected {
		/// Status code reported by the transport.
		status: u16,
		/// Human-readable reason.
		reason: String,
	},
	/// The request never completed.
	#[error("transport failure: {0}")]
	Transport(String),
	/// A value-shaped response could not be decoded into the declared type.
	#[error("failed to decode response: {0}")]
	Decode(String),
}

/// Abstract sender of structured requests on behalf of generated client methods.
pub trait Dispatcher: Send + Sync {
	/// Sends a request whose method declares no result value.
	fn send(&self, request: RequestDescription) -> DispatchResult;

	/// Sends a request whose method declares a result value.
	fn send_for_value(&self, request: RequestDescription) -> DispatchResult<serde_json::Value>;
}

/// Decodes a value-shaped response into the declared result type.
pub fn decode<T: DeserializeOwned>(value: serde_json::Value) -> DispatchResult<T> {
	serde_json::from_value(value).map_err(|e| DispatchError::Decode(e.to_string()))
}
